//! Caller identity.
//!
//! Every store and orchestrator call takes the acting [`UserId`] explicitly;
//! nothing resolves "the current user" from ambient state. Over HTTP the
//! identity arrives in the `x-user-id` header, set by the fronting gateway
//! after it has authenticated the caller.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity that owns (and scopes every query over) procurement records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
            })?
            .to_str()
            .map_err(|_| {
                ServiceError::Unauthorized(format!("{} header is not valid text", USER_ID_HEADER))
            })?;

        raw.parse::<UserId>().map_err(|_| {
            ServiceError::Unauthorized(format!("{} header is not a UUID", USER_ID_HEADER))
        })
    }
}
