use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Procuring pool a CMR lot is delivered to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DestinationPool {
    #[default]
    #[sea_orm(string_value = "fci")]
    Fci,
    #[sea_orm(string_value = "central")]
    Central,
    #[sea_orm(string_value = "state")]
    State,
}

impl DestinationPool {
    /// Upper-cased label used on freight bills ("FCI", "CENTRAL", "STATE")
    pub fn freight_label(&self) -> String {
        self.to_string().to_uppercase()
    }
}

/// Rice variety; doubles as the production rice type
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Variety {
    #[default]
    #[sea_orm(string_value = "raw")]
    Raw,
    #[sea_orm(string_value = "boiled")]
    Boiled,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// Whether unloading and quality deposit at the pool has been completed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DumpingStatus {
    #[sea_orm(string_value = "pending_ds")]
    PendingDs,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl DumpingStatus {
    pub fn from_dumping_date<T>(dumping_date: Option<T>) -> Self {
        match dumping_date {
            Some(_) => Self::Completed,
            None => Self::PendingDs,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "paid")]
    Paid,
}
