use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::UserId,
    entities::ack_production::{self, Entity as AckProduction, Variety},
    errors::ServiceError,
};

/// Field set for a new ACK production row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAckProduction {
    pub ack_number: String,
    pub production_date: NaiveDate,
    pub rice_type: Variety,
    pub fortified_rice_qty: Decimal,
    pub raw_rice_qty: Decimal,
    pub frk_qty: Decimal,
    pub season: Option<String>,
    pub notes: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AckProductionStore: Send + Sync {
    async fn create(
        &self,
        user: UserId,
        production: NewAckProduction,
    ) -> Result<ack_production::Model, ServiceError>;

    /// Earliest production recorded under `ack_number` for the user
    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<ack_production::Model>, ServiceError>;
}

#[derive(Clone)]
pub struct AckProductionService {
    db: Arc<DatabaseConnection>,
}

impl AckProductionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user: UserId,
        season: Option<&str>,
    ) -> Result<Vec<ack_production::Model>, ServiceError> {
        let mut query =
            AckProduction::find().filter(ack_production::Column::UserId.eq(user.as_uuid()));
        if let Some(season) = season {
            query = query.filter(ack_production::Column::Season.eq(season));
        }

        query
            .order_by_desc(ack_production::Column::ProductionDate)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to list ACK productions: {}", e);
                ServiceError::DatabaseError(e)
            })
    }
}

#[async_trait]
impl AckProductionStore for AckProductionService {
    #[instrument(skip(self, production), fields(ack_number = %production.ack_number))]
    async fn create(
        &self,
        user: UserId,
        production: NewAckProduction,
    ) -> Result<ack_production::Model, ServiceError> {
        let model = ack_production::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.as_uuid()),
            ack_number: Set(production.ack_number),
            production_date: Set(production.production_date),
            rice_type: Set(production.rice_type),
            fortified_rice_qty: Set(production.fortified_rice_qty),
            raw_rice_qty: Set(production.raw_rice_qty),
            frk_qty: Set(production.frk_qty),
            season: Set(production.season),
            notes: Set(production.notes),
            ..Default::default()
        };

        model.insert(&*self.db).await.map_err(|e| {
            error!("Failed to create ACK production: {}", e);
            ServiceError::DatabaseError(e)
        })
    }

    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<ack_production::Model>, ServiceError> {
        AckProduction::find()
            .filter(ack_production::Column::UserId.eq(user.as_uuid()))
            .filter(ack_production::Column::AckNumber.eq(ack_number))
            .order_by_asc(ack_production::Column::CreatedAt)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
