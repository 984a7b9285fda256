use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::UserId,
    entities::cmr_delivery::{
        self, DeliveryStatus, DestinationPool, DumpingStatus, Entity as CmrDelivery, Variety,
    },
    errors::ServiceError,
};

/// Field set for a new CMR delivery row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCmrDelivery {
    pub ack_number: String,
    pub delivery_date: NaiveDate,
    pub destination_pool: DestinationPool,
    pub variety: Variety,
    pub cmr_quantity_qtls: Decimal,
    pub paddy_consumed_qtls: Decimal,
    pub vehicle_number: String,
    pub driver_name: String,
    pub delivery_status: DeliveryStatus,
    pub gate_in_status: bool,
    pub gate_in_date: Option<NaiveDate>,
    pub dumping_status: DumpingStatus,
    pub dumping_date: Option<NaiveDate>,
    pub season: String,
    pub notes: Option<String>,
}

/// What the import workflow needs from the CMR delivery owner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CmrDeliveryStore: Send + Sync {
    async fn create(
        &self,
        user: UserId,
        delivery: NewCmrDelivery,
    ) -> Result<cmr_delivery::Model, ServiceError>;

    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<cmr_delivery::Model>, ServiceError>;
}

/// sea-orm backed owner of the `cmr_deliveries` table
#[derive(Clone)]
pub struct CmrDeliveryService {
    db: Arc<DatabaseConnection>,
}

impl CmrDeliveryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists a user's deliveries, newest delivery date first, optionally for one season
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user: UserId,
        season: Option<&str>,
    ) -> Result<Vec<cmr_delivery::Model>, ServiceError> {
        let mut query = CmrDelivery::find().filter(cmr_delivery::Column::UserId.eq(user.as_uuid()));
        if let Some(season) = season {
            query = query.filter(cmr_delivery::Column::Season.eq(season));
        }

        query
            .order_by_desc(cmr_delivery::Column::DeliveryDate)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to list CMR deliveries: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    /// Records the dumping date of a delivery and marks dumping completed
    #[instrument(skip(self))]
    pub async fn mark_dumping_completed(
        &self,
        user: UserId,
        id: Uuid,
        dumping_date: NaiveDate,
    ) -> Result<cmr_delivery::Model, ServiceError> {
        let existing = CmrDelivery::find_by_id(id)
            .filter(cmr_delivery::Column::UserId.eq(user.as_uuid()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("CMR delivery {} not found", id)))?;

        let mut active: cmr_delivery::ActiveModel = existing.into();
        active.dumping_date = Set(Some(dumping_date));
        active.dumping_status = Set(DumpingStatus::Completed);

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!("Failed to update CMR delivery {}: {}", id, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(cmr_delivery_id = %id, "Dumping marked completed");
        Ok(updated)
    }
}

#[async_trait]
impl CmrDeliveryStore for CmrDeliveryService {
    #[instrument(skip(self, delivery), fields(ack_number = %delivery.ack_number))]
    async fn create(
        &self,
        user: UserId,
        delivery: NewCmrDelivery,
    ) -> Result<cmr_delivery::Model, ServiceError> {
        let model = cmr_delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.as_uuid()),
            ack_number: Set(delivery.ack_number),
            delivery_date: Set(delivery.delivery_date),
            destination_pool: Set(delivery.destination_pool),
            variety: Set(delivery.variety),
            cmr_quantity_qtls: Set(delivery.cmr_quantity_qtls),
            paddy_consumed_qtls: Set(delivery.paddy_consumed_qtls),
            vehicle_number: Set(delivery.vehicle_number),
            driver_name: Set(delivery.driver_name),
            delivery_status: Set(delivery.delivery_status),
            gate_in_status: Set(delivery.gate_in_status),
            gate_in_date: Set(delivery.gate_in_date),
            dumping_status: Set(delivery.dumping_status),
            dumping_date: Set(delivery.dumping_date),
            season: Set(delivery.season),
            notes: Set(delivery.notes),
            ..Default::default()
        };

        model.insert(&*self.db).await.map_err(|e| {
            error!("Failed to create CMR delivery: {}", e);
            ServiceError::DatabaseError(e)
        })
    }

    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<cmr_delivery::Model>, ServiceError> {
        CmrDelivery::find()
            .filter(cmr_delivery::Column::UserId.eq(user.as_uuid()))
            .filter(cmr_delivery::Column::AckNumber.eq(ack_number))
            .order_by_asc(cmr_delivery::Column::CreatedAt)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}
