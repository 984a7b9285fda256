use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::enums::{DeliveryStatus, DestinationPool, DumpingStatus, Variety};

/// Milled rice lot handed over to a procuring pool
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cmr_deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub ack_number: String,
    pub delivery_date: NaiveDate,
    pub destination_pool: DestinationPool,
    pub variety: Variety,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub cmr_quantity_qtls: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
