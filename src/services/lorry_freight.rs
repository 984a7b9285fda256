use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::UserId,
    entities::lorry_freight::{self, Entity as LorryFreight, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Field set for a new lorry freight row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLorryFreight {
    pub ack_number: String,
    pub vehicle_number: String,
    pub delivery_date: NaiveDate,
    pub transporter_name: String,
    pub quantity_qtls: Decimal,
    pub freight_rate: Decimal,
    pub total_freight: Decimal,
    pub advance_paid: Decimal,
    pub balance_due: Decimal,
    pub payment_status: PaymentStatus,
    pub destination: String,
    pub season: String,
    pub notes: Option<String>,
}

/// Billing amounts derived from quantity, rate and advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreightTotals {
    pub total_freight: Decimal,
    pub balance_due: Decimal,
}

impl FreightTotals {
    /// total = quantity × rate, balance = total − advance
    pub fn compute(
        quantity_qtls: Decimal,
        freight_rate: Decimal,
        advance_paid: Decimal,
    ) -> Result<Self, ServiceError> {
        let total_freight = quantity_qtls.checked_mul(freight_rate).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "freight total overflows for {} qtls at {}",
                quantity_qtls, freight_rate
            ))
        })?;
        let balance_due = total_freight
            .checked_sub(advance_paid)
            .ok_or_else(|| ServiceError::InvalidInput("freight balance overflows".to_string()))?;

        Ok(Self {
            total_freight,
            balance_due,
        })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LorryFreightStore: Send + Sync {
    async fn create(
        &self,
        user: UserId,
        freight: NewLorryFreight,
    ) -> Result<lorry_freight::Model, ServiceError>;

    /// Most recently created freight entry under `ack_number` for the user
    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<lorry_freight::Model>, ServiceError>;
}

/// Owner of the `lorry_freight` table; also settles freight bills.
#[derive(Clone)]
pub struct LorryFreightService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl LorryFreightService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user: UserId,
        season: Option<&str>,
    ) -> Result<Vec<lorry_freight::Model>, ServiceError> {
        let mut query =
            LorryFreight::find().filter(lorry_freight::Column::UserId.eq(user.as_uuid()));
        if let Some(season) = season {
            query = query.filter(lorry_freight::Column::Season.eq(season));
        }

        query
            .order_by_desc(lorry_freight::Column::DeliveryDate)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to list lorry freight: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    /// Applies a payment against a freight bill.
    ///
    /// The amount is added to `advance_paid` and taken off `balance_due` in a
    /// single conditional UPDATE guarded by `balance_due >= amount`, so
    /// concurrent payments accumulate and can never overdraw the bill.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        user: UserId,
        id: Uuid,
        amount: Decimal,
    ) -> Result<lorry_freight::Model, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "payment amount must be positive".to_string(),
            ));
        }

        let payment_status: SimpleExpr = Expr::case(
            Expr::col(lorry_freight::Column::BalanceDue).lte(amount),
            PaymentStatus::Paid.to_value(),
        )
        .finally(PaymentStatus::Partial.to_value())
        .into();

        let result = LorryFreight::update_many()
            .col_expr(
                lorry_freight::Column::AdvancePaid,
                Expr::col(lorry_freight::Column::AdvancePaid).add(amount),
            )
            .col_expr(
                lorry_freight::Column::BalanceDue,
                Expr::col(lorry_freight::Column::BalanceDue).sub(amount),
            )
            .col_expr(lorry_freight::Column::PaymentStatus, payment_status)
            .col_expr(lorry_freight::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(lorry_freight::Column::Id.eq(id))
            .filter(lorry_freight::Column::UserId.eq(user.as_uuid()))
            .filter(lorry_freight::Column::BalanceDue.gte(amount))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to record payment on lorry freight {}: {}", id, e);
                ServiceError::DatabaseError(e)
            })?;

        let current = LorryFreight::find_by_id(id)
            .filter(lorry_freight::Column::UserId.eq(user.as_uuid()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Lorry freight {} not found", id)))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ValidationError(format!(
                "payment {} exceeds balance due {}",
                amount, current.balance_due
            )));
        }

        info!(
            lorry_freight_id = %id,
            amount = %amount,
            status = %current.payment_status,
            "Freight payment recorded"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::FreightPaymentRecorded {
                    user_id: user.as_uuid(),
                    lorry_freight_id: id,
                })
                .await
            {
                warn!("Failed to publish FreightPaymentRecorded: {}", e);
            }
        }

        Ok(current)
    }
}

#[async_trait]
impl LorryFreightStore for LorryFreightService {
    #[instrument(skip(self, freight), fields(ack_number = %freight.ack_number))]
    async fn create(
        &self,
        user: UserId,
        freight: NewLorryFreight,
    ) -> Result<lorry_freight::Model, ServiceError> {
        let model = lorry_freight::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.as_uuid()),
            ack_number: Set(freight.ack_number),
            vehicle_number: Set(freight.vehicle_number),
            delivery_date: Set(freight.delivery_date),
            transporter_name: Set(freight.transporter_name),
            quantity_qtls: Set(freight.quantity_qtls),
            freight_rate: Set(freight.freight_rate),
            total_freight: Set(freight.total_freight),
            advance_paid: Set(freight.advance_paid),
            balance_due: Set(freight.balance_due),
            payment_status: Set(freight.payment_status),
            destination: Set(freight.destination),
            season: Set(freight.season),
            notes: Set(freight.notes),
            ..Default::default()
        };

        model.insert(&*self.db).await.map_err(|e| {
            error!("Failed to create lorry freight: {}", e);
            ServiceError::DatabaseError(e)
        })
    }

    async fn find_by_ack_number(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<Option<lorry_freight::Model>, ServiceError> {
        LorryFreight::find()
            .filter(lorry_freight::Column::UserId.eq(user.as_uuid()))
            .filter(lorry_freight::Column::AckNumber.eq(ack_number))
            .order_by_desc(lorry_freight::Column::CreatedAt)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(290), dec!(40), dec!(0), dec!(11600), dec!(11600))]
    #[case(dec!(290), dec!(40), dec!(5000), dec!(11600), dec!(6600))]
    #[case(dec!(145.5), dec!(42.5), dec!(0), dec!(6183.75), dec!(6183.75))]
    #[case(dec!(0), dec!(40), dec!(0), dec!(0), dec!(0))]
    fn totals_follow_quantity_rate_and_advance(
        #[case] quantity: Decimal,
        #[case] rate: Decimal,
        #[case] advance: Decimal,
        #[case] total: Decimal,
        #[case] balance: Decimal,
    ) {
        let totals = FreightTotals::compute(quantity, rate, advance).unwrap();
        assert_eq!(totals.total_freight, total);
        assert_eq!(totals.balance_due, balance);
    }

    #[test]
    fn totals_reject_overflow() {
        let result = FreightTotals::compute(Decimal::MAX, dec!(2), dec!(0));
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }
}
