//! Cross-entity CMR import and freight synchronization.
//!
//! One imported CMR row fans out into a CMR delivery, an ACK production and a
//! lorry freight bill, all keyed by the acknowledgement number. The three
//! writes are sequential and not atomic: when a later write fails the earlier
//! rows stay persisted, and the failed outcome names them so the caller can
//! compensate.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::UserId,
    config::{validate_non_negative, IntegrationConfig},
    entities::{
        ack_production, cmr_delivery, lorry_freight, DeliveryStatus, DestinationPool,
        DumpingStatus, PaymentStatus, Variety,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::{
        ack_productions::{AckProductionStore, NewAckProduction},
        cmr_deliveries::{CmrDeliveryStore, NewCmrDelivery},
        lorry_freight::{FreightTotals, LorryFreightStore, NewLorryFreight},
    },
};

/// Vehicle recorded on freight entries created by the backfill sync
pub const SYNC_VEHICLE_PLACEHOLDER: &str = "TBD";

/// One row of a CMR delivery sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CmrImportRecord {
    #[validate(length(min = 1, message = "ack_number must not be empty"))]
    pub ack_number: String,
    pub dispatch_date: NaiveDate,
    #[validate(length(min = 1, message = "vehicle_number must not be empty"))]
    pub vehicle_number: String,
    #[validate(custom = "validate_quantity")]
    pub net_rice_qty: Decimal,
    #[validate(custom = "validate_quantity")]
    pub frk_qty: Decimal,
    #[serde(default)]
    pub gate_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub dumping_date: Option<NaiveDate>,
}

fn validate_quantity(qty: &Decimal) -> Result<(), ValidationError> {
    if qty.is_sign_negative() && !qty.is_zero() {
        let mut err = ValidationError::new("quantity");
        err.message = Some("quantity must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Per-call overrides; anything left unset falls back to [`IntegrationConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImportOptions {
    pub season: Option<String>,
    pub destination: Option<DestinationPool>,
    pub variety: Option<Variety>,
    #[validate(custom = "validate_non_negative")]
    pub standard_quantity_qtls: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub freight_rate: Option<Decimal>,
    pub skip_if_exists: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            season: None,
            destination: None,
            variety: None,
            standard_quantity_qtls: None,
            freight_rate: None,
            skip_if_exists: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedOptions {
    season: String,
    destination: DestinationPool,
    variety: Variety,
    standard_quantity_qtls: Decimal,
    freight_rate: Decimal,
    skip_if_exists: bool,
}

impl ResolvedOptions {
    fn resolve(options: &ImportOptions, config: &IntegrationConfig) -> Self {
        Self {
            season: options
                .season
                .clone()
                .unwrap_or_else(|| config.default_season.clone()),
            destination: options.destination.unwrap_or_default(),
            variety: options.variety.unwrap_or_default(),
            standard_quantity_qtls: options
                .standard_quantity_qtls
                .unwrap_or(config.standard_quantity_qtls),
            freight_rate: options.freight_rate.unwrap_or(config.default_freight_rate),
            skip_if_exists: options.skip_if_exists,
        }
    }
}

/// Step of the import at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImportStage {
    Validation,
    DuplicateCheck,
    PaddyCalculation,
    CmrDelivery,
    AckProduction,
    LorryFreight,
}

/// The three rows written by a successful import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecords {
    pub cmr_delivery: cmr_delivery::Model,
    pub ack_production: ack_production::Model,
    pub lorry_freight: lorry_freight::Model,
}

/// Rows already persisted when an import failed part-way
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenRecords {
    pub cmr_delivery_id: Option<Uuid>,
    pub ack_production_id: Option<Uuid>,
}

impl WrittenRecords {
    pub fn is_empty(&self) -> bool {
        self.cmr_delivery_id.is_none() && self.ack_production_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported {
        ack_number: String,
        records: Box<CreatedRecords>,
    },
    Skipped {
        ack_number: String,
        reason: String,
    },
    Failed {
        ack_number: String,
        stage: ImportStage,
        error: String,
        written: WrittenRecords,
    },
}

impl ImportOutcome {
    pub fn ack_number(&self) -> &str {
        match self {
            Self::Imported { ack_number, .. }
            | Self::Skipped { ack_number, .. }
            | Self::Failed { ack_number, .. } => ack_number,
        }
    }

    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}

/// Reported to the progress callback before each bulk item is processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// 1-based position of the item about to be imported
    pub current: usize,
    pub total: usize,
    pub ack_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkImportSummary {
    pub total_processed: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    /// One outcome per input record, in input order
    pub results: Vec<ImportOutcome>,
}

impl BulkImportSummary {
    fn record(&mut self, outcome: ImportOutcome) {
        self.total_processed += 1;
        match &outcome {
            ImportOutcome::Imported { .. } => self.successful += 1,
            ImportOutcome::Skipped { .. } => self.skipped += 1,
            ImportOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(outcome);
    }
}

/// Everything recorded under one acknowledgement number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegratedAckData {
    pub cmr_delivery: Option<cmr_delivery::Model>,
    pub ack_production: Option<ack_production::Model>,
    pub lorry_freight: Option<lorry_freight::Model>,
}

impl IntegratedAckData {
    pub fn is_empty(&self) -> bool {
        self.cmr_delivery.is_none() && self.ack_production.is_none() && self.lorry_freight.is_none()
    }
}

/// Paddy implied by the delivered rice: (net + FRK) / yield, to 2 decimal places
pub fn paddy_consumed(
    net_rice_qty: Decimal,
    frk_qty: Decimal,
    milling_yield_factor: Decimal,
) -> Result<Decimal, ServiceError> {
    let rice = net_rice_qty
        .checked_add(frk_qty)
        .ok_or_else(|| ServiceError::InvalidInput("rice quantity overflows".to_string()))?;
    let paddy = rice.checked_div(milling_yield_factor).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "cannot derive paddy with milling yield factor {}",
            milling_yield_factor
        ))
    })?;

    Ok(paddy.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

type StageResult<T> = Result<T, (ImportStage, ServiceError)>;

trait AtStage<T> {
    fn at(self, stage: ImportStage) -> StageResult<T>;
}

impl<T, E: Into<ServiceError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: ImportStage) -> StageResult<T> {
        self.map_err(|e| (stage, e.into()))
    }
}

enum ImportStep {
    Created(CreatedRecords),
    AlreadyExists,
}

/// Orchestrates imports, freight backfill and the integrated read across the
/// three entity stores.
#[derive(Clone)]
pub struct CmrIntegrationService {
    cmr_deliveries: Arc<dyn CmrDeliveryStore>,
    ack_productions: Arc<dyn AckProductionStore>,
    lorry_freight: Arc<dyn LorryFreightStore>,
    config: IntegrationConfig,
    event_sender: Option<Arc<EventSender>>,
}

impl CmrIntegrationService {
    pub fn new(
        cmr_deliveries: Arc<dyn CmrDeliveryStore>,
        ack_productions: Arc<dyn AckProductionStore>,
        lorry_freight: Arc<dyn LorryFreightStore>,
        config: IntegrationConfig,
    ) -> Self {
        Self {
            cmr_deliveries,
            ack_productions,
            lorry_freight,
            config,
            event_sender: None,
        }
    }

    pub fn with_event_sender(mut self, event_sender: Arc<EventSender>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Imports one CMR row as a delivery, an ACK production and a freight bill.
    ///
    /// Never returns an error: duplicates come back as `Skipped` and any
    /// failure as `Failed`, with earlier writes left in place.
    #[instrument(skip(self, record, options), fields(ack_number = %record.ack_number))]
    pub async fn import_cmr_delivery(
        &self,
        user: UserId,
        record: &CmrImportRecord,
        options: &ImportOptions,
    ) -> ImportOutcome {
        let mut written = WrittenRecords::default();
        let ack_number = record.ack_number.clone();

        match self.run_import(user, record, options, &mut written).await {
            Ok(ImportStep::Created(records)) => {
                metrics::CMR_IMPORTS.inc();
                info!(
                    cmr_delivery_id = %records.cmr_delivery.id,
                    ack_production_id = %records.ack_production.id,
                    lorry_freight_id = %records.lorry_freight.id,
                    "CMR delivery imported"
                );
                self.publish(Event::CmrImported {
                    user_id: user.as_uuid(),
                    ack_number: ack_number.clone(),
                    cmr_delivery_id: records.cmr_delivery.id,
                    ack_production_id: records.ack_production.id,
                    lorry_freight_id: records.lorry_freight.id,
                })
                .await;
                ImportOutcome::Imported {
                    ack_number,
                    records: Box::new(records),
                }
            }
            Ok(ImportStep::AlreadyExists) => {
                metrics::CMR_IMPORT_SKIPS.inc();
                info!("ACK already exists, skipping import");
                self.publish(Event::CmrImportSkipped {
                    user_id: user.as_uuid(),
                    ack_number: ack_number.clone(),
                })
                .await;
                ImportOutcome::Skipped {
                    reason: format!("ACK {} already exists", ack_number),
                    ack_number,
                }
            }
            Err((stage, err)) => {
                metrics::CMR_IMPORT_FAILURES.inc();
                error!(stage = %stage, written = ?written, "CMR import failed: {}", err);
                let message = err.to_string();
                self.publish(Event::CmrImportFailed {
                    user_id: user.as_uuid(),
                    ack_number: ack_number.clone(),
                    error: message.clone(),
                })
                .await;
                ImportOutcome::Failed {
                    ack_number,
                    stage,
                    error: message,
                    written,
                }
            }
        }
    }

    async fn run_import(
        &self,
        user: UserId,
        record: &CmrImportRecord,
        options: &ImportOptions,
        written: &mut WrittenRecords,
    ) -> StageResult<ImportStep> {
        record.validate().at(ImportStage::Validation)?;
        options.validate().at(ImportStage::Validation)?;
        let options = &ResolvedOptions::resolve(options, &self.config);

        if options.skip_if_exists {
            let existing = self
                .ack_productions
                .find_by_ack_number(user, &record.ack_number)
                .await
                .at(ImportStage::DuplicateCheck)?;
            if existing.is_some() {
                return Ok(ImportStep::AlreadyExists);
            }
        }

        let paddy_consumed_qtls = paddy_consumed(
            record.net_rice_qty,
            record.frk_qty,
            self.config.milling_yield_factor,
        )
        .at(ImportStage::PaddyCalculation)?;

        let cmr_delivery = self
            .cmr_deliveries
            .create(
                user,
                NewCmrDelivery {
                    ack_number: record.ack_number.clone(),
                    delivery_date: record.dispatch_date,
                    destination_pool: options.destination,
                    variety: options.variety,
                    cmr_quantity_qtls: options.standard_quantity_qtls,
                    paddy_consumed_qtls,
                    vehicle_number: record.vehicle_number.clone(),
                    driver_name: String::new(),
                    delivery_status: DeliveryStatus::Delivered,
                    gate_in_status: record.gate_in_date.is_some(),
                    gate_in_date: record.gate_in_date,
                    dumping_status: DumpingStatus::from_dumping_date(record.dumping_date),
                    dumping_date: record.dumping_date,
                    season: options.season.clone(),
                    notes: Some(format!(
                        "Net Rice: {} Qtls, FRK: {} Qtls",
                        record.net_rice_qty, record.frk_qty
                    )),
                },
            )
            .await
            .at(ImportStage::CmrDelivery)?;
        written.cmr_delivery_id = Some(cmr_delivery.id);

        let ack_production = self
            .ack_productions
            .create(
                user,
                NewAckProduction {
                    ack_number: record.ack_number.clone(),
                    production_date: record.dispatch_date,
                    rice_type: options.variety,
                    fortified_rice_qty: options.standard_quantity_qtls,
                    raw_rice_qty: record.net_rice_qty,
                    frk_qty: record.frk_qty,
                    season: Some(options.season.clone()),
                    notes: Some(format!(
                        "Auto-imported from CMR delivery {}",
                        record.ack_number
                    )),
                },
            )
            .await
            .at(ImportStage::AckProduction)?;
        written.ack_production_id = Some(ack_production.id);

        let totals = FreightTotals::compute(
            options.standard_quantity_qtls,
            options.freight_rate,
            Decimal::ZERO,
        )
        .at(ImportStage::LorryFreight)?;

        let lorry_freight = self
            .lorry_freight
            .create(
                user,
                NewLorryFreight {
                    ack_number: record.ack_number.clone(),
                    vehicle_number: record.vehicle_number.clone(),
                    delivery_date: record.dispatch_date,
                    transporter_name: self.config.default_transporter.clone(),
                    quantity_qtls: options.standard_quantity_qtls,
                    freight_rate: options.freight_rate,
                    total_freight: totals.total_freight,
                    advance_paid: Decimal::ZERO,
                    balance_due: totals.balance_due,
                    payment_status: PaymentStatus::Pending,
                    destination: options.destination.freight_label(),
                    season: options.season.clone(),
                    notes: Some(format!("Auto-populated from CMR ACK {}", record.ack_number)),
                },
            )
            .await
            .at(ImportStage::LorryFreight)?;

        Ok(ImportStep::Created(CreatedRecords {
            cmr_delivery,
            ack_production,
            lorry_freight,
        }))
    }

    /// Imports records one after another, pausing between items.
    pub async fn bulk_import(
        &self,
        user: UserId,
        records: &[CmrImportRecord],
        options: &ImportOptions,
    ) -> BulkImportSummary {
        self.bulk_import_with_progress(user, records, options, |_| {})
            .await
    }

    /// Like [`bulk_import`](Self::bulk_import), calling `on_progress` before
    /// each item is processed.
    #[instrument(skip_all, fields(user = %user, total = records.len()))]
    pub async fn bulk_import_with_progress<F>(
        &self,
        user: UserId,
        records: &[CmrImportRecord],
        options: &ImportOptions,
        mut on_progress: F,
    ) -> BulkImportSummary
    where
        F: FnMut(ImportProgress) + Send,
    {
        let total = records.len();
        let delay = self.config.bulk_item_delay();
        let mut summary = BulkImportSummary {
            results: Vec::with_capacity(total),
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            on_progress(ImportProgress {
                current: index + 1,
                total,
                ack_number: record.ack_number.clone(),
            });

            let outcome = self.import_cmr_delivery(user, record, options).await;
            summary.record(outcome);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            successful = summary.successful,
            skipped = summary.skipped,
            failed = summary.failed,
            "Bulk CMR import finished"
        );
        summary
    }

    /// Creates a new freight bill from an existing ACK production.
    ///
    /// Existing freight for the ACK is not checked; every successful call adds
    /// a row. Returns `false` when the production is missing or a write fails.
    #[instrument(skip(self))]
    pub async fn sync_ack_production_to_freight(&self, user: UserId, ack_number: &str) -> bool {
        match self.create_freight_from_production(user, ack_number).await {
            Ok(freight) => {
                metrics::FREIGHT_SYNCS.inc();
                info!(lorry_freight_id = %freight.id, "Freight synced from ACK production");
                self.publish(Event::FreightSynced {
                    user_id: user.as_uuid(),
                    ack_number: ack_number.to_string(),
                    lorry_freight_id: freight.id,
                })
                .await;
                true
            }
            Err(e) => {
                metrics::FREIGHT_SYNC_FAILURES.inc();
                error!("Failed to sync ACK production to freight: {}", e);
                false
            }
        }
    }

    async fn create_freight_from_production(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<lorry_freight::Model, ServiceError> {
        let production = self
            .ack_productions
            .find_by_ack_number(user, ack_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("ACK production {} not found", ack_number))
            })?;

        let quantity = self.config.standard_quantity_qtls;
        let rate = self.config.default_freight_rate;
        let totals = FreightTotals::compute(quantity, rate, Decimal::ZERO)?;

        self.lorry_freight
            .create(
                user,
                NewLorryFreight {
                    ack_number: ack_number.to_string(),
                    vehicle_number: SYNC_VEHICLE_PLACEHOLDER.to_string(),
                    delivery_date: production.production_date,
                    transporter_name: self.config.default_transporter.clone(),
                    quantity_qtls: quantity,
                    freight_rate: rate,
                    total_freight: totals.total_freight,
                    advance_paid: Decimal::ZERO,
                    balance_due: totals.balance_due,
                    payment_status: PaymentStatus::Pending,
                    destination: self.config.sync_destination.clone(),
                    season: production
                        .season
                        .unwrap_or_else(|| self.config.default_season.clone()),
                    notes: Some(format!("Synced from ACK Production {}", ack_number)),
                },
            )
            .await
    }

    /// Looks up the delivery, production and freight bill for one ACK.
    ///
    /// Lookup failures are logged and reported as an empty result.
    #[instrument(skip(self))]
    pub async fn integrated_ack_data(&self, user: UserId, ack_number: &str) -> IntegratedAckData {
        match self.load_integrated(user, ack_number).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to load integrated ACK data: {}", e);
                IntegratedAckData::default()
            }
        }
    }

    async fn load_integrated(
        &self,
        user: UserId,
        ack_number: &str,
    ) -> Result<IntegratedAckData, ServiceError> {
        let cmr_delivery = self
            .cmr_deliveries
            .find_by_ack_number(user, ack_number)
            .await?;
        let ack_production = self
            .ack_productions
            .find_by_ack_number(user, ack_number)
            .await?;
        let lorry_freight = self
            .lorry_freight
            .find_by_ack_number(user, ack_number)
            .await?;

        Ok(IntegratedAckData {
            cmr_delivery,
            ack_production,
            lorry_freight,
        })
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to publish integration event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lorry_freight::MockLorryFreightStore;
    use crate::services::ack_productions::MockAckProductionStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct MemoryStores {
        deliveries: Mutex<Vec<cmr_delivery::Model>>,
        productions: Mutex<Vec<ack_production::Model>>,
        freight: Mutex<Vec<lorry_freight::Model>>,
    }

    impl MemoryStores {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.deliveries.lock().unwrap().len(),
                self.productions.lock().unwrap().len(),
                self.freight.lock().unwrap().len(),
            )
        }
    }

    #[async_trait]
    impl CmrDeliveryStore for MemoryStores {
        async fn create(
            &self,
            user: UserId,
            d: NewCmrDelivery,
        ) -> Result<cmr_delivery::Model, ServiceError> {
            let model = cmr_delivery::Model {
                id: Uuid::new_v4(),
                user_id: user.as_uuid(),
                ack_number: d.ack_number,
                delivery_date: d.delivery_date,
                destination_pool: d.destination_pool,
                variety: d.variety,
                cmr_quantity_qtls: d.cmr_quantity_qtls,
                paddy_consumed_qtls: d.paddy_consumed_qtls,
                vehicle_number: d.vehicle_number,
                driver_name: d.driver_name,
                delivery_status: d.delivery_status,
                gate_in_status: d.gate_in_status,
                gate_in_date: d.gate_in_date,
                dumping_status: d.dumping_status,
                dumping_date: d.dumping_date,
                season: d.season,
                notes: d.notes,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.deliveries.lock().unwrap().push(model.clone());
            Ok(model)
        }

        async fn find_by_ack_number(
            &self,
            user: UserId,
            ack_number: &str,
        ) -> Result<Option<cmr_delivery::Model>, ServiceError> {
            Ok(self
                .deliveries
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.user_id == user.as_uuid() && d.ack_number == ack_number)
                .cloned())
        }
    }

    #[async_trait]
    impl AckProductionStore for MemoryStores {
        async fn create(
            &self,
            user: UserId,
            p: NewAckProduction,
        ) -> Result<ack_production::Model, ServiceError> {
            let model = ack_production::Model {
                id: Uuid::new_v4(),
                user_id: user.as_uuid(),
                ack_number: p.ack_number,
                production_date: p.production_date,
                rice_type: p.rice_type,
                fortified_rice_qty: p.fortified_rice_qty,
                raw_rice_qty: p.raw_rice_qty,
                frk_qty: p.frk_qty,
                season: p.season,
                notes: p.notes,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.productions.lock().unwrap().push(model.clone());
            Ok(model)
        }

        async fn find_by_ack_number(
            &self,
            user: UserId,
            ack_number: &str,
        ) -> Result<Option<ack_production::Model>, ServiceError> {
            Ok(self
                .productions
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.user_id == user.as_uuid() && p.ack_number == ack_number)
                .cloned())
        }
    }

    #[async_trait]
    impl LorryFreightStore for MemoryStores {
        async fn create(
            &self,
            user: UserId,
            f: NewLorryFreight,
        ) -> Result<lorry_freight::Model, ServiceError> {
            let model = lorry_freight::Model {
                id: Uuid::new_v4(),
                user_id: user.as_uuid(),
                ack_number: f.ack_number,
                vehicle_number: f.vehicle_number,
                delivery_date: f.delivery_date,
                transporter_name: f.transporter_name,
                quantity_qtls: f.quantity_qtls,
                freight_rate: f.freight_rate,
                total_freight: f.total_freight,
                advance_paid: f.advance_paid,
                balance_due: f.balance_due,
                payment_status: f.payment_status,
                destination: f.destination,
                season: f.season,
                notes: f.notes,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.freight.lock().unwrap().push(model.clone());
            Ok(model)
        }

        async fn find_by_ack_number(
            &self,
            user: UserId,
            ack_number: &str,
        ) -> Result<Option<lorry_freight::Model>, ServiceError> {
            Ok(self
                .freight
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|f| f.user_id == user.as_uuid() && f.ack_number == ack_number)
                .cloned())
        }
    }

    fn test_config() -> IntegrationConfig {
        IntegrationConfig {
            bulk_item_delay_ms: 0,
            ..Default::default()
        }
    }

    fn service_over(stores: &Arc<MemoryStores>) -> CmrIntegrationService {
        CmrIntegrationService::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            test_config(),
        )
    }

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    fn record(ack: &str) -> CmrImportRecord {
        CmrImportRecord {
            ack_number: ack.to_string(),
            dispatch_date: date(5),
            vehicle_number: "TN 45 AB 1234".to_string(),
            net_rice_qty: dec!(200),
            frk_qty: dec!(10),
            gate_in_date: None,
            dumping_date: None,
        }
    }

    #[rstest]
    #[case(dec!(200), dec!(10), dec!(313.43))]
    #[case(dec!(287.1), dec!(2.9), dec!(432.84))]
    #[case(dec!(0), dec!(0), dec!(0))]
    #[case(dec!(0.67), dec!(0), dec!(1))]
    fn paddy_consumed_divides_by_yield(
        #[case] net: Decimal,
        #[case] frk: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(paddy_consumed(net, frk, dec!(0.67)).unwrap(), expected);
    }

    #[test]
    fn paddy_consumed_rejects_zero_yield() {
        assert_matches!(
            paddy_consumed(dec!(200), dec!(10), Decimal::ZERO),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn import_writes_all_three_records() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        let outcome = service
            .import_cmr_delivery(user, &record("ACK900"), &ImportOptions::default())
            .await;

        let records = assert_matches!(outcome, ImportOutcome::Imported { records, .. } => records);
        assert_eq!(stores.counts(), (1, 1, 1));

        let delivery = &records.cmr_delivery;
        assert_eq!(delivery.ack_number, "ACK900");
        assert_eq!(delivery.paddy_consumed_qtls, dec!(313.43));
        assert_eq!(delivery.cmr_quantity_qtls, dec!(290));
        assert_eq!(delivery.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(delivery.dumping_status, DumpingStatus::PendingDs);
        assert!(!delivery.gate_in_status);
        assert_eq!(delivery.driver_name, "");
        assert_eq!(delivery.season, "Rabi 24-25");
        assert_eq!(
            delivery.notes.as_deref(),
            Some("Net Rice: 200 Qtls, FRK: 10 Qtls")
        );

        let production = &records.ack_production;
        assert_eq!(production.ack_number, "ACK900");
        assert_eq!(production.fortified_rice_qty, dec!(290));
        assert_eq!(production.raw_rice_qty, dec!(200));
        assert_eq!(production.frk_qty, dec!(10));
        assert_eq!(production.rice_type, Variety::Raw);
        assert_eq!(
            production.notes.as_deref(),
            Some("Auto-imported from CMR delivery ACK900")
        );

        let freight = &records.lorry_freight;
        assert_eq!(freight.ack_number, "ACK900");
        assert_eq!(freight.total_freight, dec!(11600));
        assert_eq!(freight.advance_paid, Decimal::ZERO);
        assert_eq!(freight.balance_due, freight.total_freight);
        assert_eq!(freight.payment_status, PaymentStatus::Pending);
        assert_eq!(freight.destination, "FCI");
        assert_eq!(freight.transporter_name, "FCI Transport");
        assert_eq!(freight.vehicle_number, "TN 45 AB 1234");
        assert_eq!(
            freight.notes.as_deref(),
            Some("Auto-populated from CMR ACK ACK900")
        );
    }

    #[tokio::test]
    async fn import_applies_options() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let options = ImportOptions {
            season: Some("Kharif 24-25".to_string()),
            destination: Some(DestinationPool::Central),
            variety: Some(Variety::Boiled),
            standard_quantity_qtls: Some(dec!(145)),
            freight_rate: Some(dec!(50)),
            skip_if_exists: true,
        };

        let mut input = record("ACK901");
        input.gate_in_date = Some(date(6));
        input.dumping_date = Some(date(7));

        let outcome = service.import_cmr_delivery(user(), &input, &options).await;
        let records = assert_matches!(outcome, ImportOutcome::Imported { records, .. } => records);

        assert!(records.cmr_delivery.gate_in_status);
        assert_eq!(records.cmr_delivery.dumping_status, DumpingStatus::Completed);
        assert_eq!(records.cmr_delivery.variety, Variety::Boiled);
        assert_eq!(records.ack_production.season.as_deref(), Some("Kharif 24-25"));
        assert_eq!(records.lorry_freight.destination, "CENTRAL");
        assert_eq!(records.lorry_freight.total_freight, dec!(7250));
    }

    #[tokio::test]
    async fn existing_ack_is_skipped_without_writes() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        service
            .import_cmr_delivery(user, &record("ACK123"), &ImportOptions::default())
            .await;
        assert_eq!(stores.counts(), (1, 1, 1));

        let outcome = service
            .import_cmr_delivery(user, &record("ACK123"), &ImportOptions::default())
            .await;

        assert_eq!(
            outcome,
            ImportOutcome::Skipped {
                ack_number: "ACK123".to_string(),
                reason: "ACK ACK123 already exists".to_string(),
            }
        );
        assert_eq!(stores.counts(), (1, 1, 1));
    }

    #[tokio::test]
    async fn skip_check_is_scoped_to_user() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);

        service
            .import_cmr_delivery(user(), &record("ACK123"), &ImportOptions::default())
            .await;
        let outcome = service
            .import_cmr_delivery(user(), &record("ACK123"), &ImportOptions::default())
            .await;

        assert!(outcome.is_imported());
        assert_eq!(stores.counts(), (2, 2, 2));
    }

    #[tokio::test]
    async fn disabling_skip_imports_duplicates() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();
        let options = ImportOptions {
            skip_if_exists: false,
            ..Default::default()
        };

        service.import_cmr_delivery(user, &record("ACK5"), &options).await;
        let outcome = service.import_cmr_delivery(user, &record("ACK5"), &options).await;

        assert!(outcome.is_imported());
        assert_eq!(stores.counts(), (2, 2, 2));
    }

    #[tokio::test]
    async fn invalid_record_fails_before_any_write() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let mut input = record("ACK7");
        input.net_rice_qty = dec!(-1);

        let outcome = service
            .import_cmr_delivery(user(), &input, &ImportOptions::default())
            .await;

        assert_matches!(
            outcome,
            ImportOutcome::Failed { stage: ImportStage::Validation, ref written, .. } if written.is_empty()
        );
        assert_eq!(stores.counts(), (0, 0, 0));
    }

    #[rstest]
    #[case(Some(dec!(-40)), None)]
    #[case(None, Some(dec!(-290)))]
    #[tokio::test]
    async fn negative_overrides_fail_validation(
        #[case] freight_rate: Option<Decimal>,
        #[case] standard_quantity_qtls: Option<Decimal>,
    ) {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let options = ImportOptions {
            freight_rate,
            standard_quantity_qtls,
            ..Default::default()
        };

        let outcome = service
            .import_cmr_delivery(user(), &record("ACK8"), &options)
            .await;

        assert_matches!(
            outcome,
            ImportOutcome::Failed { stage: ImportStage::Validation, ref written, .. } if written.is_empty()
        );
        assert_eq!(stores.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn freight_failure_keeps_earlier_records() {
        let stores = Arc::new(MemoryStores::default());
        let mut freight = MockLorryFreightStore::new();
        freight
            .expect_create()
            .times(1)
            .returning(|_, _| Err(ServiceError::db_error("disk full")));

        let service = CmrIntegrationService::new(
            stores.clone(),
            stores.clone(),
            Arc::new(freight),
            test_config(),
        );

        let outcome = service
            .import_cmr_delivery(user(), &record("ACK8"), &ImportOptions::default())
            .await;

        let (stage, error, written) = assert_matches!(
            outcome,
            ImportOutcome::Failed { stage, error, written, .. } => (stage, error, written)
        );
        assert_eq!(stage, ImportStage::LorryFreight);
        assert!(error.contains("disk full"));
        assert_eq!((stores.counts().0, stores.counts().1), (1, 1));
        assert_eq!(
            written.cmr_delivery_id,
            Some(stores.deliveries.lock().unwrap()[0].id)
        );
        assert_eq!(
            written.ack_production_id,
            Some(stores.productions.lock().unwrap()[0].id)
        );
    }

    #[tokio::test]
    async fn duplicate_check_failure_is_reported() {
        let stores = Arc::new(MemoryStores::default());
        let mut productions = MockAckProductionStore::new();
        productions
            .expect_find_by_ack_number()
            .returning(|_, _| Err(ServiceError::db_error("connection reset")));
        productions.expect_create().never();

        let service = CmrIntegrationService::new(
            stores.clone(),
            Arc::new(productions),
            stores.clone(),
            test_config(),
        );

        let outcome = service
            .import_cmr_delivery(user(), &record("ACK9"), &ImportOptions::default())
            .await;

        assert_matches!(
            outcome,
            ImportOutcome::Failed { stage: ImportStage::DuplicateCheck, .. }
        );
        assert_eq!(stores.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn bulk_import_reports_progress_and_counts() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        service
            .import_cmr_delivery(user, &record("ACK2"), &ImportOptions::default())
            .await;

        let mut bad = record("ACK4");
        bad.vehicle_number = String::new();
        let records = vec![record("ACK1"), record("ACK2"), record("ACK3"), bad];

        let mut progress = Vec::new();
        let summary = service
            .bulk_import_with_progress(user, &records, &ImportOptions::default(), |p| {
                progress.push(p)
            })
            .await;

        assert_eq!(summary.total_processed, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.successful + summary.skipped + summary.failed,
            summary.total_processed
        );

        let order: Vec<&str> = summary.results.iter().map(|r| r.ack_number()).collect();
        assert_eq!(order, vec!["ACK1", "ACK2", "ACK3", "ACK4"]);

        assert_eq!(
            progress,
            vec![
                ImportProgress { current: 1, total: 4, ack_number: "ACK1".into() },
                ImportProgress { current: 2, total: 4, ack_number: "ACK2".into() },
                ImportProgress { current: 3, total: 4, ack_number: "ACK3".into() },
                ImportProgress { current: 4, total: 4, ack_number: "ACK4".into() },
            ]
        );
    }

    #[tokio::test]
    async fn bulk_import_of_nothing_is_empty() {
        let stores = Arc::new(MemoryStores::default());
        let summary = service_over(&stores)
            .bulk_import(user(), &[], &ImportOptions::default())
            .await;

        assert_eq!(summary, BulkImportSummary::default());
    }

    #[tokio::test]
    async fn bulk_import_pauses_between_items() {
        let stores = Arc::new(MemoryStores::default());
        let service = CmrIntegrationService::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            IntegrationConfig::default(),
        );

        let started = std::time::Instant::now();
        service
            .bulk_import(
                user(),
                &[record("ACK1"), record("ACK2"), record("ACK3")],
                &ImportOptions::default(),
            )
            .await;

        assert!(started.elapsed() >= std::time::Duration::from_millis(150));
    }

    #[tokio::test]
    async fn sync_creates_freight_from_production() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        AckProductionStore::create(
            stores.as_ref(),
            user,
            NewAckProduction {
                ack_number: "ACK55".to_string(),
                production_date: date(12),
                rice_type: Variety::Raw,
                fortified_rice_qty: dec!(290),
                raw_rice_qty: dec!(280),
                frk_qty: dec!(10),
                season: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        assert!(service.sync_ack_production_to_freight(user, "ACK55").await);

        let freight = stores.freight.lock().unwrap()[0].clone();
        assert_eq!(freight.vehicle_number, "TBD");
        assert_eq!(freight.delivery_date, date(12));
        assert_eq!(freight.destination, "FCI");
        assert_eq!(freight.transporter_name, "FCI Transport");
        assert_eq!(freight.quantity_qtls, dec!(290));
        assert_eq!(freight.freight_rate, dec!(40));
        assert_eq!(freight.total_freight, dec!(11600));
        assert_eq!(freight.balance_due, dec!(11600));
        assert_eq!(freight.season, "Rabi 24-25");
        assert_eq!(
            freight.notes.as_deref(),
            Some("Synced from ACK Production ACK55")
        );
    }

    #[tokio::test]
    async fn sync_adds_freight_even_when_one_exists() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        service
            .import_cmr_delivery(user, &record("ACK56"), &ImportOptions::default())
            .await;
        assert!(service.sync_ack_production_to_freight(user, "ACK56").await);

        assert_eq!(stores.counts(), (1, 1, 2));
        let latest = service.integrated_ack_data(user, "ACK56").await;
        assert_eq!(latest.lorry_freight.unwrap().vehicle_number, "TBD");
    }

    #[tokio::test]
    async fn sync_for_unknown_ack_returns_false() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);

        assert!(!service.sync_ack_production_to_freight(user(), "NOPE").await);
        assert_eq!(stores.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn integrated_read_joins_by_ack() {
        let stores = Arc::new(MemoryStores::default());
        let service = service_over(&stores);
        let user = user();

        service
            .import_cmr_delivery(user, &record("ACK70"), &ImportOptions::default())
            .await;

        let data = service.integrated_ack_data(user, "ACK70").await;
        assert_eq!(data.cmr_delivery.unwrap().ack_number, "ACK70");
        assert_eq!(data.ack_production.unwrap().ack_number, "ACK70");
        assert_eq!(data.lorry_freight.unwrap().ack_number, "ACK70");

        assert!(service.integrated_ack_data(user, "ACK71").await.is_empty());
        assert!(service.integrated_ack_data(self::user(), "ACK70").await.is_empty());
    }

    #[tokio::test]
    async fn integrated_read_errors_yield_empty_triple() {
        let stores = Arc::new(MemoryStores::default());
        let mut freight = MockLorryFreightStore::new();
        freight
            .expect_find_by_ack_number()
            .returning(|_, _| Err(ServiceError::db_error("timeout")));
        let service = CmrIntegrationService::new(
            stores.clone(),
            stores.clone(),
            Arc::new(freight),
            test_config(),
        );

        AckProductionStore::create(
            stores.as_ref(),
            UserId::new(Uuid::nil()),
            NewAckProduction {
                ack_number: "ACK1".to_string(),
                production_date: date(1),
                rice_type: Variety::Raw,
                fortified_rice_qty: dec!(290),
                raw_rice_qty: dec!(280),
                frk_qty: dec!(10),
                season: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        let data = service
            .integrated_ack_data(UserId::new(Uuid::nil()), "ACK1")
            .await;
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn workflow_events_are_published() {
        let stores = Arc::new(MemoryStores::default());
        let (tx, mut rx) = mpsc::channel(8);
        let service = service_over(&stores).with_event_sender(Arc::new(EventSender::new(tx)));
        let user = user();

        service
            .import_cmr_delivery(user, &record("ACK30"), &ImportOptions::default())
            .await;
        service
            .import_cmr_delivery(user, &record("ACK30"), &ImportOptions::default())
            .await;

        assert_matches!(rx.recv().await, Some(Event::CmrImported { ref ack_number, .. }) if ack_number == "ACK30");
        assert_matches!(rx.recv().await, Some(Event::CmrImportSkipped { .. }));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = ImportOutcome::Skipped {
            ack_number: "ACK1".into(),
            reason: "ACK ACK1 already exists".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "ACK ACK1 already exists");
    }

    #[test]
    fn import_options_default_to_skipping() {
        let options: ImportOptions = serde_json::from_str("{}").unwrap();
        assert!(options.skip_if_exists);
        assert_eq!(options, ImportOptions::default());
    }
}
