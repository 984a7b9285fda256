// Entity services, one per table
pub mod ack_productions;
pub mod cmr_deliveries;
pub mod lorry_freight;

// Cross-entity import and sync workflows
pub mod cmr_integration;

pub use ack_productions::{AckProductionService, AckProductionStore, NewAckProduction};
pub use cmr_deliveries::{CmrDeliveryService, CmrDeliveryStore, NewCmrDelivery};
pub use cmr_integration::{
    BulkImportSummary, CmrImportRecord, CmrIntegrationService, ImportOptions, ImportOutcome,
    ImportProgress, ImportStage, IntegratedAckData,
};
pub use lorry_freight::{FreightTotals, LorryFreightService, LorryFreightStore, NewLorryFreight};
