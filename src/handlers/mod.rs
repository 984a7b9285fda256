pub mod freight;
pub mod integration;
pub mod records;

use std::sync::Arc;

use crate::config::IntegrationConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    ack_productions::AckProductionService, cmr_deliveries::CmrDeliveryService,
    cmr_integration::CmrIntegrationService, lorry_freight::LorryFreightService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cmr_deliveries: Arc<CmrDeliveryService>,
    pub ack_productions: Arc<AckProductionService>,
    pub lorry_freight: Arc<LorryFreightService>,
    pub integration: Arc<CmrIntegrationService>,
}

impl AppServices {
    /// Wires the entity services over one pool and the orchestrator over them.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        integration_config: IntegrationConfig,
    ) -> Self {
        let cmr_deliveries = Arc::new(CmrDeliveryService::new(db_pool.clone()));
        let ack_productions = Arc::new(AckProductionService::new(db_pool.clone()));
        let lorry_freight = Arc::new(LorryFreightService::new(
            db_pool,
            Some(event_sender.clone()),
        ));

        let integration = Arc::new(
            CmrIntegrationService::new(
                cmr_deliveries.clone(),
                ack_productions.clone(),
                lorry_freight.clone(),
                integration_config,
            )
            .with_event_sender(event_sender),
        );

        Self {
            cmr_deliveries,
            ack_productions,
            lorry_freight,
            integration,
        }
    }
}
