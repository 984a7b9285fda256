use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events emitted by the import and sync workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CmrImported {
        user_id: Uuid,
        ack_number: String,
        cmr_delivery_id: Uuid,
        ack_production_id: Uuid,
        lorry_freight_id: Uuid,
    },
    CmrImportSkipped {
        user_id: Uuid,
        ack_number: String,
    },
    CmrImportFailed {
        user_id: Uuid,
        ack_number: String,
        error: String,
    },
    FreightSynced {
        user_id: Uuid,
        ack_number: String,
        lorry_freight_id: Uuid,
    },
    FreightPaymentRecorded {
        user_id: Uuid,
        lorry_freight_id: Uuid,
    },
}

impl Event {
    pub fn ack_number(&self) -> Option<&str> {
        match self {
            Event::CmrImported { ack_number, .. }
            | Event::CmrImportSkipped { ack_number, .. }
            | Event::CmrImportFailed { ack_number, .. }
            | Event::FreightSynced { ack_number, .. } => Some(ack_number),
            Event::FreightPaymentRecorded { .. } => None,
        }
    }
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CmrImportFailed {
                ack_number, error, ..
            } => {
                warn!(ack_number = %ack_number, error = %error, "CMR import failed");
            }
            other => {
                info!(ack_number = ?other.ack_number(), event = ?other, "Received event");
            }
        }
    }

    info!("Event processing loop stopped");
}
