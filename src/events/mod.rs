use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Domain events emitted after a workflow transaction commits. Consumers
/// receive them over an mpsc channel; a lost event never affects the
/// committed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ReceiptConfirmed {
        document_id: Uuid,
        item_count: usize,
    },
    ReceiptCancelled {
        document_id: Uuid,
    },
    SaleConfirmed {
        document_id: Uuid,
        total_amount: Decimal,
    },
    MovementConfirmed {
        document_id: Uuid,
    },
    ItemReceived {
        item_id: Uuid,
        nomenclature_id: Uuid,
        quantity: Decimal,
    },
    ItemSold {
        item_id: Uuid,
        quantity: Decimal,
        sold_out: bool,
    },
    ItemMoved {
        item_id: Uuid,
        from_shelf_id: Uuid,
        to_shelf_id: Uuid,
        /// None for quick moves performed outside a document
        document_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(e.to_string()))
    }

    /// Fire-and-forget variant used after commit, where a full channel or a
    /// dropped receiver must not fail the operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Drains the event channel until all senders are dropped. Spawn this as a
/// background task alongside the application state.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => debug!(%payload, "Processing event"),
            Err(e) => warn!(?event, "Failed to serialize event: {}", e),
        }
    }
}
