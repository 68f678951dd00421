//! Stockroom: a transactional inventory-management core.
//!
//! Physical stock lives in a batch-level ledger (`entities::item`), every
//! stock change flows through a status-driven document workflow
//! (`services::{receipts, sales, movements}`) and is mirrored into an
//! append-only history. `AppState` wires the services to one shared
//! connection pool and owns its lifecycle.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use crate::config::AppConfig;
pub use crate::errors::ServiceError;

use crate::events::{Event, EventSender};
use crate::services::catalog::CatalogService;
use crate::services::movements::MovementService;
use crate::services::receipts::ReceiptService;
use crate::services::reports::ReportService;
use crate::services::sales::SaleService;

/// Channel capacity for domain events.
const EVENT_CHANNEL_SIZE: usize = 100;

/// Shared application state: one pool, one service instance per workflow.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: Option<EventSender>,
    pub receipts: ReceiptService,
    pub sales: SaleService,
    pub movements: MovementService,
    pub reports: ReportService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            receipts: ReceiptService::new(db.clone(), event_sender.clone()),
            sales: SaleService::new(db.clone(), event_sender.clone()),
            movements: MovementService::new(db.clone(), event_sender.clone()),
            reports: ReportService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }

    /// Connects the pool, optionally bootstraps the schema, and wires the
    /// event channel. The caller drives the returned receiver, typically by
    /// spawning [`events::process_events`].
    pub async fn connect(config: AppConfig) -> Result<(Self, mpsc::Receiver<Event>), ServiceError> {
        let db = db::establish_connection_from_app_config(&config).await?;
        if config.auto_migrate {
            db::run_migrations(&db).await?;
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let state = Self::new(Arc::new(db), config, Some(EventSender::new(tx)));
        info!("Application state initialized");
        Ok((state, rx))
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        db::check_connection(self.db.as_ref()).await
    }

    /// Tears down this state and closes the pool once no other handle holds
    /// it. With outstanding clones the pool stays open for them.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        let AppState {
            db,
            config: _,
            event_sender,
            receipts,
            sales,
            movements,
            reports,
            catalog,
        } = self;
        drop((receipts, sales, movements, reports, catalog, event_sender));

        match Arc::try_unwrap(db) {
            Ok(conn) => db::close_pool(conn).await,
            Err(_) => {
                warn!("Database pool still shared, skipping close");
                Ok(())
            }
        }
    }
}
