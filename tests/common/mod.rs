#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use uuid::Uuid;

use stockroom::config::AppConfig;
use stockroom::db;
use stockroom::entities::item;
use stockroom::events::{process_events, EventSender};
use stockroom::services::catalog::{NewManufacturer, NewNomenclature, NewShelf, NewWarehouse};
use stockroom::services::receipts::{NewReceipt, ReceiptLine};
use stockroom::services::sales::NewSale;
use stockroom::AppState;

/// Fresh application state backed by an in-memory SQLite database.
/// `for_database` pins the pool to a single connection so every query in
/// the test sees the same in-memory database.
pub async fn setup_state() -> AppState {
    let config = AppConfig::for_database("sqlite::memory:");
    let db = db::establish_connection_from_app_config(&config)
        .await
        .expect("Failed to connect to test database");
    db::run_migrations(&db)
        .await
        .expect("Failed to run migrations");

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(process_events(rx));

    AppState::new(Arc::new(db), config, Some(EventSender::new(tx)))
}

pub struct Fixture {
    pub warehouse_id: Uuid,
    pub shelf_a_id: Uuid,
    pub shelf_b_id: Uuid,
    pub manufacturer_id: Uuid,
    pub nomenclature_id: Uuid,
}

/// One warehouse with two shelves and one catalog position.
pub async fn seed_catalog(state: &AppState) -> Fixture {
    let warehouse = state
        .catalog
        .create_warehouse(NewWarehouse {
            name: "Main warehouse".to_string(),
            address: Some("1 Depot street".to_string()),
        })
        .await
        .expect("Failed to create warehouse");

    let shelf_a = state
        .catalog
        .create_shelf(NewShelf {
            warehouse_id: warehouse.id,
            code: "A-1".to_string(),
            capacity: Some(100),
        })
        .await
        .expect("Failed to create shelf A-1");

    let shelf_b = state
        .catalog
        .create_shelf(NewShelf {
            warehouse_id: warehouse.id,
            code: "B-2".to_string(),
            capacity: Some(100),
        })
        .await
        .expect("Failed to create shelf B-2");

    let manufacturer = state
        .catalog
        .create_manufacturer(NewManufacturer {
            name: "Acme Foods".to_string(),
            country: Some("DE".to_string()),
            contact_info: None,
        })
        .await
        .expect("Failed to create manufacturer");

    let nomenclature = state
        .catalog
        .create_nomenclature(NewNomenclature {
            article: "N-001".to_string(),
            name: "Widget".to_string(),
            unit: "pcs".to_string(),
            manufacturer_id: Some(manufacturer.id),
            min_stock_level: dec!(5),
        })
        .await
        .expect("Failed to create nomenclature");

    Fixture {
        warehouse_id: warehouse.id,
        shelf_a_id: shelf_a.id,
        shelf_b_id: shelf_b.id,
        manufacturer_id: manufacturer.id,
        nomenclature_id: nomenclature.id,
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn new_receipt(number: &str, warehouse_id: Uuid) -> NewReceipt {
    NewReceipt {
        document_number: number.to_string(),
        document_date: today(),
        warehouse_id,
        supplier: Some("Supplier LLC".to_string()),
        created_by: "tester".to_string(),
        notes: None,
    }
}

pub fn new_sale(number: &str, warehouse_id: Uuid) -> NewSale {
    NewSale {
        document_number: number.to_string(),
        document_date: today(),
        warehouse_id,
        customer: Some("Customer LLC".to_string()),
        created_by: "tester".to_string(),
        notes: None,
    }
}

pub fn receipt_line(fx: &Fixture, quantity: Decimal) -> ReceiptLine {
    ReceiptLine {
        nomenclature_id: fx.nomenclature_id,
        quantity,
        purchase_price: dec!(150),
        selling_price: dec!(200),
        shelf_id: fx.shelf_a_id,
        batch_number: None,
        manufacture_date: None,
        expiry_date: None,
    }
}

/// Receives one batch through the one-shot receipt flow and returns the
/// created item.
pub async fn receive_batch(
    state: &AppState,
    fx: &Fixture,
    number: &str,
    quantity: Decimal,
) -> item::Model {
    let confirmed = state
        .receipts
        .create_and_confirm(
            new_receipt(number, fx.warehouse_id),
            vec![receipt_line(fx, quantity)],
        )
        .await
        .expect("Failed to receive batch");
    confirmed.items.into_iter().next().expect("No item created")
}
