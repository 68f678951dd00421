mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use stockroom::entities::document::DocumentStatus;
use stockroom::entities::history::OperationType;
use stockroom::entities::item::{self, ItemStatus};
use stockroom::errors::ServiceError;
use stockroom::services::movements::NewMovement;

use common::{receive_batch, seed_catalog, setup_state, today, Fixture};

fn new_movement(number: &str, fx: &Fixture) -> NewMovement {
    NewMovement {
        document_number: number.to_string(),
        document_date: today(),
        warehouse_id: fx.warehouse_id,
        created_by: "tester".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn quick_move_relocates_and_records_history() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-200", dec!(10)).await;

    let moved = state
        .movements
        .quick_move(item.id, fx.shelf_b_id, "tester")
        .await
        .unwrap();
    assert_eq!(moved.current_shelf_id, Some(fx.shelf_b_id));
    assert_eq!(moved.quantity, dec!(10));
    assert_eq!(moved.status, ItemStatus::InStock);

    let rows = state.reports.item_history(item.id).await.unwrap();
    let move_row = rows
        .iter()
        .find(|r| r.operation_type == OperationType::Movement)
        .unwrap();
    assert_eq!(move_row.document_id, None);
    assert_eq!(move_row.quantity_change, None);
    assert_eq!(move_row.from_shelf_id, Some(fx.shelf_a_id));
    assert_eq!(move_row.to_shelf_id, Some(fx.shelf_b_id));
}

#[tokio::test]
async fn moving_to_the_current_shelf_is_rejected() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-201", dec!(10)).await;

    let err = state
        .movements
        .quick_move(item.id, fx.shelf_a_id, "tester")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::SameLocation(id) if id == item.id);
}

#[tokio::test]
async fn items_without_a_location_cannot_be_moved() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    // Shelfless items do not come out of the receipt flow; build one
    // directly to exercise the precondition.
    let now = Utc::now();
    let orphan = item::ActiveModel {
        id: Set(Uuid::new_v4()),
        nomenclature_id: Set(fx.nomenclature_id),
        batch_number: Set(None),
        serial_number: Set(None),
        quantity: Set(dec!(5)),
        purchase_price: Set(dec!(100)),
        selling_price: Set(dec!(120)),
        current_shelf_id: Set(None),
        status: Set(ItemStatus::InStock),
        manufacture_date: Set(None),
        expiry_date: Set(None),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.db.as_ref())
    .await
    .unwrap();

    let err = state
        .movements
        .quick_move(orphan.id, fx.shelf_b_id, "tester")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NoCurrentLocation(id) if id == orphan.id);
}

#[tokio::test]
async fn the_document_flow_relocates_every_line() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item_a = receive_batch(&state, &fx, "RCV-202", dec!(10)).await;
    let item_b = receive_batch(&state, &fx, "RCV-203", dec!(20)).await;

    let draft = state
        .movements
        .create_draft(new_movement("MOV-200", &fx))
        .await
        .unwrap();
    state
        .movements
        .add_line(draft.id, item_a.id, fx.shelf_b_id)
        .await
        .unwrap();
    state
        .movements
        .add_line(draft.id, item_b.id, fx.shelf_b_id)
        .await
        .unwrap();

    let confirmed = state.movements.confirm(draft.id, "tester").await.unwrap();
    assert_eq!(confirmed.document.status, DocumentStatus::Confirmed);
    assert_eq!(confirmed.moves.len(), 2);

    for id in [item_a.id, item_b.id] {
        let reloaded = item::Entity::find_by_id(id)
            .one(state.db.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.current_shelf_id, Some(fx.shelf_b_id));
    }

    let rows = state.reports.item_history(item_a.id).await.unwrap();
    let move_row = rows
        .iter()
        .find(|r| r.operation_type == OperationType::Movement)
        .unwrap();
    assert_eq!(move_row.document_id, Some(draft.id));
}

#[tokio::test]
async fn confirmation_revalidates_locations() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-204", dec!(10)).await;

    let draft = state
        .movements
        .create_draft(new_movement("MOV-201", &fx))
        .await
        .unwrap();
    state
        .movements
        .add_line(draft.id, item.id, fx.shelf_b_id)
        .await
        .unwrap();

    // The item reaches the target shelf through another path first.
    state
        .movements
        .quick_move(item.id, fx.shelf_b_id, "tester")
        .await
        .unwrap();

    let err = state.movements.confirm(draft.id, "tester").await.unwrap_err();
    assert_matches!(err, ServiceError::SameLocation(_));

    let (doc, _) = state.movements.get(draft.id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn move_item_is_a_single_documented_step() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-205", dec!(10)).await;

    let confirmed = state
        .movements
        .move_item(new_movement("MOV-202", &fx), item.id, dec!(10), fx.shelf_b_id)
        .await
        .unwrap();
    assert_eq!(confirmed.document.status, DocumentStatus::Confirmed);
    assert_eq!(confirmed.moves.len(), 1);

    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_shelf_id, Some(fx.shelf_b_id));
}

#[tokio::test]
async fn move_item_checks_the_requested_quantity() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-206", dec!(10)).await;

    let err = state
        .movements
        .move_item(new_movement("MOV-203", &fx), item.id, dec!(11), fx.shelf_b_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // The failed one-shot left no document behind.
    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_shelf_id, Some(fx.shelf_a_id));
}
