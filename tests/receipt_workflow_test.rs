mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

use stockroom::entities::document::{self, DocumentStatus, DocumentType};
use stockroom::entities::history::OperationType;
use stockroom::entities::item::{self, ItemStatus};
use stockroom::errors::ServiceError;
use stockroom::services::sales::SaleLine;

use common::{new_receipt, new_sale, receipt_line, seed_catalog, setup_state};

#[tokio::test]
async fn confirming_a_receipt_creates_items_and_history() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-001", fx.warehouse_id))
        .await
        .unwrap();
    assert_eq!(draft.status, DocumentStatus::Draft);
    assert_eq!(draft.total_amount, dec!(0));

    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(100)))
        .await
        .unwrap();

    let confirmed = state.receipts.confirm(draft.id, "tester").await.unwrap();
    assert_eq!(confirmed.document.status, DocumentStatus::Confirmed);
    assert_eq!(confirmed.document.total_amount, dec!(15000));
    assert_eq!(confirmed.items.len(), 1);

    let item = &confirmed.items[0];
    assert_eq!(item.status, ItemStatus::InStock);
    assert_eq!(item.quantity, dec!(100));
    assert_eq!(item.purchase_price, dec!(150));
    assert_eq!(item.selling_price, dec!(200));
    assert_eq!(item.current_shelf_id, Some(fx.shelf_a_id));

    let rows = state.reports.item_history(item.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].operation_type, OperationType::Receipt);
    assert_eq!(rows[0].quantity_change, Some(dec!(100)));
    assert_eq!(rows[0].to_shelf_id, Some(fx.shelf_a_id));
    assert_eq!(rows[0].document_id, Some(draft.id));
}

#[tokio::test]
async fn confirming_an_empty_draft_is_rejected() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-002", fx.warehouse_id))
        .await
        .unwrap();

    let err = state.receipts.confirm(draft.id, "tester").await.unwrap_err();
    assert_matches!(err, ServiceError::EmptyDocument(_));

    let (doc, _) = state.receipts.get(draft.id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn a_document_cannot_be_confirmed_twice() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-003", fx.warehouse_id))
        .await
        .unwrap();
    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(10)))
        .await
        .unwrap();
    state.receipts.confirm(draft.id, "tester").await.unwrap();

    let err = state.receipts.confirm(draft.id, "tester").await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidDocumentState(_));

    // No duplicate items were created by the second attempt.
    let count = item::Entity::find().count(state.db.as_ref()).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn lines_cannot_be_added_after_confirmation() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-004", fx.warehouse_id))
        .await
        .unwrap();
    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(10)))
        .await
        .unwrap();
    state.receipts.confirm(draft.id, "tester").await.unwrap();

    let err = state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(5)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidDocumentState(_));
}

#[tokio::test]
async fn duplicate_document_numbers_are_rejected() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    state
        .receipts
        .create_draft(new_receipt("RCV-005", fx.warehouse_id))
        .await
        .unwrap();

    let err = state
        .receipts
        .create_draft(new_receipt("RCV-005", fx.warehouse_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DuplicateDocumentNumber(n) if n == "RCV-005");

    // Numbers are unique across document types as well.
    let err = state
        .sales
        .create_draft(new_sale("RCV-005", fx.warehouse_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DuplicateDocumentNumber(_));
}

#[tokio::test]
async fn confirm_checks_the_document_type() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let sale_draft = state
        .sales
        .create_draft(new_sale("SAL-001", fx.warehouse_id))
        .await
        .unwrap();

    let err = state.receipts.confirm(sale_draft.id, "tester").await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::InvalidDocumentType {
            expected: DocumentType::Receipt,
            actual: DocumentType::Sale,
        }
    );
}

#[tokio::test]
async fn cancelling_a_receipt_removes_items_and_writes_off() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let confirmed = state
        .receipts
        .create_and_confirm(
            new_receipt("RCV-006", fx.warehouse_id),
            vec![receipt_line(&fx, dec!(50))],
        )
        .await
        .unwrap();
    let item = confirmed.items.into_iter().next().unwrap();

    let cancelled = state.receipts.cancel(confirmed.document.id, "tester").await.unwrap();
    assert_eq!(cancelled.status, DocumentStatus::Cancelled);

    assert!(item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .is_none());

    // The ledger keeps both rows even though the item is gone.
    let rows = state.reports.item_history(item.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].operation_type, OperationType::Receipt);
    assert_eq!(rows[1].operation_type, OperationType::WriteOff);
    assert_eq!(rows[1].quantity_change, Some(dec!(-50)));
}

#[tokio::test]
async fn cancellation_is_refused_once_an_item_was_sold() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let confirmed = state
        .receipts
        .create_and_confirm(
            new_receipt("RCV-007", fx.warehouse_id),
            vec![receipt_line(&fx, dec!(20))],
        )
        .await
        .unwrap();
    let item = &confirmed.items[0];

    state
        .sales
        .create_and_confirm(
            new_sale("SAL-002", fx.warehouse_id),
            vec![SaleLine {
                item_id: item.id,
                quantity: dec!(20),
                selling_price: None,
            }],
        )
        .await
        .unwrap();

    let err = state
        .receipts
        .cancel(confirmed.document.id, "tester")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ItemAlreadyDisposed(id) if id == item.id);

    let (doc, _) = state.receipts.get(confirmed.document.id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Confirmed);
}

#[tokio::test]
async fn cancellation_is_refused_after_a_partial_sale() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let confirmed = state
        .receipts
        .create_and_confirm(
            new_receipt("RCV-013", fx.warehouse_id),
            vec![receipt_line(&fx, dec!(20))],
        )
        .await
        .unwrap();
    let item = &confirmed.items[0];

    // Only part of the batch is sold; the item itself is still IN_STOCK.
    state
        .sales
        .create_and_confirm(
            new_sale("SAL-003", fx.warehouse_id),
            vec![SaleLine {
                item_id: item.id,
                quantity: dec!(5),
                selling_price: None,
            }],
        )
        .await
        .unwrap();

    let err = state
        .receipts
        .cancel(confirmed.document.id, "tester")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ItemAlreadyDisposed(id) if id == item.id);

    // The failed cancellation changed nothing.
    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, dec!(15));
    assert_eq!(reloaded.status, ItemStatus::InStock);
    let (doc, _) = state.receipts.get(confirmed.document.id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Confirmed);
}

#[tokio::test]
async fn zero_quantity_lines_are_rejected() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-008", fx.warehouse_id))
        .await
        .unwrap();

    let err = state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(0)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn one_shot_receipt_matches_the_stepwise_flow() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let confirmed = state
        .receipts
        .create_and_confirm(
            new_receipt("RCV-009", fx.warehouse_id),
            vec![receipt_line(&fx, dec!(10)), receipt_line(&fx, dec!(15))],
        )
        .await
        .unwrap();

    assert_eq!(confirmed.document.status, DocumentStatus::Confirmed);
    assert_eq!(confirmed.document.total_amount, dec!(3750));
    assert_eq!(confirmed.items.len(), 2);
}

#[tokio::test]
async fn a_failing_line_rolls_back_the_whole_one_shot_receipt() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let err = state
        .receipts
        .create_and_confirm(
            new_receipt("RCV-010", fx.warehouse_id),
            vec![receipt_line(&fx, dec!(10)), receipt_line(&fx, dec!(-1))],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Nothing survived the rollback, including the draft itself.
    let docs = document::Entity::find()
        .count(state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(docs, 0);
    let items = item::Entity::find().count(state.db.as_ref()).await.unwrap();
    assert_eq!(items, 0);
}

#[tokio::test]
async fn history_records_who_confirmed_and_cancelled() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    // The draft author and the person confirming are different people.
    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-012", fx.warehouse_id))
        .await
        .unwrap();
    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(10)))
        .await
        .unwrap();
    let confirmed = state.receipts.confirm(draft.id, "supervisor").await.unwrap();
    let item = &confirmed.items[0];

    let rows = state.reports.item_history(item.id).await.unwrap();
    assert_eq!(rows[0].operation_type, OperationType::Receipt);
    assert_eq!(rows[0].created_by, "supervisor");

    state
        .receipts
        .cancel(confirmed.document.id, "auditor")
        .await
        .unwrap();

    let rows = state.reports.item_history(item.id).await.unwrap();
    assert_eq!(rows[1].operation_type, OperationType::WriteOff);
    assert_eq!(rows[1].created_by, "auditor");
}

#[tokio::test]
async fn total_amount_tracks_the_lines() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;

    let draft = state
        .receipts
        .create_draft(new_receipt("RCV-011", fx.warehouse_id))
        .await
        .unwrap();
    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(10)))
        .await
        .unwrap();
    state
        .receipts
        .add_line(draft.id, receipt_line(&fx, dec!(4)))
        .await
        .unwrap();

    let (doc, lines) = state.receipts.get(draft.id).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(doc.total_amount, dec!(2100));
}
