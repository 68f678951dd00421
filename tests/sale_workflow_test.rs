mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use stockroom::entities::document::DocumentStatus;
use stockroom::entities::history::OperationType;
use stockroom::entities::item::{self, ItemStatus};
use stockroom::errors::ServiceError;
use stockroom::services::sales::SaleLine;

use common::{new_sale, receive_batch, seed_catalog, setup_state};

fn line(item_id: uuid::Uuid, quantity: rust_decimal::Decimal) -> SaleLine {
    SaleLine {
        item_id,
        quantity,
        selling_price: None,
    }
}

#[tokio::test]
async fn a_partial_sale_reduces_the_batch() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-100", dec!(100)).await;

    let confirmed = state
        .sales
        .create_and_confirm(new_sale("SAL-100", fx.warehouse_id), vec![line(item.id, dec!(30))])
        .await
        .unwrap();

    assert_eq!(confirmed.document.status, DocumentStatus::Confirmed);
    assert_eq!(confirmed.document.total_amount, dec!(6000));
    assert_eq!(confirmed.outcomes.len(), 1);
    assert_eq!(confirmed.outcomes[0].remaining, dec!(70));
    assert!(!confirmed.outcomes[0].sold_out);

    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, dec!(70));
    assert_eq!(reloaded.status, ItemStatus::InStock);
}

#[tokio::test]
async fn selling_the_whole_batch_marks_it_sold() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-101", dec!(25)).await;

    let confirmed = state
        .sales
        .create_and_confirm(new_sale("SAL-101", fx.warehouse_id), vec![line(item.id, dec!(25))])
        .await
        .unwrap();

    assert!(confirmed.outcomes[0].sold_out);
    assert_eq!(confirmed.outcomes[0].remaining, dec!(0));

    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, dec!(0));
    assert_eq!(reloaded.status, ItemStatus::Sold);

    let rows = state.reports.item_history(item.id).await.unwrap();
    let sale_row = rows
        .iter()
        .find(|r| r.operation_type == OperationType::Sale)
        .unwrap();
    assert_eq!(sale_row.quantity_change, Some(dec!(-25)));
    assert_eq!(sale_row.to_status, Some(ItemStatus::Sold));
}

#[tokio::test]
async fn overselling_is_rejected_when_the_line_is_added() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-102", dec!(10)).await;

    let draft = state
        .sales
        .create_draft(new_sale("SAL-102", fx.warehouse_id))
        .await
        .unwrap();
    let err = state
        .sales
        .add_line(draft.id, line(item.id, dec!(11)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
}

#[tokio::test]
async fn confirmation_rechecks_stock_against_fresh_reads() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-103", dec!(100)).await;

    // Draft a sale for 80 while the full 100 is still on hand.
    let draft = state
        .sales
        .create_draft(new_sale("SAL-103", fx.warehouse_id))
        .await
        .unwrap();
    state
        .sales
        .add_line(draft.id, line(item.id, dec!(80)))
        .await
        .unwrap();

    // A competing sale drains 50 before the draft is confirmed.
    state
        .sales
        .create_and_confirm(new_sale("SAL-104", fx.warehouse_id), vec![line(item.id, dec!(50))])
        .await
        .unwrap();

    let err = state.sales.confirm(draft.id, "tester").await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let (doc, _) = state.sales.get(draft.id).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn a_failing_line_rolls_back_every_other_line() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item_a = receive_batch(&state, &fx, "RCV-105", dec!(40)).await;
    let item_b = receive_batch(&state, &fx, "RCV-106", dec!(10)).await;

    let err = state
        .sales
        .create_and_confirm(
            new_sale("SAL-105", fx.warehouse_id),
            vec![line(item_a.id, dec!(20)), line(item_b.id, dec!(15))],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // The first line's deduction did not stick.
    let reloaded = item::Entity::find_by_id(item_a.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, dec!(40));
    assert!(state.reports.item_history(item_a.id).await.unwrap().len() == 1);
}

#[tokio::test]
async fn sold_out_batches_are_unavailable() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-107", dec!(5)).await;

    state
        .sales
        .create_and_confirm(new_sale("SAL-106", fx.warehouse_id), vec![line(item.id, dec!(5))])
        .await
        .unwrap();

    let draft = state
        .sales
        .create_draft(new_sale("SAL-107", fx.warehouse_id))
        .await
        .unwrap();
    let err = state
        .sales
        .add_line(draft.id, line(item.id, dec!(1)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ItemUnavailable(_));
}

#[tokio::test]
async fn the_history_stream_reconstructs_the_quantity() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-108", dec!(100)).await;

    state
        .sales
        .create_and_confirm(new_sale("SAL-108", fx.warehouse_id), vec![line(item.id, dec!(30))])
        .await
        .unwrap();
    state
        .sales
        .create_and_confirm(new_sale("SAL-109", fx.warehouse_id), vec![line(item.id, dec!(20))])
        .await
        .unwrap();

    let rows = state.reports.item_history(item.id).await.unwrap();
    let ledger_sum: rust_decimal::Decimal =
        rows.iter().filter_map(|r| r.quantity_change).sum();

    let reloaded = item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ledger_sum, reloaded.quantity);
    assert_eq!(reloaded.quantity, dec!(50));
}

#[tokio::test]
async fn availability_sums_sellable_batches_only() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item_a = receive_batch(&state, &fx, "RCV-109", dec!(30)).await;
    receive_batch(&state, &fx, "RCV-110", dec!(20)).await;

    assert_eq!(
        state
            .sales
            .available_quantity(fx.nomenclature_id)
            .await
            .unwrap(),
        dec!(50)
    );

    // Draining a batch removes it from availability.
    state
        .sales
        .create_and_confirm(new_sale("SAL-110", fx.warehouse_id), vec![line(item_a.id, dec!(30))])
        .await
        .unwrap();

    let available = state.sales.available_items(fx.nomenclature_id).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(
        state
            .sales
            .available_quantity(fx.nomenclature_id)
            .await
            .unwrap(),
        dec!(20)
    );
}

#[tokio::test]
async fn sale_price_can_be_overridden_per_line() {
    let state = setup_state().await;
    let fx = seed_catalog(&state).await;
    let item = receive_batch(&state, &fx, "RCV-111", dec!(10)).await;

    let confirmed = state
        .sales
        .create_and_confirm(
            new_sale("SAL-111", fx.warehouse_id),
            vec![SaleLine {
                item_id: item.id,
                quantity: dec!(2),
                selling_price: Some(dec!(250)),
            }],
        )
        .await
        .unwrap();
    assert_eq!(confirmed.document.total_amount, dec!(500));
}
