pub mod catalog;
pub mod movements;
pub mod receipts;
pub mod reports;
pub mod sales;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionError,
};
use uuid::Uuid;

use crate::entities::document::{self, DocumentStatus, DocumentType};
use crate::entities::{document_line, item, shelf};
use crate::errors::ServiceError;

/// Unwraps the nested error produced by `db.transaction`, keeping business
/// errors intact and wrapping connection failures as database errors.
pub(crate) fn txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

pub(crate) async fn load_document<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
) -> Result<document::Model, ServiceError> {
    document::Entity::find_by_id(document_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Document {} not found", document_id)))
}

pub(crate) async fn load_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<item::Model, ServiceError> {
    item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
}

pub(crate) async fn load_shelf<C: ConnectionTrait>(
    conn: &C,
    shelf_id: Uuid,
) -> Result<shelf::Model, ServiceError> {
    shelf::Entity::find_by_id(shelf_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", shelf_id)))
}

pub(crate) fn ensure_type(
    doc: &document::Model,
    expected: DocumentType,
) -> Result<(), ServiceError> {
    if doc.document_type != expected {
        return Err(ServiceError::InvalidDocumentType {
            expected,
            actual: doc.document_type,
        });
    }
    Ok(())
}

pub(crate) fn ensure_status(
    doc: &document::Model,
    expected: DocumentStatus,
) -> Result<(), ServiceError> {
    if doc.status != expected {
        return Err(ServiceError::InvalidDocumentState(format!(
            "Document {} is {:?}, expected {:?}",
            doc.document_number, doc.status, expected
        )));
    }
    Ok(())
}

/// Re-sums the document's line totals and persists the new `total_amount`.
pub(crate) async fn recalculate_total<C: ConnectionTrait>(
    conn: &C,
    doc: &document::Model,
) -> Result<Decimal, ServiceError> {
    let lines = document_line::Entity::find()
        .filter(document_line::Column::DocumentId.eq(doc.id))
        .all(conn)
        .await?;
    let total: Decimal = lines.iter().map(|l| l.total).sum();

    let mut active: document::ActiveModel = doc.clone().into();
    active.total_amount = Set(total);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(total)
}

/// Applies `patch` to the item only if its version still matches the one the
/// caller read. Zero rows affected means someone else committed first.
pub(crate) async fn update_item_guarded<C: ConnectionTrait>(
    conn: &C,
    current: &item::Model,
    mut patch: item::ActiveModel,
) -> Result<(), ServiceError> {
    patch.version = Set(current.version + 1);
    patch.updated_at = Set(Utc::now());

    let result = item::Entity::update_many()
        .set(patch)
        .filter(item::Column::Id.eq(current.id))
        .filter(item::Column::Version.eq(current.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(())
}
