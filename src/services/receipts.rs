use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::document::{self, DocumentStatus, DocumentType};
use crate::entities::history::{self, OperationType};
use crate::entities::item::{self, ItemStatus};
use crate::entities::{document_line, nomenclature, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

use super::{ensure_status, ensure_type, load_document, load_shelf, recalculate_total, txn_err};

/// Payload for opening a receipt draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReceipt {
    pub document_number: String,
    pub document_date: NaiveDate,
    pub warehouse_id: Uuid,
    pub supplier: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
}

/// One incoming batch on a receipt document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub nomenclature_id: Uuid,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub shelf_id: Uuid,
    pub batch_number: Option<String>,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedReceipt {
    pub document: document::Model,
    pub items: Vec<item::Model>,
}

/// Goods-inbound workflow: drafts a RECEIPT document, accumulates lines,
/// and on confirmation materializes one stock item per line.
#[derive(Clone)]
pub struct ReceiptService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl ReceiptService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_draft(&self, new: NewReceipt) -> Result<document::Model, ServiceError> {
        let db = self.db.clone();
        let doc = db
            .transaction::<_, document::Model, ServiceError>(move |txn| {
                Box::pin(async move { insert_draft(txn, &new).await })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %doc.id, number = %doc.document_number, "Created receipt draft");
        Ok(doc)
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        document_id: Uuid,
        line: ReceiptLine,
    ) -> Result<document_line::Model, ServiceError> {
        let db = self.db.clone();
        let saved = db
            .transaction::<_, document_line::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    let saved = insert_line(txn, &doc, &line).await?;
                    recalculate_total(txn, &doc).await?;
                    Ok(saved)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %document_id, line_id = %saved.id, "Added receipt line");
        Ok(saved)
    }

    /// Applies the draft to the stock ledger: creates one IN_STOCK item per
    /// line, records a RECEIPT history row for each attributed to
    /// `confirmed_by`, and flips the document to CONFIRMED. Any failure
    /// rolls the whole transaction back.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        document_id: Uuid,
        confirmed_by: &str,
    ) -> Result<ConfirmedReceipt, ServiceError> {
        let confirmed_by = confirmed_by.to_string();
        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedReceipt, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    confirm_in(txn, doc, &confirmed_by).await
                })
            })
            .await
            .map_err(txn_err)?;

        info!(
            document_id = %confirmed.document.id,
            items = confirmed.items.len(),
            "Confirmed receipt"
        );
        self.emit_confirmed(&confirmed).await;
        Ok(confirmed)
    }

    /// Retracts a confirmed receipt: deletes the items it created, writing a
    /// compensating WRITE_OFF history row for each, and marks the document
    /// CANCELLED. Refused once any created item has been sold.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        document_id: Uuid,
        cancelled_by: &str,
    ) -> Result<document::Model, ServiceError> {
        let cancelled_by = cancelled_by.to_string();
        let db = self.db.clone();
        let doc = db
            .transaction::<_, document::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    ensure_type(&doc, DocumentType::Receipt)?;
                    ensure_status(&doc, DocumentStatus::Confirmed)?;

                    let lines = document_line::Entity::find()
                        .filter(document_line::Column::DocumentId.eq(doc.id))
                        .all(txn)
                        .await?;

                    let now = Utc::now();
                    for line in &lines {
                        let Some(item_id) = line.item_id else {
                            continue;
                        };
                        // The item may legitimately be gone already if it was
                        // written off through another path.
                        let Some(item) = item::Entity::find_by_id(item_id).one(txn).await? else {
                            continue;
                        };
                        if item.status == ItemStatus::Sold || item.quantity < line.quantity {
                            return Err(ServiceError::ItemAlreadyDisposed(item.id));
                        }

                        history::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(item.id),
                            document_id: Set(Some(doc.id)),
                            operation_type: Set(OperationType::WriteOff),
                            quantity_change: Set(Some(-item.quantity)),
                            price: Set(Some(item.purchase_price)),
                            from_shelf_id: Set(item.current_shelf_id),
                            to_shelf_id: Set(None),
                            from_status: Set(Some(item.status)),
                            to_status: Set(None),
                            operation_date: Set(now),
                            created_by: Set(cancelled_by.clone()),
                            notes: Set(Some(format!(
                                "Receipt {} cancelled",
                                doc.document_number
                            ))),
                        }
                        .insert(txn)
                        .await?;

                        item.delete(txn).await?;
                    }

                    let mut active: document::ActiveModel = doc.into();
                    active.status = Set(DocumentStatus::Cancelled);
                    active.updated_at = Set(now);
                    Ok(active.update(txn).await?)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %doc.id, "Cancelled receipt");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::ReceiptCancelled {
                    document_id: doc.id,
                })
                .await;
        }
        Ok(doc)
    }

    /// One-shot convenience: draft, lines and confirmation in a single
    /// transaction, so a failing line leaves nothing behind.
    #[instrument(skip(self, lines))]
    pub async fn create_and_confirm(
        &self,
        new: NewReceipt,
        lines: Vec<ReceiptLine>,
    ) -> Result<ConfirmedReceipt, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::EmptyDocument(new.document_number));
        }

        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedReceipt, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = insert_draft(txn, &new).await?;
                    for line in &lines {
                        insert_line(txn, &doc, line).await?;
                    }
                    let total = recalculate_total(txn, &doc).await?;
                    let doc = document::Model {
                        total_amount: total,
                        ..doc
                    };
                    confirm_in(txn, doc, &new.created_by).await
                })
            })
            .await
            .map_err(txn_err)?;

        info!(
            document_id = %confirmed.document.id,
            items = confirmed.items.len(),
            "Created and confirmed receipt"
        );
        self.emit_confirmed(&confirmed).await;
        Ok(confirmed)
    }

    pub async fn get(
        &self,
        document_id: Uuid,
    ) -> Result<(document::Model, Vec<document_line::Model>), ServiceError> {
        let doc = load_document(self.db.as_ref(), document_id).await?;
        let lines = document_line::Entity::find()
            .filter(document_line::Column::DocumentId.eq(doc.id))
            .order_by_asc(document_line::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok((doc, lines))
    }

    async fn emit_confirmed(&self, confirmed: &ConfirmedReceipt) {
        let Some(sender) = &self.event_sender else {
            return;
        };
        sender
            .send_or_log(Event::ReceiptConfirmed {
                document_id: confirmed.document.id,
                item_count: confirmed.items.len(),
            })
            .await;
        for item in &confirmed.items {
            sender
                .send_or_log(Event::ItemReceived {
                    item_id: item.id,
                    nomenclature_id: item.nomenclature_id,
                    quantity: item.quantity,
                })
                .await;
        }
    }
}

async fn insert_draft<C: ConnectionTrait>(
    conn: &C,
    new: &NewReceipt,
) -> Result<document::Model, ServiceError> {
    let duplicate = document::Entity::find()
        .filter(document::Column::DocumentNumber.eq(new.document_number.clone()))
        .one(conn)
        .await?;
    if duplicate.is_some() {
        return Err(ServiceError::DuplicateDocumentNumber(
            new.document_number.clone(),
        ));
    }

    warehouse::Entity::find_by_id(new.warehouse_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Warehouse {} not found", new.warehouse_id))
        })?;

    let now = Utc::now();
    let doc = document::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_type: Set(DocumentType::Receipt),
        document_number: Set(new.document_number.clone()),
        document_date: Set(new.document_date),
        warehouse_id: Set(new.warehouse_id),
        counterparty: Set(new.supplier.clone()),
        total_amount: Set(Decimal::ZERO),
        status: Set(DocumentStatus::Draft),
        notes: Set(new.notes.clone()),
        created_by: Set(new.created_by.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(doc)
}

async fn insert_line<C: ConnectionTrait>(
    conn: &C,
    doc: &document::Model,
    line: &ReceiptLine,
) -> Result<document_line::Model, ServiceError> {
    ensure_type(doc, DocumentType::Receipt)?;
    ensure_status(doc, DocumentStatus::Draft)?;

    if line.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Receipt quantity must be positive".into(),
        ));
    }
    if line.purchase_price <= Decimal::ZERO || line.selling_price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Receipt prices must be positive".into(),
        ));
    }

    nomenclature::Entity::find_by_id(line.nomenclature_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Nomenclature {} not found", line.nomenclature_id))
        })?;

    let shelf = load_shelf(conn, line.shelf_id).await?;
    if shelf.warehouse_id != doc.warehouse_id {
        return Err(ServiceError::ValidationError(format!(
            "Shelf {} belongs to a different warehouse than document {}",
            shelf.code, doc.document_number
        )));
    }

    let saved = document_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(doc.id),
        nomenclature_id: Set(line.nomenclature_id),
        item_id: Set(None),
        quantity: Set(line.quantity),
        price: Set(line.purchase_price),
        total: Set(line.quantity * line.purchase_price),
        shelf_id: Set(Some(line.shelf_id)),
        selling_price: Set(Some(line.selling_price)),
        batch_number: Set(line.batch_number.clone()),
        manufacture_date: Set(line.manufacture_date),
        expiry_date: Set(line.expiry_date),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(saved)
}

async fn confirm_in<C: ConnectionTrait>(
    conn: &C,
    doc: document::Model,
    confirmed_by: &str,
) -> Result<ConfirmedReceipt, ServiceError> {
    ensure_type(&doc, DocumentType::Receipt)?;
    ensure_status(&doc, DocumentStatus::Draft)?;

    let lines = document_line::Entity::find()
        .filter(document_line::Column::DocumentId.eq(doc.id))
        .order_by_asc(document_line::Column::CreatedAt)
        .all(conn)
        .await?;
    if lines.is_empty() {
        return Err(ServiceError::EmptyDocument(doc.document_number.clone()));
    }

    let now = Utc::now();
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            nomenclature_id: Set(line.nomenclature_id),
            batch_number: Set(line.batch_number.clone()),
            serial_number: Set(None),
            quantity: Set(line.quantity),
            purchase_price: Set(line.price),
            selling_price: Set(line.selling_price.unwrap_or(line.price)),
            current_shelf_id: Set(line.shelf_id),
            status: Set(ItemStatus::InStock),
            manufacture_date: Set(line.manufacture_date),
            expiry_date: Set(line.expiry_date),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        let mut line_active: document_line::ActiveModel = line.clone().into();
        line_active.item_id = Set(Some(item.id));
        line_active.update(conn).await?;

        history::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item.id),
            document_id: Set(Some(doc.id)),
            operation_type: Set(OperationType::Receipt),
            quantity_change: Set(Some(line.quantity)),
            price: Set(Some(line.price)),
            from_shelf_id: Set(None),
            to_shelf_id: Set(line.shelf_id),
            from_status: Set(None),
            to_status: Set(Some(ItemStatus::InStock)),
            operation_date: Set(now),
            created_by: Set(confirmed_by.to_string()),
            notes: Set(None),
        }
        .insert(conn)
        .await?;

        items.push(item);
    }

    let mut active: document::ActiveModel = doc.into();
    active.status = Set(DocumentStatus::Confirmed);
    active.updated_at = Set(now);
    let doc = active.update(conn).await?;

    Ok(ConfirmedReceipt {
        document: doc,
        items,
    })
}
