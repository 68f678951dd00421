use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::document::{self, DocumentStatus, DocumentType};
use crate::entities::history::{self, OperationType};
use crate::entities::item;
use crate::entities::{document_line, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

use super::{
    ensure_status, ensure_type, load_document, load_item, load_shelf, recalculate_total, txn_err,
    update_item_guarded,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub document_number: String,
    pub document_date: NaiveDate,
    pub warehouse_id: Uuid,
    pub created_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemMove {
    pub item_id: Uuid,
    pub from_shelf_id: Uuid,
    pub to_shelf_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedMovement {
    pub document: document::Model,
    pub moves: Vec<ItemMove>,
}

/// Shelf-to-shelf relocation workflow. A movement never changes quantities
/// or statuses, only `current_shelf_id`; its history rows carry a null
/// quantity change.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl MovementService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_draft(&self, new: NewMovement) -> Result<document::Model, ServiceError> {
        let db = self.db.clone();
        let doc = db
            .transaction::<_, document::Model, ServiceError>(move |txn| {
                Box::pin(async move { insert_draft(txn, &new).await })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %doc.id, number = %doc.document_number, "Created movement draft");
        Ok(doc)
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        document_id: Uuid,
        item_id: Uuid,
        target_shelf_id: Uuid,
    ) -> Result<document_line::Model, ServiceError> {
        let db = self.db.clone();
        let saved = db
            .transaction::<_, document_line::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    let saved = insert_line(txn, &doc, item_id, target_shelf_id).await?;
                    recalculate_total(txn, &doc).await?;
                    Ok(saved)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %document_id, item_id = %item_id, "Added movement line");
        Ok(saved)
    }

    /// Relocates every line's item. Location preconditions are re-validated
    /// per line against fresh reads, so a batch already sitting on its
    /// target shelf fails the whole confirmation. History rows are
    /// attributed to `confirmed_by`.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        document_id: Uuid,
        confirmed_by: &str,
    ) -> Result<ConfirmedMovement, ServiceError> {
        let confirmed_by = confirmed_by.to_string();
        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedMovement, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    confirm_in(txn, doc, &confirmed_by).await
                })
            })
            .await
            .map_err(txn_err)?;

        info!(
            document_id = %confirmed.document.id,
            moves = confirmed.moves.len(),
            "Confirmed movement"
        );
        self.emit_confirmed(&confirmed).await;
        Ok(confirmed)
    }

    /// Relocates a single batch without a document. Same validations as the
    /// document flow; the history row carries a null document id.
    #[instrument(skip(self))]
    pub async fn quick_move(
        &self,
        item_id: Uuid,
        target_shelf_id: Uuid,
        moved_by: &str,
    ) -> Result<item::Model, ServiceError> {
        let moved_by = moved_by.to_string();
        let db = self.db.clone();
        let (item, from_shelf_id) = db
            .transaction::<_, (item::Model, Uuid), ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    let from_shelf_id = check_relocatable(txn, &item, target_shelf_id).await?;

                    let mut patch = <item::ActiveModel as std::default::Default>::default();
                    patch.current_shelf_id = Set(Some(target_shelf_id));
                    update_item_guarded(txn, &item, patch).await?;

                    history::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item.id),
                        document_id: Set(None),
                        operation_type: Set(OperationType::Movement),
                        quantity_change: Set(None),
                        price: Set(None),
                        from_shelf_id: Set(Some(from_shelf_id)),
                        to_shelf_id: Set(Some(target_shelf_id)),
                        from_status: Set(None),
                        to_status: Set(None),
                        operation_date: Set(Utc::now()),
                        created_by: Set(moved_by),
                        notes: Set(None),
                    }
                    .insert(txn)
                    .await?;

                    let item = load_item(txn, item.id).await?;
                    Ok((item, from_shelf_id))
                })
            })
            .await
            .map_err(txn_err)?;

        info!(item_id = %item.id, to_shelf = %target_shelf_id, "Quick-moved item");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::ItemMoved {
                    item_id: item.id,
                    from_shelf_id,
                    to_shelf_id: target_shelf_id,
                    document_id: None,
                })
                .await;
        }
        Ok(item)
    }

    /// One-shot documented move: draft, line and confirmation in a single
    /// transaction. `quantity` is validated against the batch before
    /// anything is written; movements always relocate the whole batch.
    #[instrument(skip(self))]
    pub async fn move_item(
        &self,
        new: NewMovement,
        item_id: Uuid,
        quantity: Decimal,
        target_shelf_id: Uuid,
    ) -> Result<ConfirmedMovement, ServiceError> {
        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedMovement, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    if quantity > item.quantity {
                        return Err(ServiceError::InsufficientStock(format!(
                            "Item {} has {} on hand, {} requested",
                            item.id, item.quantity, quantity
                        )));
                    }

                    let doc = insert_draft(txn, &new).await?;
                    insert_line(txn, &doc, item_id, target_shelf_id).await?;
                    confirm_in(txn, doc, &new.created_by).await
                })
            })
            .await
            .map_err(txn_err)?;

        info!(
            document_id = %confirmed.document.id,
            item_id = %item_id,
            "Moved item via one-shot document"
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

    async fn emit_confirmed(&self, confirmed: &ConfirmedMovement) {
        let Some(sender) = &self.event_sender else {
            return;
        };
        sender
            .send_or_log(Event::MovementConfirmed {
                document_id: confirmed.document.id,
            })
            .await;
        for item_move in &confirmed.moves {
            sender
                .send_or_log(Event::ItemMoved {
                    item_id: item_move.item_id,
                    from_shelf_id: item_move.from_shelf_id,
                    to_shelf_id: item_move.to_shelf_id,
                    document_id: Some(confirmed.document.id),
                })
                .await;
        }
    }
}

async fn insert_draft<C: ConnectionTrait>(
    conn: &C,
    new: &NewMovement,
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
        document_type: Set(DocumentType::Movement),
        document_number: Set(new.document_number.clone()),
        document_date: Set(new.document_date),
        warehouse_id: Set(new.warehouse_id),
        counterparty: Set(None),
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

/// Validates the location preconditions and returns the source shelf.
async fn check_relocatable<C: ConnectionTrait>(
    conn: &C,
    item: &item::Model,
    target_shelf_id: Uuid,
) -> Result<Uuid, ServiceError> {
    let from_shelf_id = item
        .current_shelf_id
        .ok_or(ServiceError::NoCurrentLocation(item.id))?;
    if from_shelf_id == target_shelf_id {
        return Err(ServiceError::SameLocation(item.id));
    }
    load_shelf(conn, target_shelf_id).await?;
    Ok(from_shelf_id)
}

async fn insert_line<C: ConnectionTrait>(
    conn: &C,
    doc: &document::Model,
    item_id: Uuid,
    target_shelf_id: Uuid,
) -> Result<document_line::Model, ServiceError> {
    ensure_type(doc, DocumentType::Movement)?;
    ensure_status(doc, DocumentStatus::Draft)?;

    let item = load_item(conn, item_id).await?;
    check_relocatable(conn, &item, target_shelf_id).await?;

    let saved = document_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(doc.id),
        nomenclature_id: Set(item.nomenclature_id),
        item_id: Set(Some(item.id)),
        quantity: Set(item.quantity),
        price: Set(Decimal::ZERO),
        total: Set(Decimal::ZERO),
        shelf_id: Set(Some(target_shelf_id)),
        selling_price: Set(None),
        batch_number: Set(None),
        manufacture_date: Set(None),
        expiry_date: Set(None),
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
) -> Result<ConfirmedMovement, ServiceError> {
    ensure_type(&doc, DocumentType::Movement)?;
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
    let mut moves = Vec::with_capacity(lines.len());
    for line in &lines {
        let item_id = line.item_id.ok_or_else(|| {
            ServiceError::InternalError(format!("Movement line {} has no item", line.id))
        })?;
        let target_shelf_id = line.shelf_id.ok_or_else(|| {
            ServiceError::InternalError(format!("Movement line {} has no target shelf", line.id))
        })?;

        // Location may have drifted since the line was drafted.
        let item = load_item(conn, item_id).await?;
        let from_shelf_id = check_relocatable(conn, &item, target_shelf_id).await?;

        let mut patch = <item::ActiveModel as std::default::Default>::default();
        patch.current_shelf_id = Set(Some(target_shelf_id));
        update_item_guarded(conn, &item, patch).await?;

        history::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item.id),
            document_id: Set(Some(doc.id)),
            operation_type: Set(OperationType::Movement),
            quantity_change: Set(None),
            price: Set(None),
            from_shelf_id: Set(Some(from_shelf_id)),
            to_shelf_id: Set(Some(target_shelf_id)),
            from_status: Set(None),
            to_status: Set(None),
            operation_date: Set(now),
            created_by: Set(confirmed_by.to_string()),
            notes: Set(None),
        }
        .insert(conn)
        .await?;

        moves.push(ItemMove {
            item_id: item.id,
            from_shelf_id,
            to_shelf_id: target_shelf_id,
        });
    }

    let mut active: document::ActiveModel = doc.into();
    active.status = Set(DocumentStatus::Confirmed);
    active.updated_at = Set(now);
    let doc = active.update(conn).await?;

    Ok(ConfirmedMovement {
        document: doc,
        moves,
    })
}
