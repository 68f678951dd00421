use std::sync::Arc;

use chrono::NaiveDate;
use chrono::Utc;
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
use crate::entities::item::{self, ItemStatus};
use crate::entities::{document_line, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

use super::{
    ensure_status, ensure_type, load_document, load_item, recalculate_total, txn_err,
    update_item_guarded,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub document_number: String,
    pub document_date: NaiveDate,
    pub warehouse_id: Uuid,
    pub customer: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
}

/// One outgoing position on a sale document. The price defaults to the
/// item's selling price when not overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub selling_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleLineOutcome {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub remaining: Decimal,
    pub sold_out: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedSale {
    pub document: document::Model,
    pub outcomes: Vec<SaleLineOutcome>,
}

/// Goods-outbound workflow. Stock checks run twice: an advisory check when a
/// line is added, and an authoritative re-check against a fresh item read
/// inside the confirmation transaction.
#[derive(Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl SaleService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_draft(&self, new: NewSale) -> Result<document::Model, ServiceError> {
        let db = self.db.clone();
        let doc = db
            .transaction::<_, document::Model, ServiceError>(move |txn| {
                Box::pin(async move { insert_draft(txn, &new).await })
            })
            .await
            .map_err(txn_err)?;

        info!(document_id = %doc.id, number = %doc.document_number, "Created sale draft");
        Ok(doc)
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        document_id: Uuid,
        line: SaleLine,
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

        info!(document_id = %document_id, line_id = %saved.id, "Added sale line");
        Ok(saved)
    }

    /// Deducts stock for every line or none at all. A batch drained to
    /// exactly zero flips to SOLD; partially sold batches stay IN_STOCK.
    /// History rows are attributed to `confirmed_by`.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        document_id: Uuid,
        confirmed_by: &str,
    ) -> Result<ConfirmedSale, ServiceError> {
        let confirmed_by = confirmed_by.to_string();
        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedSale, ServiceError>(move |txn| {
                Box::pin(async move {
                    let doc = load_document(txn, document_id).await?;
                    confirm_in(txn, doc, &confirmed_by).await
                })
            })
            .await
            .map_err(txn_err)?;

        info!(
            document_id = %confirmed.document.id,
            lines = confirmed.outcomes.len(),
            total = %confirmed.document.total_amount,
            "Confirmed sale"
        );
        self.emit_confirmed(&confirmed).await;
        Ok(confirmed)
    }

    /// One-shot convenience composed of the same draft/line/confirm
    /// primitives inside a single transaction.
    #[instrument(skip(self, lines))]
    pub async fn create_and_confirm(
        &self,
        new: NewSale,
        lines: Vec<SaleLine>,
    ) -> Result<ConfirmedSale, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::EmptyDocument(new.document_number));
        }

        let db = self.db.clone();
        let confirmed = db
            .transaction::<_, ConfirmedSale, ServiceError>(move |txn| {
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
            total = %confirmed.document.total_amount,
            "Created and confirmed sale"
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

    /// Sellable batches of a nomenclature: IN_STOCK with positive quantity.
    pub async fn available_items(
        &self,
        nomenclature_id: Uuid,
    ) -> Result<Vec<item::Model>, ServiceError> {
        let items = item::Entity::find()
            .filter(item::Column::NomenclatureId.eq(nomenclature_id))
            .filter(item::Column::Status.eq(ItemStatus::InStock))
            .filter(item::Column::Quantity.gt(Decimal::ZERO))
            .order_by_asc(item::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(items)
    }

    pub async fn available_quantity(&self, nomenclature_id: Uuid) -> Result<Decimal, ServiceError> {
        let items = self.available_items(nomenclature_id).await?;
        Ok(items.iter().map(|i| i.quantity).sum())
    }

    async fn emit_confirmed(&self, confirmed: &ConfirmedSale) {
        let Some(sender) = &self.event_sender else {
            return;
        };
        sender
            .send_or_log(Event::SaleConfirmed {
                document_id: confirmed.document.id,
                total_amount: confirmed.document.total_amount,
            })
            .await;
        for outcome in &confirmed.outcomes {
            sender
                .send_or_log(Event::ItemSold {
                    item_id: outcome.item_id,
                    quantity: outcome.quantity,
                    sold_out: outcome.sold_out,
                })
                .await;
        }
    }
}

async fn insert_draft<C: ConnectionTrait>(
    conn: &C,
    new: &NewSale,
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
        document_type: Set(DocumentType::Sale),
        document_number: Set(new.document_number.clone()),
        document_date: Set(new.document_date),
        warehouse_id: Set(new.warehouse_id),
        counterparty: Set(new.customer.clone()),
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

fn check_sellable(item: &item::Model, quantity: Decimal) -> Result<(), ServiceError> {
    if item.status != ItemStatus::InStock {
        return Err(ServiceError::ItemUnavailable(format!(
            "Item {} is {:?}",
            item.id, item.status
        )));
    }
    if item.quantity < quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "Item {} has {} on hand, {} requested",
            item.id, item.quantity, quantity
        )));
    }
    Ok(())
}

async fn insert_line<C: ConnectionTrait>(
    conn: &C,
    doc: &document::Model,
    line: &SaleLine,
) -> Result<document_line::Model, ServiceError> {
    ensure_type(doc, DocumentType::Sale)?;
    ensure_status(doc, DocumentStatus::Draft)?;

    if line.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Sale quantity must be positive".into(),
        ));
    }

    // Advisory check only. Stock can still drain between drafting and
    // confirmation; confirm_in re-checks against a fresh read.
    let item = load_item(conn, line.item_id).await?;
    check_sellable(&item, line.quantity)?;

    let price = line.selling_price.unwrap_or(item.selling_price);
    if price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Sale price must be positive".into(),
        ));
    }

    let saved = document_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(doc.id),
        nomenclature_id: Set(item.nomenclature_id),
        item_id: Set(Some(item.id)),
        quantity: Set(line.quantity),
        price: Set(price),
        total: Set(line.quantity * price),
        shelf_id: Set(item.current_shelf_id),
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
) -> Result<ConfirmedSale, ServiceError> {
    ensure_type(&doc, DocumentType::Sale)?;
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
    let mut outcomes = Vec::with_capacity(lines.len());
    for line in &lines {
        let item_id = line.item_id.ok_or_else(|| {
            ServiceError::InternalError(format!("Sale line {} has no item", line.id))
        })?;

        // Authoritative re-check against the current row.
        let item = load_item(conn, item_id).await?;
        check_sellable(&item, line.quantity)?;

        let remaining = item.quantity - line.quantity;
        let sold_out = remaining.is_zero();

        let mut patch = <item::ActiveModel as std::default::Default>::default();
        patch.quantity = Set(remaining);
        if sold_out {
            patch.status = Set(ItemStatus::Sold);
        }
        update_item_guarded(conn, &item, patch).await?;

        history::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item.id),
            document_id: Set(Some(doc.id)),
            operation_type: Set(OperationType::Sale),
            quantity_change: Set(Some(-line.quantity)),
            price: Set(Some(line.price)),
            from_shelf_id: Set(item.current_shelf_id),
            to_shelf_id: Set(None),
            from_status: Set(Some(item.status)),
            to_status: Set(Some(if sold_out {
                ItemStatus::Sold
            } else {
                ItemStatus::InStock
            })),
            operation_date: Set(now),
            created_by: Set(confirmed_by.to_string()),
            notes: Set(None),
        }
        .insert(conn)
        .await?;

        outcomes.push(SaleLineOutcome {
            item_id: item.id,
            quantity: line.quantity,
            remaining,
            sold_out,
        });
    }

    let mut active: document::ActiveModel = doc.into();
    active.status = Set(DocumentStatus::Confirmed);
    active.updated_at = Set(now);
    let doc = active.update(conn).await?;

    Ok(ConfirmedSale {
        document: doc,
        outcomes,
    })
}
