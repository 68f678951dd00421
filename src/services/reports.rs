use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::document::{self, DocumentStatus, DocumentType};
use crate::entities::item::{self, ItemStatus};
use crate::entities::{history, nomenclature, shelf, warehouse};
use crate::errors::ServiceError;

/// Current stock level of one catalog position. Positions with nothing on
/// hand are reported with a zero quantity rather than omitted.
#[derive(Debug, Clone, Serialize)]
pub struct NomenclatureStock {
    pub nomenclature: nomenclature::Model,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseStock {
    pub nomenclature_id: Uuid,
    pub nomenclature_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: Decimal,
}

/// Aggregate over confirmed documents of one type in a date range.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentTotals {
    pub count: usize,
    pub total: Decimal,
    pub documents: Vec<document::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseSummary {
    pub warehouse: warehouse::Model,
    pub item_count: usize,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShelfReport {
    pub shelf: shelf::Model,
    pub items: Vec<item::Model>,
    pub item_count: usize,
    pub total_value: Decimal,
}

/// Read-only reporting over the stock ledger. Aggregation happens in
/// application code so every query stays portable across backends.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn in_stock_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        let items = item::Entity::find()
            .filter(item::Column::Status.eq(ItemStatus::InStock))
            .all(self.db.as_ref())
            .await?;
        Ok(items)
    }

    /// Stock on hand per catalog position, covering the whole catalog.
    #[instrument(skip(self))]
    pub async fn stock_by_nomenclature(&self) -> Result<Vec<NomenclatureStock>, ServiceError> {
        let catalog = nomenclature::Entity::find()
            .order_by_asc(nomenclature::Column::Article)
            .all(self.db.as_ref())
            .await?;
        let items = self.in_stock_items().await?;

        let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
        for item in &items {
            *totals.entry(item.nomenclature_id).or_default() += item.quantity;
        }

        Ok(catalog
            .into_iter()
            .map(|n| {
                let quantity = totals.get(&n.id).copied().unwrap_or_default();
                NomenclatureStock {
                    nomenclature: n,
                    quantity,
                }
            })
            .collect())
    }

    /// Stock on hand broken down by warehouse, following the
    /// item -> shelf -> warehouse chain. Items without a shelf are omitted.
    #[instrument(skip(self))]
    pub async fn stock_by_warehouse(&self) -> Result<Vec<WarehouseStock>, ServiceError> {
        let items = self.in_stock_items().await?;
        let shelves: HashMap<Uuid, shelf::Model> = shelf::Entity::find()
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let warehouses: HashMap<Uuid, warehouse::Model> = warehouse::Entity::find()
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();
        let catalog: HashMap<Uuid, nomenclature::Model> = nomenclature::Entity::find()
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();

        let mut totals: HashMap<(Uuid, Uuid), Decimal> = HashMap::new();
        for item in &items {
            let Some(shelf_id) = item.current_shelf_id else {
                continue;
            };
            let Some(shelf) = shelves.get(&shelf_id) else {
                continue;
            };
            *totals
                .entry((item.nomenclature_id, shelf.warehouse_id))
                .or_default() += item.quantity;
        }

        let mut rows: Vec<WarehouseStock> = totals
            .into_iter()
            .filter_map(|((nomenclature_id, warehouse_id), quantity)| {
                let n = catalog.get(&nomenclature_id)?;
                let w = warehouses.get(&warehouse_id)?;
                Some(WarehouseStock {
                    nomenclature_id,
                    nomenclature_name: n.name.clone(),
                    warehouse_id,
                    warehouse_name: w.name.clone(),
                    quantity,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.nomenclature_name, &a.warehouse_name)
                .cmp(&(&b.nomenclature_name, &b.warehouse_name))
        });
        Ok(rows)
    }

    /// Catalog positions whose on-hand stock is below their minimum level.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<NomenclatureStock>, ServiceError> {
        let rows = self.stock_by_nomenclature().await?;
        Ok(rows
            .into_iter()
            .filter(|r| r.quantity < r.nomenclature.min_stock_level)
            .collect())
    }

    /// IN_STOCK items expiring within the next `days` days. Items expiring
    /// today or already expired are excluded; the window is half-open on
    /// the left and closed on the right.
    #[instrument(skip(self))]
    pub async fn expiring_within(&self, days: i64) -> Result<Vec<item::Model>, ServiceError> {
        let today = Utc::now().date_naive();
        let items = self.in_stock_items().await?;
        Ok(items
            .into_iter()
            .filter(|i| {
                i.expiry_date.is_some_and(|expiry| {
                    let left = (expiry - today).num_days();
                    left > 0 && left <= days
                })
            })
            .collect())
    }

    /// IN_STOCK items already past their expiry date.
    #[instrument(skip(self))]
    pub async fn expired_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        let today = Utc::now().date_naive();
        let items = self.in_stock_items().await?;
        Ok(items
            .into_iter()
            .filter(|i| i.is_expired(today))
            .collect())
    }

    /// Confirmed sales in the date range, both endpoints inclusive.
    #[instrument(skip(self))]
    pub async fn sales_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DocumentTotals, ServiceError> {
        self.document_totals(DocumentType::Sale, start, end).await
    }

    /// Confirmed receipts in the date range, both endpoints inclusive.
    #[instrument(skip(self))]
    pub async fn receipt_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DocumentTotals, ServiceError> {
        self.document_totals(DocumentType::Receipt, start, end)
            .await
    }

    async fn document_totals(
        &self,
        document_type: DocumentType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DocumentTotals, ServiceError> {
        let documents = document::Entity::find()
            .filter(document::Column::DocumentType.eq(document_type))
            .filter(document::Column::Status.eq(DocumentStatus::Confirmed))
            .filter(document::Column::DocumentDate.gte(start))
            .filter(document::Column::DocumentDate.lte(end))
            .order_by_asc(document::Column::DocumentDate)
            .all(self.db.as_ref())
            .await?;
        let total = documents.iter().map(|d| d.total_amount).sum();
        Ok(DocumentTotals {
            count: documents.len(),
            total,
            documents,
        })
    }

    /// Audit trail of one item in operation order. Works for deleted items
    /// as well, since history rows outlive their item.
    #[instrument(skip(self))]
    pub async fn item_history(&self, item_id: Uuid) -> Result<Vec<history::Model>, ServiceError> {
        let rows = history::Entity::find()
            .filter(history::Column::ItemId.eq(item_id))
            .order_by_asc(history::Column::OperationDate)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// Every ledger operation in the time range, both endpoints inclusive,
    /// across all items and documents in operation order.
    #[instrument(skip(self))]
    pub async fn operation_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<history::Model>, ServiceError> {
        let rows = history::Entity::find()
            .filter(history::Column::OperationDate.gte(start))
            .filter(history::Column::OperationDate.lte(end))
            .order_by_asc(history::Column::OperationDate)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// IN_STOCK totals across all shelves of one warehouse.
    #[instrument(skip(self))]
    pub async fn warehouse_summary(
        &self,
        warehouse_id: Uuid,
    ) -> Result<WarehouseSummary, ServiceError> {
        let warehouse = warehouse::Entity::find_by_id(warehouse_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
            })?;

        let shelf_ids: Vec<Uuid> = shelf::Entity::find()
            .filter(shelf::Column::WarehouseId.eq(warehouse_id))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let items = if shelf_ids.is_empty() {
            Vec::new()
        } else {
            item::Entity::find()
                .filter(item::Column::Status.eq(ItemStatus::InStock))
                .filter(item::Column::CurrentShelfId.is_in(shelf_ids))
                .all(self.db.as_ref())
                .await?
        };

        Ok(WarehouseSummary {
            warehouse,
            item_count: items.len(),
            total_quantity: items.iter().map(|i| i.quantity).sum(),
            total_value: items.iter().map(|i| i.total_value()).sum(),
        })
    }

    /// Everything currently sitting on one shelf, regardless of status.
    #[instrument(skip(self))]
    pub async fn shelf_report(&self, shelf_id: Uuid) -> Result<ShelfReport, ServiceError> {
        let shelf = shelf::Entity::find_by_id(shelf_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", shelf_id)))?;

        let items = item::Entity::find()
            .filter(item::Column::CurrentShelfId.eq(shelf_id))
            .order_by_asc(item::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(ShelfReport {
            item_count: items.len(),
            total_value: items.iter().map(|i| i.total_value()).sum(),
            shelf,
            items,
        })
    }
}
