use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{document, item, manufacturer, nomenclature, shelf, warehouse};
use crate::errors::ServiceError;

use super::txn_err;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewWarehouse {
    #[validate(length(min = 1))]
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewShelf {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewManufacturer {
    #[validate(length(min = 1))]
    pub name: String,
    pub country: Option<String>,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewNomenclature {
    #[validate(length(min = 1, max = 100))]
    pub article: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    pub manufacturer_id: Option<Uuid>,
    pub min_stock_level: Decimal,
}

/// Mutable subset of a catalog position. The article is the position's
/// external identity and stays fixed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NomenclatureUpdate {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub manufacturer_id: Option<Option<Uuid>>,
    pub min_stock_level: Option<Decimal>,
}

/// Reference-data administration: warehouses, shelves, manufacturers and
/// the nomenclature catalog. Hard deletes are refused while stock or
/// documents still reference the row; deactivation is the soft path for
/// locations.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // Warehouses

    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        new: NewWarehouse,
    ) -> Result<warehouse::Model, ServiceError> {
        new.validate()?;
        let db = self.db.clone();
        let created = db
            .transaction::<_, warehouse::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let duplicate = warehouse::Entity::find()
                        .filter(warehouse::Column::Name.eq(new.name.clone()))
                        .one(txn)
                        .await?;
                    if duplicate.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Warehouse '{}' already exists",
                            new.name
                        )));
                    }

                    let now = Utc::now();
                    let created = warehouse::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(new.name),
                        address: Set(new.address),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    Ok(created)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(warehouse_id = %created.id, name = %created.name, "Created warehouse");
        Ok(created)
    }

    pub async fn get_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        warehouse::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", id)))
    }

    pub async fn list_warehouses(&self) -> Result<Vec<warehouse::Model>, ServiceError> {
        let rows = warehouse::Entity::find()
            .order_by_asc(warehouse::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        let existing = self.get_warehouse(id).await?;
        let mut active: warehouse::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Hard delete; refused while shelves or documents still reference the
    /// warehouse.
    #[instrument(skip(self))]
    pub async fn delete_warehouse(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = warehouse::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Warehouse {} not found", id))
                    })?;

                let shelf_count = shelf::Entity::find()
                    .filter(shelf::Column::WarehouseId.eq(id))
                    .count(txn)
                    .await?;
                if shelf_count > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Warehouse '{}' still has {} shelves",
                        existing.name, shelf_count
                    )));
                }

                let document_count = document::Entity::find()
                    .filter(document::Column::WarehouseId.eq(id))
                    .count(txn)
                    .await?;
                if document_count > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Warehouse '{}' is referenced by {} documents",
                        existing.name, document_count
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(txn_err)
    }

    // Shelves

    #[instrument(skip(self))]
    pub async fn create_shelf(&self, new: NewShelf) -> Result<shelf::Model, ServiceError> {
        new.validate()?;
        let db = self.db.clone();
        let created = db
            .transaction::<_, shelf::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    warehouse::Entity::find_by_id(new.warehouse_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse {} not found",
                                new.warehouse_id
                            ))
                        })?;

                    let duplicate = shelf::Entity::find()
                        .filter(shelf::Column::WarehouseId.eq(new.warehouse_id))
                        .filter(shelf::Column::Code.eq(new.code.clone()))
                        .one(txn)
                        .await?;
                    if duplicate.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Shelf '{}' already exists in this warehouse",
                            new.code
                        )));
                    }

                    let now = Utc::now();
                    let created = shelf::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        warehouse_id: Set(new.warehouse_id),
                        code: Set(new.code),
                        capacity: Set(new.capacity),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    Ok(created)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(shelf_id = %created.id, code = %created.code, "Created shelf");
        Ok(created)
    }

    pub async fn get_shelf(&self, id: Uuid) -> Result<shelf::Model, ServiceError> {
        shelf::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", id)))
    }

    pub async fn list_shelves(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<shelf::Model>, ServiceError> {
        let rows = shelf::Entity::find()
            .filter(shelf::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(shelf::Column::Code)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_shelf(&self, id: Uuid) -> Result<shelf::Model, ServiceError> {
        let existing = self.get_shelf(id).await?;
        let mut active: shelf::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Hard delete; refused while any item still sits on the shelf.
    #[instrument(skip(self))]
    pub async fn delete_shelf(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = shelf::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", id)))?;

                let item_count = item::Entity::find()
                    .filter(item::Column::CurrentShelfId.eq(id))
                    .count(txn)
                    .await?;
                if item_count > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Shelf '{}' still holds {} items",
                        existing.code, item_count
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(txn_err)
    }

    // Manufacturers

    #[instrument(skip(self))]
    pub async fn create_manufacturer(
        &self,
        new: NewManufacturer,
    ) -> Result<manufacturer::Model, ServiceError> {
        new.validate()?;
        let db = self.db.clone();
        let created = db
            .transaction::<_, manufacturer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let duplicate = manufacturer::Entity::find()
                        .filter(manufacturer::Column::Name.eq(new.name.clone()))
                        .one(txn)
                        .await?;
                    if duplicate.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Manufacturer '{}' already exists",
                            new.name
                        )));
                    }

                    let now = Utc::now();
                    let created = manufacturer::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(new.name),
                        country: Set(new.country),
                        contact_info: Set(new.contact_info),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    Ok(created)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(manufacturer_id = %created.id, name = %created.name, "Created manufacturer");
        Ok(created)
    }

    pub async fn get_manufacturer(&self, id: Uuid) -> Result<manufacturer::Model, ServiceError> {
        manufacturer::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Manufacturer {} not found", id)))
    }

    pub async fn list_manufacturers(&self) -> Result<Vec<manufacturer::Model>, ServiceError> {
        let rows = manufacturer::Entity::find()
            .order_by_asc(manufacturer::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// Hard delete; refused while catalog positions still reference the
    /// manufacturer.
    #[instrument(skip(self))]
    pub async fn delete_manufacturer(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = manufacturer::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Manufacturer {} not found", id))
                    })?;

                let referenced = nomenclature::Entity::find()
                    .filter(nomenclature::Column::ManufacturerId.eq(id))
                    .count(txn)
                    .await?;
                if referenced > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Manufacturer '{}' is referenced by {} nomenclature entries",
                        existing.name, referenced
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(txn_err)
    }

    // Nomenclature

    #[instrument(skip(self))]
    pub async fn create_nomenclature(
        &self,
        new: NewNomenclature,
    ) -> Result<nomenclature::Model, ServiceError> {
        new.validate()?;
        if new.min_stock_level < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Minimum stock level cannot be negative".into(),
            ));
        }

        let db = self.db.clone();
        let created = db
            .transaction::<_, nomenclature::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let duplicate = nomenclature::Entity::find()
                        .filter(nomenclature::Column::Article.eq(new.article.clone()))
                        .one(txn)
                        .await?;
                    if duplicate.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Article '{}' already exists",
                            new.article
                        )));
                    }

                    if let Some(manufacturer_id) = new.manufacturer_id {
                        manufacturer::Entity::find_by_id(manufacturer_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Manufacturer {} not found",
                                    manufacturer_id
                                ))
                            })?;
                    }

                    let now = Utc::now();
                    let created = nomenclature::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        article: Set(new.article),
                        name: Set(new.name),
                        unit: Set(new.unit),
                        manufacturer_id: Set(new.manufacturer_id),
                        min_stock_level: Set(new.min_stock_level),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    Ok(created)
                })
            })
            .await
            .map_err(txn_err)?;

        info!(nomenclature_id = %created.id, article = %created.article, "Created nomenclature");
        Ok(created)
    }

    pub async fn get_nomenclature(&self, id: Uuid) -> Result<nomenclature::Model, ServiceError> {
        nomenclature::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Nomenclature {} not found", id)))
    }

    pub async fn find_nomenclature_by_article(
        &self,
        article: &str,
    ) -> Result<Option<nomenclature::Model>, ServiceError> {
        let found = nomenclature::Entity::find()
            .filter(nomenclature::Column::Article.eq(article))
            .one(self.db.as_ref())
            .await?;
        Ok(found)
    }

    pub async fn list_nomenclature(&self) -> Result<Vec<nomenclature::Model>, ServiceError> {
        let rows = nomenclature::Entity::find()
            .order_by_asc(nomenclature::Column::Article)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn update_nomenclature(
        &self,
        id: Uuid,
        update: NomenclatureUpdate,
    ) -> Result<nomenclature::Model, ServiceError> {
        let existing = self.get_nomenclature(id).await?;

        if let Some(manufacturer_id) = update.manufacturer_id.flatten() {
            self.get_manufacturer(manufacturer_id).await?;
        }
        if let Some(level) = update.min_stock_level {
            if level < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Minimum stock level cannot be negative".into(),
                ));
            }
        }

        let mut active: nomenclature::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(unit) = update.unit {
            active.unit = Set(unit);
        }
        if let Some(manufacturer_id) = update.manufacturer_id {
            active.manufacturer_id = Set(manufacturer_id);
        }
        if let Some(level) = update.min_stock_level {
            active.min_stock_level = Set(level);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Hard delete; refused while stock items still reference the position.
    #[instrument(skip(self))]
    pub async fn delete_nomenclature(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.clone();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = nomenclature::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Nomenclature {} not found", id))
                    })?;

                let item_count = item::Entity::find()
                    .filter(item::Column::NomenclatureId.eq(id))
                    .count(txn)
                    .await?;
                if item_count > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Article '{}' is referenced by {} stock items",
                        existing.article, item_count
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(txn_err)
    }
}
