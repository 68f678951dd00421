use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a stock batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ItemStatus {
    #[sea_orm(string_value = "IN_STOCK")]
    InStock,
    #[sea_orm(string_value = "SOLD")]
    Sold,
    #[sea_orm(string_value = "RESERVED")]
    Reserved,
    #[sea_orm(string_value = "DAMAGED")]
    Damaged,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    #[sea_orm(string_value = "RETURNED")]
    Returned,
}

/// A stock batch/lot: the unit of physical inventory.
///
/// Items are created only by confirming a receipt document and mutated only
/// by the workflow services. `quantity` never goes negative; a sale that
/// drains it to exactly zero also flips the status to SOLD. `version` is the
/// optimistic-concurrency counter checked on every mutation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub nomenclature_id: Uuid,
    pub batch_number: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub current_shelf_id: Option<Uuid>,
    pub status: ItemStatus,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| today > expiry)
    }

    /// Batch value at selling price.
    pub fn total_value(&self) -> Decimal {
        self.selling_price * self.quantity
    }

    /// Batch value at purchase price.
    pub fn total_purchase_cost(&self) -> Decimal {
        self.purchase_price * self.quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::nomenclature::Entity",
        from = "Column::NomenclatureId",
        to = "super::nomenclature::Column::Id"
    )]
    Nomenclature,
    #[sea_orm(
        belongs_to = "super::shelf::Entity",
        from = "Column::CurrentShelfId",
        to = "super::shelf::Column::Id"
    )]
    CurrentShelf,
    #[sea_orm(has_many = "super::history::Entity")]
    History,
}

impl Related<super::nomenclature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Nomenclature.def()
    }
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CurrentShelf.def()
    }
}

impl Related<super::history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
