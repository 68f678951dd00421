use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::ItemStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OperationType {
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
    #[sea_orm(string_value = "SALE")]
    Sale,
    #[sea_orm(string_value = "MOVEMENT")]
    Movement,
    #[sea_orm(string_value = "WRITE_OFF")]
    WriteOff,
    #[sea_orm(string_value = "STATUS_CHANGE")]
    StatusChange,
    #[sea_orm(string_value = "INVENTORY")]
    Inventory,
    #[sea_orm(string_value = "RETURN")]
    Return,
}

/// Append-only audit ledger entry. Rows are never updated or deleted; the
/// signed `quantity_change` stream reconstructs an item's quantity at any
/// point in time. `item_id` is deliberately unconstrained so a write-off row
/// survives deletion of its item when a receipt is cancelled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    /// Null for ad-hoc operations such as quick moves
    pub document_id: Option<Uuid>,
    pub operation_type: OperationType,
    /// Positive for inbound, negative for outbound, null for pure relocations
    pub quantity_change: Option<Decimal>,
    pub price: Option<Decimal>,
    pub from_shelf_id: Option<Uuid>,
    pub to_shelf_id: Option<Uuid>,
    pub from_status: Option<ItemStatus>,
    pub to_status: Option<ItemStatus>,
    pub operation_date: DateTime<Utc>,
    pub created_by: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
