use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single line of any stock document, owned by its parent document.
///
/// For receipt lines `item_id` is null until confirmation creates the item.
/// For sale and movement lines it references the existing batch. `shelf_id`
/// is the destination for receipts/movements and the source for sales.
/// The batch/date fields carry the receipt-line payload through to the item
/// created at confirmation; they are unused on other document types.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub document_id: Uuid,
    pub nomenclature_id: Uuid,
    pub item_id: Option<Uuid>,
    pub quantity: Decimal,
    pub price: Decimal,
    /// quantity x price, recomputed on every mutation
    pub total: Decimal,
    pub shelf_id: Option<Uuid>,
    pub selling_price: Option<Decimal>,
    pub batch_number: Option<String>,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id"
    )]
    Document,
    #[sea_orm(
        belongs_to = "super::nomenclature::Entity",
        from = "Column::NomenclatureId",
        to = "super::nomenclature::Column::Id"
    )]
    Nomenclature,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::nomenclature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Nomenclature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
