use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::InvoiceStatus;

/// Monetary columns are minor units (cents). Totals are computed
/// server-side: subtotal = sum of line amounts, tax = subtotal * rate / 100
/// rounded to the nearest minor unit, total = subtotal + tax.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub client_id: i32,
    /// Sequential human-readable number, "INV-YYYY-NNNN".
    #[sea_orm(unique)]
    pub number: String,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal_minor: i64,
    pub tax_rate_percent: f64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub issued_at: Option<ChronoDateTimeUtc>,
    pub paid_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Client,

    #[sea_orm(has_many = "super::invoice_line_item::Entity")]
    LineItems,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::invoice_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
