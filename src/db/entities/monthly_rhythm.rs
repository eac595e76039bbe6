use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-client-per-month record of retainer hours and weekly notes.
/// Unique on (client_id, month); the editor upserts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_rhythms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub client_id: i32,
    /// "YYYY-MM".
    pub month: String,
    pub hours_used: f64,
    pub hours_included: f64,
    /// JSON array of free-text weekly notes.
    pub weekly_notes: Json,
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
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
