use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::ClientStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub status: ClientStatus,
    pub plan_id: Option<i32>,
    pub contact_email: Option<String>,
    /// Tenant id on the external bot platform, set after provisioning.
    pub bot_tenant_id: Option<String>,
    /// Per-tenant bot platform API key, AES-GCM encrypted (hex).
    #[serde(skip_serializing)]
    pub bot_api_key_enc: Option<String>,
    /// Customer id at the payment processor, set by the billing webhook.
    pub processor_customer_id: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    Plan,

    #[sea_orm(has_many = "super::asset::Entity")]
    Assets,

    #[sea_orm(has_many = "super::entitlement::Entity")]
    Entitlements,

    #[sea_orm(has_many = "super::incident::Entity")]
    Incidents,

    #[sea_orm(has_many = "super::monthly_rhythm::Entity")]
    MonthlyRhythms,

    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoices,

    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assets.def()
    }
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incidents.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
