use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::incident;
use crate::db::enums::{IncidentSeverity, IncidentSource, IncidentStatus};

pub struct NewIncident {
    pub client_id: i32,
    pub asset_id: Option<i32>,
    pub title: String,
    pub body: Option<String>,
    pub severity: IncidentSeverity,
    pub source: IncidentSource,
    pub reporter_email: Option<String>,
}

#[derive(Default)]
pub struct UpdateIncident {
    pub title: Option<String>,
    pub body: Option<String>,
    pub severity: Option<IncidentSeverity>,
    pub status: Option<IncidentStatus>,
    pub assignee_user_id: Option<i32>,
}

pub async fn list_incidents(
    db: &DatabaseConnection,
    client_id: Option<i32>,
    status: Option<IncidentStatus>,
) -> Result<Vec<incident::Model>, DbErr> {
    let mut query = incident::Entity::find().order_by_desc(incident::Column::CreatedAt);
    if let Some(client_id) = client_id {
        query = query.filter(incident::Column::ClientId.eq(client_id));
    }
    if let Some(status) = status {
        query = query.filter(incident::Column::Status.eq(status));
    }
    query.all(db).await
}

pub async fn get_incident(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<incident::Model>, DbErr> {
    incident::Entity::find_by_id(id).one(db).await
}

pub async fn create_incident(
    db: &DatabaseConnection,
    new: NewIncident,
) -> Result<incident::Model, DbErr> {
    let now = Utc::now();
    incident::ActiveModel {
        client_id: Set(new.client_id),
        asset_id: Set(new.asset_id),
        title: Set(new.title),
        body: Set(new.body),
        severity: Set(new.severity),
        status: Set(IncidentStatus::Open),
        source: Set(new.source),
        assignee_user_id: Set(None),
        reporter_email: Set(new.reporter_email),
        resolved_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Staff mutation of an incident. Moving into a terminal status stamps
/// `resolved_at`; reopening clears it.
pub async fn update_incident(
    db: &DatabaseConnection,
    id: i32,
    update: UpdateIncident,
) -> Result<Option<incident::Model>, DbErr> {
    let Some(existing) = incident::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let now = Utc::now();
    let mut active = existing.into_active_model();
    if let Some(title) = update.title {
        active.title = Set(title);
    }
    if let Some(body) = update.body {
        active.body = Set(Some(body));
    }
    if let Some(severity) = update.severity {
        active.severity = Set(severity);
    }
    if let Some(status) = update.status {
        active.resolved_at = Set(status.is_terminal().then_some(now));
        active.status = Set(status);
    }
    if let Some(assignee) = update.assignee_user_id {
        active.assignee_user_id = Set(Some(assignee));
    }
    active.updated_at = Set(now);
    active.update(db).await.map(Some)
}
