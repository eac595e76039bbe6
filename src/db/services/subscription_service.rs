use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};

use crate::db::entities::subscription;
use crate::db::enums::SubscriptionStatus;

/// Mirrors the processor's subscription object locally, keyed by its id.
pub async fn upsert_subscription(
    db: &DatabaseConnection,
    client_id: i32,
    plan_id: Option<i32>,
    processor_subscription_id: &str,
    processor_customer_id: &str,
    status: SubscriptionStatus,
    current_period_end: Option<DateTime<Utc>>,
) -> Result<subscription::Model, DbErr> {
    let now = Utc::now();
    let existing = subscription::Entity::find()
        .filter(subscription::Column::ProcessorSubscriptionId.eq(processor_subscription_id))
        .one(db)
        .await?;

    match existing {
        Some(model) => {
            let mut active = model.into_active_model();
            active.status = Set(status);
            active.plan_id = Set(plan_id);
            active.current_period_end = Set(current_period_end);
            active.updated_at = Set(now);
            active.update(db).await
        }
        None => {
            subscription::ActiveModel {
                client_id: Set(client_id),
                plan_id: Set(plan_id),
                processor_subscription_id: Set(processor_subscription_id.to_string()),
                processor_customer_id: Set(processor_customer_id.to_string()),
                status: Set(status),
                current_period_end: Set(current_period_end),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
        }
    }
}

pub async fn mark_canceled(
    db: &DatabaseConnection,
    processor_subscription_id: &str,
) -> Result<Option<subscription::Model>, DbErr> {
    let existing = subscription::Entity::find()
        .filter(subscription::Column::ProcessorSubscriptionId.eq(processor_subscription_id))
        .one(db)
        .await?;
    let Some(model) = existing else {
        return Ok(None);
    };
    let mut active = model.into_active_model();
    active.status = Set(SubscriptionStatus::Canceled);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}
