use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::monthly_rhythm;

/// "YYYY-MM" with a plausible month component.
pub fn is_valid_month(month: &str) -> bool {
    let Some((year, month_part)) = month.split_once('-') else {
        return false;
    };
    year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && month_part.len() == 2
        && matches!(month_part.parse::<u8>(), Ok(1..=12))
}

pub async fn list_for_client(
    db: &DatabaseConnection,
    client_id: i32,
) -> Result<Vec<monthly_rhythm::Model>, DbErr> {
    monthly_rhythm::Entity::find()
        .filter(monthly_rhythm::Column::ClientId.eq(client_id))
        .order_by_desc(monthly_rhythm::Column::Month)
        .all(db)
        .await
}

pub async fn get_rhythm(
    db: &DatabaseConnection,
    client_id: i32,
    month: &str,
) -> Result<Option<monthly_rhythm::Model>, DbErr> {
    monthly_rhythm::Entity::find()
        .filter(monthly_rhythm::Column::ClientId.eq(client_id))
        .filter(monthly_rhythm::Column::Month.eq(month))
        .one(db)
        .await
}

/// One record per (client, month); the admin editor writes through this
/// upsert.
pub async fn upsert_rhythm(
    db: &DatabaseConnection,
    client_id: i32,
    month: &str,
    hours_used: f64,
    hours_included: f64,
    weekly_notes: serde_json::Value,
) -> Result<monthly_rhythm::Model, DbErr> {
    let now = Utc::now();
    match get_rhythm(db, client_id, month).await? {
        Some(existing) => {
            let mut active = existing.into_active_model();
            active.hours_used = Set(hours_used);
            active.hours_included = Set(hours_included);
            active.weekly_notes = Set(weekly_notes);
            active.updated_at = Set(now);
            active.update(db).await
        }
        None => {
            monthly_rhythm::ActiveModel {
                client_id: Set(client_id),
                month: Set(month.to_string()),
                hours_used: Set(hours_used),
                hours_included: Set(hours_included),
                weekly_notes: Set(weekly_notes),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_format_validation() {
        assert!(is_valid_month("2026-08"));
        assert!(is_valid_month("2026-12"));
        assert!(!is_valid_month("2026-13"));
        assert!(!is_valid_month("2026-00"));
        assert!(!is_valid_month("2026-8"));
        assert!(!is_valid_month("26-08"));
        assert!(!is_valid_month("August 2026"));
    }
}
