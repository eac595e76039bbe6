//! Entitlement resolution and the create-or-update (never both) toggle
//! persistence used by the bot feature workflow.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use tracing::warn;

use crate::db::entities::{entitlement, feature};
use crate::db::enums::EntitlementStatus;

/// Returns the feature-flag map for an asset: every config-key whose latest
/// entitlement is not revoked maps to `true`. An asset with no entitlements
/// yields an empty map, not an error.
///
/// All rows for the asset are fetched so the latest-activation-wins dedupe
/// runs across statuses; filtering revoked rows first would let a stale
/// active duplicate shadow a later revocation.
pub async fn resolve_feature_flags(
    db: &DatabaseConnection,
    asset_id: i32,
) -> Result<HashMap<String, bool>, DbErr> {
    let rows = entitlement::Entity::find()
        .filter(entitlement::Column::AssetId.eq(asset_id))
        .order_by_desc(entitlement::Column::ActivatedAt)
        .all(db)
        .await?;

    let current: Vec<entitlement::Model> = dedupe_latest(rows)
        .into_iter()
        .filter(|e| e.status != EntitlementStatus::Revoked)
        .collect();
    if current.is_empty() {
        return Ok(HashMap::new());
    }

    let feature_ids: Vec<i32> = current.iter().map(|e| e.feature_id).collect();
    let features = feature::Entity::find()
        .filter(feature::Column::Id.is_in(feature_ids))
        .all(db)
        .await?;

    Ok(features
        .into_iter()
        .map(|f| (f.config_key, true))
        .collect())
}

/// Collapses duplicate (asset, feature) rows, keeping the first occurrence.
/// Input must be sorted by `activated_at` descending, so the latest row wins.
/// Stale duplicates are a data-integrity risk and are logged.
pub fn dedupe_latest(rows: Vec<entitlement::Model>) -> Vec<entitlement::Model> {
    let mut seen: HashSet<i32> = HashSet::new();
    let mut current = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.feature_id) {
            current.push(row);
        } else {
            warn!(
                asset_id = row.asset_id,
                feature_id = row.feature_id,
                entitlement_id = row.id,
                "duplicate entitlement row ignored; latest activated_at wins"
            );
        }
    }
    current
}

/// Latest entitlement row for an (asset, feature) pair, if any.
pub async fn find_for_pair(
    db: &DatabaseConnection,
    asset_id: i32,
    feature_id: i32,
) -> Result<Option<entitlement::Model>, DbErr> {
    entitlement::Entity::find()
        .filter(entitlement::Column::AssetId.eq(asset_id))
        .filter(entitlement::Column::FeatureId.eq(feature_id))
        .order_by_desc(entitlement::Column::ActivatedAt)
        .one(db)
        .await
}

/// Create or update, never both: an existing row for the pair is updated in
/// place; otherwise a new row is inserted. Activation refreshes
/// `activated_at`.
pub async fn upsert_entitlement(
    db: &DatabaseConnection,
    client_id: i32,
    asset_id: i32,
    feature_id: i32,
    status: EntitlementStatus,
) -> Result<entitlement::Model, DbErr> {
    let now = Utc::now();
    match find_for_pair(db, asset_id, feature_id).await? {
        Some(existing) => {
            let mut active = existing.into_active_model();
            active.status = Set(status);
            if status == EntitlementStatus::Active {
                active.activated_at = Set(now);
            }
            active.updated_at = Set(now);
            active.update(db).await
        }
        None => {
            entitlement::ActiveModel {
                client_id: Set(client_id),
                asset_id: Set(asset_id),
                feature_id: Set(feature_id),
                status: Set(status),
                activated_at: Set(now),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await
        }
    }
}

/// Sets an existing entitlement to revoked. Revoking a feature that was
/// never enabled is an idempotent no-op and creates no row.
pub async fn revoke_entitlement(
    db: &DatabaseConnection,
    asset_id: i32,
    feature_id: i32,
) -> Result<Option<entitlement::Model>, DbErr> {
    match find_for_pair(db, asset_id, feature_id).await? {
        Some(existing) => {
            if existing.status == EntitlementStatus::Revoked {
                return Ok(Some(existing));
            }
            let mut active = existing.into_active_model();
            active.status = Set(EntitlementStatus::Revoked);
            active.updated_at = Set(Utc::now());
            active.update(db).await.map(Some)
        }
        None => Ok(None),
    }
}

pub async fn list_entitlements(
    db: &DatabaseConnection,
    client_id: Option<i32>,
    asset_id: Option<i32>,
) -> Result<Vec<entitlement::Model>, DbErr> {
    let mut query =
        entitlement::Entity::find().order_by_desc(entitlement::Column::ActivatedAt);
    if let Some(client_id) = client_id {
        query = query.filter(entitlement::Column::ClientId.eq(client_id));
    }
    if let Some(asset_id) = asset_id {
        query = query.filter(entitlement::Column::AssetId.eq(asset_id));
    }
    query.all(db).await
}

/// Outcome of reconciling local entitlements against the bot platform.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileOutcome {
    pub activated: Vec<String>,
    pub revoked: Vec<String>,
}

/// Plans a reconciliation of local entitlement state against the remote
/// platform's enabled config-keys (remote is the source of truth). Pure so
/// the drift logic is testable without a database.
pub fn plan_reconciliation(
    local_active_keys: &[String],
    remote_keys: &[String],
) -> ReconcileOutcome {
    let local: HashSet<&str> = local_active_keys.iter().map(String::as_str).collect();
    let remote: HashSet<&str> = remote_keys.iter().map(String::as_str).collect();

    ReconcileOutcome {
        activated: remote
            .difference(&local)
            .map(|k| k.to_string())
            .collect(),
        revoked: local
            .difference(&remote)
            .map(|k| k.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn row(
        id: i32,
        feature_id: i32,
        status: EntitlementStatus,
        activated_ts: i64,
    ) -> entitlement::Model {
        let at = Utc.timestamp_opt(activated_ts, 0).unwrap();
        entitlement::Model {
            id,
            client_id: 1,
            asset_id: 10,
            feature_id,
            status,
            activated_at: at,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn dedupe_keeps_latest_per_feature() {
        // sorted by activated_at descending, as the resolver queries
        let rows = vec![
            row(3, 101, EntitlementStatus::Active, 3000),
            row(1, 101, EntitlementStatus::Active, 1000),
            row(2, 102, EntitlementStatus::Active, 2000),
        ];
        let current = dedupe_latest(rows);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].id, 3);
        assert_eq!(current[1].id, 2);
    }

    #[tokio::test]
    async fn zero_entitlements_resolve_to_empty_map() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entitlement::Model>::new()])
            .into_connection();

        let flags = resolve_feature_flags(&db, 10).await.unwrap();
        assert!(flags.is_empty());
    }

    #[tokio::test]
    async fn resolves_config_keys_for_active_entitlements() {
        let now = Utc::now();
        let feature = feature::Model {
            id: 101,
            key: "tickets".to_string(),
            config_key: "ENABLE_TICKETS".to_string(),
            name: "Ticket Panels".to_string(),
            description: None,
            asset_kind: crate::db::enums::AssetKind::Bot,
            price: Some("$45".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(1, 101, EntitlementStatus::Active, 1000)]])
            .append_query_results([vec![feature]])
            .into_connection();

        let flags = resolve_feature_flags(&db, 10).await.unwrap();
        assert_eq!(flags.get("ENABLE_TICKETS"), Some(&true));
        assert_eq!(flags.len(), 1);
    }

    #[tokio::test]
    async fn later_revocation_beats_stale_active_duplicate() {
        // Concurrent-enable race left two rows for the pair; the disable
        // updated only the later one. The flag must resolve to off.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                row(2, 101, EntitlementStatus::Revoked, 2000),
                row(1, 101, EntitlementStatus::Active, 1000),
            ]])
            .into_connection();

        let flags = resolve_feature_flags(&db, 10).await.unwrap();
        assert!(flags.is_empty());
    }

    #[tokio::test]
    async fn first_enable_inserts_exactly_one_row() {
        let inserted = row(1, 101, EntitlementStatus::Active, 1000);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // find_for_pair: no existing row
            .append_query_results([Vec::<entitlement::Model>::new()])
            // insert returning
            .append_query_results([vec![inserted.clone()]])
            .into_connection();

        let saved = upsert_entitlement(&db, 1, 10, 101, EntitlementStatus::Active)
            .await
            .unwrap();
        assert_eq!(saved.status, EntitlementStatus::Active);

        let log = db.into_transaction_log();
        let inserts = log
            .iter()
            .filter(|t| format!("{t:?}").contains("INSERT"))
            .count();
        assert_eq!(inserts, 1, "exactly one INSERT expected");
    }

    #[tokio::test]
    async fn second_enable_updates_in_place() {
        let existing = row(1, 101, EntitlementStatus::Revoked, 1000);
        let updated = row(1, 101, EntitlementStatus::Active, 2000);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .append_query_results([vec![updated.clone()]])
            .into_connection();

        let saved = upsert_entitlement(&db, 1, 10, 101, EntitlementStatus::Active)
            .await
            .unwrap();
        assert_eq!(saved.id, 1);
        assert_eq!(saved.status, EntitlementStatus::Active);

        let log = db.into_transaction_log();
        assert!(
            !log.iter().any(|t| format!("{t:?}").contains("INSERT")),
            "update path must not insert a duplicate"
        );
    }

    #[tokio::test]
    async fn revoking_never_enabled_feature_is_a_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entitlement::Model>::new()])
            .into_connection();

        let result = revoke_entitlement(&db, 10, 101).await.unwrap();
        assert!(result.is_none());

        let log = db.into_transaction_log();
        assert!(
            !log.iter()
                .any(|t| format!("{t:?}").contains("INSERT") || format!("{t:?}").contains("UPDATE")),
            "no write may happen for a never-enabled feature"
        );
    }

    #[test]
    fn reconciliation_plan_follows_remote() {
        let local = vec!["a".to_string(), "b".to_string()];
        let remote = vec!["b".to_string(), "c".to_string()];
        let mut plan = plan_reconciliation(&local, &remote);
        plan.activated.sort();
        plan.revoked.sort();
        assert_eq!(plan.activated, vec!["c".to_string()]);
        assert_eq!(plan.revoked, vec!["a".to_string()]);
    }
}
