use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::feature;
use crate::db::enums::AssetKind;

pub struct NewFeature {
    pub key: String,
    pub config_key: String,
    pub name: String,
    pub description: Option<String>,
    pub asset_kind: AssetKind,
    pub price: Option<String>,
}

#[derive(Default)]
pub struct UpdateFeature {
    pub config_key: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_features(
    db: &DatabaseConnection,
    asset_kind: Option<AssetKind>,
    only_active: bool,
) -> Result<Vec<feature::Model>, DbErr> {
    let mut query = feature::Entity::find().order_by_asc(feature::Column::Key);
    if let Some(kind) = asset_kind {
        query = query.filter(feature::Column::AssetKind.eq(kind));
    }
    if only_active {
        query = query.filter(feature::Column::IsActive.eq(true));
    }
    query.all(db).await
}

pub async fn get_feature(db: &DatabaseConnection, id: i32) -> Result<Option<feature::Model>, DbErr> {
    feature::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_key(
    db: &DatabaseConnection,
    key: &str,
) -> Result<Option<feature::Model>, DbErr> {
    feature::Entity::find()
        .filter(feature::Column::Key.eq(key))
        .one(db)
        .await
}

pub async fn find_by_config_key(
    db: &DatabaseConnection,
    config_key: &str,
) -> Result<Option<feature::Model>, DbErr> {
    feature::Entity::find()
        .filter(feature::Column::ConfigKey.eq(config_key))
        .one(db)
        .await
}

pub async fn create_feature(
    db: &DatabaseConnection,
    new: NewFeature,
) -> Result<feature::Model, DbErr> {
    let now = Utc::now();
    feature::ActiveModel {
        key: Set(new.key),
        config_key: Set(new.config_key),
        name: Set(new.name),
        description: Set(new.description),
        asset_kind: Set(new.asset_kind),
        price: Set(new.price),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_feature(
    db: &DatabaseConnection,
    id: i32,
    update: UpdateFeature,
) -> Result<Option<feature::Model>, DbErr> {
    let Some(existing) = feature::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    if let Some(config_key) = update.config_key {
        active.config_key = Set(config_key);
    }
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = update.price {
        active.price = Set(Some(price));
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

pub async fn delete_feature(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    let result = feature::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}
