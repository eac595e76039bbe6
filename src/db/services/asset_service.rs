use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::asset;
use crate::db::enums::AssetKind;

pub struct NewAsset {
    pub client_id: i32,
    pub name: String,
    pub kind: AssetKind,
    pub external_ref: Option<String>,
}

#[derive(Default)]
pub struct UpdateAsset {
    pub name: Option<String>,
    pub external_ref: Option<String>,
}

pub async fn list_assets(
    db: &DatabaseConnection,
    client_id: Option<i32>,
) -> Result<Vec<asset::Model>, DbErr> {
    let mut query = asset::Entity::find().order_by_asc(asset::Column::Name);
    if let Some(client_id) = client_id {
        query = query.filter(asset::Column::ClientId.eq(client_id));
    }
    query.all(db).await
}

pub async fn get_asset(db: &DatabaseConnection, id: i32) -> Result<Option<asset::Model>, DbErr> {
    asset::Entity::find_by_id(id).one(db).await
}

pub async fn create_asset(db: &DatabaseConnection, new: NewAsset) -> Result<asset::Model, DbErr> {
    let now = Utc::now();
    asset::ActiveModel {
        client_id: Set(new.client_id),
        name: Set(new.name),
        kind: Set(new.kind),
        external_ref: Set(new.external_ref),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_asset(
    db: &DatabaseConnection,
    id: i32,
    update: UpdateAsset,
) -> Result<Option<asset::Model>, DbErr> {
    let Some(existing) = asset::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    if let Some(external_ref) = update.external_ref {
        active.external_ref = Set(Some(external_ref));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

pub async fn delete_asset(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    let result = asset::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}
