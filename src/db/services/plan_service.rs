use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::plan;

pub struct NewPlan {
    pub name: String,
    pub price: String,
    pub included_hours: i32,
    pub blurb: Option<String>,
    pub sort_order: i32,
}

#[derive(Default)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub price: Option<String>,
    pub included_hours: Option<i32>,
    pub blurb: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn list_plans(
    db: &DatabaseConnection,
    only_active: bool,
) -> Result<Vec<plan::Model>, DbErr> {
    let mut query = plan::Entity::find().order_by_asc(plan::Column::SortOrder);
    if only_active {
        query = query.filter(plan::Column::IsActive.eq(true));
    }
    query.all(db).await
}

pub async fn get_plan(db: &DatabaseConnection, id: i32) -> Result<Option<plan::Model>, DbErr> {
    plan::Entity::find_by_id(id).one(db).await
}

pub async fn create_plan(db: &DatabaseConnection, new: NewPlan) -> Result<plan::Model, DbErr> {
    let now = Utc::now();
    plan::ActiveModel {
        name: Set(new.name),
        price: Set(new.price),
        included_hours: Set(new.included_hours),
        blurb: Set(new.blurb),
        sort_order: Set(new.sort_order),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_plan(
    db: &DatabaseConnection,
    id: i32,
    update: UpdatePlan,
) -> Result<Option<plan::Model>, DbErr> {
    let Some(existing) = plan::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    if let Some(price) = update.price {
        active.price = Set(price);
    }
    if let Some(included_hours) = update.included_hours {
        active.included_hours = Set(included_hours);
    }
    if let Some(blurb) = update.blurb {
        active.blurb = Set(Some(blurb));
    }
    if let Some(sort_order) = update.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

pub async fn delete_plan(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    let result = plan::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}
