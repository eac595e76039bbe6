use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::client;
use crate::db::enums::ClientStatus;

pub struct NewClient {
    pub name: String,
    pub slug: String,
    pub contact_email: Option<String>,
    pub plan_id: Option<i32>,
}

#[derive(Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub status: Option<ClientStatus>,
    pub plan_id: Option<i32>,
}

pub async fn list_clients(db: &DatabaseConnection) -> Result<Vec<client::Model>, DbErr> {
    client::Entity::find()
        .order_by_asc(client::Column::Name)
        .all(db)
        .await
}

pub async fn get_client(db: &DatabaseConnection, id: i32) -> Result<Option<client::Model>, DbErr> {
    client::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<client::Model>, DbErr> {
    client::Entity::find()
        .filter(client::Column::Slug.eq(slug))
        .one(db)
        .await
}

pub async fn find_by_contact_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<client::Model>, DbErr> {
    client::Entity::find()
        .filter(client::Column::ContactEmail.eq(email))
        .one(db)
        .await
}

pub async fn create_client(
    db: &DatabaseConnection,
    new: NewClient,
) -> Result<client::Model, DbErr> {
    let now = Utc::now();
    client::ActiveModel {
        name: Set(new.name),
        slug: Set(new.slug),
        status: Set(ClientStatus::Lead),
        plan_id: Set(new.plan_id),
        contact_email: Set(new.contact_email),
        bot_tenant_id: Set(None),
        bot_api_key_enc: Set(None),
        processor_customer_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_client(
    db: &DatabaseConnection,
    id: i32,
    update: UpdateClient,
) -> Result<Option<client::Model>, DbErr> {
    let Some(existing) = client::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    if let Some(name) = update.name {
        active.name = Set(name);
    }
    if let Some(contact_email) = update.contact_email {
        active.contact_email = Set(Some(contact_email));
    }
    if let Some(status) = update.status {
        active.status = Set(status);
    }
    if let Some(plan_id) = update.plan_id {
        active.plan_id = Set(Some(plan_id));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

pub async fn delete_client(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    let result = client::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}

/// Stores the provisioned bot tenant on the client. The API key must already
/// be encrypted by the caller.
pub async fn set_bot_tenant(
    db: &DatabaseConnection,
    id: i32,
    tenant_id: &str,
    api_key_enc: &str,
) -> Result<Option<client::Model>, DbErr> {
    let Some(existing) = client::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut active = existing.into_active_model();
    active.bot_tenant_id = Set(Some(tenant_id.to_string()));
    active.bot_api_key_enc = Set(Some(api_key_enc.to_string()));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

/// Records a successful plan purchase: plan reference, active status and,
/// when the event carried one, the processor's customer id. Called from the
/// billing webhook. A missing customer id stays unset; the portal route
/// treats it as "no billing history".
pub async fn activate_plan(
    db: &DatabaseConnection,
    id: i32,
    plan_id: i32,
    processor_customer_id: Option<&str>,
) -> Result<Option<client::Model>, DbErr> {
    let Some(existing) = client::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut active = existing.into_active_model();
    active.plan_id = Set(Some(plan_id));
    active.status = Set(ClientStatus::Active);
    if let Some(customer_id) = processor_customer_id {
        active.processor_customer_id = Set(Some(customer_id.to_string()));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn model(status: ClientStatus, plan_id: Option<i32>) -> client::Model {
        let now = Utc::now();
        client::Model {
            id: 1,
            name: "Acme Corp".to_string(),
            slug: "acme".to_string(),
            status,
            plan_id,
            contact_email: None,
            bot_tenant_id: None,
            bot_api_key_enc: None,
            processor_customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn plan_activation_without_customer_keeps_id_unset() {
        let existing = model(ClientStatus::Lead, None);
        let updated = model(ClientStatus::Active, Some(2));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .append_query_results([vec![updated]])
            .into_connection();

        let saved = activate_plan(&db, 1, 2, None).await.unwrap().unwrap();
        assert_eq!(saved.processor_customer_id, None);

        let log = db.into_transaction_log();
        assert!(
            !log.iter()
                .any(|t| format!("{t:?}").contains("processor_customer_id")),
            "the customer column must not be written without a customer id"
        );
    }
}
