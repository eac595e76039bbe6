use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db::entities::{invoice, invoice_line_item};
use crate::db::enums::InvoiceStatus;
use crate::services::pricing_service;

pub struct NewLineItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

/// Next sequential number given the latest existing one for the year.
/// `INV-2026-0012` -> `INV-2026-0013`; no prior invoice -> `INV-2026-0001`.
pub fn bump_invoice_number(latest: Option<&str>, year: i32) -> String {
    let next_seq = latest
        .and_then(|n| n.rsplit('-').next())
        .and_then(|seq| seq.parse::<u32>().ok())
        .map(|seq| seq + 1)
        .unwrap_or(1);
    format!("INV-{year}-{next_seq:04}")
}

async fn next_invoice_number<C: ConnectionTrait>(conn: &C, year: i32) -> Result<String, DbErr> {
    let prefix = format!("INV-{year}-");
    let latest = invoice::Entity::find()
        .filter(invoice::Column::Number.starts_with(&prefix))
        .order_by_desc(invoice::Column::Number)
        .one(conn)
        .await?;
    Ok(bump_invoice_number(latest.as_ref().map(|i| i.number.as_str()), year))
}

/// Creates a draft invoice plus its line items in one transaction. Subtotal,
/// tax and total are computed here and never taken from the caller.
pub async fn create_invoice(
    db: &DatabaseConnection,
    client_id: i32,
    currency: &str,
    tax_rate_percent: f64,
    items: Vec<NewLineItem>,
) -> Result<(invoice::Model, Vec<invoice_line_item::Model>), DbErr> {
    let txn = db.begin().await?;
    let now = Utc::now();

    let amounts: Vec<i64> = items
        .iter()
        .map(|i| i64::from(i.quantity) * i.unit_price_minor)
        .collect();
    let (subtotal, tax, total) = pricing_service::invoice_totals(&amounts, tax_rate_percent);

    let number = next_invoice_number(&txn, now.year()).await?;

    let created = invoice::ActiveModel {
        client_id: Set(client_id),
        number: Set(number),
        status: Set(InvoiceStatus::Draft),
        currency: Set(currency.to_string()),
        subtotal_minor: Set(subtotal),
        tax_rate_percent: Set(tax_rate_percent),
        tax_minor: Set(tax),
        total_minor: Set(total),
        issued_at: Set(None),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut line_items = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let amount = i64::from(item.quantity) * item.unit_price_minor;
        let saved = invoice_line_item::ActiveModel {
            invoice_id: Set(created.id),
            description: Set(item.description),
            quantity: Set(item.quantity),
            unit_price_minor: Set(item.unit_price_minor),
            amount_minor: Set(amount),
            sort_order: Set(index as i32),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        line_items.push(saved);
    }

    txn.commit().await?;
    Ok((created, line_items))
}

pub async fn list_invoices(
    db: &DatabaseConnection,
    client_id: Option<i32>,
) -> Result<Vec<invoice::Model>, DbErr> {
    let mut query = invoice::Entity::find().order_by_desc(invoice::Column::Number);
    if let Some(client_id) = client_id {
        query = query.filter(invoice::Column::ClientId.eq(client_id));
    }
    query.all(db).await
}

pub async fn get_invoice_with_items(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<(invoice::Model, Vec<invoice_line_item::Model>)>, DbErr> {
    let Some(inv) = invoice::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let items = invoice_line_item::Entity::find()
        .filter(invoice_line_item::Column::InvoiceId.eq(id))
        .order_by_asc(invoice_line_item::Column::SortOrder)
        .all(db)
        .await?;
    Ok(Some((inv, items)))
}

/// Draft -> Issued | Void; Issued -> Paid | Void. Everything else is
/// rejected.
pub fn allowed_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    matches!(
        (from, to),
        (InvoiceStatus::Draft, InvoiceStatus::Issued)
            | (InvoiceStatus::Draft, InvoiceStatus::Void)
            | (InvoiceStatus::Issued, InvoiceStatus::Paid)
            | (InvoiceStatus::Issued, InvoiceStatus::Void)
    )
}

pub enum InvoiceTransition {
    NotFound,
    Invalid { from: InvoiceStatus },
    Updated(invoice::Model),
}

pub async fn transition_invoice(
    db: &DatabaseConnection,
    id: i32,
    to: InvoiceStatus,
) -> Result<InvoiceTransition, DbErr> {
    let Some(existing) = invoice::Entity::find_by_id(id).one(db).await? else {
        return Ok(InvoiceTransition::NotFound);
    };
    if !allowed_transition(existing.status, to) {
        return Ok(InvoiceTransition::Invalid {
            from: existing.status,
        });
    }

    let now = Utc::now();
    let mut active = existing.into_active_model();
    match to {
        InvoiceStatus::Issued => active.issued_at = Set(Some(now)),
        InvoiceStatus::Paid => active.paid_at = Set(Some(now)),
        _ => {}
    }
    active.status = Set(to);
    active.updated_at = Set(now);
    active.update(db).await.map(InvoiceTransition::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_sequence() {
        assert_eq!(bump_invoice_number(None, 2026), "INV-2026-0001");
        assert_eq!(
            bump_invoice_number(Some("INV-2026-0012"), 2026),
            "INV-2026-0013"
        );
        assert_eq!(
            bump_invoice_number(Some("INV-2026-9999"), 2026),
            "INV-2026-10000"
        );
    }

    #[test]
    fn transition_matrix() {
        use InvoiceStatus::*;
        assert!(allowed_transition(Draft, Issued));
        assert!(allowed_transition(Draft, Void));
        assert!(allowed_transition(Issued, Paid));
        assert!(allowed_transition(Issued, Void));
        assert!(!allowed_transition(Paid, Void));
        assert!(!allowed_transition(Void, Issued));
        assert!(!allowed_transition(Draft, Paid));
    }

    #[test]
    fn totals_are_subtotal_plus_tax() {
        let amounts = [30000_i64, 4500];
        let (subtotal, tax, total) = pricing_service::invoice_totals(&amounts, 8.25);
        assert_eq!(subtotal, 34500);
        // 8.25% of $345.00 = $28.46625 -> 2847 cents
        assert_eq!(tax, 2847);
        assert_eq!(total, subtotal + tax);
    }
}
