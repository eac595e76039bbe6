//! SeaORM entities, one module per table.

pub mod asset;
pub mod client;
pub mod entitlement;
pub mod feature;
pub mod incident;
pub mod invoice;
pub mod invoice_line_item;
pub mod monthly_rhythm;
pub mod plan;
pub mod subscription;
pub mod user;
