//! High-level persistence API. Encapsulates all SeaORM query logic so the
//! HTTP handlers work with domain models without knowing the schema.

pub mod asset_service;
pub mod client_service;
pub mod entitlement_service;
pub mod feature_service;
pub mod incident_service;
pub mod invoice_service;
pub mod plan_service;
pub mod rhythm_service;
pub mod subscription_service;
