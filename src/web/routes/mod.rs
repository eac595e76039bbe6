pub mod asset_routes;
pub mod billing_routes;
pub mod bot_routes;
pub mod client_routes;
pub mod entitlement_routes;
pub mod feature_routes;
pub mod incident_routes;
pub mod invoice_routes;
pub mod plan_routes;
