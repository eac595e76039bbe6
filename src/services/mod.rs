pub mod auth_service;
pub mod encryption_service;
pub mod pricing_service;
