pub mod auth;
pub mod billing;
pub mod cash;
pub mod dashboard;
pub mod inventory;
pub mod sales;
pub mod service_orders;
pub mod settings;
pub mod tenancy;
