pub mod auth;
pub mod billing;
pub mod cash;
pub mod dashboard;
pub mod documents;
pub mod exports;
pub mod inventory;
pub mod rbac;
pub mod receipts;
pub mod sales;
pub mod service_orders;
pub mod settings;
pub mod tenancy;
