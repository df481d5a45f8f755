pub mod auth;
pub mod billing_service;
pub mod cash_service;
pub mod dashboard_service;
pub mod document_service;
pub mod export_service;
pub mod inventory_service;
pub mod receipt_service;
pub mod sales_service;
pub mod service_order_service;
pub mod tenancy_service;
