pub mod user_repo;
pub use user_repo::UserRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod cash_repo;
pub use cash_repo::CashRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod service_order_repo;
pub use service_order_repo::ServiceOrderRepository;
pub mod billing_repo;
pub use billing_repo::BillingRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
