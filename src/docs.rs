// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::middleware;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_companies,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,
        handlers::tenancy::add_member,
        handlers::tenancy::list_members,

        // --- RBAC ---
        handlers::rbac::list_permissions,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- INVENTORY ---
        handlers::inventory::create_product,
        handlers::inventory::list_products,
        handlers::inventory::get_product,
        handlers::inventory::update_product,
        handlers::inventory::register_movement,
        handlers::inventory::list_movements,

        // --- CASH ---
        handlers::cash::open_cash,
        handlers::cash::current_cash,
        handlers::cash::supply,
        handlers::cash::withdrawal,
        handlers::cash::close_cash,
        handlers::cash::list_sessions,
        handlers::cash::session_summary,
        handlers::cash::session_movements,

        // --- SALES ---
        handlers::sales::checkout,
        handlers::sales::cancel_sale,
        handlers::sales::get_sale,
        handlers::sales::list_sales,

        // --- SERVICE ORDERS ---
        handlers::service_orders::create_order,
        handlers::service_orders::add_item,
        handlers::service_orders::update_status,
        handlers::service_orders::deliver_order,
        handlers::service_orders::get_order,
        handlers::service_orders::list_orders,

        // --- Documentos / Impressão ---
        handlers::documents::service_order_pdf,
        handlers::receipts::sale_receipt,
        handlers::receipts::service_order_receipt,
        handlers::receipts::cash_closing_receipt,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_revenue_chart,
        handlers::dashboard::get_top_products,

        // --- Exports ---
        handlers::exports::export_products,
        handlers::exports::export_sales,
        handlers::exports::export_stock_movements,
        handlers::exports::export_cash_movements,

        // --- Billing ---
        handlers::billing::list_plans,
        handlers::billing::validate_coupon,
        handlers::billing::subscribe,
        handlers::billing::get_subscription,

        // --- Admin ---
        handlers::billing::create_plan,
        handlers::billing::list_all_plans,
        handlers::billing::update_plan,
        handlers::billing::deactivate_plan,
        handlers::billing::create_coupon,
        handlers::billing::list_coupons,
        handlers::billing::update_coupon,
        handlers::billing::deactivate_coupon,
        handlers::billing::metrics,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::UserCompany,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- TENANCY ---
            models::tenancy::Tenant,
            models::tenancy::MemberRole,
            models::tenancy::TenantMember,
            handlers::tenancy::CreateTenantPayload,
            handlers::tenancy::AddMemberPayload,
            middleware::rbac::PermissionInfo,

            // --- Settings ---
            models::settings::PaperWidth,
            models::settings::TenantSettings,
            models::settings::UpdateSettingsRequest,

            // --- Inventory ---
            models::inventory::Product,
            models::inventory::StockMovementKind,
            models::inventory::StockMovement,
            handlers::inventory::CreateProductPayload,
            handlers::inventory::UpdateProductPayload,
            handlers::inventory::RegisterMovementPayload,

            // --- Cash ---
            models::cash::CashSessionStatus,
            models::cash::CashMovementCategory,
            models::cash::PaymentMethod,
            models::cash::CashSession,
            models::cash::CashMovement,
            models::cash::CashTotals,
            models::cash::VarianceStatus,
            models::cash::Reconciliation,
            models::cash::PaymentMethodTotal,
            models::cash::CashSessionSummary,
            models::cash::CashClosing,
            handlers::cash::OpenCashPayload,
            handlers::cash::ManualMovementPayload,
            handlers::cash::CloseCashPayload,

            // --- Sales ---
            models::sales::SaleStatus,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleDetail,
            handlers::sales::CheckoutItemPayload,
            handlers::sales::CheckoutPayload,

            // --- Service orders ---
            models::service_orders::ServiceOrderStatus,
            models::service_orders::ServiceOrder,
            models::service_orders::ServiceOrderItem,
            models::service_orders::ServiceOrderDetail,
            handlers::service_orders::CreateServiceOrderPayload,
            handlers::service_orders::AddOrderItemPayload,
            handlers::service_orders::UpdateStatusPayload,
            handlers::service_orders::DeliverOrderPayload,

            // --- DASHBOARD ---
            models::dashboard::DashboardSummary,
            models::dashboard::RevenueChartEntry,
            models::dashboard::TopProductEntry,

            // --- Billing ---
            models::billing::DiscountKind,
            models::billing::SubscriptionStatus,
            models::billing::Plan,
            models::billing::Coupon,
            models::billing::CouponRejection,
            models::billing::CouponValidation,
            models::billing::Subscription,
            models::billing::AdminMetrics,
            handlers::billing::PlanPayload,
            handlers::billing::CouponPayload,
            handlers::billing::ValidateCouponPayload,
            handlers::billing::SubscribePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Tenancy", description = "Gestão de Lojas e Membros"),
        (name = "RBAC", description = "Catálogo de Permissões"),
        (name = "Settings", description = "Configurações da Loja e da Impressão"),
        (name = "Inventory", description = "Produtos e Livro de Estoque"),
        (name = "Cash", description = "Sessões de Caixa, Suprimento, Sangria e Fechamento"),
        (name = "Sales", description = "Vendas no Balcão (PDV)"),
        (name = "Service Orders", description = "Ordens de Serviço da Assistência"),
        (name = "Documents", description = "PDF da Ordem de Serviço"),
        (name = "Receipts", description = "Cupons Não Fiscais (HTML)"),
        (name = "Dashboard", description = "Indicadores e Gráficos Gerenciais"),
        (name = "Exports", description = "Exportação CSV"),
        (name = "Billing", description = "Planos e Assinatura da Loja"),
        (name = "Admin", description = "Administração da Plataforma")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_cash_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/cash/close"));
        assert!(paths.contains_key("/api/sales/{id}/cancel"));
        assert!(paths.contains_key("/api/service-orders/{id}/deliver"));
    }
}
