//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::{admin_guard, auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    let listener = TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (só token)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/companies", get(handlers::auth::get_my_companies))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let tenancy_routes = Router::new()
        .route("/"
               ,post(handlers::tenancy::create_tenant)
               .get(handlers::tenancy::list_my_tenants)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let billing_user_routes = Router::new()
        .route("/plans", get(handlers::billing::list_plans))
        .route("/coupons/validate", post(handlers::billing::validate_coupon))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Tudo que opera dentro de uma loja passa pelo tenant_guard
    let store_routes = Router::new()
        .route("/members"
               ,post(handlers::tenancy::add_member)
               .get(handlers::tenancy::list_members)
        )
        .route("/settings"
               ,get(handlers::settings::get_settings)
               .put(handlers::settings::update_settings)
        )
        // Estoque
        .route("/inventory/products"
               ,post(handlers::inventory::create_product)
               .get(handlers::inventory::list_products)
        )
        .route("/inventory/products/{id}"
               ,get(handlers::inventory::get_product)
               .patch(handlers::inventory::update_product)
        )
        .route("/inventory/movements"
               ,post(handlers::inventory::register_movement)
               .get(handlers::inventory::list_movements)
        )
        // Caixa
        .route("/cash/open", post(handlers::cash::open_cash))
        .route("/cash/current", get(handlers::cash::current_cash))
        .route("/cash/supply", post(handlers::cash::supply))
        .route("/cash/withdrawal", post(handlers::cash::withdrawal))
        .route("/cash/close", post(handlers::cash::close_cash))
        .route("/cash/sessions", get(handlers::cash::list_sessions))
        .route("/cash/sessions/{id}/summary", get(handlers::cash::session_summary))
        .route("/cash/sessions/{id}/movements", get(handlers::cash::session_movements))
        // Vendas
        .route("/sales"
               ,post(handlers::sales::checkout)
               .get(handlers::sales::list_sales)
        )
        .route("/sales/{id}", get(handlers::sales::get_sale))
        .route("/sales/{id}/cancel", post(handlers::sales::cancel_sale))
        // Ordens de serviço
        .route("/service-orders"
               ,post(handlers::service_orders::create_order)
               .get(handlers::service_orders::list_orders)
        )
        .route("/service-orders/{id}", get(handlers::service_orders::get_order))
        .route("/service-orders/{id}/items", post(handlers::service_orders::add_item))
        .route("/service-orders/{id}/status", patch(handlers::service_orders::update_status))
        .route("/service-orders/{id}/deliver", post(handlers::service_orders::deliver_order))
        .route("/service-orders/{id}/pdf", get(handlers::documents::service_order_pdf))
        // Impressão
        .route("/receipts/sales/{id}", get(handlers::receipts::sale_receipt))
        .route("/receipts/service-orders/{id}", get(handlers::receipts::service_order_receipt))
        .route("/receipts/cash-sessions/{id}", get(handlers::receipts::cash_closing_receipt))
        // Relatórios
        .route("/dashboard/summary", get(handlers::dashboard::get_summary))
        .route("/dashboard/revenue-chart", get(handlers::dashboard::get_revenue_chart))
        .route("/dashboard/top-products", get(handlers::dashboard::get_top_products))
        .route("/exports/products", get(handlers::exports::export_products))
        .route("/exports/sales", get(handlers::exports::export_sales))
        .route("/exports/stock-movements", get(handlers::exports::export_stock_movements))
        .route("/exports/cash-sessions/{id}/movements", get(handlers::exports::export_cash_movements))
        // Assinatura da loja
        .route("/billing/subscription"
               ,post(handlers::billing::subscribe)
               .get(handlers::billing::get_subscription)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let admin_routes = Router::new()
        .route("/plans"
               ,post(handlers::billing::create_plan)
               .get(handlers::billing::list_all_plans)
        )
        .route("/plans/{id}"
               ,put(handlers::billing::update_plan)
               .delete(handlers::billing::deactivate_plan)
        )
        .route("/coupons"
               ,post(handlers::billing::create_coupon)
               .get(handlers::billing::list_coupons)
        )
        .route("/coupons/{id}"
               ,put(handlers::billing::update_coupon)
               .delete(handlers::billing::deactivate_coupon)
        )
        .route("/metrics", get(handlers::billing::metrics))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api/billing", billing_user_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", store_routes)
        .with_state(app_state)
}
