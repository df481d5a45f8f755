// src/handlers/dashboard.rs

use axum::{extract::State, response::IntoResponse, Json};
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermReportsRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::dashboard::{DashboardSummary, RevenueChartEntry, TopProductEntry},
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Vendas de hoje, OS pendentes, estoque baixo e saldo do caixa aberto", body = DashboardSummary),
        (status = 403, description = "Sem permissão de relatórios")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .dashboard_service
        .get_summary(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}

// GET /api/dashboard/revenue-chart
#[utoipa::path(
    get,
    path = "/api/dashboard/revenue-chart",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Um ponto por dia nos últimos 30 dias (vendas e OS entregues)", body = Vec<RevenueChartEntry>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_revenue_chart(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let chart = app_state
        .dashboard_service
        .get_revenue_chart(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(chart))
}

// GET /api/dashboard/top-products
#[utoipa::path(
    get,
    path = "/api/dashboard/top-products",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Cinco produtos de maior faturamento nos últimos 30 dias", body = Vec<TopProductEntry>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_top_products(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ranking = app_state
        .dashboard_service
        .get_top_products(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ranking))
}
