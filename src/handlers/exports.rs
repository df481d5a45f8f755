// src/handlers/exports.rs

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermCashManage, PermReportsRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::{inventory::StockMovementFilter, sales::SaleFilter},
};

/// Anexo CSV com o nome de arquivo datado.
fn csv_attachment(name: &str, bytes: Vec<u8>) -> Response {
    let filename = format!(
        "attachment; filename=\"{}_{}.csv\"",
        name,
        chrono::Utc::now().format("%Y%m%d")
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        bytes,
    )
        .into_response()
}

// GET /api/exports/products
#[utoipa::path(
    get,
    path = "/api/exports/products",
    tag = "Exports",
    responses(
        (status = 200, description = "Produtos em CSV (;)", content_type = "text/csv")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_products(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state.export_service
        .products_csv(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(csv_attachment("produtos", bytes))
}

// GET /api/exports/sales?sessionId=&status=&from=&to=
#[utoipa::path(
    get,
    path = "/api/exports/sales",
    tag = "Exports",
    responses(
        (status = 200, description = "Vendas em CSV (;)", content_type = "text/csv")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("sessionId" = Option<Uuid>, Query, description = "Filtra por sessão de caixa"),
        ("from" = Option<String>, Query, description = "Data inicial (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Data final (RFC 3339)")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
    Query(filter): Query<SaleFilter>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state.export_service
        .sales_csv(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(csv_attachment("vendas", bytes))
}

// GET /api/exports/stock-movements?productId=&kind=&from=&to=
#[utoipa::path(
    get,
    path = "/api/exports/stock-movements",
    tag = "Exports",
    responses(
        (status = 200, description = "Movimentações de estoque em CSV (;)", content_type = "text/csv")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("productId" = Option<Uuid>, Query, description = "Filtra por produto"),
        ("from" = Option<String>, Query, description = "Data inicial (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Data final (RFC 3339)")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_stock_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
    Query(filter): Query<StockMovementFilter>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state.export_service
        .stock_movements_csv(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(csv_attachment("movimentacoes_estoque", bytes))
}

// GET /api/exports/cash-sessions/{id}/movements
#[utoipa::path(
    get,
    path = "/api/exports/cash-sessions/{id}/movements",
    tag = "Exports",
    responses(
        (status = 200, description = "Livro do caixa em CSV (;)", content_type = "text/csv"),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da sessão de caixa")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_cash_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashManage>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state.export_service
        .cash_movements_csv(&mut *rls_conn, tenant.0, session_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(csv_attachment("caixa", bytes))
}
