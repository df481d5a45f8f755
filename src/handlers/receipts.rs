// src/handlers/receipts.rs
//
// Cupons não fiscais em HTML, prontos para a impressora térmica.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::{error::ApiError, db_utils::get_rls_connection},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermCashOperate, PermSalesWrite, PermServiceOrdersWrite, RequirePermission},
        tenancy::TenantContext,
    },
};

fn html(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
}

// GET /api/receipts/sales/{id}
#[utoipa::path(
    get,
    path = "/api/receipts/sales/{id}",
    tag = "Receipts",
    responses(
        (status = 200, description = "Cupom da venda", content_type = "text/html"),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da venda")
    ),
    security(("api_jwt" = []))
)]
pub async fn sale_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Path(sale_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = app_state.receipt_service
        .sale_receipt(&mut *rls_conn, tenant.0, sale_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(html(body))
}

// GET /api/receipts/service-orders/{id}
#[utoipa::path(
    get,
    path = "/api/receipts/service-orders/{id}",
    tag = "Receipts",
    responses(
        (status = 200, description = "Comprovante da OS", content_type = "text/html"),
        (status = 404, description = "OS não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn service_order_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = app_state.receipt_service
        .service_order_receipt(&mut *rls_conn, tenant.0, order_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(html(body))
}

// GET /api/receipts/cash-sessions/{id}
#[utoipa::path(
    get,
    path = "/api/receipts/cash-sessions/{id}",
    tag = "Receipts",
    responses(
        (status = 200, description = "Relatório de fechamento (parcial se o caixa estiver aberto)", content_type = "text/html"),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da sessão de caixa")
    ),
    security(("api_jwt" = []))
)]
pub async fn cash_closing_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = app_state.receipt_service
        .cash_closing_receipt(&mut *rls_conn, tenant.0, session_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(html(body))
}
