// src/handlers/documents.rs

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
        rbac::{PermServiceOrdersWrite, RequirePermission},
        tenancy::TenantContext,
    },
};

// GET /api/service-orders/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/service-orders/{id}/pdf",
    tag = "Documents",
    responses(
        (status = 200, description = "PDF da OS (com QR PIX quando há valor a receber)", content_type = "application/pdf"),
        (status = 404, description = "OS não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn service_order_pdf(
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

    let pdf_bytes = app_state.document_service
        .generate_service_order_pdf(&mut *rls_conn, tenant.0, order_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let disposition = format!("inline; filename=\"os_{}.pdf\"", order_id);
    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, disposition.as_str()),
    ];

    Ok((headers, pdf_bytes).into_response())
}
