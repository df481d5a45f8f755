// src/handlers/cash.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        validation::{validate_not_negative, validate_positive},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermCashManage, PermCashOperate, RequirePermission},
        tenancy::TenantContext,
    },
    models::cash::{CashClosing, CashMovement, CashSession, CashSessionSummary},
    services::cash_service::ManualMovementKind,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCashPayload {
    // Troco inicial
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "100.00")]
    pub opening_float: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualMovementPayload {
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "50.00")]
    pub amount: Decimal,
    #[validate(length(max = 200, message = "Descrição com no máximo 200 caracteres."))]
    #[schema(example = "Troco do banco")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashPayload {
    // Valor contado na gaveta
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "1230.50")]
    pub counted_amount: Decimal,
    #[validate(length(max = 500, message = "Observação com no máximo 500 caracteres."))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    pub limit: Option<i64>,
}

// POST /api/cash/open
#[utoipa::path(
    post,
    path = "/api/cash/open",
    tag = "Cash",
    request_body = OpenCashPayload,
    responses(
        (status = 201, description = "Caixa aberto", body = CashSession),
        (status = 409, description = "Já existe um caixa aberto")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn open_cash(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
    Json(payload): Json<OpenCashPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let session = app_state
        .cash_service
        .open_session(&mut *rls_conn, tenant.0, payload.opening_float, user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(session)))
}

// GET /api/cash/current
// 200 com `null` quando não há caixa aberto: o PDV usa isso para decidir a tela.
#[utoipa::path(
    get,
    path = "/api/cash/current",
    tag = "Cash",
    responses(
        (status = 200, description = "Caixa aberto com totais parciais (ou null)", body = Option<CashSessionSummary>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn current_cash(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let current = app_state
        .cash_service
        .current_session(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(current))
}

async fn manual_movement(
    app_state: AppState,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    kind: ManualMovementKind,
    payload: ManualMovementPayload,
) -> Result<CashMovement, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .cash_service
        .add_movement(
            &mut *rls_conn,
            tenant.0,
            kind,
            payload.amount,
            payload.description.as_deref(),
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))
}

// POST /api/cash/supply
#[utoipa::path(
    post,
    path = "/api/cash/supply",
    tag = "Cash",
    request_body = ManualMovementPayload,
    responses(
        (status = 201, description = "Suprimento lançado", body = CashMovement),
        (status = 422, description = "Nenhum caixa aberto")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn supply(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
    Json(payload): Json<ManualMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let movement =
        manual_movement(app_state, locale, user, tenant, ManualMovementKind::Supply, payload).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

// POST /api/cash/withdrawal
#[utoipa::path(
    post,
    path = "/api/cash/withdrawal",
    tag = "Cash",
    request_body = ManualMovementPayload,
    responses(
        (status = 201, description = "Sangria lançada", body = CashMovement),
        (status = 422, description = "Nenhum caixa aberto ou sangria maior que o saldo em dinheiro")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn withdrawal(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
    Json(payload): Json<ManualMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let movement =
        manual_movement(app_state, locale, user, tenant, ManualMovementKind::Withdrawal, payload).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

// POST /api/cash/close
#[utoipa::path(
    post,
    path = "/api/cash/close",
    tag = "Cash",
    request_body = CloseCashPayload,
    responses(
        (status = 200, description = "Caixa fechado com conferência", body = CashClosing),
        (status = 422, description = "Nenhum caixa aberto")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_cash(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashOperate>,
    Json(payload): Json<CloseCashPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let closing = app_state
        .cash_service
        .close_session(
            &mut *rls_conn,
            tenant.0,
            payload.counted_amount,
            payload.notes.as_deref(),
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(closing))
}

// GET /api/cash/sessions?limit=
#[utoipa::path(
    get,
    path = "/api/cash/sessions",
    tag = "Cash",
    responses(
        (status = 200, description = "Histórico de caixas", body = Vec<CashSession>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("limit" = Option<i64>, Query, description = "Máximo de sessões (padrão 30)")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sessions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashManage>,
    Query(query): Query<SessionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sessions = app_state
        .cash_service
        .list_sessions(&mut *rls_conn, tenant.0, query.limit)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sessions))
}

// GET /api/cash/sessions/{id}/summary
#[utoipa::path(
    get,
    path = "/api/cash/sessions/{id}/summary",
    tag = "Cash",
    responses(
        (status = 200, description = "Totais da sessão", body = CashSessionSummary),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da sessão de caixa")
    ),
    security(("api_jwt" = []))
)]
pub async fn session_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashManage>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .cash_service
        .session_summary(&mut *rls_conn, tenant.0, session_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}

// GET /api/cash/sessions/{id}/movements
#[utoipa::path(
    get,
    path = "/api/cash/sessions/{id}/movements",
    tag = "Cash",
    responses(
        (status = 200, description = "Livro da sessão em ordem cronológica", body = Vec<CashMovement>),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da sessão de caixa")
    ),
    security(("api_jwt" = []))
)]
pub async fn session_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermCashManage>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let movements = app_state
        .cash_service
        .list_movements(&mut *rls_conn, tenant.0, session_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}
