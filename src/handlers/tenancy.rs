// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid; // usado nos params do Swagger
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermMembersWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::tenancy::{MemberRole, Tenant, TenantMember},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    #[schema(example = "Assistência Técnica Central")]
    pub name: String,

    #[validate(length(max = 18, message = "Documento com no máximo 18 caracteres."))]
    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "tecnico@loja.com")]
    pub email: String,
    pub role: MemberRole,
}

// POST /api/tenants
// O criador vira OWNER da nova empresa.
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Empresa criada", body = Tenant),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new_tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.name, payload.document_number.as_deref(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(new_tenant)))
}

// GET /api/tenants
#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Empresas do usuário", body = Vec<Tenant>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_tenants(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = app_state
        .tenant_service
        .list_user_tenants(user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenants))
}

// POST /api/members
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Tenancy",
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro adicionado", body = TenantMember),
        (status = 404, description = "Usuário não cadastrado"),
        (status = 409, description = "Usuário já é membro")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermMembersWrite>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .tenant_service
        .add_member_by_email(&mut *rls_conn, tenant.0, &payload.email, payload.role)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(member)))
}

// GET /api/members
#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Membros da empresa", body = Vec<TenantMember>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let members = app_state
        .tenant_service
        .list_members(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(members))
}
