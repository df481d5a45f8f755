// src/handlers/billing.rs
//
// Planos e cupons são da plataforma (sem tenant). As rotas /api/admin passam
// pelo admin_guard; as demais são da loja que assina.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_negative, validate_positive},
    },
    config::AppState,
    db::billing_repo::{CouponInput, PlanInput},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermBillingWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::billing::{AdminMetrics, Coupon, CouponValidation, DiscountKind, Plan, Subscription},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanPayload {
    #[validate(length(min = 1, message = "O nome do plano é obrigatório."))]
    #[schema(example = "Profissional")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "89.90")]
    pub monthly_price: Decimal,
    #[validate(range(min = 1, message = "O plano precisa de pelo menos 1 usuário."))]
    pub max_users: Option<i32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl PlanPayload {
    fn as_input(&self) -> PlanInput<'_> {
        PlanInput {
            name: self.name.trim(),
            description: self.description.as_deref(),
            monthly_price: self.monthly_price,
            max_users: self.max_users,
            active: self.active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_coupon_discount"))]
pub struct CouponPayload {
    #[validate(length(min = 3, max = 40, message = "O código deve ter de 3 a 40 caracteres."))]
    #[schema(example = "BEMVINDO20")]
    pub code: String,
    pub discount_kind: DiscountKind,
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "20")]
    pub discount_value: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "O limite de usos deve ser positivo."))]
    pub max_uses: Option<i32>,
    pub plan_id: Option<Uuid>,
}

impl CouponPayload {
    fn as_input(&self) -> CouponInput<'_> {
        CouponInput {
            code: self.code.trim(),
            discount_kind: self.discount_kind,
            discount_value: self.discount_value,
            active: self.active,
            expires_at: self.expires_at,
            max_uses: self.max_uses,
            plan_id: self.plan_id,
        }
    }
}

fn validate_coupon_discount(payload: &CouponPayload) -> Result<(), validator::ValidationError> {
    if payload.discount_kind == DiscountKind::Percent && payload.discount_value > Decimal::ONE_HUNDRED {
        let mut err = validator::ValidationError::new("range");
        err.message = Some("Desconto percentual não pode passar de 100%.".into());
        return Err(err);
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponPayload {
    #[validate(length(min = 1, message = "Informe o código do cupom."))]
    pub code: String,
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub plan_id: Uuid,
    pub coupon_code: Option<String>,
}

// ---
// Admin
// ---

// POST /api/admin/plans
#[utoipa::path(
    post,
    path = "/api/admin/plans",
    tag = "Admin",
    request_body = PlanPayload,
    responses(
        (status = 201, description = "Plano criado", body = Plan),
        (status = 403, description = "Apenas super admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let plan = app_state.billing_service
        .create_plan(&payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(plan)))
}

// GET /api/admin/plans
#[utoipa::path(
    get,
    path = "/api/admin/plans",
    tag = "Admin",
    responses(
        (status = 200, description = "Todos os planos, inclusive inativos", body = Vec<Plan>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_all_plans(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let plans = app_state.billing_service
        .list_plans(false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(plans))
}

// PUT /api/admin/plans/{id}
#[utoipa::path(
    put,
    path = "/api/admin/plans/{id}",
    tag = "Admin",
    request_body = PlanPayload,
    responses(
        (status = 200, description = "Plano atualizado", body = Plan),
        (status = 404, description = "Plano não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do plano")),
    security(("api_jwt" = []))
)]
pub async fn update_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(plan_id): Path<Uuid>,
    Json(payload): Json<PlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let plan = app_state.billing_service
        .update_plan(plan_id, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(plan))
}

// DELETE /api/admin/plans/{id}
// Só desativa: assinaturas existentes continuam apontando para o plano.
#[utoipa::path(
    delete,
    path = "/api/admin/plans/{id}",
    tag = "Admin",
    responses(
        (status = 204, description = "Plano desativado"),
        (status = 404, description = "Plano não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do plano")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.billing_service
        .deactivate_plan(plan_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/admin/coupons
#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    tag = "Admin",
    request_body = CouponPayload,
    responses(
        (status = 201, description = "Cupom criado", body = Coupon),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let coupon = app_state.billing_service
        .create_coupon(&payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

// GET /api/admin/coupons
#[utoipa::path(
    get,
    path = "/api/admin/coupons",
    tag = "Admin",
    responses(
        (status = 200, description = "Cupons cadastrados", body = Vec<Coupon>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_coupons(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = app_state.billing_service
        .list_coupons()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupons))
}

// PUT /api/admin/coupons/{id}
#[utoipa::path(
    put,
    path = "/api/admin/coupons/{id}",
    tag = "Admin",
    request_body = CouponPayload,
    responses(
        (status = 200, description = "Cupom atualizado", body = Coupon),
        (status = 404, description = "Cupom não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do cupom")),
    security(("api_jwt" = []))
)]
pub async fn update_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(coupon_id): Path<Uuid>,
    Json(payload): Json<CouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let coupon = app_state.billing_service
        .update_coupon(coupon_id, &payload.as_input())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(coupon))
}

// DELETE /api/admin/coupons/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/coupons/{id}",
    tag = "Admin",
    responses(
        (status = 204, description = "Cupom desativado"),
        (status = 404, description = "Cupom não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do cupom")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(coupon_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.billing_service
        .deactivate_coupon(coupon_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/metrics
#[utoipa::path(
    get,
    path = "/api/admin/metrics",
    tag = "Admin",
    responses(
        (status = 200, description = "Indicadores da plataforma", body = AdminMetrics)
    ),
    security(("api_jwt" = []))
)]
pub async fn metrics(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let metrics = app_state.billing_service
        .metrics()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(metrics))
}

// ---
// Loja
// ---

// GET /api/billing/plans
#[utoipa::path(
    get,
    path = "/api/billing/plans",
    tag = "Billing",
    responses(
        (status = 200, description = "Planos disponíveis para assinatura", body = Vec<Plan>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_plans(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let plans = app_state.billing_service
        .list_plans(true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(plans))
}

// POST /api/billing/coupons/validate
#[utoipa::path(
    post,
    path = "/api/billing/coupons/validate",
    tag = "Billing",
    request_body = ValidateCouponPayload,
    responses(
        (status = 200, description = "Resultado da validação (valid=false traz o motivo)", body = CouponValidation),
        (status = 404, description = "Plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_coupon(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<ValidateCouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let validation = app_state.billing_service
        .validate_coupon(payload.code.trim(), payload.plan_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(validation))
}

// POST /api/billing/subscription
#[utoipa::path(
    post,
    path = "/api/billing/subscription",
    tag = "Billing",
    request_body = SubscribePayload,
    responses(
        (status = 201, description = "Assinatura ativada", body = Subscription),
        (status = 422, description = "Plano inativo ou cupom inválido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscribe(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<SubscribePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = app_state.billing_service
        .subscribe(tenant.0, payload.plan_id, payload.coupon_code.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

// GET /api/billing/subscription
#[utoipa::path(
    get,
    path = "/api/billing/subscription",
    tag = "Billing",
    responses(
        (status = 200, description = "Assinatura da loja", body = Subscription),
        (status = 404, description = "Loja sem assinatura")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = app_state.billing_service
        .get_subscription(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(subscription))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percent_coupon_over_100_is_rejected() {
        let payload: CouponPayload = serde_json::from_value(json!({
            "code": "METADE",
            "discountKind": "PERCENT",
            "discountValue": 150
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn fixed_coupon_above_100_is_fine_and_active_by_default() {
        let payload: CouponPayload = serde_json::from_value(json!({
            "code": "DESC150",
            "discountKind": "FIXED",
            "discountValue": 150
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert!(payload.active);
        assert_eq!(payload.as_input().code, "DESC150");
    }
}
