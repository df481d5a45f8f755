// src/handlers/service_orders.rs

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
    db::service_order_repo::NewServiceOrder,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermServiceOrdersWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::{
        cash::PaymentMethod,
        service_orders::{ServiceOrder, ServiceOrderDetail, ServiceOrderFilter, ServiceOrderStatus},
    },
    services::service_order_service::NewOrderItem,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceOrderPayload {
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    #[schema(example = "Maria Souza")]
    pub customer_name: String,
    #[schema(example = "(11) 99999-0000")]
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, message = "Informe o equipamento."))]
    #[schema(example = "iPhone 11 preto")]
    pub equipment: String,
    #[validate(length(min = 1, message = "Descreva o defeito relatado."))]
    #[schema(example = "Tela trincada")]
    pub reported_issue: String,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(example = "80.00")]
    pub labor_amount: Decimal,
    pub technician_id: Option<Uuid>,
}

/// Peça do estoque (`productId`) ou serviço avulso (`description`).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddOrderItemPayload {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Descrição com 1 a 200 caracteres."))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "1")]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: ServiceOrderStatus,
    // Laudo técnico, opcional em qualquer transição
    #[validate(length(max = 2000, message = "Diagnóstico com no máximo 2000 caracteres."))]
    pub diagnosis: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverOrderPayload {
    pub payment_method: PaymentMethod,
    // Substitui o desconto da OS, se informado
    #[validate(custom(function = "validate_not_negative"))]
    pub discount: Option<Decimal>,
}

// POST /api/service-orders
#[utoipa::path(
    post,
    path = "/api/service-orders",
    tag = "Service Orders",
    request_body = CreateServiceOrderPayload,
    responses(
        (status = 201, description = "OS aberta", body = ServiceOrderDetail),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Json(payload): Json<CreateServiceOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewServiceOrder {
        customer_name: payload.customer_name.trim(),
        customer_phone: payload.customer_phone.as_deref(),
        equipment: payload.equipment.trim(),
        reported_issue: payload.reported_issue.trim(),
        labor_amount: payload.labor_amount,
        technician_id: payload.technician_id,
    };

    let order = app_state
        .service_order_service
        .create_order(&mut *rls_conn, tenant.0, &input)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// POST /api/service-orders/{id}/items
#[utoipa::path(
    post,
    path = "/api/service-orders/{id}/items",
    tag = "Service Orders",
    request_body = AddOrderItemPayload,
    responses(
        (status = 201, description = "Item adicionado, totais recalculados", body = ServiceOrderDetail),
        (status = 404, description = "OS ou produto não encontrado"),
        (status = 422, description = "OS já finalizada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AddOrderItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = NewOrderItem {
        product_id: payload.product_id,
        description: payload.description.as_deref().map(str::trim),
        quantity: payload.quantity,
        unit_price: payload.unit_price,
    };

    let order = app_state
        .service_order_service
        .add_item(&mut *rls_conn, tenant.0, order_id, &item)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// PATCH /api/service-orders/{id}/status
#[utoipa::path(
    patch,
    path = "/api/service-orders/{id}/status",
    tag = "Service Orders",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = ServiceOrder),
        (status = 422, description = "Transição de status inválida")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .service_order_service
        .update_status(
            &mut *rls_conn,
            tenant.0,
            order_id,
            payload.status,
            payload.diagnosis.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

// POST /api/service-orders/{id}/deliver
#[utoipa::path(
    post,
    path = "/api/service-orders/{id}/deliver",
    tag = "Service Orders",
    request_body = DeliverOrderPayload,
    responses(
        (status = 200, description = "OS entregue, peças baixadas e valor lançado no caixa", body = ServiceOrderDetail),
        (status = 422, description = "Nenhum caixa aberto, OS já finalizada ou estoque insuficiente")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn deliver_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<DeliverOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .service_order_service
        .deliver(
            &mut *rls_conn,
            tenant.0,
            order_id,
            payload.payment_method,
            payload.discount,
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

// GET /api/service-orders/{id}
#[utoipa::path(
    get,
    path = "/api/service-orders/{id}",
    tag = "Service Orders",
    responses(
        (status = 200, description = "OS com itens", body = ServiceOrderDetail),
        (status = 404, description = "OS não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da OS")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .service_order_service
        .get_order(&mut *rls_conn, tenant.0, order_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

// GET /api/service-orders?status=&search=&limit=
#[utoipa::path(
    get,
    path = "/api/service-orders",
    tag = "Service Orders",
    responses(
        (status = 200, description = "OS da loja", body = Vec<ServiceOrder>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("status" = Option<ServiceOrderStatus>, Query, description = "Filtra por status"),
        ("search" = Option<String>, Query, description = "Cliente ou equipamento"),
        ("limit" = Option<i64>, Query, description = "Máximo de registros")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermServiceOrdersWrite>,
    Query(filter): Query<ServiceOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let orders = app_state
        .service_order_service
        .list_orders(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(orders))
}
