// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
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
        rbac::{PermSalesCancel, PermSalesWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::{
        cash::PaymentMethod,
        sales::{Sale, SaleDetail, SaleFilter},
    },
    services::sales_service::{CheckoutLine, CheckoutRequest},
};

// ---
// Payloads
// ---
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemPayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "1")]
    pub quantity: Decimal,
    // Preço negociado no balcão; sem ele vale o cadastro
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[validate(length(min = 1, message = "A venda precisa de pelo menos um item."), nested)]
    pub items: Vec<CheckoutItemPayload>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(example = "10.00")]
    pub discount: Decimal,

    pub payment_method: PaymentMethod,

    #[validate(length(max = 120, message = "Nome do cliente com no máximo 120 caracteres."))]
    pub customer_name: Option<String>,
}

impl CheckoutPayload {
    fn to_request(&self) -> CheckoutRequest<'_> {
        CheckoutRequest {
            items: self
                .items
                .iter()
                .map(|item| CheckoutLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            discount: self.discount,
            payment_method: self.payment_method,
            customer_name: self.customer_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        }
    }
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Venda concluída", body = SaleDetail),
        (status = 400, description = "Carrinho inválido"),
        (status = 422, description = "Nenhum caixa aberto, estoque insuficiente ou desconto maior que o subtotal")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn checkout(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sale = app_state
        .sales_service
        .checkout(&mut *rls_conn, tenant.0, &payload.to_request(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(sale)))
}

// POST /api/sales/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/sales/{id}/cancel",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda cancelada, estoque e caixa estornados", body = SaleDetail),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "Venda já cancelada ou caixa da venda fechado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da venda")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesCancel>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sale = app_state
        .sales_service
        .cancel_sale(&mut *rls_conn, tenant.0, sale_id, user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sale))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda com itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da venda")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sale = app_state
        .sales_service
        .get_sale(&mut *rls_conn, tenant.0, sale_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sale))
}

// GET /api/sales?sessionId=&status=&from=&to=&limit=
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    responses(
        (status = 200, description = "Vendas da loja, mais recentes primeiro", body = Vec<Sale>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("sessionId" = Option<Uuid>, Query, description = "Filtra por sessão de caixa"),
        ("status" = Option<String>, Query, description = "COMPLETED ou CANCELLED"),
        ("from" = Option<String>, Query, description = "Data inicial (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Data final (RFC 3339)"),
        ("limit" = Option<i64>, Query, description = "Máximo de registros")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Query(filter): Query<SaleFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sales = app_state
        .sales_service
        .list_sales(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sales))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkout_payload_parses_camel_case_and_defaults_discount() {
        let product_id = Uuid::new_v4();
        let payload: CheckoutPayload = serde_json::from_value(json!({
            "items": [{ "productId": product_id, "quantity": 2 }],
            "paymentMethod": "PIX",
            "customerName": "  "
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        let request = payload.to_request();
        assert_eq!(request.discount, Decimal::ZERO);
        assert_eq!(request.items[0].product_id, product_id);
        assert_eq!(request.items[0].unit_price, None);
        // Nome em branco não vai para o cupom
        assert_eq!(request.customer_name, None);
    }

    #[test]
    fn empty_cart_and_zero_quantity_are_rejected() {
        let empty: CheckoutPayload = serde_json::from_value(json!({
            "items": [],
            "paymentMethod": "CASH"
        }))
        .unwrap();
        assert!(empty.validate().is_err());

        let zero: CheckoutPayload = serde_json::from_value(json!({
            "items": [{ "productId": Uuid::new_v4(), "quantity": 0 }],
            "paymentMethod": "CASH"
        }))
        .unwrap();
        assert!(zero.validate().is_err());
    }
}
