// src/handlers/inventory.rs

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
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        validation::{validate_not_negative, validate_positive},
    },
    config::AppState,
    db::inventory_repo::{NewProduct, ProductChanges},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermInventoryRead, PermInventoryWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::inventory::{Product, StockMovement, StockMovementFilter, StockMovementKind},
    services::inventory_service::StockMovementRequest,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 60, message = "O SKU é obrigatório (até 60 caracteres)."))]
    #[schema(example = "TELA-IP11")]
    pub sku: String,

    pub barcode: Option<String>,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Tela iPhone 11")]
    pub name: String,

    pub description: Option<String>,
    pub category: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub cost_price: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Decimal,

    // Entra como movimentação de ENTRADA
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_stock: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub min_stock: Decimal,
}

/// Alteração parcial. O estoque não muda por aqui, só por movimentação.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    pub barcode: Option<String>,
    #[validate(length(min = 1, message = "O nome não pode ficar vazio."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub cost_price: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub min_stock: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMovementPayload {
    pub product_id: Uuid,
    pub kind: StockMovementKind,
    // Ajuste aceita zero (zera o estoque); o resto exige > 0
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "5")]
    pub quantity: Decimal,
    #[schema(example = "Compra fornecedor")]
    pub reason: Option<String>,
}

impl RegisterMovementPayload {
    // Baixas de venda e OS só nascem dos seus próprios fluxos
    fn validate_kind(&self) -> Result<(), ValidationError> {
        match self.kind {
            StockMovementKind::Sale | StockMovementKind::ServiceOrder => {
                let mut err = ValidationError::new("kind");
                err.message = Some("Use ENTRY, EXIT ou ADJUSTMENT para lançamentos manuais.".into());
                Err(err)
            }
            StockMovementKind::Adjustment => Ok(()),
            _ => validate_positive(&self.quantity),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

// POST /api/inventory/products
#[utoipa::path(
    post,
    path = "/api/inventory/products",
    tag = "Inventory",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "SKU já existe")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewProduct {
        sku: payload.sku.trim(),
        barcode: payload.barcode.as_deref(),
        name: payload.name.trim(),
        description: payload.description.as_deref(),
        category: payload.category.as_deref(),
        cost_price: payload.cost_price,
        sale_price: payload.sale_price,
        min_stock: payload.min_stock,
    };

    let product = app_state
        .inventory_service
        .create_product(&mut *rls_conn, tenant.0, &input, payload.initial_stock, user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/inventory/products?search=&lowStock=
#[utoipa::path(
    get,
    path = "/api/inventory/products",
    tag = "Inventory",
    responses(
        (status = 200, description = "Produtos da loja", body = Vec<Product>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("search" = Option<String>, Query, description = "Nome, SKU ou código de barras"),
        ("lowStock" = Option<bool>, Query, description = "Só produtos no estoque mínimo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let products = app_state
        .inventory_service
        .list_products(&mut *rls_conn, tenant.0, search, query.low_stock)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(products))
}

// GET /api/inventory/products/{id}
#[utoipa::path(
    get,
    path = "/api/inventory/products/{id}",
    tag = "Inventory",
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID do produto")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .inventory_service
        .get_product(&mut *rls_conn, tenant.0, product_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(product))
}

// PATCH /api/inventory/products/{id}
#[utoipa::path(
    patch,
    path = "/api/inventory/products/{id}",
    tag = "Inventory",
    request_body = UpdateProductPayload,
    responses(
        (status = 200, description = "Produto atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID do produto")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = ProductChanges {
        barcode: payload.barcode.as_deref(),
        name: payload.name.as_deref().map(str::trim),
        description: payload.description.as_deref(),
        category: payload.category.as_deref(),
        cost_price: payload.cost_price,
        sale_price: payload.sale_price,
        min_stock: payload.min_stock,
        active: payload.active,
    };

    let product = app_state
        .inventory_service
        .update_product(&mut *rls_conn, tenant.0, product_id, &changes)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(product))
}

// POST /api/inventory/movements
#[utoipa::path(
    post,
    path = "/api/inventory/movements",
    tag = "Inventory",
    request_body = RegisterMovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = StockMovement),
        (status = 422, description = "Estoque insuficiente")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Json(payload): Json<RegisterMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    payload.validate_kind()
        .map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("kind", e);
            AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store)
        })?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let movement = app_state
        .inventory_service
        .register_movement(
            &mut *rls_conn,
            tenant.0,
            &StockMovementRequest {
                product_id: payload.product_id,
                kind: payload.kind,
                quantity: payload.quantity,
                reason: payload.reason.as_deref(),
                reference_id: None,
                user_id: Some(user.0.id),
            },
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// GET /api/inventory/movements?productId=&kind=&from=&to=&limit=
#[utoipa::path(
    get,
    path = "/api/inventory/movements",
    tag = "Inventory",
    responses(
        (status = 200, description = "Histórico de movimentações", body = Vec<StockMovement>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("productId" = Option<Uuid>, Query, description = "Filtra por produto"),
        ("kind" = Option<StockMovementKind>, Query, description = "Filtra por tipo"),
        ("from" = Option<String>, Query, description = "Data inicial (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Data final (RFC 3339)"),
        ("limit" = Option<i64>, Query, description = "Máximo de registros (padrão 100)")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Query(filter): Query<StockMovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let movements = app_state
        .inventory_service
        .list_movements(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(kind: StockMovementKind, quantity: i64) -> RegisterMovementPayload {
        RegisterMovementPayload {
            product_id: Uuid::new_v4(),
            kind,
            quantity: Decimal::from(quantity),
            reason: None,
        }
    }

    #[test]
    fn manual_movements_cannot_impersonate_sales() {
        assert!(movement(StockMovementKind::Sale, 1).validate_kind().is_err());
        assert!(movement(StockMovementKind::ServiceOrder, 1).validate_kind().is_err());
    }

    #[test]
    fn adjustment_to_zero_is_allowed_but_empty_entry_is_not() {
        assert!(movement(StockMovementKind::Adjustment, 0).validate_kind().is_ok());
        assert!(movement(StockMovementKind::Entry, 0).validate_kind().is_err());
        assert!(movement(StockMovementKind::Exit, 3).validate_kind().is_ok());
    }

    #[test]
    fn negative_prices_fail_validation() {
        let payload = CreateProductPayload {
            sku: "CAPA-01".into(),
            barcode: None,
            name: "Capa".into(),
            description: None,
            category: None,
            cost_price: Decimal::ZERO,
            sale_price: Decimal::from(-1),
            initial_stock: Decimal::ZERO,
            min_stock: Decimal::ZERO,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("sale_price"));
    }
}
