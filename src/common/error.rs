// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro interno (services e repositórios).
// A mensagem do `#[error]` é a usada nos logs; a mensagem para o usuário
// vem do I18nStore pela chave `key()`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Sem acesso à empresa")]
    TenantAccessDenied,

    #[error("Cabeçalho X-Tenant-ID ausente ou inválido")]
    InvalidTenantHeader,

    #[error("Permissão necessária: {0}")]
    PermissionDenied(String),

    #[error("Recurso não encontrado: {0}")]
    NotFound(&'static str),

    #[error("SKU já existe: {0}")]
    SkuAlreadyExists(String),

    #[error("Cupom já existe: {0}")]
    CouponCodeAlreadyExists(String),

    #[error("Plano já existe: {0}")]
    PlanNameAlreadyExists(String),

    #[error("Usuário já é membro da empresa")]
    MemberAlreadyExists,

    // --- Caixa ---
    #[error("Já existe um caixa aberto")]
    CashSessionAlreadyOpen,

    #[error("Nenhum caixa aberto")]
    CashSessionNotOpen,

    #[error("Caixa já fechado")]
    CashSessionClosed,

    #[error("Sangria de {requested} maior que o saldo {available}")]
    WithdrawalExceedsBalance { requested: Decimal, available: Decimal },

    #[error("Valor deve ser maior que zero")]
    NonPositiveAmount,

    // --- Estoque ---
    #[error("Estoque insuficiente: pedido {requested}, disponível {available}")]
    InsufficientStock { requested: Decimal, available: Decimal },

    #[error("Quantidade inválida")]
    InvalidQuantity,

    #[error("Produto inativo")]
    ProductInactive,

    // --- Vendas / OS ---
    #[error("Desconto maior que o subtotal")]
    DiscountExceedsSubtotal,

    #[error("Venda sem itens")]
    EmptySale,

    #[error("Venda já cancelada")]
    SaleAlreadyCancelled,

    #[error("Item sem produto precisa de descrição")]
    ItemDescriptionRequired,

    #[error("OS já finalizada")]
    ServiceOrderFinalized,

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    // --- Assinaturas ---
    #[error("Cupom inválido: {0}")]
    InvalidCoupon(String),

    #[error("Plano inativo")]
    PlanInactive,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro ao gerar documento: {0}")]
    DocumentError(String),

    #[error("Erro ao exportar CSV")]
    CsvError(#[from] csv::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::NonPositiveAmount
            | AppError::InvalidQuantity
            | AppError::DiscountExceedsSubtotal
            | AppError::EmptySale
            | AppError::ItemDescriptionRequired
            | AppError::InvalidTenantHeader => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::TenantAccessDenied | AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,

            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::EmailAlreadyExists
            | AppError::SkuAlreadyExists(_)
            | AppError::CouponCodeAlreadyExists(_)
            | AppError::PlanNameAlreadyExists(_)
            | AppError::MemberAlreadyExists
            | AppError::CashSessionAlreadyOpen
            | AppError::CashSessionClosed
            | AppError::SaleAlreadyCancelled => StatusCode::CONFLICT,

            AppError::CashSessionNotOpen
            | AppError::WithdrawalExceedsBalance { .. }
            | AppError::InsufficientStock { .. }
            | AppError::ProductInactive
            | AppError::InvalidStatusTransition { .. }
            | AppError::ServiceOrderFinalized
            | AppError::InvalidCoupon(_)
            | AppError::PlanInactive => StatusCode::UNPROCESSABLE_ENTITY,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave da mensagem no catálogo de traduções.
    pub fn key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::TenantAccessDenied => "tenant_access_denied",
            AppError::InvalidTenantHeader => "invalid_tenant_header",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::NotFound(_) => "not_found",
            AppError::SkuAlreadyExists(_) => "sku_already_exists",
            AppError::CouponCodeAlreadyExists(_) => "coupon_code_already_exists",
            AppError::PlanNameAlreadyExists(_) => "plan_name_already_exists",
            AppError::MemberAlreadyExists => "member_already_exists",
            AppError::CashSessionAlreadyOpen => "cash_session_already_open",
            AppError::CashSessionNotOpen => "cash_session_not_open",
            AppError::CashSessionClosed => "cash_session_closed",
            AppError::WithdrawalExceedsBalance { .. } => "withdrawal_exceeds_balance",
            AppError::NonPositiveAmount => "non_positive_amount",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::InvalidQuantity => "invalid_quantity",
            AppError::ProductInactive => "product_inactive",
            AppError::DiscountExceedsSubtotal => "discount_exceeds_subtotal",
            AppError::EmptySale => "empty_sale",
            AppError::SaleAlreadyCancelled => "sale_already_cancelled",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::ItemDescriptionRequired => "item_description_required",
            AppError::ServiceOrderFinalized => "service_order_finalized",
            AppError::InvalidCoupon(_) => "invalid_coupon",
            AppError::PlanInactive => "plan_inactive",
            _ => "internal_error",
        }
    }

    /// Converte o erro interno na resposta da API, traduzida para o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let message = store.translate(&locale.0, self.key());

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::WithdrawalExceedsBalance { requested, available }
            | AppError::InsufficientStock { requested, available } => Some(json!({
                "requested": requested,
                "available": available,
            })),
            AppError::InvalidStatusTransition { from, to } => Some(json!({ "from": from, "to": to })),
            // O motivo do cupom já vem em português (regra de negócio)
            AppError::InvalidCoupon(reason) => Some(json!({ "reason": reason })),
            AppError::PermissionDenied(slug) => Some(json!({ "permission": slug })),
            AppError::NotFound(entity) => Some(json!({ "entity": entity })),
            _ => None,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        } else {
            tracing::warn!(status = %status, "Requisição rejeitada: {}", self);
        }

        ApiError { status, error: message, details }
    }
}

// Usado por rotas que não recebem o Locale (ex: middlewares)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn business_rule_errors_map_to_unprocessable_entity() {
        let err = AppError::WithdrawalExceedsBalance {
            requested: dec("50.00"),
            available: dec("10.00"),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::CashSessionAlreadyOpen.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("produto").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_is_translated_and_carries_details() {
        let err = AppError::InsufficientStock {
            requested: dec("5"),
            available: dec("2"),
        };
        let api = err.to_api_error(&Locale("pt".into()), I18nStore::global());
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.error, "Estoque insuficiente para a operação.");
        let details = api.details.unwrap();
        assert_eq!(details["available"], json!(2.0));
    }

    #[test]
    fn database_errors_do_not_leak_details() {
        let err = AppError::DatabaseError(sqlx::Error::RowNotFound);
        let api = err.to_api_error(&Locale("en".into()), I18nStore::global());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
        assert!(api.details.is_none());
    }
}
