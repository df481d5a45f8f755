// src/models/inventory.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- 1. Produto ---
// `current_stock` é o saldo oficial; `stock_movements` é só o histórico.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "TELA-IP11")]
    pub sku: String,
    #[schema(example = "7891234567890")]
    pub barcode: Option<String>,
    #[schema(example = "Tela iPhone 11")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Peças")]
    pub category: Option<String>,
    #[schema(example = "180.00")]
    pub cost_price: Decimal,
    #[schema(example = "350.00")]
    pub sale_price: Decimal,
    #[schema(example = "12")]
    pub current_stock: Decimal,
    #[schema(example = "2")]
    pub min_stock: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

// --- 2. Tipo de movimentação ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "stock_movement_kind", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum StockMovementKind {
    Entry,        // Entrada
    Exit,         // Saída manual
    Sale,         // Baixa por venda
    ServiceOrder, // Baixa por OS
    Adjustment,   // Ajuste (define o saldo absoluto)
}

impl StockMovementKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Entry => "Entrada",
            Self::Exit => "Saída",
            Self::Sale => "Venda",
            Self::ServiceOrder => "OS",
            Self::Adjustment => "Ajuste",
        }
    }

    pub fn is_outflow(self) -> bool {
        matches!(self, Self::Exit | Self::Sale | Self::ServiceOrder)
    }

    /// Calcula o novo saldo a partir do saldo atual.
    ///
    /// Entrada soma, saídas subtraem e ajuste define o valor absoluto.
    /// Uma saída maior que o saldo é rejeitada antes de qualquer escrita.
    pub fn apply(self, current: Decimal, quantity: Decimal) -> Result<Decimal, AppError> {
        match self {
            Self::Adjustment => {
                if quantity.is_sign_negative() {
                    return Err(AppError::InvalidQuantity);
                }
                Ok(quantity)
            }
            _ if quantity <= Decimal::ZERO => Err(AppError::InvalidQuantity),
            Self::Entry => Ok(current + quantity),
            _ => {
                if quantity > current {
                    return Err(AppError::InsufficientStock {
                        requested: quantity,
                        available: current,
                    });
                }
                Ok(current - quantity)
            }
        }
    }
}

// --- 3. Movimentação de estoque (histórico, append-only) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub kind: StockMovementKind,
    #[schema(example = "5")]
    pub quantity: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    #[schema(example = "Compra fornecedor")]
    pub reason: Option<String>,
    // Venda ou OS que originou a movimentação
    pub reference_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Filtros da listagem de movimentações.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementFilter {
    pub product_id: Option<Uuid>,
    pub kind: Option<StockMovementKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn entry_adds_to_current_stock() {
        assert_eq!(StockMovementKind::Entry.apply(d(10), d(5)).unwrap(), d(15));
    }

    #[test]
    fn outflows_subtract_from_current_stock() {
        assert_eq!(StockMovementKind::Exit.apply(d(10), d(4)).unwrap(), d(6));
        assert_eq!(StockMovementKind::Sale.apply(d(10), d(10)).unwrap(), d(0));
        assert_eq!(StockMovementKind::ServiceOrder.apply(d(3), d(1)).unwrap(), d(2));
    }

    #[test]
    fn exit_greater_than_stock_is_rejected() {
        let err = StockMovementKind::Exit.apply(d(2), d(3)).unwrap_err();
        match err {
            AppError::InsufficientStock { requested, available } => {
                assert_eq!(requested, d(3));
                assert_eq!(available, d(2));
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn adjustment_sets_absolute_value() {
        assert_eq!(StockMovementKind::Adjustment.apply(d(10), d(7)).unwrap(), d(7));
        assert_eq!(StockMovementKind::Adjustment.apply(d(10), d(0)).unwrap(), d(0));
        assert!(StockMovementKind::Adjustment.apply(d(10), d(-1)).is_err());
    }

    #[test]
    fn zero_or_negative_quantity_is_invalid() {
        assert!(matches!(
            StockMovementKind::Entry.apply(d(10), d(0)),
            Err(AppError::InvalidQuantity)
        ));
        assert!(matches!(
            StockMovementKind::Sale.apply(d(10), d(-2)),
            Err(AppError::InvalidQuantity)
        ));
    }
}
