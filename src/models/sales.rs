// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::{error::AppError, money::round_money};
use crate::models::cash::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "Concluída",
            Self::Cancelled => "Cancelada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 42)]
    pub display_id: i32,
    pub session_id: Uuid,
    pub customer_name: Option<String>,
    #[schema(example = "120.00")]
    pub subtotal: Decimal,
    #[schema(example = "10.00")]
    pub discount: Decimal,
    #[schema(example = "110.00")]
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "Capa silicone")]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Linha já precificada, pronta para entrar na venda.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn total(&self) -> Decimal {
        round_money(self.quantity * self.unit_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl SaleTotals {
    /// `subtotal = Σ qtd × preço`, `total = subtotal − desconto` com `0 ≤ desconto ≤ subtotal`.
    pub fn compute(lines: &[PricedLine], discount: Decimal) -> Result<Self, AppError> {
        if lines.is_empty() {
            return Err(AppError::EmptySale);
        }
        if lines.iter().any(|l| l.quantity <= Decimal::ZERO || l.unit_price.is_sign_negative()) {
            return Err(AppError::InvalidQuantity);
        }

        let subtotal: Decimal = lines.iter().map(PricedLine::total).sum();
        let discount = round_money(discount);

        if discount.is_sign_negative() || discount > subtotal {
            return Err(AppError::DiscountExceedsSubtotal);
        }

        Ok(Self {
            subtotal,
            discount,
            total: subtotal - discount,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilter {
    pub session_id: Option<Uuid>,
    pub status: Option<SaleStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: &str, price: &str) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            description: "Item".into(),
            quantity: qty.parse().unwrap(),
            unit_price: price.parse().unwrap(),
        }
    }

    #[test]
    fn totals_apply_discount_over_subtotal() {
        let lines = vec![line("2", "25.00"), line("1", "19.90")];
        let totals = SaleTotals::compute(&lines, "9.90".parse().unwrap()).unwrap();
        assert_eq!(totals.subtotal, "69.90".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, "60.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn fractional_quantities_round_each_line_to_cents() {
        let lines = vec![line("0.333", "10.00")];
        let totals = SaleTotals::compute(&lines, Decimal::ZERO).unwrap();
        assert_eq!(totals.total, "3.33".parse::<Decimal>().unwrap());
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let lines = vec![line("1", "10.00")];
        assert!(matches!(
            SaleTotals::compute(&lines, "10.01".parse().unwrap()),
            Err(AppError::DiscountExceedsSubtotal)
        ));
        assert!(SaleTotals::compute(&lines, "10.00".parse().unwrap()).is_ok());
    }

    #[test]
    fn empty_sale_is_rejected() {
        assert!(matches!(SaleTotals::compute(&[], Decimal::ZERO), Err(AppError::EmptySale)));
    }
}
