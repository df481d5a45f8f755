// src/models/service_orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::{error::AppError, money::round_money};
use crate::models::cash::PaymentMethod;

// --- Status da OS ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceOrderStatus {
    Open,          // Aberta
    InProgress,    // Em andamento
    AwaitingParts, // Aguardando peças
    Ready,         // Pronta para retirada
    Delivered,     // Entregue (final)
    Cancelled,     // Cancelada (final)
}

impl ServiceOrderStatus {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::AwaitingParts => "AWAITING_PARTS",
            Self::Ready => "READY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Aberta",
            Self::InProgress => "Em andamento",
            Self::AwaitingParts => "Aguardando peças",
            Self::Ready => "Pronta",
            Self::Delivered => "Entregue",
            Self::Cancelled => "Cancelada",
        }
    }

    /// Transições manuais. A entrega (DELIVERED) só acontece pelo fluxo de
    /// entrega, que também lança o recebimento no caixa.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ServiceOrderStatus::*;
        if self.is_final() || self == next {
            return false;
        }
        match next {
            Cancelled => true,
            Delivered => false,
            Open => false,
            InProgress => matches!(self, Open | AwaitingParts | Ready),
            AwaitingParts => matches!(self, Open | InProgress),
            Ready => matches!(self, InProgress | AwaitingParts),
        }
    }

    pub fn ensure_transition(self, next: Self) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 1024)]
    pub display_id: i32,
    #[schema(example = "Maria Souza")]
    pub customer_name: String,
    #[schema(example = "(11) 98888-7777")]
    pub customer_phone: Option<String>,
    #[schema(example = "Samsung Galaxy S21")]
    pub equipment: String,
    #[schema(example = "Não liga após queda")]
    pub reported_issue: String,
    pub diagnosis: Option<String>,
    pub status: ServiceOrderStatus,
    #[schema(example = "120.00")]
    pub labor_amount: Decimal,
    pub parts_amount: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub session_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Peça (ligada a um produto) ou linha de serviço livre.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub service_order_id: Uuid,
    pub product_id: Option<Uuid>,
    #[schema(example = "Conector de carga")]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderDetail {
    #[serde(flatten)]
    pub order: ServiceOrder,
    pub status_label: String,
    pub items: Vec<ServiceOrderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOrderTotals {
    pub parts_amount: Decimal,
    pub total: Decimal,
}

impl ServiceOrderTotals {
    /// `total = mão de obra + Σ itens − desconto`
    pub fn compute(
        labor_amount: Decimal,
        items: &[ServiceOrderItem],
        discount: Decimal,
    ) -> Result<Self, AppError> {
        let parts_amount: Decimal = items.iter().map(|i| i.total).sum();
        let gross = round_money(labor_amount + parts_amount);
        let discount = round_money(discount);

        if discount.is_sign_negative() || discount > gross {
            return Err(AppError::DiscountExceedsSubtotal);
        }

        Ok(Self {
            parts_amount,
            total: gross - discount,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderFilter {
    pub status: Option<ServiceOrderStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ServiceOrderStatus::*;

    fn item(total: &str) -> ServiceOrderItem {
        ServiceOrderItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            service_order_id: Uuid::nil(),
            product_id: None,
            description: "Peça".into(),
            quantity: Decimal::ONE,
            unit_price: total.parse().unwrap(),
            total: total.parse().unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn workflow_transitions() {
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(AwaitingParts));
        assert!(AwaitingParts.can_transition_to(Ready));
        assert!(Ready.can_transition_to(InProgress));
        assert!(Ready.can_transition_to(Cancelled));
        assert!(!Open.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Delivered));
    }

    #[test]
    fn final_statuses_are_locked() {
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        let err = Delivered.ensure_transition(Open).unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn total_includes_labor_and_parts_minus_discount() {
        let items = vec![item("80.00"), item("35.50")];
        let totals =
            ServiceOrderTotals::compute("120.00".parse().unwrap(), &items, "15.50".parse().unwrap())
                .unwrap();
        assert_eq!(totals.parts_amount, "115.50".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, "220.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn discount_larger_than_order_is_rejected() {
        let res = ServiceOrderTotals::compute("10.00".parse().unwrap(), &[], "10.50".parse().unwrap());
        assert!(matches!(res, Err(AppError::DiscountExceedsSubtotal)));
    }
}
