// src/models/billing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::money::round_money;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "discount_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Cancelled,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    #[schema(example = "Profissional")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "89.90")]
    pub monthly_price: Decimal,
    #[schema(example = 5)]
    pub max_users: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    #[schema(example = "BEMVINDO20")]
    pub code: String,
    pub discount_kind: DiscountKind,
    #[schema(example = "20")]
    pub discount_value: Decimal,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub uses_count: i32,
    // Se definido, o cupom só vale para este plano
    pub plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Motivo pelo qual um cupom não pode ser usado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    NotFound,
    Inactive,
    Expired,
    UsageLimitReached,
    WrongPlan,
}

impl CouponRejection {
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotFound => "Cupom não encontrado",
            Self::Inactive => "Cupom inativo",
            Self::Expired => "Cupom expirado",
            Self::UsageLimitReached => "Cupom atingiu o limite de usos",
            Self::WrongPlan => "Cupom não é válido para este plano",
        }
    }
}

impl Coupon {
    /// Valida na ordem: ativo, validade, limite de usos, plano.
    pub fn validate(&self, now: DateTime<Utc>, plan_id: Option<Uuid>) -> Result<(), CouponRejection> {
        if !self.active {
            return Err(CouponRejection::Inactive);
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < now {
                return Err(CouponRejection::Expired);
            }
        }
        if let Some(max_uses) = self.max_uses {
            if self.uses_count >= max_uses {
                return Err(CouponRejection::UsageLimitReached);
            }
        }
        if let Some(restricted_plan) = self.plan_id {
            if plan_id != Some(restricted_plan) {
                return Err(CouponRejection::WrongPlan);
            }
        }
        Ok(())
    }

    /// Preço com desconto, nunca negativo.
    pub fn apply(&self, price: Decimal) -> Decimal {
        let discounted = match self.discount_kind {
            DiscountKind::Percent => {
                let pct = self.discount_value.min(Decimal::ONE_HUNDRED);
                price - price * pct / Decimal::ONE_HUNDRED
            }
            DiscountKind::Fixed => price - self.discount_value,
        };
        round_money(discounted.max(Decimal::ZERO))
    }
}

/// Resposta da validação de cupom.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    pub code: String,
    pub reason: Option<String>,
    pub rejection: Option<CouponRejection>,
    pub original_price: Option<Decimal>,
    pub final_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    #[schema(example = "71.92")]
    pub price: Decimal,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Indicadores da plataforma (painel admin).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetrics {
    pub total_tenants: i64,
    pub total_users: i64,
    pub active_subscriptions: i64,
    pub trial_subscriptions: i64,
    // Receita recorrente mensal (assinaturas ativas)
    pub monthly_recurring_revenue: Decimal,
    pub coupons_redeemed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon() -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "BEMVINDO20".into(),
            discount_kind: DiscountKind::Percent,
            discount_value: Decimal::from(20),
            active: true,
            expires_at: None,
            max_uses: None,
            uses_count: 0,
            plan_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn active_unrestricted_coupon_is_valid() {
        assert_eq!(coupon().validate(Utc::now(), None), Ok(()));
    }

    #[test]
    fn inactive_coupon_is_rejected_first() {
        let mut c = coupon();
        c.active = false;
        c.expires_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(c.validate(Utc::now(), None), Err(CouponRejection::Inactive));
        assert_eq!(CouponRejection::Inactive.reason(), "Cupom inativo");
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let mut c = coupon();
        c.expires_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(c.validate(Utc::now(), None), Err(CouponRejection::Expired));
    }

    #[test]
    fn coupon_at_max_uses_is_rejected() {
        let mut c = coupon();
        c.max_uses = Some(3);
        c.uses_count = 2;
        assert!(c.validate(Utc::now(), None).is_ok());
        c.uses_count = 3;
        assert_eq!(
            c.validate(Utc::now(), None),
            Err(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn plan_restricted_coupon_requires_matching_plan() {
        let plan = Uuid::new_v4();
        let mut c = coupon();
        c.plan_id = Some(plan);
        assert!(c.validate(Utc::now(), Some(plan)).is_ok());
        assert_eq!(
            c.validate(Utc::now(), Some(Uuid::new_v4())),
            Err(CouponRejection::WrongPlan)
        );
        assert_eq!(c.validate(Utc::now(), None), Err(CouponRejection::WrongPlan));
    }

    #[test]
    fn discounts_never_go_below_zero() {
        let c = coupon();
        assert_eq!(c.apply("89.90".parse().unwrap()), "71.92".parse::<Decimal>().unwrap());

        let mut fixed = coupon();
        fixed.discount_kind = DiscountKind::Fixed;
        fixed.discount_value = Decimal::from(100);
        assert_eq!(fixed.apply("89.90".parse().unwrap()), Decimal::ZERO);
    }
}
