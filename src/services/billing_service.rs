// src/services/billing_service.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        billing_repo::{CouponInput, PlanInput},
        BillingRepository,
    },
    models::billing::{
        AdminMetrics, Coupon, CouponRejection, CouponValidation, Plan, Subscription,
        SubscriptionStatus,
    },
};

const BILLING_PERIOD_DAYS: i64 = 30;

#[derive(Clone)]
pub struct BillingService {
    billing_repo: BillingRepository,
    pool: PgPool,
}

impl BillingService {
    pub fn new(billing_repo: BillingRepository, pool: PgPool) -> Self {
        Self { billing_repo, pool }
    }

    // --- PLANOS (admin) ---

    pub async fn create_plan(&self, input: &PlanInput<'_>) -> Result<Plan, AppError> {
        let plan = self.billing_repo.create_plan(input).await?;
        tracing::info!(plan_id = %plan.id, name = %plan.name, "Plano criado");
        Ok(plan)
    }

    pub async fn update_plan(&self, plan_id: Uuid, input: &PlanInput<'_>) -> Result<Plan, AppError> {
        self.billing_repo
            .update_plan(plan_id, input)
            .await?
            .ok_or(AppError::NotFound("plan"))
    }

    /// Planos não são apagados: assinaturas antigas continuam apontando para eles.
    pub async fn deactivate_plan(&self, plan_id: Uuid) -> Result<(), AppError> {
        if !self.billing_repo.deactivate_plan(plan_id).await? {
            return Err(AppError::NotFound("plan"));
        }
        tracing::info!(plan_id = %plan_id, "Plano desativado");
        Ok(())
    }

    pub async fn list_plans(&self, only_active: bool) -> Result<Vec<Plan>, AppError> {
        self.billing_repo.list_plans(only_active).await
    }

    // --- CUPONS (admin) ---

    pub async fn create_coupon(&self, input: &CouponInput<'_>) -> Result<Coupon, AppError> {
        let coupon = self.billing_repo.create_coupon(input).await?;
        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Cupom criado");
        Ok(coupon)
    }

    pub async fn update_coupon(&self, coupon_id: Uuid, input: &CouponInput<'_>) -> Result<Coupon, AppError> {
        self.billing_repo
            .update_coupon(coupon_id, input)
            .await?
            .ok_or(AppError::NotFound("coupon"))
    }

    pub async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<(), AppError> {
        if !self.billing_repo.deactivate_coupon(coupon_id).await? {
            return Err(AppError::NotFound("coupon"));
        }
        tracing::info!(coupon_id = %coupon_id, "Cupom desativado");
        Ok(())
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        self.billing_repo.list_coupons().await
    }

    pub async fn metrics(&self) -> Result<AdminMetrics, AppError> {
        self.billing_repo.admin_metrics().await
    }

    // --- VALIDAÇÃO ---
    // Cupom inválido não é erro HTTP: a resposta diz o motivo.
    pub async fn validate_coupon(
        &self,
        code: &str,
        plan_id: Option<Uuid>,
    ) -> Result<CouponValidation, AppError> {
        let plan = match plan_id {
            Some(id) => Some(
                self.billing_repo
                    .get_plan(&self.pool, id)
                    .await?
                    .ok_or(AppError::NotFound("plan"))?,
            ),
            None => None,
        };

        let coupon = self.billing_repo.find_coupon_by_code(&self.pool, code).await?;
        Ok(build_validation(code, coupon.as_ref(), plan.as_ref()))
    }

    // --- ASSINATURA ---
    // Validação, incremento de uso e assinatura na mesma transação.
    pub async fn subscribe(
        &self,
        tenant_id: Uuid,
        plan_id: Uuid,
        coupon_code: Option<&str>,
    ) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await?;

        let plan = self.billing_repo
            .get_plan(&mut *tx, plan_id)
            .await?
            .ok_or(AppError::NotFound("plan"))?;
        if !plan.active {
            return Err(AppError::PlanInactive);
        }

        let mut price = plan.monthly_price;
        let mut coupon_id = None;

        if let Some(code) = coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            let coupon = self.billing_repo
                .find_coupon_by_code(&mut *tx, code)
                .await?
                .ok_or_else(|| AppError::InvalidCoupon(CouponRejection::NotFound.reason().to_string()))?;

            coupon
                .validate(Utc::now(), Some(plan.id))
                .map_err(|r| AppError::InvalidCoupon(r.reason().to_string()))?;

            // O UPDATE condicional fecha a corrida entre dois resgates do último uso
            if !self.billing_repo.increment_coupon_usage(&mut *tx, coupon.id).await? {
                return Err(AppError::InvalidCoupon(
                    CouponRejection::UsageLimitReached.reason().to_string(),
                ));
            }

            price = coupon.apply(price);
            coupon_id = Some(coupon.id);
        }

        let period_end = Utc::now() + Duration::days(BILLING_PERIOD_DAYS);
        let subscription = self.billing_repo
            .upsert_subscription(
                &mut *tx,
                tenant_id,
                plan.id,
                coupon_id,
                SubscriptionStatus::Active,
                price,
                period_end,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            plan = %plan.name,
            price = %subscription.price,
            coupon = coupon_code.unwrap_or("-"),
            "Assinatura ativada"
        );
        Ok(subscription)
    }

    pub async fn get_subscription(&self, tenant_id: Uuid) -> Result<Subscription, AppError> {
        self.billing_repo
            .get_subscription(tenant_id)
            .await?
            .ok_or(AppError::NotFound("subscription"))
    }
}

fn build_validation(code: &str, coupon: Option<&Coupon>, plan: Option<&Plan>) -> CouponValidation {
    let original_price = plan.map(|p| p.monthly_price);

    let checked = match coupon {
        None => Err(CouponRejection::NotFound),
        Some(c) => c.validate(Utc::now(), plan.map(|p| p.id)).map(|_| c),
    };

    match checked {
        Ok(coupon) => CouponValidation {
            valid: true,
            code: coupon.code.clone(),
            reason: None,
            rejection: None,
            original_price,
            final_price: original_price.map(|price| coupon.apply(price)),
        },
        Err(rejection) => CouponValidation {
            valid: false,
            code: code.trim().to_uppercase(),
            reason: Some(rejection.reason().to_string()),
            rejection: Some(rejection),
            original_price,
            final_price: original_price,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::billing::DiscountKind;
    use rust_decimal::Decimal;

    fn plan(price: &str) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "Profissional".into(),
            description: None,
            monthly_price: price.parse().unwrap(),
            max_users: Some(5),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn coupon(kind: DiscountKind, value: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "PROMO".into(),
            discount_kind: kind,
            discount_value: Decimal::from(value),
            active: true,
            expires_at: None,
            max_uses: None,
            uses_count: 0,
            plan_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_code_is_reported_as_not_found() {
        let v = build_validation(" promo ", None, None);
        assert!(!v.valid);
        assert_eq!(v.code, "PROMO");
        assert_eq!(v.reason.as_deref(), Some("Cupom não encontrado"));
    }

    #[test]
    fn valid_coupon_reports_the_discounted_price() {
        let p = plan("100.00");
        let v = build_validation("PROMO", Some(&coupon(DiscountKind::Fixed, 30)), Some(&p));
        assert!(v.valid);
        assert_eq!(v.original_price, Some("100.00".parse().unwrap()));
        assert_eq!(v.final_price, Some("70.00".parse().unwrap()));
    }

    #[test]
    fn plan_restricted_coupon_is_rejected_for_another_plan() {
        let mut c = coupon(DiscountKind::Percent, 10);
        c.plan_id = Some(Uuid::new_v4());
        let p = plan("50.00");

        let v = build_validation("PROMO", Some(&c), Some(&p));
        assert!(!v.valid);
        assert_eq!(v.rejection, Some(CouponRejection::WrongPlan));
        assert_eq!(v.final_price, v.original_price);
    }
}
