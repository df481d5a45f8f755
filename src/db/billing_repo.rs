// src/db/billing_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{AdminMetrics, Coupon, DiscountKind, Plan, Subscription, SubscriptionStatus},
};

#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub monthly_price: Decimal,
    pub max_users: Option<i32>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CouponInput<'a> {
    pub code: &'a str,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub plan_id: Option<Uuid>,
}

fn map_unique(e: sqlx::Error, conflict: AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return conflict;
        }
    }
    e.into()
}

// Tabelas globais da plataforma: sem tenant_id, só super admins escrevem.
#[derive(Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Planos ---

    pub async fn create_plan(&self, input: &PlanInput<'_>) -> Result<Plan, AppError> {
        sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (name, description, monthly_price, max_users, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(input.name)
            .bind(input.description)
            .bind(input.monthly_price)
            .bind(input.max_users)
            .bind(input.active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, AppError::PlanNameAlreadyExists(input.name.to_string())))
    }

    pub async fn update_plan(&self, plan_id: Uuid, input: &PlanInput<'_>) -> Result<Option<Plan>, AppError> {
        sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                name = $2,
                description = $3,
                monthly_price = $4,
                max_users = $5,
                active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(plan_id)
            .bind(input.name)
            .bind(input.description)
            .bind(input.monthly_price)
            .bind(input.max_users)
            .bind(input.active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, AppError::PlanNameAlreadyExists(input.name.to_string())))
    }

    /// Planos com assinaturas não podem sumir: "excluir" desativa.
    pub async fn deactivate_plan(&self, plan_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE plans SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(plan_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_plans(&self, only_active: bool) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE (NOT $1 OR active) ORDER BY monthly_price ASC",
        )
            .bind(only_active)
            .fetch_all(&self.pool)
            .await?;
        Ok(plans)
    }

    pub async fn get_plan<'e, E>(&self, executor: E, plan_id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(executor)
            .await?;
        Ok(plan)
    }

    // --- Cupons ---

    pub async fn create_coupon(&self, input: &CouponInput<'_>) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons (code, discount_kind, discount_value, active, expires_at, max_uses, plan_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(input.code)
            .bind(input.discount_kind)
            .bind(input.discount_value)
            .bind(input.active)
            .bind(input.expires_at)
            .bind(input.max_uses)
            .bind(input.plan_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, AppError::CouponCodeAlreadyExists(input.code.to_string())))
    }

    pub async fn update_coupon(
        &self,
        coupon_id: Uuid,
        input: &CouponInput<'_>,
    ) -> Result<Option<Coupon>, AppError> {
        sqlx::query_as::<_, Coupon>(
            r#"
            UPDATE coupons SET
                code = $2,
                discount_kind = $3,
                discount_value = $4,
                active = $5,
                expires_at = $6,
                max_uses = $7,
                plan_id = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(coupon_id)
            .bind(input.code)
            .bind(input.discount_kind)
            .bind(input.discount_value)
            .bind(input.active)
            .bind(input.expires_at)
            .bind(input.max_uses)
            .bind(input.plan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, AppError::CouponCodeAlreadyExists(input.code.to_string())))
    }

    pub async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE coupons SET active = FALSE WHERE id = $1")
            .bind(coupon_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    /// Códigos são comparados sem diferenciar maiúsculas.
    pub async fn find_coupon_by_code<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<Coupon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE UPPER(code) = UPPER($1)")
            .bind(code.trim())
            .fetch_optional(executor)
            .await?;
        Ok(coupon)
    }

    /// Incrementa o uso só se o cupom ainda estiver dentro do limite.
    /// Retorna `false` quando outra transação esgotou o cupom antes.
    pub async fn increment_coupon_usage<'e, E>(
        &self,
        executor: E,
        coupon_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE coupons SET uses_count = uses_count + 1
            WHERE id = $1
              AND active
              AND (max_uses IS NULL OR uses_count < max_uses)
            "#,
        )
            .bind(coupon_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // --- Assinaturas ---

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_subscription<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        plan_id: Uuid,
        coupon_id: Option<Uuid>,
        status: SubscriptionStatus,
        price: Decimal,
        current_period_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (tenant_id, plan_id, coupon_id, status, price, current_period_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                coupon_id = EXCLUDED.coupon_id,
                status = EXCLUDED.status,
                price = EXCLUDED.price,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = NOW()
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(plan_id)
            .bind(coupon_id)
            .bind(status)
            .bind(price)
            .bind(current_period_end)
            .fetch_one(executor)
            .await?;
        Ok(subscription)
    }

    pub async fn get_subscription(&self, tenant_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE tenant_id = $1",
        )
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(subscription)
    }

    pub async fn admin_metrics(&self) -> Result<AdminMetrics, AppError> {
        let metrics = sqlx::query_as::<_, AdminMetrics>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tenants) AS total_tenants,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'ACTIVE') AS active_subscriptions,
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'TRIAL') AS trial_subscriptions,
                (SELECT COALESCE(SUM(price), 0) FROM subscriptions WHERE status = 'ACTIVE')
                    AS monthly_recurring_revenue,
                (SELECT COALESCE(SUM(uses_count), 0)::BIGINT FROM coupons) AS coupons_redeemed
            "#,
        )
            .fetch_one(&self.pool)
            .await?;
        Ok(metrics)
    }
}
