// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{DailyRevenueRow, TopProductRow},
};

const TOP_PRODUCTS_LIMIT: i64 = 5;

/// Consultas agregadas do painel. Cada método é uma leitura; quem precisa de
/// um retrato consistente (o resumo) junta tudo numa transação no service.
#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    /// Soma e quantidade de vendas concluídas a partir de `since`.
    pub async fn completed_sales_since<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<(Decimal, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row: (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total), 0), COUNT(*)
            FROM sales
            WHERE tenant_id = $1 AND status = 'COMPLETED' AND created_at >= $2
            "#,
        )
            .bind(tenant_id)
            .bind(since)
            .fetch_one(executor)
            .await?;

        Ok(row)
    }

    pub async fn count_open_service_orders<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_orders WHERE tenant_id = $1 AND status NOT IN ('DELIVERED', 'CANCELLED')",
        )
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    pub async fn count_low_stock<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE tenant_id = $1 AND active AND current_stock <= min_stock",
        )
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    // Vendas concluídas + OS entregues, agrupadas por dia (UTC)
    pub async fn revenue_by_day<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyRevenueRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, DailyRevenueRow>(
            r#"
            SELECT
                day::date AS day,
                COALESCE(SUM(sales_total), 0) AS sales_total,
                COALESCE(SUM(service_total), 0) AS service_total
            FROM (
                SELECT date_trunc('day', created_at AT TIME ZONE 'UTC') AS day,
                       total AS sales_total, 0::numeric AS service_total
                FROM sales
                WHERE tenant_id = $1 AND status = 'COMPLETED' AND created_at >= $2
                UNION ALL
                SELECT date_trunc('day', delivered_at AT TIME ZONE 'UTC'), 0::numeric, total
                FROM service_orders
                WHERE tenant_id = $1 AND status = 'DELIVERED' AND delivered_at >= $2
            ) revenue
            GROUP BY day
            ORDER BY day
            "#,
        )
            .bind(tenant_id)
            .bind(since)
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    pub async fn top_products_since<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TopProductRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                si.product_id,
                MAX(si.description) AS product_name,
                SUM(si.quantity) AS total_quantity,
                SUM(si.total) AS total_revenue
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE s.tenant_id = $1 AND s.status = 'COMPLETED' AND s.created_at >= $2
            GROUP BY si.product_id
            ORDER BY total_revenue DESC
            LIMIT $3
            "#,
        )
            .bind(tenant_id)
            .bind(since)
            .bind(TOP_PRODUCTS_LIMIT)
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }
}
