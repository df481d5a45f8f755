// src/db/sales_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::inventory_repo::RowLimit,
    models::{
        cash::PaymentMethod,
        sales::{PricedLine, Sale, SaleFilter, SaleItem, SaleTotals},
    },
};

#[derive(Clone, Default)]
pub struct SalesRepository;

impl SalesRepository {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
        customer_name: Option<&str>,
        totals: &SaleTotals,
        payment_method: PaymentMethod,
        user_id: Uuid,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales
                (tenant_id, session_id, customer_name, subtotal, discount, total, payment_method, status, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'COMPLETED', $8)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(session_id)
            .bind(customer_name)
            .bind(totals.subtotal)
            .bind(totals.discount)
            .bind(totals.total)
            .bind(payment_method)
            .bind(user_id)
            .fetch_one(executor)
            .await?;

        Ok(sale)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
        line: &PricedLine,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (tenant_id, sale_id, product_id, description, quantity, unit_price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(sale_id)
            .bind(line.product_id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total())
            .fetch_one(executor)
            .await?;

        Ok(item)
    }

    pub async fn get_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;

        Ok(sale)
    }

    pub async fn get_sale_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;

        Ok(sale)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE tenant_id = $1 AND sale_id = $2 ORDER BY created_at",
        )
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_all(executor)
            .await?;

        Ok(items)
    }

    pub async fn mark_cancelled<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET status = 'CANCELLED', cancelled_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = 'COMPLETED'
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;

        sale.ok_or(AppError::SaleAlreadyCancelled)
    }

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &SaleFilter,
        limit: RowLimit,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR session_id = $2)
              AND ($3::sale_status IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            LIMIT $6::bigint
            "#,
        )
            .bind(tenant_id)
            .bind(filter.session_id)
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit.as_sql())
            .fetch_all(executor)
            .await?;

        Ok(sales)
    }
}
