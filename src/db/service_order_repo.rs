// src/db/service_order_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::inventory_repo::clamp_limit,
    models::{
        cash::PaymentMethod,
        service_orders::{
            ServiceOrder, ServiceOrderFilter, ServiceOrderItem, ServiceOrderStatus, ServiceOrderTotals,
        },
    },
};

#[derive(Debug, Clone)]
pub struct NewServiceOrder<'a> {
    pub customer_name: &'a str,
    pub customer_phone: Option<&'a str>,
    pub equipment: &'a str,
    pub reported_issue: &'a str,
    pub labor_amount: Decimal,
    pub technician_id: Option<Uuid>,
}

#[derive(Clone, Default)]
pub struct ServiceOrderRepository;

impl ServiceOrderRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewServiceOrder<'_>,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Sem itens ainda: total = mão de obra
        let order = sqlx::query_as::<_, ServiceOrder>(
            r#"
            INSERT INTO service_orders
                (tenant_id, customer_name, customer_phone, equipment, reported_issue,
                 labor_amount, total, technician_id)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(input.customer_name)
            .bind(input.customer_phone)
            .bind(input.equipment)
            .bind(input.reported_issue)
            .bind(input.labor_amount)
            .bind(input.technician_id)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn get_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<ServiceOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            "SELECT * FROM service_orders WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(order_id)
            .fetch_optional(executor)
            .await?;

        Ok(order)
    }

    pub async fn get_order_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<ServiceOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            "SELECT * FROM service_orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(tenant_id)
            .bind(order_id)
            .fetch_optional(executor)
            .await?;

        Ok(order)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        product_id: Option<Uuid>,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        total: Decimal,
    ) -> Result<ServiceOrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, ServiceOrderItem>(
            r#"
            INSERT INTO service_order_items
                (tenant_id, service_order_id, product_id, description, quantity, unit_price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(order_id)
            .bind(product_id)
            .bind(description)
            .bind(quantity)
            .bind(unit_price)
            .bind(total)
            .fetch_one(executor)
            .await?;

        Ok(item)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<ServiceOrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, ServiceOrderItem>(
            r#"
            SELECT * FROM service_order_items
            WHERE tenant_id = $1 AND service_order_id = $2
            ORDER BY created_at ASC
            "#,
        )
            .bind(tenant_id)
            .bind(order_id)
            .fetch_all(executor)
            .await?;

        Ok(items)
    }

    /// Regrava os valores derivados (peças, desconto, total).
    pub async fn update_amounts<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        discount: Decimal,
        totals: &ServiceOrderTotals,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            r#"
            UPDATE service_orders SET
                parts_amount = $3,
                discount = $4,
                total = $5,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(order_id)
            .bind(totals.parts_amount)
            .bind(discount)
            .bind(totals.total)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        status: ServiceOrderStatus,
        diagnosis: Option<&str>,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            r#"
            UPDATE service_orders SET
                status = $3,
                diagnosis = COALESCE($4, diagnosis),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(order_id)
            .bind(status)
            .bind(diagnosis)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn mark_delivered<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        payment_method: PaymentMethod,
        session_id: Uuid,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            r#"
            UPDATE service_orders SET
                status = 'DELIVERED',
                payment_method = $3,
                session_id = $4,
                delivered_at = NOW(),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(order_id)
            .bind(payment_method)
            .bind(session_id)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn list_orders<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ServiceOrderFilter,
    ) -> Result<Vec<ServiceOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pattern = filter.search.as_deref().map(|s| format!("%{}%", s.trim()));

        let orders = sqlx::query_as::<_, ServiceOrder>(
            r#"
            SELECT * FROM service_orders
            WHERE tenant_id = $1
              AND ($2::service_order_status IS NULL OR status = $2)
              AND ($3::text IS NULL OR customer_name ILIKE $3 OR equipment ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
            .bind(tenant_id)
            .bind(filter.status)
            .bind(pattern)
            .bind(clamp_limit(filter.limit))
            .fetch_all(executor)
            .await?;

        Ok(orders)
    }
}
