// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{Product, StockMovement, StockMovementFilter, StockMovementKind},
};

/// Dados de cadastro de um produto (sem estoque: o saldo inicial entra como movimentação).
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub sku: &'a str,
    pub barcode: Option<&'a str>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub min_stock: Decimal,
}

/// Campos alteráveis do cadastro. `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges<'a> {
    pub barcode: Option<&'a str>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub min_stock: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Clone, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewProduct<'_>,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (tenant_id, sku, barcode, name, description, category, cost_price, sale_price, min_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(input.sku)
            .bind(input.barcode)
            .bind(input.name)
            .bind(input.description)
            .bind(input.category)
            .bind(input.cost_price)
            .bind(input.sale_price)
            .bind(input.min_stock)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.constraint() == Some("products_tenant_sku_key") {
                        return AppError::SkuAlreadyExists(input.sku.to_string());
                    }
                }
                e.into()
            })
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        changes: &ProductChanges<'_>,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                barcode = COALESCE($3, barcode),
                name = COALESCE($4, name),
                description = COALESCE($5, description),
                category = COALESCE($6, category),
                cost_price = COALESCE($7, cost_price),
                sale_price = COALESCE($8, sale_price),
                min_stock = COALESCE($9, min_stock),
                active = COALESCE($10, active),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(product_id)
            .bind(changes.barcode)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.category)
            .bind(changes.cost_price)
            .bind(changes.sale_price)
            .bind(changes.min_stock)
            .bind(changes.active)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        search: Option<&str>,
        low_stock_only: bool,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pattern = search.map(|s| format!("%{}%", s.trim()));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2 OR barcode ILIKE $2)
              AND (NOT $3 OR current_stock <= min_stock)
            ORDER BY name ASC
            "#,
        )
            .bind(tenant_id)
            .bind(pattern)
            .bind(low_stock_only)
            .fetch_all(executor)
            .await?;

        Ok(products)
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Lê o produto travando a linha até o fim da transação.
    pub async fn get_product_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(tenant_id)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    pub async fn set_current_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        new_balance: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE products
            SET current_stock = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
            .bind(tenant_id)
            .bind(product_id)
            .bind(new_balance)
            .execute(executor)
            .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_stock_movement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        kind: StockMovementKind,
        quantity: Decimal,
        balance_before: Decimal,
        balance_after: Decimal,
        reason: Option<&str>,
        reference_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements
                (tenant_id, product_id, kind, quantity, balance_before, balance_after, reason, reference_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(product_id)
            .bind(kind)
            .bind(quantity)
            .bind(balance_before)
            .bind(balance_after)
            .bind(reason)
            .bind(reference_id)
            .bind(user_id)
            .fetch_one(executor)
            .await?;

        Ok(movement)
    }

    pub async fn list_stock_movements<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &StockMovementFilter,
        limit: RowLimit,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR product_id = $2)
              AND ($3::stock_movement_kind IS NULL OR kind = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            LIMIT $6::bigint
            "#,
        )
            .bind(tenant_id)
            .bind(filter.product_id)
            .bind(filter.kind)
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit.as_sql())
            .fetch_all(executor)
            .await?;

        Ok(movements)
    }
}

/// Limite padrão das listagens (e teto).
pub(crate) fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, 1000)
}

/// Quantas linhas uma consulta devolve: página da API ou tudo (exportação).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    Page(Option<i64>),
    Unbounded,
}

impl RowLimit {
    /// Valor de `LIMIT $n`; `NULL` no Postgres é "sem limite".
    pub(crate) fn as_sql(self) -> Option<i64> {
        match self {
            Self::Page(limit) => Some(clamp_limit(limit)),
            Self::Unbounded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_limit, RowLimit};

    #[test]
    fn listing_limit_has_default_and_bounds() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(10_000)), 1000);
    }

    #[test]
    fn unbounded_listing_binds_a_null_limit() {
        assert_eq!(RowLimit::Unbounded.as_sql(), None);
        assert_eq!(RowLimit::Page(None).as_sql(), Some(100));
        assert_eq!(RowLimit::Page(Some(5_000)).as_sql(), Some(1000));
    }
}
