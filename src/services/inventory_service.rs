// src/services/inventory_service.rs

use crate::{
    common::error::AppError,
    db::{
        inventory_repo::{NewProduct, ProductChanges, RowLimit},
        InventoryRepository,
    },
    models::inventory::{Product, StockMovement, StockMovementFilter, StockMovementKind},
};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

/// Um lançamento no livro de estoque.
#[derive(Debug, Clone)]
pub struct StockMovementRequest<'a> {
    pub product_id: Uuid,
    pub kind: StockMovementKind,
    pub quantity: Decimal,
    pub reason: Option<&'a str>,
    // Venda ou OS de origem
    pub reference_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository) -> Self {
        Self { inventory_repo }
    }

    // --- CREATE PRODUCT ---
    // O estoque inicial entra como ENTRY para o histórico bater com o saldo.
    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewProduct<'_>,
        initial_stock: Decimal,
        user_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut product = self.inventory_repo
            .create_product(&mut *tx, tenant_id, input)
            .await?;

        if initial_stock > Decimal::ZERO {
            let movement = self
                .apply_movement(
                    &mut *tx,
                    tenant_id,
                    &StockMovementRequest {
                        product_id: product.id,
                        kind: StockMovementKind::Entry,
                        quantity: initial_stock,
                        reason: Some("Estoque inicial"),
                        reference_id: None,
                        user_id: Some(user_id),
                    },
                )
                .await?;
            product.current_stock = movement.balance_after;
        }

        tx.commit().await?;
        Ok(product)
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        changes: &ProductChanges<'_>,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .update_product(executor, tenant_id, product_id, changes)
            .await?
            .ok_or(AppError::NotFound("product"))
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .get_product(executor, tenant_id, product_id)
            .await?
            .ok_or(AppError::NotFound("product"))
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
        self.inventory_repo
            .list_products(executor, tenant_id, search, low_stock_only)
            .await
    }

    // --- REGISTER MOVEMENT ---
    pub async fn register_movement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        request: &StockMovementRequest<'_>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let movement = self.apply_movement(&mut *tx, tenant_id, request).await?;
        tx.commit().await?;

        tracing::info!(
            product_id = %movement.product_id,
            kind = ?movement.kind,
            before = %movement.balance_before,
            after = %movement.balance_after,
            "Movimentação de estoque registrada"
        );
        Ok(movement)
    }

    /// Lançamento dentro de uma transação já aberta (vendas e OS usam direto).
    ///
    /// Trava a linha do produto, calcula o novo saldo e só então escreve:
    /// uma saída maior que o saldo falha sem gravar nada.
    pub(crate) async fn apply_movement(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        request: &StockMovementRequest<'_>,
    ) -> Result<StockMovement, AppError> {
        let product = self.inventory_repo
            .get_product_for_update(&mut *conn, tenant_id, request.product_id)
            .await?
            .ok_or(AppError::NotFound("product"))?;

        let balance_before = product.current_stock;
        let balance_after = request.kind.apply(balance_before, request.quantity)?;

        let movement = self.inventory_repo
            .record_stock_movement(
                &mut *conn,
                tenant_id,
                product.id,
                request.kind,
                request.quantity,
                balance_before,
                balance_after,
                request.reason,
                request.reference_id,
                request.user_id,
            )
            .await?;

        self.inventory_repo
            .set_current_stock(&mut *conn, tenant_id, product.id, balance_after)
            .await?;

        Ok(movement)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &StockMovementFilter,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .list_stock_movements(executor, tenant_id, filter, RowLimit::Page(filter.limit))
            .await
    }
}
