// src/services/sales_service.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::round_money},
    db::{inventory_repo::RowLimit, InventoryRepository, SalesRepository},
    models::{
        cash::{CashMovementCategory, PaymentMethod},
        inventory::StockMovementKind,
        sales::{PricedLine, Sale, SaleDetail, SaleFilter, SaleTotals},
    },
    services::{
        cash_service::{CashService, LinkedCashEntry},
        inventory_service::{InventoryService, StockMovementRequest},
    },
};

/// Item pedido no checkout. Sem `unit_price`, vale o preço de cadastro.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub items: Vec<CheckoutLine>,
    pub discount: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<&'a str>,
}

#[derive(Clone)]
pub struct SalesService {
    sales_repo: SalesRepository,
    inventory_repo: InventoryRepository,
    inventory_service: InventoryService,
    cash_service: CashService,
}

impl SalesService {
    pub fn new(
        sales_repo: SalesRepository,
        inventory_repo: InventoryRepository,
        inventory_service: InventoryService,
        cash_service: CashService,
    ) -> Self {
        Self { sales_repo, inventory_repo, inventory_service, cash_service }
    }

    // --- CHECKOUT ---
    // Uma transação: caixa travado, itens gravados, estoque baixado, dinheiro lançado.
    pub async fn checkout<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        request: &CheckoutRequest<'_>,
        user_id: Uuid,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if request.items.is_empty() {
            return Err(AppError::EmptySale);
        }

        let mut tx = executor.begin().await?;

        let session = self.cash_service.lock_open_session(&mut *tx, tenant_id).await?;

        // 1. Precifica (preço de cadastro ou o informado no balcão)
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = self.inventory_repo
                .get_product(&mut *tx, tenant_id, item.product_id)
                .await?
                .ok_or(AppError::NotFound("product"))?;

            if !product.active {
                return Err(AppError::ProductInactive);
            }

            lines.push(PricedLine {
                product_id: product.id,
                description: product.name,
                quantity: item.quantity,
                unit_price: round_money(item.unit_price.unwrap_or(product.sale_price)),
            });
        }

        let totals = SaleTotals::compute(&lines, request.discount)?;

        // 2. Venda e itens
        let sale = self.sales_repo
            .create_sale(
                &mut *tx,
                tenant_id,
                session.id,
                request.customer_name,
                &totals,
                request.payment_method,
                user_id,
            )
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.sales_repo.insert_item(&mut *tx, tenant_id, sale.id, line).await?);
        }

        // 3. Baixa de estoque. Produtos repetidos somam; ordem por id evita deadlock.
        let reason = format!("Venda #{}", sale.display_id);
        for (product_id, quantity) in quantities_by_product(&lines) {
            self.inventory_service
                .apply_movement(
                    &mut *tx,
                    tenant_id,
                    &StockMovementRequest {
                        product_id,
                        kind: StockMovementKind::Sale,
                        quantity,
                        reason: Some(&reason),
                        reference_id: Some(sale.id),
                        user_id: Some(user_id),
                    },
                )
                .await?;
        }

        // 4. Entrada no caixa
        if totals.total > Decimal::ZERO {
            self.cash_service
                .record_in_session(
                    &mut *tx,
                    tenant_id,
                    &session,
                    &LinkedCashEntry {
                        category: CashMovementCategory::Sale,
                        amount: totals.total,
                        description: &reason,
                        payment_method: Some(request.payment_method),
                        sale_id: Some(sale.id),
                        service_order_id: None,
                        user_id,
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            display_id = sale.display_id,
            total = %sale.total,
            payment_method = ?sale.payment_method,
            "Venda concluída"
        );

        Ok(SaleDetail { sale, items })
    }

    // --- CANCELAMENTO ---
    // Só enquanto o caixa da venda estiver aberto: devolve estoque e estorna o valor.
    pub async fn cancel_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
        user_id: Uuid,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let sale = self.sales_repo
            .get_sale(&mut *tx, tenant_id, sale_id)
            .await?
            .ok_or(AppError::NotFound("sale"))?;

        // Caixa primeiro, depois a venda e os produtos
        let session = self.cash_service.lock_session(&mut *tx, tenant_id, sale.session_id).await?;
        if !session.is_open() {
            return Err(AppError::CashSessionClosed);
        }

        let sale = self.sales_repo
            .get_sale_for_update(&mut *tx, tenant_id, sale_id)
            .await?
            .ok_or(AppError::NotFound("sale"))?;
        let cancelled = self.sales_repo.mark_cancelled(&mut *tx, tenant_id, sale.id).await?;

        let items = self.sales_repo.list_items(&mut *tx, tenant_id, sale.id).await?;
        let reason = format!("Estorno da venda #{}", sale.display_id);

        let lines: Vec<PricedLine> = items
            .iter()
            .map(|item| PricedLine {
                product_id: item.product_id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        for (product_id, quantity) in quantities_by_product(&lines) {
            self.inventory_service
                .apply_movement(
                    &mut *tx,
                    tenant_id,
                    &StockMovementRequest {
                        product_id,
                        kind: StockMovementKind::Entry,
                        quantity,
                        reason: Some(&reason),
                        reference_id: Some(sale.id),
                        user_id: Some(user_id),
                    },
                )
                .await?;
        }

        if sale.total > Decimal::ZERO {
            self.cash_service
                .record_in_session(
                    &mut *tx,
                    tenant_id,
                    &session,
                    &LinkedCashEntry {
                        category: CashMovementCategory::Withdrawal,
                        amount: sale.total,
                        description: &reason,
                        payment_method: Some(sale.payment_method),
                        sale_id: Some(sale.id),
                        service_order_id: None,
                        user_id,
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, display_id = sale.display_id, "Venda cancelada");
        Ok(SaleDetail { sale: cancelled, items })
    }

    pub async fn get_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let sale = self.sales_repo
            .get_sale(&mut *conn, tenant_id, sale_id)
            .await?
            .ok_or(AppError::NotFound("sale"))?;
        let items = self.sales_repo.list_items(&mut *conn, tenant_id, sale.id).await?;
        Ok(SaleDetail { sale, items })
    }

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.sales_repo
            .list_sales(executor, tenant_id, filter, RowLimit::Page(filter.limit))
            .await
    }
}

/// Quantidade total por produto, em ordem de id (ordem fixa de travamento).
fn quantities_by_product(lines: &[PricedLine]) -> BTreeMap<Uuid, Decimal> {
    let mut totals = BTreeMap::new();
    for line in lines {
        *totals.entry(line.product_id).or_insert(Decimal::ZERO) += line.quantity;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, qty: i64) -> PricedLine {
        PricedLine {
            product_id,
            description: "Capa".into(),
            quantity: Decimal::from(qty),
            unit_price: Decimal::from(10),
        }
    }

    #[test]
    fn repeated_products_are_merged_for_the_stock_write_off() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = quantities_by_product(&[line(a, 2), line(b, 1), line(a, 3)]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&a], Decimal::from(5));
        assert_eq!(merged[&b], Decimal::from(1));
    }

    #[test]
    fn write_off_order_is_by_product_id() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let lines: Vec<PricedLine> = ids.iter().map(|id| line(*id, 1)).collect();

        let order: Vec<Uuid> = quantities_by_product(&lines).into_keys().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }
}
