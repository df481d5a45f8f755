// src/services/service_order_service.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::round_money},
    db::{service_order_repo::NewServiceOrder, InventoryRepository, ServiceOrderRepository},
    models::{
        cash::{CashMovementCategory, PaymentMethod},
        inventory::StockMovementKind,
        service_orders::{
            ServiceOrder, ServiceOrderDetail, ServiceOrderFilter, ServiceOrderItem,
            ServiceOrderStatus, ServiceOrderTotals,
        },
    },
    services::{
        cash_service::{CashService, LinkedCashEntry},
        inventory_service::{InventoryService, StockMovementRequest},
    },
};

/// Peça (com `product_id`) ou linha de serviço livre.
#[derive(Debug, Clone)]
pub struct NewOrderItem<'a> {
    pub product_id: Option<Uuid>,
    pub description: Option<&'a str>,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

#[derive(Clone)]
pub struct ServiceOrderService {
    order_repo: ServiceOrderRepository,
    inventory_repo: InventoryRepository,
    inventory_service: InventoryService,
    cash_service: CashService,
}

impl ServiceOrderService {
    pub fn new(
        order_repo: ServiceOrderRepository,
        inventory_repo: InventoryRepository,
        inventory_service: InventoryService,
        cash_service: CashService,
    ) -> Self {
        Self { order_repo, inventory_repo, inventory_service, cash_service }
    }

    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewServiceOrder<'_>,
    ) -> Result<ServiceOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if input.labor_amount.is_sign_negative() {
            return Err(AppError::NonPositiveAmount);
        }
        let order = self.order_repo.create_order(executor, tenant_id, input).await?;
        tracing::info!(order_id = %order.id, display_id = order.display_id, "OS aberta");
        Ok(detail(order, Vec::new()))
    }

    // --- ITENS ---
    // O estoque só sai na entrega; aqui a OS apenas acumula o orçamento.
    pub async fn add_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        input: &NewOrderItem<'_>,
    ) -> Result<ServiceOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if input.quantity <= Decimal::ZERO {
            return Err(AppError::InvalidQuantity);
        }

        let mut tx = executor.begin().await?;

        let order = self.lock_order(&mut *tx, tenant_id, order_id).await?;
        if order.status.is_final() {
            return Err(AppError::ServiceOrderFinalized);
        }

        let (description, unit_price) = match input.product_id {
            Some(product_id) => {
                let product = self.inventory_repo
                    .get_product(&mut *tx, tenant_id, product_id)
                    .await?
                    .ok_or(AppError::NotFound("product"))?;
                if !product.active {
                    return Err(AppError::ProductInactive);
                }
                (
                    input.description.map(str::to_owned).unwrap_or(product.name),
                    input.unit_price.unwrap_or(product.sale_price),
                )
            }
            None => {
                let description = input
                    .description
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .ok_or(AppError::ItemDescriptionRequired)?;
                (description.to_owned(), input.unit_price.unwrap_or(Decimal::ZERO))
            }
        };

        let unit_price = round_money(unit_price);
        if unit_price.is_sign_negative() {
            return Err(AppError::NonPositiveAmount);
        }
        let total = round_money(input.quantity * unit_price);

        self.order_repo
            .insert_item(
                &mut *tx,
                tenant_id,
                order.id,
                input.product_id,
                &description,
                input.quantity,
                unit_price,
                total,
            )
            .await?;

        let items = self.order_repo.list_items(&mut *tx, tenant_id, order.id).await?;
        let totals = ServiceOrderTotals::compute(order.labor_amount, &items, order.discount)?;
        let order = self.order_repo
            .update_amounts(&mut *tx, tenant_id, order.id, order.discount, &totals)
            .await?;

        tx.commit().await?;
        Ok(detail(order, items))
    }

    // --- STATUS ---
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        next: ServiceOrderStatus,
        diagnosis: Option<&str>,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let order = self.lock_order(&mut *tx, tenant_id, order_id).await?;
        order.status.ensure_transition(next)?;

        let updated = self.order_repo
            .update_status(&mut *tx, tenant_id, order.id, next, diagnosis)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %updated.id,
            from = order.status.as_str(),
            to = next.as_str(),
            "Status da OS alterado"
        );
        Ok(updated)
    }

    // --- ENTREGA ---
    // Caixa travado primeiro, depois a OS e os produtos (mesma ordem da venda).
    pub async fn deliver<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        payment_method: PaymentMethod,
        discount: Option<Decimal>,
        user_id: Uuid,
    ) -> Result<ServiceOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let session = self.cash_service.lock_open_session(&mut *tx, tenant_id).await?;

        let order = self.lock_order(&mut *tx, tenant_id, order_id).await?;
        if order.status.is_final() {
            return Err(AppError::ServiceOrderFinalized);
        }

        let items = self.order_repo.list_items(&mut *tx, tenant_id, order.id).await?;
        let discount = round_money(discount.unwrap_or(order.discount));
        let totals = ServiceOrderTotals::compute(order.labor_amount, &items, discount)?;

        // 1. Baixa das peças
        let reason = format!("OS #{}", order.display_id);
        for (product_id, quantity) in parts_by_product(&items) {
            self.inventory_service
                .apply_movement(
                    &mut *tx,
                    tenant_id,
                    &StockMovementRequest {
                        product_id,
                        kind: StockMovementKind::ServiceOrder,
                        quantity,
                        reason: Some(&reason),
                        reference_id: Some(order.id),
                        user_id: Some(user_id),
                    },
                )
                .await?;
        }

        // 2. Recebimento no caixa
        if totals.total > Decimal::ZERO {
            self.cash_service
                .record_in_session(
                    &mut *tx,
                    tenant_id,
                    &session,
                    &LinkedCashEntry {
                        category: CashMovementCategory::ServiceOrder,
                        amount: totals.total,
                        description: &reason,
                        payment_method: Some(payment_method),
                        sale_id: None,
                        service_order_id: Some(order.id),
                        user_id,
                    },
                )
                .await?;
        }

        self.order_repo
            .update_amounts(&mut *tx, tenant_id, order.id, discount, &totals)
            .await?;
        let delivered = self.order_repo
            .mark_delivered(&mut *tx, tenant_id, order.id, payment_method, session.id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %delivered.id,
            display_id = delivered.display_id,
            total = %delivered.total,
            payment_method = ?payment_method,
            "OS entregue"
        );
        Ok(detail(delivered, items))
    }

    pub async fn get_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<ServiceOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let order = self.order_repo
            .get_order(&mut *conn, tenant_id, order_id)
            .await?
            .ok_or(AppError::NotFound("service_order"))?;
        let items = self.order_repo.list_items(&mut *conn, tenant_id, order.id).await?;
        Ok(detail(order, items))
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
        self.order_repo.list_orders(executor, tenant_id, filter).await
    }

    async fn lock_order(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<ServiceOrder, AppError> {
        self.order_repo
            .get_order_for_update(conn, tenant_id, order_id)
            .await?
            .ok_or(AppError::NotFound("service_order"))
    }
}

fn detail(order: ServiceOrder, items: Vec<ServiceOrderItem>) -> ServiceOrderDetail {
    ServiceOrderDetail {
        status_label: order.status.label().to_string(),
        order,
        items,
    }
}

/// Peças agrupadas por produto; linhas de serviço livre não mexem no estoque.
fn parts_by_product(items: &[ServiceOrderItem]) -> BTreeMap<Uuid, Decimal> {
    let mut parts = BTreeMap::new();
    for item in items {
        if let Some(product_id) = item.product_id {
            *parts.entry(product_id).or_insert(Decimal::ZERO) += item.quantity;
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(product_id: Option<Uuid>, qty: i64) -> ServiceOrderItem {
        ServiceOrderItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            service_order_id: Uuid::nil(),
            product_id,
            description: "Troca de conector".into(),
            quantity: Decimal::from(qty),
            unit_price: Decimal::from(40),
            total: Decimal::from(40 * qty),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn free_text_lines_do_not_touch_stock() {
        let screen = Uuid::new_v4();
        let parts = parts_by_product(&[item(Some(screen), 1), item(None, 1), item(Some(screen), 2)]);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[&screen], Decimal::from(3));
    }

    #[test]
    fn detail_carries_the_portuguese_status_label() {
        let now = Utc::now();
        let order = ServiceOrder {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            display_id: 7,
            customer_name: "Maria".into(),
            customer_phone: None,
            equipment: "Moto G".into(),
            reported_issue: "Tela quebrada".into(),
            diagnosis: None,
            status: ServiceOrderStatus::AwaitingParts,
            labor_amount: Decimal::from(80),
            parts_amount: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::from(80),
            payment_method: None,
            session_id: None,
            technician_id: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        };

        assert_eq!(detail(order, Vec::new()).status_label, "Aguardando peças");
    }
}
