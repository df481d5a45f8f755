// src/db/cash_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cash::{
        CashMovement, CashMovementCategory, CashSession, CashTotals, PaymentMethod, Reconciliation,
    },
};

/// Lançamento a gravar no livro de caixa (valor já com sinal).
#[derive(Debug, Clone)]
pub struct NewCashMovement<'a> {
    pub session_id: Uuid,
    pub category: CashMovementCategory,
    pub amount: Decimal,
    pub description: Option<&'a str>,
    pub payment_method: Option<PaymentMethod>,
    pub sale_id: Option<Uuid>,
    pub service_order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Clone, Default)]
pub struct CashRepository;

impl CashRepository {
    pub fn new() -> Self {
        Self
    }

    /// Abre uma sessão. O índice parcial garante no máximo uma aberta por empresa.
    pub async fn create_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        opening_float: Decimal,
        opened_by: Uuid,
    ) -> Result<CashSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CashSession>(
            r#"
            INSERT INTO cash_sessions (tenant_id, status, opening_float, opened_by)
            VALUES ($1, 'OPEN', $2, $3)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(opening_float)
            .bind(opened_by)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.constraint() == Some("cash_sessions_one_open_per_tenant") {
                        return AppError::CashSessionAlreadyOpen;
                    }
                }
                e.into()
            })
    }

    pub async fn find_open_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, CashSession>(
            "SELECT * FROM cash_sessions WHERE tenant_id = $1 AND status = 'OPEN'",
        )
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    /// Sessão aberta com a linha travada: serializa lançamentos e fechamento.
    pub async fn find_open_session_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, CashSession>(
            "SELECT * FROM cash_sessions WHERE tenant_id = $1 AND status = 'OPEN' FOR UPDATE",
        )
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    pub async fn get_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, CashSession>(
            "SELECT * FROM cash_sessions WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(session_id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    pub async fn get_session_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, CashSession>(
            "SELECT * FROM cash_sessions WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(tenant_id)
            .bind(session_id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    pub async fn list_sessions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sessions = sqlx::query_as::<_, CashSession>(
            r#"
            SELECT * FROM cash_sessions
            WHERE tenant_id = $1
            ORDER BY opened_at DESC
            LIMIT $2
            "#,
        )
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(executor)
            .await?;

        Ok(sessions)
    }

    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        movement: &NewCashMovement<'_>,
    ) -> Result<CashMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, CashMovement>(
            r#"
            INSERT INTO cash_movements
                (tenant_id, session_id, category, amount, description, payment_method, sale_id, service_order_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(movement.session_id)
            .bind(movement.category)
            .bind(movement.amount)
            .bind(movement.description)
            .bind(movement.payment_method)
            .bind(movement.sale_id)
            .bind(movement.service_order_id)
            .bind(movement.user_id)
            .fetch_one(executor)
            .await?;

        Ok(row)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<CashMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, CashMovement>(
            r#"
            SELECT * FROM cash_movements
            WHERE tenant_id = $1 AND session_id = $2
            ORDER BY created_at ASC
            "#,
        )
            .bind(tenant_id)
            .bind(session_id)
            .fetch_all(executor)
            .await?;

        Ok(movements)
    }

    /// Grava os totais e a conferência e marca a sessão como fechada.
    #[allow(clippy::too_many_arguments)]
    pub async fn close_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
        totals: &CashTotals,
        reconciliation: &Reconciliation,
        notes: Option<&str>,
        closed_by: Uuid,
    ) -> Result<CashSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, CashSession>(
            r#"
            UPDATE cash_sessions SET
                status = 'CLOSED',
                total_sales = $3,
                total_service_orders = $4,
                total_supplies = $5,
                total_withdrawals = $6,
                expected_balance = $7,
                counted_amount = $8,
                variance = $9,
                closing_notes = $10,
                closed_by = $11,
                closed_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = 'OPEN'
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(session_id)
            .bind(totals.sales)
            .bind(totals.service_orders)
            .bind(totals.supplies)
            .bind(totals.withdrawals)
            .bind(reconciliation.expected)
            .bind(reconciliation.counted)
            .bind(reconciliation.variance)
            .bind(notes)
            .bind(closed_by)
            .fetch_optional(executor)
            .await?;

        session.ok_or(AppError::CashSessionClosed)
    }
}
