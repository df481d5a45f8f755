// src/services/cash_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::round_money},
    db::{cash_repo::NewCashMovement, CashRepository},
    models::cash::{
        check_withdrawal, CashClosing, CashMovement, CashMovementCategory, CashSession,
        CashSessionSummary, CashTotals, PaymentMethod, Reconciliation,
    },
};

/// Lançamento manual (suprimento ou sangria).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualMovementKind {
    Supply,
    Withdrawal,
}

impl ManualMovementKind {
    fn category(self) -> CashMovementCategory {
        match self {
            Self::Supply => CashMovementCategory::Supply,
            Self::Withdrawal => CashMovementCategory::Withdrawal,
        }
    }
}

/// Lançamento automático vindo de uma venda ou OS.
#[derive(Debug, Clone)]
pub struct LinkedCashEntry<'a> {
    pub category: CashMovementCategory,
    pub amount: Decimal,
    pub description: &'a str,
    pub payment_method: Option<PaymentMethod>,
    pub sale_id: Option<Uuid>,
    pub service_order_id: Option<Uuid>,
    pub user_id: Uuid,
}

impl LinkedCashEntry<'_> {
    /// Estorno em dinheiro sai da gaveta; estorno de PIX/cartão não.
    fn takes_cash_from_drawer(&self) -> bool {
        self.category == CashMovementCategory::Withdrawal
            && self.payment_method.is_none_or(PaymentMethod::is_cash)
    }
}

#[derive(Clone)]
pub struct CashService {
    cash_repo: CashRepository,
}

impl CashService {
    pub fn new(cash_repo: CashRepository) -> Self {
        Self { cash_repo }
    }

    // --- ABERTURA ---
    pub async fn open_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        opening_float: Decimal,
        user_id: Uuid,
    ) -> Result<CashSession, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let opening_float = round_money(opening_float);
        if opening_float.is_sign_negative() {
            return Err(AppError::NonPositiveAmount);
        }

        let mut tx = executor.begin().await?;

        // Checagem amigável; o índice parcial cobre a corrida entre duas aberturas.
        if self.cash_repo.find_open_session(&mut *tx, tenant_id).await?.is_some() {
            return Err(AppError::CashSessionAlreadyOpen);
        }

        let session = self.cash_repo
            .create_session(&mut *tx, tenant_id, opening_float, user_id)
            .await?;

        // Registro informativo: o fundo de troco entra no saldo pela sessão.
        self.cash_repo
            .insert_movement(
                &mut *tx,
                tenant_id,
                &NewCashMovement {
                    session_id: session.id,
                    category: CashMovementCategory::Opening,
                    amount: opening_float,
                    description: Some("Abertura de caixa"),
                    payment_method: None,
                    sale_id: None,
                    service_order_id: None,
                    user_id: Some(user_id),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(session_id = %session.id, tenant_id = %tenant_id, float = %opening_float, "Caixa aberto");
        Ok(session)
    }

    // --- SUPRIMENTO / SANGRIA ---
    pub async fn add_movement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        kind: ManualMovementKind,
        amount: Decimal,
        description: Option<&str>,
        user_id: Uuid,
    ) -> Result<CashMovement, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::NonPositiveAmount);
        }

        let mut tx = executor.begin().await?;

        let session = self.cash_repo
            .find_open_session_for_update(&mut *tx, tenant_id)
            .await?
            .ok_or(AppError::CashSessionNotOpen)?;

        if kind == ManualMovementKind::Withdrawal {
            let balance = self.current_balance(&mut *tx, tenant_id, &session).await?;
            check_withdrawal(balance, amount)?;
        }

        let category = kind.category();
        let movement = self.cash_repo
            .insert_movement(
                &mut *tx,
                tenant_id,
                &NewCashMovement {
                    session_id: session.id,
                    category,
                    amount: category.signed(amount),
                    description,
                    payment_method: None,
                    sale_id: None,
                    service_order_id: None,
                    user_id: Some(user_id),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(session_id = %session.id, category = ?category, amount = %movement.amount, "Lançamento de caixa");
        Ok(movement)
    }

    /// Trava a sessão aberta dentro da transação de quem chama.
    /// Vendas e OS travam o caixa antes dos produtos (mesma ordem em todo lugar).
    pub(crate) async fn lock_open_session(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
    ) -> Result<CashSession, AppError> {
        self.cash_repo
            .find_open_session_for_update(conn, tenant_id)
            .await?
            .ok_or(AppError::CashSessionNotOpen)
    }

    /// Lançamento de venda/OS numa sessão já travada pelo chamador.
    /// Estornos em dinheiro passam pela checagem de saldo da gaveta.
    pub(crate) async fn record_in_session(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        session: &CashSession,
        entry: &LinkedCashEntry<'_>,
    ) -> Result<CashMovement, AppError> {
        if !session.is_open() {
            return Err(AppError::CashSessionClosed);
        }

        let amount = round_money(entry.amount.abs());
        if entry.takes_cash_from_drawer() {
            let balance = self.current_balance(&mut *conn, tenant_id, session).await?;
            check_withdrawal(balance, amount)?;
        }

        self.cash_repo
            .insert_movement(
                &mut *conn,
                tenant_id,
                &NewCashMovement {
                    session_id: session.id,
                    category: entry.category,
                    amount: entry.category.signed(amount),
                    description: Some(entry.description),
                    payment_method: entry.payment_method,
                    sale_id: entry.sale_id,
                    service_order_id: entry.service_order_id,
                    user_id: Some(entry.user_id),
                },
            )
            .await
    }

    pub(crate) async fn lock_session(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<CashSession, AppError> {
        self.cash_repo
            .get_session_for_update(conn, tenant_id, session_id)
            .await?
            .ok_or(AppError::NotFound("cash_session"))
    }

    async fn current_balance(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        session: &CashSession,
    ) -> Result<Decimal, AppError> {
        let movements = self.cash_repo.list_movements(conn, tenant_id, session.id).await?;
        Ok(CashTotals::from_movements(&movements).expected_balance(session.opening_float))
    }

    // --- FECHAMENTO ---
    // Os totais são recalculados aqui a partir do livro, com a sessão travada.
    pub async fn close_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        counted_amount: Decimal,
        notes: Option<&str>,
        user_id: Uuid,
    ) -> Result<CashClosing, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let counted_amount = round_money(counted_amount);
        if counted_amount.is_sign_negative() {
            return Err(AppError::NonPositiveAmount);
        }

        let mut tx = executor.begin().await?;

        let session = self.cash_repo
            .find_open_session_for_update(&mut *tx, tenant_id)
            .await?
            .ok_or(AppError::CashSessionNotOpen)?;

        let movements = self.cash_repo.list_movements(&mut *tx, tenant_id, session.id).await?;
        let totals = CashTotals::from_movements(&movements);
        let expected = totals.expected_balance(session.opening_float);
        let reconciliation = Reconciliation::compute(expected, counted_amount);

        let closed = self.cash_repo
            .close_session(&mut *tx, tenant_id, session.id, &totals, &reconciliation, notes, user_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            session_id = %closed.id,
            expected = %reconciliation.expected,
            counted = %reconciliation.counted,
            variance = %reconciliation.variance,
            "Caixa fechado ({})",
            reconciliation.label
        );

        Ok(CashClosing { session: closed, totals, reconciliation })
    }

    // --- CONSULTAS ---

    pub async fn current_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<CashSessionSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let Some(session) = self.cash_repo.find_open_session(&mut *conn, tenant_id).await? else {
            return Ok(None);
        };
        let movements = self.cash_repo.list_movements(&mut *conn, tenant_id, session.id).await?;
        Ok(Some(CashSessionSummary::build(session, &movements)))
    }

    pub async fn get_session<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<CashSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.cash_repo
            .get_session(executor, tenant_id, session_id)
            .await?
            .ok_or(AppError::NotFound("cash_session"))
    }

    pub async fn list_sessions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<CashSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = limit.unwrap_or(30).clamp(1, 365);
        self.cash_repo.list_sessions(executor, tenant_id, limit).await
    }

    /// Visão agregada: totais por categoria e por forma de pagamento.
    pub async fn session_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<CashSessionSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let session = self.cash_repo
            .get_session(&mut *conn, tenant_id, session_id)
            .await?
            .ok_or(AppError::NotFound("cash_session"))?;
        let movements = self.cash_repo.list_movements(&mut *conn, tenant_id, session.id).await?;
        Ok(CashSessionSummary::build(session, &movements))
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<CashMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        // 404 em vez de lista vazia para sessão inexistente
        self.cash_repo
            .get_session(&mut *conn, tenant_id, session_id)
            .await?
            .ok_or(AppError::NotFound("cash_session"))?;
        self.cash_repo.list_movements(&mut *conn, tenant_id, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refund(payment_method: Option<PaymentMethod>) -> LinkedCashEntry<'static> {
        LinkedCashEntry {
            category: CashMovementCategory::Withdrawal,
            amount: Decimal::from(100),
            description: "Estorno da venda #1",
            payment_method,
            sale_id: Some(Uuid::new_v4()),
            service_order_id: None,
            user_id: Uuid::nil(),
        }
    }

    #[test]
    fn only_cash_refunds_are_checked_against_the_drawer() {
        assert!(refund(Some(PaymentMethod::Cash)).takes_cash_from_drawer());
        assert!(refund(None).takes_cash_from_drawer());
        assert!(!refund(Some(PaymentMethod::Pix)).takes_cash_from_drawer());
        assert!(!refund(Some(PaymentMethod::CreditCard)).takes_cash_from_drawer());

        let mut sale = refund(Some(PaymentMethod::Cash));
        sale.category = CashMovementCategory::Sale;
        assert!(!sale.takes_cash_from_drawer());
    }
}
