// src/services/dashboard_service.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{DashboardSummary, RevenueChartEntry, TopProductEntry},
    services::cash_service::CashService,
};

// Janela do gráfico e do ranking, contando hoje
const WINDOW_DAYS: i64 = 30;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    cash_service: CashService,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository, cash_service: CashService) -> Self {
        Self { repo, cash_service }
    }

    // --- RESUMO ---
    // Uma transação para os números saírem do mesmo retrato. O saldo do caixa
    // vem do próprio livro do caixa, igual ao que o fechamento vai calcular.
    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let today = Utc::now().date_naive();
        let mut tx = executor.begin().await?;

        let (sales_today, sales_count_today) = self.repo
            .completed_sales_since(&mut *tx, tenant_id, start_of(today))
            .await?;
        let open_service_orders = self.repo.count_open_service_orders(&mut *tx, tenant_id).await?;
        let low_stock_products = self.repo.count_low_stock(&mut *tx, tenant_id).await?;
        let cash = self.cash_service.current_session(&mut *tx, tenant_id).await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            sales_today,
            sales_count_today,
            open_service_orders,
            low_stock_products,
            cash_session_id: cash.as_ref().map(|c| c.session.id),
            cash_balance: cash.map(|c| c.current_balance),
        })
    }

    pub async fn get_revenue_chart<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<RevenueChartEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let today = Utc::now().date_naive();
        let first_day = window_start(today);

        let rows = self.repo.revenue_by_day(executor, tenant_id, start_of(first_day)).await?;
        Ok(RevenueChartEntry::fill_days(&rows, first_day, today))
    }

    pub async fn get_top_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<TopProductEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let since = start_of(window_start(Utc::now().date_naive()));
        let mut conn = executor.acquire().await?;

        let rows = self.repo.top_products_since(&mut *conn, tenant_id, since).await?;
        let (period_revenue, _) = if rows.is_empty() {
            (Decimal::ZERO, 0)
        } else {
            self.repo.completed_sales_since(&mut *conn, tenant_id, since).await?
        };

        Ok(TopProductEntry::rank(rows, period_revenue))
    }
}

fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS - 1)
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_thirty_days_including_today() {
        let today: NaiveDate = "2026-03-31".parse().unwrap();
        let first = window_start(today);

        assert_eq!(first, "2026-03-02".parse::<NaiveDate>().unwrap());
        assert_eq!(RevenueChartEntry::fill_days(&[], first, today).len(), 30);
    }

    #[test]
    fn day_starts_at_utc_midnight() {
        let day: NaiveDate = "2026-03-31".parse().unwrap();
        assert_eq!(start_of(day).to_rfc3339(), "2026-03-31T00:00:00+00:00");
    }
}
