// src/models/dashboard.rs

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::round_money;

// Cards do topo
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub sales_today: Decimal,
    pub sales_count_today: i64,
    pub open_service_orders: i64,
    pub low_stock_products: i64,
    // None quando não há caixa aberto
    pub cash_session_id: Option<Uuid>,
    pub cash_balance: Option<Decimal>,
}

/// Linha crua do banco: só os dias que tiveram movimento.
#[derive(Debug, Clone, FromRow)]
pub struct DailyRevenueRow {
    pub day: NaiveDate,
    pub sales_total: Decimal,
    pub service_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueChartEntry {
    #[schema(example = "2026-05-17")]
    pub date: NaiveDate,
    pub sales_total: Decimal,
    pub service_total: Decimal,
    pub total: Decimal,
}

impl RevenueChartEntry {
    /// Um ponto por dia, de `first_day` até `last_day`; dia sem venda vale zero.
    pub fn fill_days(rows: &[DailyRevenueRow], first_day: NaiveDate, last_day: NaiveDate) -> Vec<Self> {
        let by_day: HashMap<NaiveDate, &DailyRevenueRow> = rows.iter().map(|r| (r.day, r)).collect();

        let mut entries = Vec::new();
        let mut day = first_day;
        while day <= last_day {
            let (sales_total, service_total) = by_day
                .get(&day)
                .map(|r| (r.sales_total, r.service_total))
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            entries.push(Self {
                date: day,
                sales_total,
                service_total,
                total: sales_total + service_total,
            });
            day += Duration::days(1);
        }
        entries
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: Decimal,
    pub total_revenue: Decimal,
}

// Ranking dos mais vendidos
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductEntry {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: Decimal,
    pub total_revenue: Decimal,
    /// Participação no faturamento de vendas do período, em %.
    #[schema(example = "12.50")]
    pub revenue_share: Decimal,
}

impl TopProductEntry {
    pub fn rank(rows: Vec<TopProductRow>, period_revenue: Decimal) -> Vec<Self> {
        rows.into_iter()
            .map(|row| {
                let revenue_share = if period_revenue > Decimal::ZERO {
                    round_money(row.total_revenue * Decimal::ONE_HUNDRED / period_revenue)
                } else {
                    Decimal::ZERO
                };
                Self {
                    product_id: row.product_id,
                    product_name: row.product_name,
                    total_quantity: row.total_quantity,
                    total_revenue: row.total_revenue,
                    revenue_share,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn chart_has_one_point_per_day_with_gaps_zeroed() {
        let rows = vec![DailyRevenueRow {
            day: date("2026-03-02"),
            sales_total: Decimal::from(150),
            service_total: Decimal::from(80),
        }];

        let chart = RevenueChartEntry::fill_days(&rows, date("2026-03-01"), date("2026-03-03"));

        assert_eq!(chart.len(), 3);
        assert_eq!(chart[0].total, Decimal::ZERO);
        assert_eq!(chart[1].date, date("2026-03-02"));
        assert_eq!(chart[1].total, Decimal::from(230));
        assert_eq!(chart[2].sales_total, Decimal::ZERO);
    }

    #[test]
    fn top_products_report_their_share_of_the_period() {
        let rows = vec![TopProductRow {
            product_id: Uuid::new_v4(),
            product_name: "Película 3D".into(),
            total_quantity: Decimal::from(10),
            total_revenue: "125.00".parse().unwrap(),
        }];

        let ranked = TopProductEntry::rank(rows.clone(), "1000.00".parse().unwrap());
        assert_eq!(ranked[0].revenue_share, "12.50".parse::<Decimal>().unwrap());

        // Sem faturamento no período não divide por zero
        let ranked = TopProductEntry::rank(rows, Decimal::ZERO);
        assert_eq!(ranked[0].revenue_share, Decimal::ZERO);
    }
}
