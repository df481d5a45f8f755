// src/models/cash.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::{error::AppError, money::round_money};

/// Diferenças abaixo de um centavo contam como "sem diferença".
pub const VARIANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cash_session_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashSessionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cash_movement_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashMovementCategory {
    Opening,      // Abertura (informativo, o fundo de troco vem da sessão)
    Sale,         // Venda
    ServiceOrder, // Recebimento de OS
    Supply,       // Suprimento
    Withdrawal,   // Sangria
}

impl CashMovementCategory {
    /// Valor com sinal como é gravado no livro: sangria é negativa.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Withdrawal => -amount.abs(),
            _ => amount.abs(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Opening => "Abertura",
            Self::Sale => "Venda",
            Self::ServiceOrder => "OS",
            Self::Supply => "Suprimento",
            Self::Withdrawal => "Sangria",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
}

impl PaymentMethod {
    /// Só dinheiro vivo passa pela gaveta.
    pub fn is_cash(self) -> bool {
        self == Self::Cash
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cash => "Dinheiro",
            Self::Pix => "PIX",
            Self::CreditCard => "Cartão de crédito",
            Self::DebitCard => "Cartão de débito",
        }
    }
}

// --- Structs ---

/// Sessão de caixa. Os totais só são gravados no fechamento.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashSession {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub status: CashSessionStatus,
    #[schema(example = "100.00")]
    pub opening_float: Decimal,
    pub opened_by: Option<Uuid>,
    pub opened_at: DateTime<Utc>,
    pub total_sales: Option<Decimal>,
    pub total_service_orders: Option<Decimal>,
    pub total_supplies: Option<Decimal>,
    pub total_withdrawals: Option<Decimal>,
    pub expected_balance: Option<Decimal>,
    pub counted_amount: Option<Decimal>,
    pub variance: Option<Decimal>,
    pub closing_notes: Option<String>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashSession {
    pub fn is_open(&self) -> bool {
        self.status == CashSessionStatus::Open
    }
}

/// Linha do livro de caixa. Nunca é alterada nem apagada.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub category: CashMovementCategory,
    #[schema(example = "-20.00")]
    pub amount: Decimal,
    #[schema(example = "Sangria para depósito")]
    pub description: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub sale_id: Option<Uuid>,
    pub service_order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Totais por categoria de uma sessão (todas as formas de pagamento).
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashTotals {
    pub sales: Decimal,
    pub service_orders: Decimal,
    pub supplies: Decimal,
    // Sempre positivo (magnitude das sangrias)
    pub withdrawals: Decimal,
    /// Saldo líquido de PIX e cartões: entra nos totais, mas não na gaveta.
    pub non_cash: Decimal,
}

impl CashTotals {
    pub fn from_movements(movements: &[CashMovement]) -> Self {
        let mut totals = CashTotals::default();
        for movement in movements {
            totals.add(movement.category, movement.payment_method, movement.amount);
        }
        totals
    }

    /// `payment_method = None` é lançamento manual, sempre em dinheiro.
    pub fn add(
        &mut self,
        category: CashMovementCategory,
        payment_method: Option<PaymentMethod>,
        signed_amount: Decimal,
    ) {
        match category {
            CashMovementCategory::Opening => return,
            CashMovementCategory::Sale => self.sales += signed_amount,
            CashMovementCategory::ServiceOrder => self.service_orders += signed_amount,
            CashMovementCategory::Supply => self.supplies += signed_amount,
            CashMovementCategory::Withdrawal => self.withdrawals += -signed_amount,
        }
        if payment_method.is_some_and(|m| !m.is_cash()) {
            self.non_cash += signed_amount;
        }
    }

    pub fn inflows(&self) -> Decimal {
        self.sales + self.service_orders + self.supplies
    }

    /// Dinheiro esperado na gaveta: `abertura + entradas − saídas`, só em espécie.
    pub fn expected_balance(&self, opening_float: Decimal) -> Decimal {
        round_money(opening_float + self.inflows() - self.withdrawals - self.non_cash)
    }
}

/// Rejeita sangria maior que o saldo corrente.
pub fn check_withdrawal(current_balance: Decimal, amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::NonPositiveAmount);
    }
    if amount > current_balance {
        return Err(AppError::WithdrawalExceedsBalance {
            requested: amount,
            available: current_balance,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarianceStatus {
    NoDifference,
    Surplus,
    Shortage,
}

impl VarianceStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoDifference => "sem diferença",
            Self::Surplus => "sobra",
            Self::Shortage => "falta",
        }
    }
}

/// Conferência do fechamento: `variance = counted − expected`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub expected: Decimal,
    pub counted: Decimal,
    pub variance: Decimal,
    pub status: VarianceStatus,
    pub label: String,
}

impl Reconciliation {
    pub fn compute(expected: Decimal, counted: Decimal) -> Self {
        let variance = round_money(counted - expected);
        let status = if variance.abs() < VARIANCE_TOLERANCE {
            VarianceStatus::NoDifference
        } else if variance.is_sign_positive() {
            VarianceStatus::Surplus
        } else {
            VarianceStatus::Shortage
        };

        Self {
            expected,
            counted,
            variance,
            status,
            label: status.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub label: String,
    pub total: Decimal,
}

/// Visão agregada de uma sessão (recalculada a cada consulta).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashSessionSummary {
    pub session: CashSession,
    pub totals: CashTotals,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub current_balance: Decimal,
    pub movement_count: usize,
}

impl CashSessionSummary {
    pub fn build(session: CashSession, movements: &[CashMovement]) -> Self {
        let totals = CashTotals::from_movements(movements);
        let current_balance = totals.expected_balance(session.opening_float);

        let mut by_method: BTreeMap<PaymentMethod, Decimal> = BTreeMap::new();
        for movement in movements {
            if let Some(method) = movement.payment_method {
                *by_method.entry(method).or_default() += movement.amount;
            }
        }

        let by_payment_method = by_method
            .into_iter()
            .map(|(payment_method, total)| PaymentMethodTotal {
                payment_method,
                label: payment_method.label().to_string(),
                total,
            })
            .collect();

        Self {
            session,
            totals,
            by_payment_method,
            current_balance,
            movement_count: movements.len(),
        }
    }
}

/// Resultado do fechamento devolvido ao cliente.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashClosing {
    pub session: CashSession,
    pub totals: CashTotals,
    pub reconciliation: Reconciliation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn movement(category: CashMovementCategory, amount: &str) -> CashMovement {
        CashMovement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            category,
            amount: category.signed(money(amount)),
            description: None,
            payment_method: match category {
                CashMovementCategory::Sale => Some(PaymentMethod::Cash),
                _ => None,
            },
            sale_id: None,
            service_order_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    fn session(opening: &str) -> CashSession {
        CashSession {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            status: CashSessionStatus::Open,
            opening_float: money(opening),
            opened_by: None,
            opened_at: Utc::now(),
            total_sales: None,
            total_service_orders: None,
            total_supplies: None,
            total_withdrawals: None,
            expected_balance: None,
            counted_amount: None,
            variance: None,
            closing_notes: None,
            closed_by: None,
            closed_at: None,
        }
    }

    #[test]
    fn withdrawal_is_stored_negative() {
        assert_eq!(CashMovementCategory::Withdrawal.signed(money("20")), money("-20"));
        assert_eq!(CashMovementCategory::Supply.signed(money("20")), money("20"));
    }

    #[test]
    fn closing_scenario_without_difference() {
        // abertura 100, venda 50, sangria 20, contado 130
        let movements = vec![
            movement(CashMovementCategory::Opening, "100.00"),
            movement(CashMovementCategory::Sale, "50.00"),
            movement(CashMovementCategory::Withdrawal, "20.00"),
        ];
        let totals = CashTotals::from_movements(&movements);
        let expected = totals.expected_balance(money("100.00"));
        assert_eq!(expected, money("130.00"));

        let rec = Reconciliation::compute(expected, money("130.00"));
        assert_eq!(rec.variance, Decimal::ZERO);
        assert_eq!(rec.status, VarianceStatus::NoDifference);
        assert_eq!(rec.label, "sem diferença");
    }

    #[test]
    fn opening_movement_is_not_counted_twice() {
        let movements = vec![movement(CashMovementCategory::Opening, "100.00")];
        let totals = CashTotals::from_movements(&movements);
        assert_eq!(totals.expected_balance(money("100.00")), money("100.00"));
    }

    #[test]
    fn variance_is_counted_minus_expected() {
        let movements = vec![
            movement(CashMovementCategory::Sale, "80.00"),
            movement(CashMovementCategory::ServiceOrder, "150.00"),
            movement(CashMovementCategory::Supply, "30.00"),
            movement(CashMovementCategory::Withdrawal, "60.00"),
        ];
        let totals = CashTotals::from_movements(&movements);
        assert_eq!(totals.withdrawals, money("60.00"));
        let expected = totals.expected_balance(money("50.00"));
        assert_eq!(expected, money("250.00"));

        let short = Reconciliation::compute(expected, money("245.50"));
        assert_eq!(short.variance, money("-4.50"));
        assert_eq!(short.status, VarianceStatus::Shortage);

        let over = Reconciliation::compute(expected, money("251.00"));
        assert_eq!(over.variance, money("1.00"));
        assert_eq!(over.label, "sobra");
    }

    #[test]
    fn sub_cent_variance_is_no_difference() {
        let rec = Reconciliation::compute(money("100.00"), money("100.004"));
        assert_eq!(rec.status, VarianceStatus::NoDifference);
        let rec = Reconciliation::compute(money("100.00"), money("99.99"));
        assert_eq!(rec.status, VarianceStatus::Shortage);
    }

    #[test]
    fn withdrawal_above_balance_is_rejected() {
        assert!(check_withdrawal(money("50"), money("50")).is_ok());
        assert!(matches!(
            check_withdrawal(money("50"), money("50.01")),
            Err(AppError::WithdrawalExceedsBalance { .. })
        ));
        assert!(matches!(
            check_withdrawal(money("50"), Decimal::ZERO),
            Err(AppError::NonPositiveAmount)
        ));
    }

    fn paid_with(category: CashMovementCategory, amount: &str, method: PaymentMethod) -> CashMovement {
        let mut m = movement(category, amount);
        m.payment_method = Some(method);
        m
    }

    #[test]
    fn pix_sale_does_not_fund_a_cash_withdrawal() {
        let movements = vec![paid_with(CashMovementCategory::Sale, "100.00", PaymentMethod::Pix)];
        let totals = CashTotals::from_movements(&movements);

        assert_eq!(totals.sales, money("100.00"));
        assert_eq!(totals.non_cash, money("100.00"));
        let balance = totals.expected_balance(Decimal::ZERO);
        assert_eq!(balance, Decimal::ZERO);
        assert!(matches!(
            check_withdrawal(balance, money("100.00")),
            Err(AppError::WithdrawalExceedsBalance { .. })
        ));

        // Gaveta vazia no fechamento bate com o esperado
        let rec = Reconciliation::compute(balance, Decimal::ZERO);
        assert_eq!(rec.status, VarianceStatus::NoDifference);
    }

    #[test]
    fn card_receipts_and_their_refunds_stay_out_of_the_drawer() {
        let movements = vec![
            paid_with(CashMovementCategory::ServiceOrder, "250.00", PaymentMethod::CreditCard),
            paid_with(CashMovementCategory::Sale, "40.00", PaymentMethod::DebitCard),
            paid_with(CashMovementCategory::Withdrawal, "40.00", PaymentMethod::DebitCard),
            movement(CashMovementCategory::Sale, "30.00"),
        ];
        let totals = CashTotals::from_movements(&movements);

        assert_eq!(totals.non_cash, money("250.00"));
        assert_eq!(totals.expected_balance(money("50.00")), money("80.00"));
    }

    #[test]
    fn summary_groups_by_payment_method() {
        let mut pix_sale = movement(CashMovementCategory::Sale, "40.00");
        pix_sale.payment_method = Some(PaymentMethod::Pix);
        let movements = vec![
            movement(CashMovementCategory::Sale, "10.00"),
            movement(CashMovementCategory::Sale, "15.00"),
            pix_sale,
        ];
        let summary = CashSessionSummary::build(session("20.00"), &movements);
        // O PIX aparece por forma de pagamento, mas não soma na gaveta
        assert_eq!(summary.current_balance, money("45.00"));
        assert_eq!(summary.movement_count, 3);
        assert_eq!(summary.by_payment_method.len(), 2);
        assert_eq!(summary.by_payment_method[0].payment_method, PaymentMethod::Cash);
        assert_eq!(summary.by_payment_method[0].total, money("25.00"));
        assert_eq!(summary.by_payment_method[1].total, money("40.00"));
    }
}
