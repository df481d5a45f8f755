// src/common/money.rs

use rust_decimal::{Decimal, RoundingStrategy};

/// Arredonda um valor monetário para centavos (meio para cima, como no caixa).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formata em reais: `R$ 1.234,56` (negativos como `-R$ 20,00`).
pub fn format_brl(value: Decimal) -> String {
    let rounded = round_money(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    // Separador de milhar
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-R$ {},{}", grouped, frac_part)
    } else {
        format!("R$ {},{}", grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_cent_up() {
        assert_eq!(round_money(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_money(Decimal::new(-10005, 3)), Decimal::new(-1001, 2));
    }

    #[test]
    fn formats_brazilian_currency() {
        assert_eq!(format_brl(Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(format_brl(Decimal::new(5, 1)), "R$ 0,50");
        assert_eq!(format_brl(Decimal::new(-2000, 2)), "-R$ 20,00");
        assert_eq!(format_brl(Decimal::new(100000000, 2)), "R$ 1.000.000,00");
    }
}
