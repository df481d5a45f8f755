// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// ---
// Validações customizadas dos payloads (usadas com `#[validate(custom(...))]`)
// ---

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("exclusive_min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_negative_but_not_positive() {
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
        assert!(validate_positive(&Decimal::ZERO).is_err());
    }

    #[test]
    fn negative_values_carry_a_portuguese_message() {
        let err = validate_not_negative(&Decimal::new(-1, 2)).unwrap_err();
        assert_eq!(err.code, "range");
        assert_eq!(err.message.as_deref(), Some("O valor não pode ser negativo."));
    }
}
