use bigdecimal::BigDecimal;
use num_traits::Signed;

use crate::constants::MAX_BIND_PARAMS;
use crate::error::{StoreError, StoreResult};

/// Fractional digits of a `NUMERIC(12,2)` column.
pub const AMOUNT_SCALE: i64 = 2;
/// Integer digits of a `NUMERIC(12,2)` column.
const AMOUNT_INTEGER_DIGITS: u32 = 10;

pub fn not_blank(field: &'static str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::validation(field, "must not be blank"));
    }
    Ok(())
}

pub fn max_len(field: &'static str, value: Option<&str>, max: usize) -> StoreResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(StoreError::validation(
            field,
            format!("longer than {max} characters"),
        )),
        _ => Ok(()),
    }
}

/// The text a changeset writes to a nullable column, if it writes one.
pub fn new_text(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().and_then(|v| v.as_deref())
}

/// Non-negative and representable as `NUMERIC(12,2)` without rounding.
pub fn non_negative_amount(field: &'static str, value: &BigDecimal) -> StoreResult<()> {
    if value.is_negative() {
        return Err(StoreError::validation(field, "must not be negative"));
    }
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    if scale > AMOUNT_SCALE {
        return Err(StoreError::validation(
            field,
            format!("more than {AMOUNT_SCALE} fractional digits"),
        ));
    }
    if *value >= BigDecimal::from(10_i64.pow(AMOUNT_INTEGER_DIGITS)) {
        return Err(StoreError::validation(
            field,
            format!("more than {AMOUNT_INTEGER_DIGITS} integer digits"),
        ));
    }
    Ok(())
}

pub fn non_negative(field: &'static str, value: i32) -> StoreResult<()> {
    if value < 0 {
        return Err(StoreError::validation(field, "must not be negative"));
    }
    Ok(())
}

pub fn positive(field: &'static str, value: i32) -> StoreResult<()> {
    if value <= 0 {
        return Err(StoreError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

/// Rows per INSERT: `batch_size`, lowered so one statement never binds more
/// than PostgreSQL's parameter limit for a record of `columns` values.
pub fn chunk_len(batch_size: usize, columns: usize) -> StoreResult<usize> {
    if batch_size == 0 {
        return Err(StoreError::validation("batch_size", "must be greater than zero"));
    }
    Ok(batch_size.min(MAX_BIND_PARAMS / columns.max(1)))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(max_len("category", Some("ééé"), 3).is_ok());
        assert!(max_len("category", Some("abcd"), 3).is_err());
        assert!(max_len("category", None, 0).is_ok());
    }

    #[test]
    fn zero_amount_is_allowed() {
        assert!(non_negative_amount("price", &BigDecimal::from(0)).is_ok());
        let negative = BigDecimal::from_str("-0.01").unwrap();
        assert!(non_negative_amount("price", &negative).is_err());
    }

    #[test]
    fn amounts_must_fit_two_decimals() {
        let amount = |v: &str| BigDecimal::from_str(v).unwrap();

        assert!(non_negative_amount("price", &amount("9.99")).is_ok());
        assert!(non_negative_amount("price", &amount("9.990")).is_ok());
        assert!(non_negative_amount("price", &amount("100")).is_ok());
        let largest = amount("9999999999.99");
        assert!(non_negative_amount("price", &largest).is_ok());

        let err = non_negative_amount("price", &amount("9.999")).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "price", .. }));
        assert!(non_negative_amount("price", &amount("10000000000")).is_err());
    }

    #[test]
    fn chunks_stay_under_the_parameter_limit() {
        assert_eq!(chunk_len(1000, 8).unwrap(), 1000);
        assert_eq!(chunk_len(10_000, 8).unwrap(), 8191);
        assert_eq!(chunk_len(usize::MAX, 6).unwrap(), 10_922);
        assert!(8191 * 8 <= MAX_BIND_PARAMS);

        let err = chunk_len(0, 8).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "batch_size", .. }));
    }

    #[test]
    fn blank_strings_are_rejected() {
        let err = not_blank("product_name", "   ").unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "product_name", .. }));
    }
}
