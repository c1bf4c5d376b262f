//! Serde support for money columns read from JSON or CSV.
//!
//! Amounts are taken from their decimal text so `"19.90"` keeps its digits;
//! bare numbers (JSON numbers, unquoted CSV fields) go through their shortest
//! decimal rendering instead of the binary expansion of the float.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserializer;
use serde::de::{self, Visitor};

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = BigDecimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BigDecimal, E> {
        BigDecimal::from_str(v.trim())
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigDecimal, E> {
        Ok(BigDecimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigDecimal, E> {
        Ok(BigDecimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigDecimal, E> {
        if !v.is_finite() {
            return Err(E::invalid_value(de::Unexpected::Float(v), &self));
        }
        self.visit_str(&v.to_string())
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(AmountVisitor)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "deserialize")]
        price: BigDecimal,
    }

    fn price(json: &str) -> BigDecimal {
        serde_json::from_str::<Row>(json).unwrap().price
    }

    #[test]
    fn keeps_decimal_text() {
        let value = price(r#"{"price": "19.90"}"#);
        assert_eq!(value, BigDecimal::from_str("19.90").unwrap());
        assert_eq!(value.as_bigint_and_exponent().1, 2);
    }

    #[test]
    fn float_numbers_use_shortest_rendering() {
        let value = price(r#"{"price": 9.99}"#);
        assert_eq!(value, BigDecimal::from_str("9.99").unwrap());
        assert_eq!(value.normalized().as_bigint_and_exponent().1, 2);
        assert_eq!(price(r#"{"price": 12}"#), BigDecimal::from(12));
    }

    #[test]
    fn rejects_garbage() {
        let parsed = serde_json::from_str::<Row>(r#"{"price": "a lot"}"#);
        assert!(parsed.is_err());
    }
}
