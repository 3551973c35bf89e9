//! `int` and `decimal` codecs.

use super::{ValueCodec, ValueType};

/// Truncate toward zero, rejecting values no `i64` can hold.
pub(crate) fn truncate(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    // i64::MAX is not representable as f64; the bound below is exclusive.
    if truncated >= -9_223_372_036_854_775_808.0 && truncated < 9_223_372_036_854_775_808.0 {
        Some(truncated as i64)
    } else {
        None
    }
}

/// Integers. Fractional input is truncated toward zero: `"12.9"` decodes to 12.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

impl ValueCodec for IntCodec {
    type Runtime = Option<i64>;

    fn value_type(&self) -> ValueType {
        ValueType::Int
    }

    fn encode(&self, value: &Option<i64>) -> String {
        value.map(|value| value.to_string()).unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<i64> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().and_then(truncate))
    }
}

/// Finite decimals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalCodec;

impl ValueCodec for DecimalCodec {
    type Runtime = Option<f64>;

    fn value_type(&self) -> ValueType {
        ValueType::Decimal
    }

    fn encode(&self, value: &Option<f64>) -> String {
        value.map(|value| value.to_string()).unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<f64> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }
}
