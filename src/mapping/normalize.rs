use log::warn;

use super::mapper::DataType;
use crate::core::types::IndicatorValue;

const BOOLEAN_WORDS: [&str; 4] = ["yes", "true", "no", "false"];

/// Outcome of normalising a raw fact value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Value(IndicatorValue),
    /// Conversion to the expected numeric type failed; the trimmed text is kept
    Unconverted(String),
}

impl Normalized {
    pub fn into_value(self) -> IndicatorValue {
        match self {
            Normalized::Value(v) => v,
            Normalized::Unconverted(s) => IndicatorValue::Text(s),
        }
    }
}

/// Never fails. Blank input is always absent.
pub fn normalize_value(raw: &str, expected: Option<DataType>) -> Normalized {
    let val = raw.trim();
    if val.is_empty() {
        return Normalized::Value(IndicatorValue::Absent);
    }

    let low = val.to_lowercase();
    if expected == Some(DataType::Boolean) || BOOLEAN_WORDS.contains(&low.as_str()) {
        return Normalized::Value(IndicatorValue::Bool(low == "yes" || low == "true"));
    }

    match expected {
        Some(DataType::Integer) => match parse_float(val) {
            // i64 range check; `as` would saturate
            Some(f) if f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Normalized::Value(IndicatorValue::Int(f.trunc() as i64))
            }
            _ => {
                warn!("Could not convert '{}' to integer", val);
                Normalized::Unconverted(val.to_string())
            }
        },
        Some(DataType::Float) => match parse_float(val) {
            Some(f) => Normalized::Value(IndicatorValue::Float(f)),
            None => {
                warn!("Could not convert '{}' to float", val);
                Normalized::Unconverted(val.to_string())
            }
        },
        _ => Normalized::Value(auto_detect(val, &low)),
    }
}

fn auto_detect(val: &str, low: &str) -> IndicatorValue {
    if val.contains('.') || low.contains('e') {
        if let Some(f) = parse_float(val) {
            return IndicatorValue::Float(f);
        }
        return IndicatorValue::Text(val.to_string());
    }
    match val.parse::<i64>() {
        Ok(i) => IndicatorValue::Int(i),
        Err(_) => IndicatorValue::Text(val.to_string()),
    }
}

fn parse_float(val: &str) -> Option<f64> {
    val.parse::<f64>().ok().filter(|f| f.is_finite())
}
