//! Field predicates for row filtering and row colouring rules
//!
//! Evaluation never fails: unknown conditions and non-numeric operands simply
//! evaluate to `false`.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

impl Condition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "equals" => Some(Condition::Equals),
            "not_equals" => Some(Condition::NotEquals),
            "contains" => Some(Condition::Contains),
            "greater_than" => Some(Condition::GreaterThan),
            "less_than" => Some(Condition::LessThan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::NotEquals => "not_equals",
            Condition::Contains => "contains",
            Condition::GreaterThan => "greater_than",
            Condition::LessThan => "less_than",
        }
    }
}

/// String coercion: strings as-is, numbers without a trailing `.0`, null as "null"
fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Evaluate `field_value <condition> comparand`
pub fn evaluate(field_value: &Value, condition: &str, comparand: &Value) -> bool {
    let Some(condition) = Condition::parse(condition) else {
        return false;
    };

    match condition {
        Condition::Equals => coerce_string(field_value) == coerce_string(comparand),
        Condition::NotEquals => coerce_string(field_value) != coerce_string(comparand),
        Condition::Contains => coerce_string(field_value).contains(&coerce_string(comparand)),
        Condition::GreaterThan => match (coerce_number(field_value), coerce_number(comparand)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        Condition::LessThan => match (coerce_number(field_value), coerce_number(comparand)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}
