//! Load-time coercion cascade.
//!
//! A stored payload may no longer match the field it is loaded into: the
//! declaring plugin changed the field's type between releases. Each
//! [`Coercion`] is a pure function proposing a candidate value from the raw
//! payload and the field's declared [`FieldHint`]. Candidates are tried in
//! [`CASCADE`] order and the first one the field accepts wins.

use crate::error::{SerialError, SerialResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use stowage_model::{FieldHint, FieldType, ModelResult};

/// A named coercion strategy.
#[derive(Clone, Copy)]
pub struct Coercion {
    pub name: &'static str,
    pub apply: fn(&str, &FieldHint) -> Option<Value>,
}

impl std::fmt::Debug for Coercion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Strategies in the order they are tried.
pub static CASCADE: [Coercion; 4] = [
    Coercion {
        name: "exact",
        apply: exact,
    },
    Coercion {
        name: "convert",
        apply: convert,
    },
    Coercion {
        name: "widen",
        apply: widen,
    },
    Coercion {
        name: "enum_from_int",
        apply: enum_from_int,
    },
];

/// The payload decoded as-is, if its JSON shape matches the hint.
pub fn exact(raw: &str, hint: &FieldHint) -> Option<Value> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    fits(&value, hint).then_some(value)
}

/// Scalar conversion towards the declared type: text to number or bool,
/// number or bool to text, bool to number and back. A payload that is not
/// JSON at all is taken as bare text.
pub fn convert(raw: &str, hint: &FieldHint) -> Option<Value> {
    let value = decode_or_text(raw);
    match hint.field_type {
        FieldType::Int => match &value {
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            Value::Bool(b) => Some(Value::from(i64::from(*b))),
            _ => None,
        },
        FieldType::Float => match &value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            Value::Bool(b) => Some(Value::from(if *b { 1.0 } else { 0.0 })),
            _ => None,
        },
        FieldType::Bool => match &value {
            Value::String(s) => s.trim().to_ascii_lowercase().parse::<bool>().ok().map(Value::Bool),
            Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            _ => None,
        },
        FieldType::Text => match value {
            Value::String(s) => Some(Value::String(s)),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        FieldType::Enum => match &value {
            Value::String(s) => hint
                .enum_variants
                .as_ref()?
                .iter()
                .find(|v| v.eq_ignore_ascii_case(s.trim()))
                .map(|v| Value::String(v.clone())),
            _ => None,
        },
        FieldType::Structured => None,
    }
}

/// Numeric payloads of any width, integral floats and numeric text,
/// funnelled through an `i64`.
#[allow(clippy::cast_precision_loss)]
pub fn widen(raw: &str, hint: &FieldHint) -> Option<Value> {
    let wide = as_i64(&decode_or_text(raw))?;
    match hint.field_type {
        FieldType::Int => Some(Value::from(wide)),
        FieldType::Float => Some(Value::from(wide as f64)),
        _ => None,
    }
}

/// An integer payload selects the enum variant at that ordinal.
pub fn enum_from_int(raw: &str, hint: &FieldHint) -> Option<Value> {
    if hint.field_type != FieldType::Enum {
        return None;
    }
    let variants = hint.enum_variants.as_ref()?;
    let ordinal = usize::try_from(as_i64(&decode_or_text(raw))?).ok()?;
    variants.get(ordinal).map(|v| Value::String(v.clone()))
}

/// First candidate the cascade produces for `raw`.
pub fn resolve(raw: &str, hint: &FieldHint) -> SerialResult<Value> {
    CASCADE
        .iter()
        .find_map(|c| (c.apply)(raw, hint))
        .ok_or_else(|| SerialError::NoCoercion {
            field_type: hint.field_type,
            reason: "payload matched no strategy".to_string(),
        })
}

/// First candidate that decodes into `V`.
pub fn resolve_as<V: DeserializeOwned>(raw: &str, hint: &FieldHint) -> Option<V> {
    CASCADE
        .iter()
        .filter_map(|c| (c.apply)(raw, hint))
        .find_map(|value| serde_json::from_value(value).ok())
}

/// Offers each candidate to `write` until one is accepted. Returns the
/// name of the winning strategy.
pub(crate) fn apply(
    raw: &str,
    hint: &FieldHint,
    mut write: impl FnMut(Value) -> ModelResult<()>,
) -> SerialResult<&'static str> {
    let mut reason = "payload matched no strategy".to_string();
    for coercion in &CASCADE {
        let Some(candidate) = (coercion.apply)(raw, hint) else {
            continue;
        };
        match write(candidate) {
            Ok(()) => return Ok(coercion.name),
            Err(e) => reason = format!("{}: {e}", coercion.name),
        }
    }
    Err(SerialError::NoCoercion {
        field_type: hint.field_type,
        reason,
    })
}

fn fits(value: &Value, hint: &FieldHint) -> bool {
    match hint.field_type {
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Float => value.is_number(),
        FieldType::Bool => value.is_boolean(),
        FieldType::Text => value.is_string(),
        FieldType::Enum => match (value.as_str(), &hint.enum_variants) {
            (Some(name), Some(variants)) => variants.iter().any(|v| v == name),
            (Some(_), None) => true,
            (None, _) => false,
        },
        FieldType::Structured => true,
    }
}

fn decode_or_text(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn as_i64(value: &Value) -> Option<i64> {
    let from_float = |f: f64| {
        (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64)
            .then_some(f as i64)
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}
