//! Keyed field payloads and the depth-bounded encoder.

use crate::coerce;
use crate::error::{SerialError, SerialResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use stowage_model::{FieldHint, FieldInfo, FieldType, ModelResult};
use stowage_types::FieldKey;
use tracing::{debug, warn};

/// Deepest nesting of arrays and objects a saved value may have.
pub const MAX_DEPTH: usize = 10;

/// Nesting depth of `value`. Scalars are depth 0.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Payloads of one record, keyed by salted field key.
///
/// Each payload is the JSON text of the field's value at the last save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialFields(BTreeMap<FieldKey, String>);

impl SerialFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `value` and stores it under `key`, replacing any previous
    /// payload. On error nothing is stored.
    pub fn try_save_field<V: Serialize + ?Sized>(
        &mut self,
        key: FieldKey,
        value: &V,
    ) -> SerialResult<()> {
        let value = serde_json::to_value(value)?;
        let depth = depth(&value);
        if depth > MAX_DEPTH {
            return Err(SerialError::TooDeep {
                depth,
                limit: MAX_DEPTH,
            });
        }
        self.0.insert(key, serde_json::to_string(&value)?);
        Ok(())
    }

    /// Stores an already encoded field value checked against its hint.
    ///
    /// Non-finite floats encode to `null`, which no float field loads back,
    /// so a float field must encode to a number.
    pub fn try_save_hinted(
        &mut self,
        key: FieldKey,
        value: &Value,
        hint: &FieldHint,
    ) -> SerialResult<()> {
        if hint.field_type == FieldType::Float && !value.is_number() {
            return Err(SerialError::NonFinite {
                field_type: hint.field_type,
            });
        }
        self.try_save_field(key, value)
    }

    /// Like [`try_save_field`](Self::try_save_field) but logs the failure
    /// and reports it as `false`.
    pub fn save_field<V: Serialize + ?Sized>(&mut self, key: FieldKey, value: &V) -> bool {
        match self.try_save_field(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to save field");
                false
            }
        }
    }

    /// Raw payload stored under `key`.
    pub fn load_field(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Outcome of walking the declared fields of one schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub attempted: usize,
    pub failed: usize,
}

impl Tally {
    pub fn worked(&self) -> bool {
        self.failed == 0
    }

    pub fn absorb(&mut self, other: Tally) {
        self.attempted += other.attempted;
        self.failed += other.failed;
    }
}

/// Saves every declared field (or only the one named `only`) of one schema
/// contribution. Failures are counted, never short-circuited.
pub(crate) fn save_declared(
    fields: &mut SerialFields,
    owner: &str,
    infos: &[FieldInfo<'_>],
    only: Option<&str>,
    read: impl Fn(usize) -> ModelResult<Value>,
) -> Tally {
    let mut tally = Tally::default();
    for (index, info) in infos.iter().enumerate() {
        if only.is_some_and(|name| name != info.name) {
            continue;
        }
        tally.attempted += 1;
        let key = FieldKey::new(owner, info.name);
        let saved = match read(index) {
            Ok(value) => match fields.try_save_hinted(key, &value, info.hint) {
                Ok(()) => true,
                Err(e) => {
                    warn!(plugin = owner, field = info.name, error = %e, "Failed to save field");
                    false
                }
            },
            Err(e) => {
                warn!(plugin = owner, field = info.name, error = %e, "Failed to read field");
                false
            }
        };
        if !saved {
            tally.failed += 1;
        }
    }
    tally
}

/// Applies stored payloads to every declared field (or only `only`) of one
/// schema contribution through the coercion cascade.
pub(crate) fn load_declared(
    fields: &SerialFields,
    owner: &str,
    infos: &[FieldInfo<'_>],
    only: Option<&str>,
    mut write: impl FnMut(usize, Value) -> ModelResult<()>,
) -> Tally {
    let mut tally = Tally::default();
    for (index, info) in infos.iter().enumerate() {
        if only.is_some_and(|name| name != info.name) {
            continue;
        }
        tally.attempted += 1;
        let key = FieldKey::new(owner, info.name);
        let Some(raw) = fields.load_field(key) else {
            debug!(plugin = owner, field = info.name, "No payload saved for field");
            tally.failed += 1;
            continue;
        };
        match coerce::apply(raw, info.hint, |value| write(index, value)) {
            Ok(strategy) => {
                debug!(plugin = owner, field = info.name, strategy, "Loaded field");
            }
            Err(e) => {
                warn!(plugin = owner, field = info.name, error = %e, "Failed to load field");
                tally.failed += 1;
            }
        }
    }
    tally
}
