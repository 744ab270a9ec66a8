use crate::error::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared shape of a persisted field.
///
/// The shape guides load-time coercion when a payload no longer matches the
/// field's Rust type exactly (a plugin retyped the field between versions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
    Enum,
    Structured,
}

/// Coercion hint carried by every field descriptor.
///
/// Enum variant names are stored here rather than inside [`FieldType`] so an
/// integer payload can be mapped to the variant at that ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHint {
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_variants: Option<Vec<String>>,
}

impl FieldHint {
    /// Hint for a field with no enum variants.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            enum_variants: None,
        }
    }

    /// Hint for an enum field whose variants serialize as their names.
    pub fn enumeration(variants: &[&str]) -> Self {
        Self {
            field_type: FieldType::Enum,
            enum_variants: Some(variants.iter().map(|v| (*v).to_string()).collect()),
        }
    }
}

/// Name and hint of one declared field, borrowed from its schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo<'a> {
    pub name: &'a str,
    pub hint: &'a FieldHint,
}

/// Capability for live objects the engine must not reach into directly.
///
/// The engine exchanges field values with such objects as a name → JSON map
/// and lets the object apply them itself.
pub trait PersistedFields {
    /// Current values of the persisted fields, keyed by field name.
    fn persisted_fields(&self) -> BTreeMap<String, Value>;

    /// Applies the given values. Return `Err(reason)` to reject them; the
    /// object must then be left unchanged.
    fn apply_persisted_fields(&mut self, fields: &BTreeMap<String, Value>) -> Result<(), String>;
}

type ReadFn<T> = Box<dyn Fn(&T) -> ModelResult<Value>>;
type WriteFn<T> = Box<dyn Fn(&mut T, Value) -> ModelResult<()>>;

/// "Persist this field": name, coercion hint and accessors for one field of `T`.
pub struct FieldDescriptor<T> {
    name: String,
    hint: FieldHint,
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T: 'static> FieldDescriptor<T> {
    /// Declares a field of type `V` reached through `get`/`get_mut`.
    ///
    /// A write only replaces the field once the value decoded completely, so a
    /// failed decode leaves the previous value in place.
    pub fn new<V>(
        name: &str,
        hint: FieldHint,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self {
            name: name.to_string(),
            hint,
            read: Box::new(move |target: &T| Ok(serde_json::to_value(get(target))?)),
            write: Box::new(move |target: &mut T, value: Value| {
                let decoded: V = serde_json::from_value(value)?;
                *get_mut(target) = decoded;
                Ok(())
            }),
        }
    }

    /// Shorthand for an integer field.
    pub fn int<V>(name: &str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self::new(name, FieldHint::of(FieldType::Int), get, get_mut)
    }

    /// Shorthand for a floating point field.
    pub fn float<V>(name: &str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self::new(name, FieldHint::of(FieldType::Float), get, get_mut)
    }

    /// Shorthand for a boolean field.
    pub fn flag(name: &str, get: fn(&T) -> &bool, get_mut: fn(&mut T) -> &mut bool) -> Self {
        Self::new(name, FieldHint::of(FieldType::Bool), get, get_mut)
    }

    /// Shorthand for a text field.
    pub fn text<V>(name: &str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self::new(name, FieldHint::of(FieldType::Text), get, get_mut)
    }

    /// Shorthand for a unit-variant enum field. `variants` lists the variant
    /// names in declaration order.
    pub fn enumeration<V>(
        name: &str,
        variants: &[&str],
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self::new(name, FieldHint::enumeration(variants), get, get_mut)
    }

    /// Shorthand for a nested structure, list or map.
    pub fn structured<V>(name: &str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        Self::new(name, FieldHint::of(FieldType::Structured), get, get_mut)
    }

    /// Returns the declared field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the coercion hint.
    pub fn hint(&self) -> &FieldHint {
        &self.hint
    }

    /// Borrowed name and hint.
    pub fn info(&self) -> FieldInfo<'_> {
        FieldInfo {
            name: &self.name,
            hint: &self.hint,
        }
    }

    /// Reads the field's current value from `target`.
    pub fn read(&self, target: &T) -> ModelResult<Value> {
        (self.read)(target)
    }

    /// Writes `value` into `target`.
    pub fn write(&self, target: &mut T, value: Value) -> ModelResult<()> {
        (self.write)(target, value)
    }
}

impl<T: PersistedFields + 'static> FieldDescriptor<T> {
    /// Declares a field exchanged through the [`PersistedFields`] capability.
    pub fn capability(name: &str, hint: FieldHint) -> Self {
        let read_name = name.to_string();
        let write_name = name.to_string();
        Self {
            name: name.to_string(),
            hint,
            read: Box::new(move |target: &T| {
                target
                    .persisted_fields()
                    .remove(&read_name)
                    .ok_or_else(|| ModelError::MissingField(read_name.clone()))
            }),
            write: Box::new(move |target: &mut T, value: Value| {
                let mut fields = BTreeMap::new();
                fields.insert(write_name.clone(), value);
                target
                    .apply_persisted_fields(&fields)
                    .map_err(|reason| ModelError::Rejected {
                        field: write_name.clone(),
                        reason,
                    })
            }),
        }
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}
