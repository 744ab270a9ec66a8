//! Component and singleton schemas, and their type-erased views.

use crate::error::{ModelError, ModelResult};
use crate::field::{FieldDescriptor, FieldInfo};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;
use stowage_types::TypeTag;
use tracing::{debug, warn};

/// Ordered field table shared by both schema kinds.
struct FieldTable<T> {
    tag: TypeTag,
    owner: String,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> FieldTable<T> {
    fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            owner: String::new(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, field: FieldDescriptor<T>) {
        if self.fields.iter().any(|f| f.name() == field.name()) {
            warn!(
                type_tag = %self.tag,
                field = field.name(),
                "Duplicate persisted field declaration ignored"
            );
            return;
        }
        self.fields.push(field);
    }

    fn infos(&self) -> Vec<FieldInfo<'_>> {
        self.fields.iter().map(FieldDescriptor::info).collect()
    }

    fn descriptor(&self, index: usize) -> ModelResult<&FieldDescriptor<T>> {
        self.fields.get(index).ok_or_else(|| ModelError::NoSuchField {
            type_name: self.tag.to_string(),
            index,
        })
    }

    fn read(&self, target: &dyn Any, index: usize) -> ModelResult<Value> {
        let target = target
            .downcast_ref::<T>()
            .ok_or_else(|| ModelError::TypeMismatch(self.tag.to_string()))?;
        self.descriptor(index)?.read(target)
    }

    fn write(&self, target: &mut dyn Any, index: usize, value: Value) -> ModelResult<()> {
        let descriptor = self.descriptor(index)?;
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| ModelError::TypeMismatch(self.tag.to_string()))?;
        descriptor.write(target, value)
    }
}

/// Type-erased view of a component schema, as held by the registry.
pub trait DeclaredComponent {
    /// Persisted type name.
    fn tag(&self) -> &TypeTag;
    /// Assembly name of the declaring plugin; salts every field key.
    fn owner(&self) -> &str;
    /// `TypeId` of the live component type.
    fn component_type(&self) -> TypeId;
    /// Declared fields, in declaration order.
    fn fields(&self) -> Vec<FieldInfo<'_>>;
    /// Reads field `index` from a live component.
    fn read(&self, target: &dyn Any, index: usize) -> ModelResult<Value>;
    /// Writes field `index` into a live component.
    fn write(&self, target: &mut dyn Any, index: usize, value: Value) -> ModelResult<()>;
}

/// Type-erased view of a singleton schema, as held by the registry.
pub trait DeclaredSingleton {
    /// Persisted type name.
    fn tag(&self) -> &TypeTag;
    /// Assembly name of the declaring plugin.
    fn owner(&self) -> &str;
    /// Declared fields, in declaration order.
    fn fields(&self) -> Vec<FieldInfo<'_>>;
    /// Runs `visit` against the live instance.
    ///
    /// Returns `Ok(false)` when the accessor reports no live instance.
    fn visit_instance(&self, visit: &mut dyn FnMut(&mut dyn Any)) -> ModelResult<bool>;
    /// Reads field `index` from the instance passed to `visit`.
    fn read(&self, target: &dyn Any, index: usize) -> ModelResult<Value>;
    /// Writes field `index` into the instance passed to `visit`.
    fn write(&self, target: &mut dyn Any, index: usize, value: Value) -> ModelResult<()>;
}

/// "Instances of this type are persisted component-by-component."
pub struct ComponentSchema<T> {
    table: FieldTable<T>,
}

impl<T: 'static> ComponentSchema<T> {
    /// Starts a schema for the component type persisted as `name`.
    pub fn new(name: impl Into<TypeTag>) -> Self {
        Self {
            table: FieldTable::new(name.into()),
        }
    }

    /// Adds a persisted field. A second field with the same name is ignored.
    pub fn field(mut self, field: FieldDescriptor<T>) -> Self {
        self.table.push(field);
        self
    }

    pub(crate) fn stamp_owner(&mut self, owner: &str) {
        self.table.owner = owner.to_string();
    }
}

impl<T: 'static> DeclaredComponent for ComponentSchema<T> {
    fn tag(&self) -> &TypeTag {
        &self.table.tag
    }

    fn owner(&self) -> &str {
        &self.table.owner
    }

    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn fields(&self) -> Vec<FieldInfo<'_>> {
        self.table.infos()
    }

    fn read(&self, target: &dyn Any, index: usize) -> ModelResult<Value> {
        self.table.read(target, index)
    }

    fn write(&self, target: &mut dyn Any, index: usize, value: Value) -> ModelResult<()> {
        self.table.write(target, index, value)
    }
}

type InstanceFn<T> = Box<dyn Fn() -> Option<Rc<RefCell<T>>>>;

/// "This type is a persisted singleton."
///
/// Exactly one live instance is assumed, reached through the accessor given
/// to [`SingletonSchema::instance`].
pub struct SingletonSchema<T> {
    table: FieldTable<T>,
    instance: Option<InstanceFn<T>>,
}

impl<T: 'static> SingletonSchema<T> {
    /// Starts a schema for the singleton type persisted as `name`.
    pub fn new(name: impl Into<TypeTag>) -> Self {
        Self {
            table: FieldTable::new(name.into()),
            instance: None,
        }
    }

    /// "This accessor holds the sole instance."
    ///
    /// Only the first accessor is honored; later calls are ignored.
    pub fn instance(mut self, locate: impl Fn() -> Option<Rc<RefCell<T>>> + 'static) -> Self {
        if self.instance.is_some() {
            debug!(type_tag = %self.table.tag, "Additional instance accessor ignored");
            return self;
        }
        self.instance = Some(Box::new(locate));
        self
    }

    /// Adds a persisted field. A second field with the same name is ignored.
    pub fn field(mut self, field: FieldDescriptor<T>) -> Self {
        self.table.push(field);
        self
    }

    pub(crate) fn stamp_owner(&mut self, owner: &str) {
        self.table.owner = owner.to_string();
    }
}

impl<T: 'static> DeclaredSingleton for SingletonSchema<T> {
    fn tag(&self) -> &TypeTag {
        &self.table.tag
    }

    fn owner(&self) -> &str {
        &self.table.owner
    }

    fn fields(&self) -> Vec<FieldInfo<'_>> {
        self.table.infos()
    }

    fn visit_instance(&self, visit: &mut dyn FnMut(&mut dyn Any)) -> ModelResult<bool> {
        let locate = self
            .instance
            .as_ref()
            .ok_or_else(|| ModelError::NoInstanceMarker(self.table.tag.to_string()))?;
        let Some(cell) = locate() else {
            return Ok(false);
        };
        let mut instance = cell
            .try_borrow_mut()
            .map_err(|_| ModelError::InstanceBusy(self.table.tag.to_string()))?;
        visit(&mut *instance);
        Ok(true)
    }

    fn read(&self, target: &dyn Any, index: usize) -> ModelResult<Value> {
        self.table.read(target, index)
    }

    fn write(&self, target: &mut dyn Any, index: usize, value: Value) -> ModelResult<()> {
        self.table.write(target, index, value)
    }
}
