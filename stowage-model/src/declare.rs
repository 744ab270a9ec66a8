use crate::schema::{ComponentSchema, DeclaredComponent, DeclaredSingleton, SingletonSchema};
use std::any::TypeId;
use stowage_types::TypeTag;

/// A plugin's persistence contract, handed to the registry once.
///
/// `declare` may fail when the plugin is only partially initialised; the
/// registry then retries on a later tick.
pub trait PluginAssembly {
    /// Stable assembly name. Hashes to the plugin's identity and salts all
    /// of its field keys, so it must not change between releases.
    fn name(&self) -> &str;

    /// Lists every singleton and component type this plugin persists.
    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()>;
}

/// Collector for the schemas a plugin declares.
pub struct Declarations {
    assembly: String,
    singletons: Vec<Box<dyn DeclaredSingleton>>,
    components: Vec<Box<dyn DeclaredComponent>>,
}

impl Declarations {
    pub fn new(assembly: impl Into<String>) -> Self {
        Self {
            assembly: assembly.into(),
            singletons: Vec::new(),
            components: Vec::new(),
        }
    }

    /// The declaring assembly's name.
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Declares a persisted singleton type.
    pub fn singleton<T: 'static>(&mut self, mut schema: SingletonSchema<T>) -> &mut Self {
        schema.stamp_owner(&self.assembly);
        self.singletons.push(Box::new(schema));
        self
    }

    /// Declares a component type persisted per entity.
    pub fn component<T: 'static>(&mut self, mut schema: ComponentSchema<T>) -> &mut Self {
        schema.stamp_owner(&self.assembly);
        self.components.push(Box::new(schema));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.components.is_empty()
    }

    /// Splits into `(singletons, components)`.
    pub fn into_parts(
        self,
    ) -> (
        Vec<Box<dyn DeclaredSingleton>>,
        Vec<Box<dyn DeclaredComponent>>,
    ) {
        (self.singletons, self.components)
    }
}

/// Read access to the live set of declared schemas.
///
/// Implemented by the plugin registry; consumed by records and the save
/// container so they never depend on the registry directly.
pub trait SchemaSource {
    /// Every registered singleton schema, in registration order.
    fn singletons(&self) -> Vec<&dyn DeclaredSingleton>;

    /// The singleton schema persisted under `tag`, if its plugin is loaded.
    fn singleton(&self, tag: &TypeTag) -> Option<&dyn DeclaredSingleton>;

    /// Every contribution declared for the component type `tag`, one per
    /// plugin. Empty when the tag does not resolve.
    fn components(&self, tag: &TypeTag) -> Vec<&dyn DeclaredComponent>;

    /// The persisted tag of the live component type `type_id`.
    fn component_tag(&self, type_id: TypeId) -> Option<TypeTag>;
}
