//! Plugin registration, retry queue and hook dispatch.

use crate::error::{RegistryError, RegistryResult};
use crate::hooks::{isolate, HookFailure, HookPass, HookPhase, PluginHooks};
use std::any::TypeId;
use stowage_model::{
    Declarations, DeclaredComponent, DeclaredSingleton, PluginAssembly, SchemaSource,
};
use stowage_types::{PluginId, TypeTag};
use tracing::{debug, info, warn};

/// Outcome of [`PluginRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Declarations collected; the plugin takes part in the next pass.
    Registered(PluginId),
    /// A plugin with the same assembly name is already registered or queued.
    AlreadyRegistered(PluginId),
    /// Declaration failed; it is retried on the next [`tick`](PluginRegistry::tick).
    Deferred(PluginId),
}

struct Plugin {
    id: PluginId,
    name: String,
    hooks: Option<Box<dyn PluginHooks>>,
    singletons: Vec<Box<dyn DeclaredSingleton>>,
    components: Vec<Box<dyn DeclaredComponent>>,
}

struct Queued {
    id: PluginId,
    assembly: Box<dyn PluginAssembly>,
    hooks: Option<Box<dyn PluginHooks>>,
    attempts: u32,
    last_error: RegistryError,
}

/// Every registered plugin, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    queued: Vec<Queued>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ================================================================
    // Registration
    // ================================================================

    /// Registers `assembly` and its optional hooks.
    ///
    /// Idempotent on the assembly name. A failing declaration queues the
    /// plugin for retry instead of rejecting it.
    pub fn register(
        &mut self,
        assembly: Box<dyn PluginAssembly>,
        hooks: Option<Box<dyn PluginHooks>>,
    ) -> Registration {
        let id = PluginId::from_name(assembly.name());
        if self.plugins.iter().any(|p| p.id == id) || self.queued.iter().any(|q| q.id == id) {
            debug!(plugin = assembly.name(), "Plugin already registered");
            return Registration::AlreadyRegistered(id);
        }
        match self.admit(id, assembly.as_ref(), hooks) {
            Ok(()) => Registration::Registered(id),
            Err((hooks, err)) => {
                warn!(plugin = assembly.name(), error = %err, "Plugin registration deferred to next tick");
                self.queued.push(Queued {
                    id,
                    assembly,
                    hooks,
                    attempts: 1,
                    last_error: err,
                });
                Registration::Deferred(id)
            }
        }
    }

    /// Removes the plugin named `name` and detaches its hooks.
    pub fn unregister(&mut self, name: &str) -> bool {
        let id = PluginId::from_name(name);
        if let Some(index) = self.plugins.iter().position(|p| p.id == id) {
            self.plugins.remove(index);
            info!(plugin = name, "Plugin unregistered");
            return true;
        }
        if let Some(index) = self.queued.iter().position(|q| q.id == id) {
            self.queued.remove(index);
            info!(plugin = name, "Queued plugin dropped");
            return true;
        }
        false
    }

    /// Retries every queued registration once. Returns how many succeeded.
    pub fn tick(&mut self) -> usize {
        if self.queued.is_empty() {
            return 0;
        }
        let mut admitted = 0;
        for mut queued in std::mem::take(&mut self.queued) {
            let hooks = queued.hooks.take();
            match self.admit(queued.id, queued.assembly.as_ref(), hooks) {
                Ok(()) => {
                    admitted += 1;
                    debug!(plugin = queued.assembly.name(), attempts = queued.attempts + 1, "Deferred registration succeeded");
                }
                Err((hooks, err)) => {
                    queued.attempts += 1;
                    debug!(plugin = queued.assembly.name(), attempts = queued.attempts, error = %err, "Registration still failing");
                    queued.hooks = hooks;
                    queued.last_error = err;
                    self.queued.push(queued);
                }
            }
        }
        admitted
    }

    /// Runs the declaration and, on success, inserts the plugin.
    /// On failure the hooks are handed back for the retry queue.
    #[allow(clippy::type_complexity)]
    fn admit(
        &mut self,
        id: PluginId,
        assembly: &dyn PluginAssembly,
        hooks: Option<Box<dyn PluginHooks>>,
    ) -> Result<(), (Option<Box<dyn PluginHooks>>, RegistryError)> {
        let decl = match declare(assembly) {
            Ok(decl) => decl,
            Err(e) => return Err((hooks, e)),
        };
        let name = assembly.name().to_string();
        let (singletons, components) = decl.into_parts();
        let singletons = self.accept_singletons(&name, singletons);
        let components = self.accept_components(&name, components);
        info!(
            plugin = %name,
            id = %id,
            singletons = singletons.len(),
            components = components.len(),
            "Plugin registered"
        );
        self.plugins.push(Plugin {
            id,
            name,
            hooks,
            singletons,
            components,
        });
        Ok(())
    }

    fn accept_singletons(
        &self,
        plugin: &str,
        declared: Vec<Box<dyn DeclaredSingleton>>,
    ) -> Vec<Box<dyn DeclaredSingleton>> {
        let mut accepted: Vec<Box<dyn DeclaredSingleton>> = Vec::with_capacity(declared.len());
        for schema in declared {
            let taken = self.singleton(schema.tag()).is_some()
                || accepted.iter().any(|s| s.tag() == schema.tag());
            if taken {
                warn!(plugin, type_tag = %schema.tag(), "Singleton type already declared; ignoring");
                continue;
            }
            accepted.push(schema);
        }
        accepted
    }

    fn accept_components(
        &self,
        plugin: &str,
        declared: Vec<Box<dyn DeclaredComponent>>,
    ) -> Vec<Box<dyn DeclaredComponent>> {
        let mut accepted: Vec<Box<dyn DeclaredComponent>> = Vec::with_capacity(declared.len());
        for schema in declared {
            if accepted.iter().any(|c| c.tag() == schema.tag()) {
                warn!(plugin, type_tag = %schema.tag(), "Component type declared twice; ignoring");
                continue;
            }
            let clash = self
                .components(schema.tag())
                .iter()
                .any(|c| c.component_type() != schema.component_type());
            if clash {
                warn!(plugin, type_tag = %schema.tag(), "Component tag already names another type; ignoring");
                continue;
            }
            accepted.push(schema);
        }
        accepted
    }

    // ================================================================
    // Queries
    // ================================================================

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        let id = PluginId::from_name(name);
        self.plugins.iter().any(|p| p.id == id)
    }

    /// Registered plugin names, in registration order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    /// Why the queued plugin `name` last failed to register.
    pub fn queued_error(&self, name: &str) -> RegistryResult<&RegistryError> {
        let id = PluginId::from_name(name);
        self.queued
            .iter()
            .find(|q| q.id == id)
            .map(|q| &q.last_error)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    // ================================================================
    // Hooks
    // ================================================================

    /// Runs every plugin's save hook for `phase`.
    pub fn run_save_hooks(&mut self, phase: HookPhase) -> Vec<HookFailure> {
        self.run_hooks(HookPass::Save, phase)
    }

    /// Runs every plugin's load hook for `phase`.
    pub fn run_load_hooks(&mut self, phase: HookPhase) -> Vec<HookFailure> {
        self.run_hooks(HookPass::Load, phase)
    }

    fn run_hooks(&mut self, pass: HookPass, phase: HookPhase) -> Vec<HookFailure> {
        let mut failures = Vec::new();
        for plugin in &mut self.plugins {
            let Some(hooks) = plugin.hooks.as_mut() else {
                continue;
            };
            let outcome = isolate(|| match pass {
                HookPass::Save => hooks.on_save(phase),
                HookPass::Load => hooks.on_load(phase),
            });
            if let Err(message) = outcome {
                warn!(plugin = %plugin.name, %pass, %phase, error = %message, "Plugin hook failed");
                failures.push(HookFailure {
                    plugin: plugin.name.clone(),
                    pass,
                    phase,
                    message,
                });
            }
        }
        failures
    }
}

fn declare(assembly: &dyn PluginAssembly) -> RegistryResult<Declarations> {
    let mut decl = Declarations::new(assembly.name());
    isolate(|| assembly.declare(&mut decl)).map_err(|reason| RegistryError::DeclarationFailed {
        plugin: assembly.name().to_string(),
        reason,
    })?;
    Ok(decl)
}

impl SchemaSource for PluginRegistry {
    fn singletons(&self) -> Vec<&dyn DeclaredSingleton> {
        self.plugins
            .iter()
            .flat_map(|p| p.singletons.iter().map(|s| s.as_ref()))
            .collect()
    }

    fn singleton(&self, tag: &TypeTag) -> Option<&dyn DeclaredSingleton> {
        self.plugins
            .iter()
            .flat_map(|p| p.singletons.iter())
            .find(|s| s.tag() == tag)
            .map(|s| s.as_ref())
    }

    fn components(&self, tag: &TypeTag) -> Vec<&dyn DeclaredComponent> {
        self.plugins
            .iter()
            .flat_map(|p| p.components.iter())
            .filter(|c| c.tag() == tag)
            .map(|c| c.as_ref())
            .collect()
    }

    fn component_tag(&self, type_id: TypeId) -> Option<TypeTag> {
        self.plugins
            .iter()
            .flat_map(|p| p.components.iter())
            .find(|c| c.component_type() == type_id)
            .map(|c| c.tag().clone())
    }
}
