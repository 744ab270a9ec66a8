//! Shared fixtures for container tests: a small entity world, a schema
//! source built from plugin declarations, and a few plugin types.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use stowage_container::{Attachment, EntityHost};
use stowage_model::{
    ComponentSchema, Declarations, DeclaredComponent, DeclaredSingleton, FieldDescriptor,
    PluginAssembly, SchemaSource, SingletonSchema,
};
use stowage_types::{EntityId, TypeTag};

// ── Plugin types ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    Active,
    Overdrive,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub hp: i32,
    pub mode: Mode,
    pub label: String,
    pub bonus_hp: i32,
    pub telemetry: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Economy {
    pub funds: i64,
    pub rate: f64,
}

/// Declares `Widget` with `hp`, `mode`, `label` and `telemetry`.
pub struct WidgetsA;

impl PluginAssembly for WidgetsA {
    fn name(&self) -> &str {
        "WidgetsA"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        decl.component(
            ComponentSchema::new("Widget")
                .field(FieldDescriptor::int("hp", |w: &Widget| &w.hp, |w: &mut Widget| &mut w.hp))
                .field(FieldDescriptor::enumeration(
                    "mode",
                    &["Idle", "Active", "Overdrive"],
                    |w: &Widget| &w.mode,
                    |w: &mut Widget| &mut w.mode,
                ))
                .field(FieldDescriptor::text(
                    "label",
                    |w: &Widget| &w.label,
                    |w: &mut Widget| &mut w.label,
                ))
                .field(FieldDescriptor::structured(
                    "telemetry",
                    |w: &Widget| &w.telemetry,
                    |w: &mut Widget| &mut w.telemetry,
                )),
        );
        Ok(())
    }
}

/// A second plugin persisting its own `hp` on the same `Widget`.
pub struct WidgetsB;

impl PluginAssembly for WidgetsB {
    fn name(&self) -> &str {
        "WidgetsB"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        decl.component(ComponentSchema::new("Widget").field(FieldDescriptor::int(
            "hp",
            |w: &Widget| &w.bonus_hp,
            |w: &mut Widget| &mut w.bonus_hp,
        )));
        Ok(())
    }
}

/// Declares the `Economy` singleton, reached through `cell`.
pub struct EconomyPlugin {
    pub cell: Rc<RefCell<Option<Rc<RefCell<Economy>>>>>,
}

impl EconomyPlugin {
    pub fn live(economy: Economy) -> (Self, Rc<RefCell<Economy>>) {
        let instance = Rc::new(RefCell::new(economy));
        let plugin = Self {
            cell: Rc::new(RefCell::new(Some(instance.clone()))),
        };
        (plugin, instance)
    }

    pub fn absent() -> Self {
        Self {
            cell: Rc::new(RefCell::new(None)),
        }
    }
}

impl PluginAssembly for EconomyPlugin {
    fn name(&self) -> &str {
        "EconomyPlugin"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        let cell = self.cell.clone();
        decl.singleton(
            SingletonSchema::new("Economy")
                .instance(move || cell.borrow().clone())
                .field(FieldDescriptor::int(
                    "funds",
                    |e: &Economy| &e.funds,
                    |e: &mut Economy| &mut e.funds,
                ))
                .field(FieldDescriptor::float(
                    "rate",
                    |e: &Economy| &e.rate,
                    |e: &mut Economy| &mut e.rate,
                )),
        );
        Ok(())
    }
}

// ── Schema source ────────────────────────────────────────────────

#[derive(Default)]
pub struct Schemas {
    singletons: Vec<Box<dyn DeclaredSingleton>>,
    components: Vec<Box<dyn DeclaredComponent>>,
}

impl Schemas {
    pub fn of(plugins: &[&dyn PluginAssembly]) -> Self {
        let mut schemas = Self::default();
        for plugin in plugins {
            let mut decl = Declarations::new(plugin.name());
            plugin.declare(&mut decl).expect("fixture plugins declare cleanly");
            let (singletons, components) = decl.into_parts();
            schemas.singletons.extend(singletons);
            schemas.components.extend(components);
        }
        schemas
    }
}

impl SchemaSource for Schemas {
    fn singletons(&self) -> Vec<&dyn DeclaredSingleton> {
        self.singletons.iter().map(|s| s.as_ref()).collect()
    }

    fn singleton(&self, tag: &TypeTag) -> Option<&dyn DeclaredSingleton> {
        self.singletons
            .iter()
            .find(|s| s.tag() == tag)
            .map(|s| s.as_ref())
    }

    fn components(&self, tag: &TypeTag) -> Vec<&dyn DeclaredComponent> {
        self.components
            .iter()
            .filter(|c| c.tag() == tag)
            .map(|c| c.as_ref())
            .collect()
    }

    fn component_tag(&self, type_id: TypeId) -> Option<TypeTag> {
        self.components
            .iter()
            .find(|c| c.component_type() == type_id)
            .map(|c| c.tag().clone())
    }
}

// ── Entity world ─────────────────────────────────────────────────

/// Roots, their ordered parts, and the widgets attached to holders.
#[derive(Default)]
pub struct World {
    pub roots: BTreeSet<EntityId>,
    pub parts: BTreeMap<EntityId, Vec<EntityId>>,
    pub parent_of: BTreeMap<EntityId, EntityId>,
    pub widgets: BTreeMap<EntityId, Widget>,
}

impl World {
    pub fn with_root(mut self, entity: i32) -> Self {
        self.roots.insert(EntityId::new(entity));
        self
    }

    /// Appends `part` to `parent`'s ordered part list.
    pub fn with_part(mut self, parent: i32, part: i32) -> Self {
        let (parent, part) = (EntityId::new(parent), EntityId::new(part));
        self.parts.entry(parent).or_default().push(part);
        self.parent_of.insert(part, parent);
        self
    }

    pub fn with_widget(mut self, holder: i32, widget: Widget) -> Self {
        self.widgets.insert(EntityId::new(holder), widget);
        self
    }

    pub fn widget(&self, holder: i32) -> &Widget {
        &self.widgets[&EntityId::new(holder)]
    }
}

impl EntityHost for World {
    fn attachment(&self, holder: EntityId) -> Attachment {
        if self.roots.contains(&holder) {
            Attachment::Root(holder)
        } else if let Some(parent) = self.parent_of.get(&holder) {
            Attachment::Part { parent: *parent }
        } else {
            Attachment::Detached
        }
    }

    fn parts(&self, entity: EntityId) -> Vec<EntityId> {
        self.parts.get(&entity).cloned().unwrap_or_default()
    }

    fn component_mut(&mut self, holder: EntityId, tag: &TypeTag) -> Option<&mut dyn Any> {
        if tag.as_str() != "Widget" {
            return None;
        }
        self.widgets.get_mut(&holder).map(|w| w as &mut dyn Any)
    }
}

pub fn id(raw: i32) -> EntityId {
    EntityId::new(raw)
}
