//! Fixtures for orchestrator tests: one component plugin, one singleton
//! plugin with hooks, a small entity world and scripted host callbacks.

#![allow(dead_code)]

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use stowage_container::{Attachment, EntityHost};
use stowage_engine::{ErrorSurface, Orchestrator, SaveHost, SaveSession, StowageConfig};
use stowage_model::{ComponentSchema, Declarations, FieldDescriptor, PluginAssembly, SingletonSchema};
use stowage_registry::{HookPhase, PluginHooks};
use stowage_types::{EntityId, TypeTag};

// ── Plugins ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub hp: i32,
    pub label: String,
}

pub struct WidgetPlugin;

impl PluginAssembly for WidgetPlugin {
    fn name(&self) -> &str {
        "WidgetPlugin"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        decl.component(
            ComponentSchema::new("Widget")
                .field(FieldDescriptor::int("hp", |w: &Widget| &w.hp, |w: &mut Widget| &mut w.hp))
                .field(FieldDescriptor::text(
                    "label",
                    |w: &Widget| &w.label,
                    |w: &mut Widget| &mut w.label,
                )),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub funds: i64,
}

/// Declares the `Ledger` singleton held in `instance`.
pub struct LedgerPlugin {
    pub instance: Rc<RefCell<Ledger>>,
}

impl PluginAssembly for LedgerPlugin {
    fn name(&self) -> &str {
        "LedgerPlugin"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        let instance = self.instance.clone();
        decl.singleton(
            SingletonSchema::new("Ledger")
                .instance(move || Some(instance.clone()))
                .field(FieldDescriptor::int(
                    "funds",
                    |l: &Ledger| &l.funds,
                    |l: &mut Ledger| &mut l.funds,
                )),
        );
        Ok(())
    }
}

/// Records every hook call as `"<pass> <phase>"` and can be told to fail.
pub struct Recorder {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub fail_save: bool,
    pub panic_load: bool,
    /// Copied into the ledger on `save before`, as a plugin flushing its
    /// working state into its persisted singleton.
    pub pending_funds: Option<(Rc<RefCell<Ledger>>, i64)>,
}

impl Recorder {
    pub fn new(calls: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            calls,
            fail_save: false,
            panic_load: false,
            pending_funds: None,
        }
    }
}

impl PluginHooks for Recorder {
    fn on_save(&mut self, phase: HookPhase) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(format!("save {phase}"));
        if phase == HookPhase::Before {
            if let Some((ledger, funds)) = &self.pending_funds {
                ledger.borrow_mut().funds = *funds;
            }
        }
        if self.fail_save {
            anyhow::bail!("ledger offline");
        }
        Ok(())
    }

    fn on_load(&mut self, phase: HookPhase) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(format!("load {phase}"));
        if self.panic_load {
            panic!("ledger exploded");
        }
        Ok(())
    }
}

/// Fails its first `failures` declarations.
pub struct Flaky {
    pub failures: Cell<u32>,
}

impl PluginAssembly for Flaky {
    fn name(&self) -> &str {
        "Flaky"
    }

    fn declare(&self, decl: &mut Declarations) -> anyhow::Result<()> {
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            anyhow::bail!("not initialised yet");
        }
        decl.component(ComponentSchema::<Ledger>::new("Gear"));
        Ok(())
    }
}

// ── Host ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct World {
    pub roots: BTreeSet<EntityId>,
    pub parts: BTreeMap<EntityId, Vec<EntityId>>,
    pub parent_of: BTreeMap<EntityId, EntityId>,
    pub widgets: BTreeMap<EntityId, Widget>,
}

impl World {
    /// Entity 42 with one part, 420, holding a widget.
    pub fn with_widget_part(hp: i32) -> Self {
        let mut world = Self::default();
        world.roots.insert(id(42));
        world.parts.insert(id(42), vec![id(420)]);
        world.parent_of.insert(id(420), id(42));
        world.widgets.insert(
            id(420),
            Widget {
                hp,
                label: "north gate".into(),
            },
        );
        world
    }

    pub fn widget(&self, holder: i32) -> &Widget {
        &self.widgets[&id(holder)]
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

/// Scripted answers to the orchestrator's questions about the host.
pub struct Game {
    pub save_name: Option<String>,
    pub mode: String,
    pub persistent: bool,
    pub managed: Vec<String>,
}

impl Game {
    pub fn campaign(save_name: &str) -> Self {
        Self {
            save_name: Some(save_name.to_string()),
            mode: "campaign".to_string(),
            persistent: true,
            managed: vec!["autosave".to_string()],
        }
    }
}

impl SaveHost for Game {
    fn current_save_name(&self) -> Option<String> {
        self.save_name.clone()
    }

    fn current_mode(&self) -> String {
        self.mode.clone()
    }

    fn is_persistent_mode(&self) -> bool {
        self.persistent
    }

    fn is_managed_slot(&self, save_name: &str) -> bool {
        self.managed.iter().any(|m| m == save_name)
    }
}

/// Collects every popup shown to the player.
pub struct Popups {
    pub shown: Rc<RefCell<Vec<String>>>,
    pub explode: bool,
}

impl ErrorSurface for Popups {
    fn report_fatal(&mut self, title: &str, message: &str) {
        self.shown.borrow_mut().push(format!("{title}: {message}"));
        if self.explode {
            panic!("popup widget missing");
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

pub fn id(raw: i32) -> EntityId {
    EntityId::new(raw)
}

pub fn config(saves_dir: &Path, compress: bool) -> StowageConfig {
    StowageConfig {
        compress,
        saves_dir: saves_dir.to_path_buf(),
        ..StowageConfig::default()
    }
}

pub fn session(save_name: &str) -> SaveSession {
    SaveSession::new(save_name, "campaign")
}

/// An orchestrator with the widget plugin registered.
pub fn with_widgets(saves_dir: &Path, compress: bool) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(config(saves_dir, compress));
    orchestrator.register(Box::new(WidgetPlugin), None);
    orchestrator
}
