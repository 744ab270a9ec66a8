//! Per-entity component records.

use crate::field::{load_declared, save_declared, SerialFields, Tally};
use crate::host::{Attachment, EntityHost};
use serde::{Deserialize, Serialize};
use std::any::Any;
use stowage_model::DeclaredComponent;
use stowage_types::{EntityId, Slot, TypeTag};
use tracing::{debug, warn};

/// How a load treats records whose fields only partly applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPolicy {
    /// Report success even when some fields failed to load.
    pub continue_on_partial_failure: bool,
}

impl LoadPolicy {
    /// Any field failure fails the record.
    pub const STRICT: LoadPolicy = LoadPolicy {
        continue_on_partial_failure: false,
    };

    /// Field failures are logged; the record still reports success.
    pub const LENIENT: LoadPolicy = LoadPolicy {
        continue_on_partial_failure: true,
    };

    pub(crate) fn settle(&self, tally: Tally, type_tag: &TypeTag) -> bool {
        if tally.worked() {
            return true;
        }
        debug!(
            type_tag = %type_tag,
            failed = tally.failed,
            attempted = tally.attempted,
            "Record loaded partially"
        );
        self.continue_on_partial_failure
    }
}

/// Saved state of one component on one entity.
///
/// Addressed by `(entity_id, slot, type)`. See [`Slot`] for the limits of
/// positional addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    entity_id: EntityId,
    slot: Slot,
    #[serde(rename = "type")]
    type_tag: TypeTag,
    #[serde(default)]
    corrupted: bool,
    #[serde(default)]
    fields: SerialFields,
}

impl ComponentRecord {
    /// An empty record at the given address.
    pub fn new(entity_id: EntityId, slot: Slot, type_tag: TypeTag) -> Self {
        Self {
            entity_id,
            slot,
            type_tag,
            corrupted: false,
            fields: SerialFields::new(),
        }
    }

    /// Computes the address of the component of type `type_tag` on `holder`.
    ///
    /// Holders that are not attached to an entity, or that their parent
    /// does not list, yield a corrupted record addressed by the holder itself.
    pub fn capture(host: &dyn EntityHost, holder: EntityId, type_tag: TypeTag) -> Self {
        match host.attachment(holder) {
            Attachment::Root(entity) => Self::new(entity, Slot::ENTITY, type_tag),
            Attachment::Part { parent } => {
                match host.parts(parent).iter().position(|part| *part == holder) {
                    Some(index) => Self::new(parent, Slot::part(index), type_tag),
                    None => {
                        warn!(
                            holder = %holder,
                            parent = %parent,
                            type_tag = %type_tag,
                            "Part is not listed by its parent; record marked corrupted"
                        );
                        Self::corrupted_at(holder, type_tag)
                    }
                }
            }
            Attachment::Detached => {
                warn!(
                    holder = %holder,
                    type_tag = %type_tag,
                    "Holder is not attached to any entity; record marked corrupted"
                );
                Self::corrupted_at(holder, type_tag)
            }
        }
    }

    fn corrupted_at(holder: EntityId, type_tag: TypeTag) -> Self {
        Self {
            corrupted: true,
            ..Self::new(holder, Slot::ENTITY, type_tag)
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn fields(&self) -> &SerialFields {
        &self.fields
    }

    /// True when both records share an `(entity, slot, type)` address.
    ///
    /// A corrupted record is keyed by its holder, which is also the valid
    /// address of that holder once it becomes a root, so corrupted and
    /// intact records never match each other.
    pub fn same_address(&self, other: &ComponentRecord) -> bool {
        self.corrupted == other.corrupted
            && self.entity_id == other.entity_id
            && self.slot == other.slot
            && self.type_tag == other.type_tag
    }

    pub(crate) fn rekey(&mut self, entity: EntityId) {
        self.entity_id = entity;
    }

    /// Saves every declared field of every contribution in `schemas`.
    ///
    /// All fields are attempted; the result is false if any failed.
    pub fn save(&mut self, schemas: &[&dyn DeclaredComponent], component: &dyn Any) -> bool {
        self.save_matching(schemas, component, None)
    }

    /// Saves only the fields named `name`.
    pub fn save_field_named(
        &mut self,
        schemas: &[&dyn DeclaredComponent],
        component: &dyn Any,
        name: &str,
    ) -> bool {
        self.save_matching(schemas, component, Some(name))
    }

    fn save_matching(
        &mut self,
        schemas: &[&dyn DeclaredComponent],
        component: &dyn Any,
        only: Option<&str>,
    ) -> bool {
        if self.corrupted {
            warn!(entity = %self.entity_id, type_tag = %self.type_tag, "Refusing to save into corrupted record");
            return false;
        }
        if schemas.is_empty() {
            warn!(type_tag = %self.type_tag, "Component type is not declared by any plugin");
            return false;
        }
        let mut tally = Tally::default();
        for schema in schemas {
            let infos = schema.fields();
            tally.absorb(save_declared(
                &mut self.fields,
                schema.owner(),
                &infos,
                only,
                |index| schema.read(component, index),
            ));
        }
        if tally.attempted == 0 {
            if let Some(name) = only {
                warn!(type_tag = %self.type_tag, field = name, "No declared field with that name");
            }
            return only.is_none();
        }
        tally.worked()
    }

    /// True when the record is intact and its type resolves.
    pub fn can_load(&self, schemas: &[&dyn DeclaredComponent]) -> bool {
        !self.corrupted && !schemas.is_empty()
    }

    /// Applies the saved payloads to `component`.
    pub fn load(
        &self,
        schemas: &[&dyn DeclaredComponent],
        component: &mut dyn Any,
        policy: LoadPolicy,
    ) -> bool {
        if !self.can_load(schemas) {
            debug!(entity = %self.entity_id, type_tag = %self.type_tag, "Record cannot be loaded");
            return false;
        }
        let tally = self.load_matching(schemas, component, None);
        policy.settle(tally, &self.type_tag)
    }

    /// Applies the saved payload of the fields named `name` only.
    pub fn load_field_named(
        &self,
        schemas: &[&dyn DeclaredComponent],
        component: &mut dyn Any,
        name: &str,
    ) -> bool {
        if !self.can_load(schemas) {
            return false;
        }
        let tally = self.load_matching(schemas, component, Some(name));
        tally.attempted > 0 && tally.worked()
    }

    fn load_matching(
        &self,
        schemas: &[&dyn DeclaredComponent],
        component: &mut dyn Any,
        only: Option<&str>,
    ) -> Tally {
        let mut tally = Tally::default();
        for schema in schemas {
            let infos = schema.fields();
            tally.absorb(load_declared(
                &self.fields,
                schema.owner(),
                &infos,
                only,
                |index, value| schema.write(&mut *component, index, value),
            ));
        }
        tally
    }
}
