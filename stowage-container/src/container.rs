//! The save container: every record of one save.

use crate::component::{ComponentRecord, LoadPolicy};
use crate::error::SerialResult;
use crate::host::{holder_at, EntityHost};
use crate::singleton::SingletonRecord;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use stowage_model::{DeclaredComponent, SchemaSource};
use stowage_types::{EntityId, TypeTag};
use tracing::{debug, info, warn};

/// Document revision written by this version.
pub const FORMAT_REVISION: u32 = 1;

/// All singleton and component records of one save.
///
/// Singleton records are rebuilt wholesale on every [`save_all`]; component
/// records are created on the first save of their address and updated in
/// place after that. Records whose type no longer resolves are kept
/// verbatim so reinstalling the plugin recovers them.
///
/// [`save_all`]: SaveContainer::save_all
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveContainer {
    #[serde(default)]
    revision: u32,
    #[serde(default)]
    singletons: Vec<SingletonRecord>,
    #[serde(default)]
    components: BTreeMap<EntityId, Vec<ComponentRecord>>,
}

impl Default for SaveContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveContainer {
    pub fn new() -> Self {
        Self {
            revision: FORMAT_REVISION,
            singletons: Vec::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn singletons(&self) -> &[SingletonRecord] {
        &self.singletons
    }

    /// Component records of `entity`.
    pub fn components(&self, entity: EntityId) -> &[ComponentRecord] {
        self.components.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities that have at least one record.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.components.keys().copied()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.components.is_empty()
    }

    // ── Singletons ───────────────────────────────────────────────

    /// Rebuilds every singleton record from the live instances.
    ///
    /// Types without a live instance produce no record. Returns the number
    /// of singletons that failed to save; component records are untouched.
    pub fn save_all(&mut self, source: &dyn SchemaSource) -> usize {
        self.singletons.clear();
        let mut failures = 0;
        for schema in source.singletons() {
            let mut record = match SingletonRecord::capture(schema) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(type_tag = %schema.tag(), "No live instance, singleton skipped");
                    continue;
                }
                Err(e) => {
                    warn!(type_tag = %schema.tag(), error = %e, "Failed to capture singleton");
                    failures += 1;
                    continue;
                }
            };
            if !record.save(schema) {
                failures += 1;
            }
            self.singletons.push(record);
        }
        debug!(
            saved = self.singletons.len(),
            failures, "Singleton records rebuilt"
        );
        failures
    }

    /// Loads every singleton record, in document order.
    ///
    /// Records whose type does not resolve are skipped and kept. Returns
    /// the number of records that failed to load.
    pub fn load_all(&self, source: &dyn SchemaSource, policy: LoadPolicy) -> usize {
        let mut failures = 0;
        for record in &self.singletons {
            let Some(schema) = source.singleton(record.type_tag()) else {
                debug!(type_tag = %record.type_tag(), "Singleton type not declared, record kept");
                continue;
            };
            if !record.load(schema, policy) {
                warn!(type_tag = %record.type_tag(), "Failed to load singleton");
                failures += 1;
            }
        }
        failures
    }

    // ── Components ───────────────────────────────────────────────

    /// Saves every declared field of `component`, held by `holder`.
    pub fn save_component<C: Any>(
        &mut self,
        host: &dyn EntityHost,
        source: &dyn SchemaSource,
        holder: EntityId,
        component: &C,
    ) -> bool {
        let Some((tag, schemas)) = declared::<C>(source) else {
            return false;
        };
        self.record_for(host, holder, tag).save(&schemas, component)
    }

    /// Saves the field `name` of `component` only.
    pub fn save_component_field<C: Any>(
        &mut self,
        host: &dyn EntityHost,
        source: &dyn SchemaSource,
        holder: EntityId,
        component: &C,
        name: &str,
    ) -> bool {
        let Some((tag, schemas)) = declared::<C>(source) else {
            return false;
        };
        self.record_for(host, holder, tag)
            .save_field_named(&schemas, component, name)
    }

    /// Applies the saved record of `holder` to `component`.
    pub fn load_component<C: Any>(
        &self,
        host: &dyn EntityHost,
        source: &dyn SchemaSource,
        holder: EntityId,
        component: &mut C,
        policy: LoadPolicy,
    ) -> bool {
        let Some((tag, schemas)) = declared::<C>(source) else {
            return false;
        };
        match self.find(&ComponentRecord::capture(host, holder, tag)) {
            Some(record) => record.load(&schemas, component, policy),
            None => {
                debug!(holder = %holder, "Nothing saved for component");
                false
            }
        }
    }

    /// Applies the saved value of the field `name` to `component`.
    pub fn load_component_field<C: Any>(
        &self,
        host: &dyn EntityHost,
        source: &dyn SchemaSource,
        holder: EntityId,
        component: &mut C,
        name: &str,
    ) -> bool {
        let Some((tag, schemas)) = declared::<C>(source) else {
            return false;
        };
        self.find(&ComponentRecord::capture(host, holder, tag))
            .is_some_and(|record| record.load_field_named(&schemas, component, name))
    }

    /// The record stored at `address`, if any.
    pub fn find(&self, address: &ComponentRecord) -> Option<&ComponentRecord> {
        self.components
            .get(&address.entity_id())?
            .iter()
            .find(|record| record.same_address(address))
    }

    fn record_for(
        &mut self,
        host: &dyn EntityHost,
        holder: EntityId,
        tag: TypeTag,
    ) -> &mut ComponentRecord {
        let captured = ComponentRecord::capture(host, holder, tag);
        let records = self.components.entry(captured.entity_id()).or_default();
        if !captured.is_corrupted() {
            // Left over from a save while the holder was detached.
            records.retain(|r| {
                !(r.is_corrupted()
                    && r.slot() == captured.slot()
                    && r.type_tag() == captured.type_tag())
            });
        }
        let index = match records.iter().position(|r| r.same_address(&captured)) {
            Some(index) => index,
            None => {
                records.push(captured);
                records.len() - 1
            }
        };
        &mut records[index]
    }

    // ── Entity state ─────────────────────────────────────────────

    /// Every record of `entity` as a standalone JSON array.
    pub fn entity_state(&self, entity: EntityId) -> String {
        match serde_json::to_string(self.components(entity)) {
            Ok(json) => json,
            Err(e) => {
                warn!(entity = %entity, error = %e, "Failed to serialize entity state");
                "[]".to_string()
            }
        }
    }

    /// Replaces the records of `entity` with those in `state` and applies
    /// them to the live entity right away.
    ///
    /// The records are re-keyed to `entity`, so state taken from one entity
    /// can be restored onto another. `None` purges the entity. An unreadable
    /// `state` leaves the existing records untouched.
    pub fn restore_entity_state(
        &mut self,
        host: &mut dyn EntityHost,
        source: &dyn SchemaSource,
        entity: EntityId,
        state: Option<&str>,
        policy: LoadPolicy,
    ) -> bool {
        let Some(state) = state else {
            self.purge_entity(entity);
            return true;
        };
        let parsed: Vec<ComponentRecord> = match serde_json::from_str(state) {
            Ok(records) => records,
            Err(e) => {
                warn!(entity = %entity, error = %e, "Unreadable entity state, keeping existing records");
                return false;
            }
        };
        let mut records: Vec<ComponentRecord> = Vec::with_capacity(parsed.len());
        for mut record in parsed {
            record.rekey(entity);
            if records.iter().any(|r| r.same_address(&record)) {
                warn!(entity = %entity, type_tag = %record.type_tag(), "Duplicate record in entity state dropped");
                continue;
            }
            records.push(record);
        }
        if records.is_empty() {
            self.components.remove(&entity);
            return true;
        }

        let mut worked = true;
        for record in &records {
            worked &= apply_record(host, source, entity, record, policy);
        }
        self.components.insert(entity, records);
        worked
    }

    /// Drops every record of `entity`. Returns true if any existed.
    pub fn purge_entity(&mut self, entity: EntityId) -> bool {
        let purged = self.components.remove(&entity).is_some();
        if purged {
            debug!(entity = %entity, "Purged entity records");
        }
        purged
    }

    // ── Whole container ──────────────────────────────────────────

    /// Clears every record.
    pub fn reset(&mut self) {
        self.singletons.clear();
        self.components.clear();
    }

    /// Installs `other` wholesale and returns the previous contents.
    pub fn replace(&mut self, other: SaveContainer) -> SaveContainer {
        std::mem::replace(self, other)
    }

    /// Encodes the container, indented when `pretty`.
    pub fn to_json(&self, pretty: bool) -> SerialResult<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Decodes a container. Duplicate addresses keep their first record.
    /// Records are re-keyed to the entity they are filed under.
    pub fn from_json(text: &str) -> SerialResult<Self> {
        let mut container: SaveContainer = serde_json::from_str(text)?;
        if container.revision > FORMAT_REVISION {
            info!(
                revision = container.revision,
                supported = FORMAT_REVISION,
                "Save written by a newer version"
            );
        }
        container.dedupe();
        Ok(container)
    }

    fn dedupe(&mut self) {
        let mut seen: Vec<TypeTag> = Vec::new();
        self.singletons.retain(|record| {
            if seen.contains(record.type_tag()) {
                warn!(type_tag = %record.type_tag(), "Duplicate singleton record dropped");
                return false;
            }
            seen.push(record.type_tag().clone());
            true
        });
        for (entity, records) in &mut self.components {
            let mut kept: Vec<ComponentRecord> = Vec::with_capacity(records.len());
            for mut record in records.drain(..) {
                if record.entity_id() != *entity {
                    warn!(entity = %entity, filed_as = %record.entity_id(), "Record re-keyed to the entity it is filed under");
                    record.rekey(*entity);
                }
                if kept.iter().any(|r| r.same_address(&record)) {
                    warn!(entity = %entity, type_tag = %record.type_tag(), "Duplicate component record dropped");
                } else {
                    kept.push(record);
                }
            }
            *records = kept;
        }
        self.components.retain(|_, records| !records.is_empty());
    }
}

/// The persisted tag of `C` and every schema contribution for it.
fn declared<C: Any>(source: &dyn SchemaSource) -> Option<(TypeTag, Vec<&dyn DeclaredComponent>)> {
    let Some(tag) = source.component_tag(TypeId::of::<C>()) else {
        warn!(
            component = std::any::type_name::<C>(),
            "Component type is not declared by any plugin"
        );
        return None;
    };
    let schemas = source.components(&tag);
    Some((tag, schemas))
}

fn apply_record(
    host: &mut dyn EntityHost,
    source: &dyn SchemaSource,
    entity: EntityId,
    record: &ComponentRecord,
    policy: LoadPolicy,
) -> bool {
    let Some(holder) = holder_at(&*host, entity, record.slot()) else {
        warn!(entity = %entity, slot = %record.slot(), "No part at saved slot");
        return false;
    };
    let schemas = source.components(record.type_tag());
    match host.component_mut(holder, record.type_tag()) {
        Some(component) => record.load(&schemas, component, policy),
        None => {
            warn!(holder = %holder, type_tag = %record.type_tag(), "Component not attached");
            false
        }
    }
}
