//! The slice of the host's entity model the container needs.

use std::any::Any;
use stowage_types::{EntityId, Slot, TypeTag};

/// Where a component holder sits in the host's entity tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The holder is the entity with this id.
    Root(EntityId),
    /// The holder is a part of `parent`.
    Part { parent: EntityId },
    /// The holder belongs to no entity. Its records cannot be reloaded.
    Detached,
}

/// Entity lookups supplied by the host simulation.
pub trait EntityHost {
    /// Resolves the entity owning `holder`.
    fn attachment(&self, holder: EntityId) -> Attachment;

    /// Ordered parts of `entity`, as the host currently lists them.
    fn parts(&self, entity: EntityId) -> Vec<EntityId>;

    /// The live component persisted as `tag` on `holder`, if attached.
    fn component_mut(&mut self, holder: EntityId, tag: &TypeTag) -> Option<&mut dyn Any>;
}

/// Maps a record address back to the holder that currently occupies it.
pub fn holder_at(host: &dyn EntityHost, entity: EntityId, slot: Slot) -> Option<EntityId> {
    match slot.part_index() {
        None => Some(entity),
        Some(index) => host.parts(entity).get(index).copied(),
    }
}
