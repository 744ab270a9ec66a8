//! Records for singleton types.

use crate::component::LoadPolicy;
use crate::error::SerialResult;
use crate::field::{load_declared, save_declared, SerialFields, Tally};
use serde::{Deserialize, Serialize};
use stowage_model::DeclaredSingleton;
use stowage_types::TypeTag;
use tracing::{debug, warn};

/// Saved state of the sole live instance of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingletonRecord {
    #[serde(rename = "type")]
    type_tag: TypeTag,
    #[serde(default)]
    corrupted: bool,
    #[serde(default)]
    fields: SerialFields,
}

impl SingletonRecord {
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            corrupted: false,
            fields: SerialFields::new(),
        }
    }

    /// An empty record for `schema`, or `None` while no instance is live.
    pub fn capture(schema: &dyn DeclaredSingleton) -> SerialResult<Option<Self>> {
        let live = schema.visit_instance(&mut |_| {})?;
        Ok(live.then(|| Self::new(schema.tag().clone())))
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

    /// Saves every declared field of the live instance.
    pub fn save(&mut self, schema: &dyn DeclaredSingleton) -> bool {
        let infos = schema.fields();
        let fields = &mut self.fields;
        let mut tally = Tally::default();
        let visited = schema.visit_instance(&mut |instance| {
            tally = save_declared(fields, schema.owner(), &infos, None, |index| {
                schema.read(&*instance, index)
            });
        });
        match visited {
            Ok(true) => tally.worked(),
            Ok(false) => {
                debug!(type_tag = %self.type_tag, "No live instance to save");
                false
            }
            Err(e) => {
                warn!(type_tag = %self.type_tag, error = %e, "Failed to reach singleton instance");
                false
            }
        }
    }

    /// True when the record is intact and `schema` resolved.
    pub fn can_load(&self, schema: Option<&dyn DeclaredSingleton>) -> bool {
        !self.corrupted && schema.is_some()
    }

    /// Applies the saved payloads to the live instance.
    pub fn load(&self, schema: &dyn DeclaredSingleton, policy: LoadPolicy) -> bool {
        if !self.can_load(Some(schema)) {
            return false;
        }
        let infos = schema.fields();
        let mut tally = Tally::default();
        let visited = schema.visit_instance(&mut |instance| {
            tally = load_declared(&self.fields, schema.owner(), &infos, None, |index, value| {
                schema.write(&mut *instance, index, value)
            });
        });
        match visited {
            Ok(true) => policy.settle(tally, &self.type_tag),
            Ok(false) => {
                debug!(type_tag = %self.type_tag, "No live instance to load into");
                false
            }
            Err(e) => {
                warn!(type_tag = %self.type_tag, error = %e, "Failed to reach singleton instance");
                false
            }
        }
    }
}
