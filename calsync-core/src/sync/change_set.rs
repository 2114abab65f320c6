//! Batched edits coming from the presentation layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventPatch;

/// One batched edit: an optional add, any number of changes, an optional delete.
///
/// `changed` is keyed by template id and processed in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<EventPatch>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changed: BTreeMap<String, EventPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
}

impl ChangeSet {
    pub fn add(patch: EventPatch) -> Self {
        ChangeSet {
            added: Some(patch),
            ..Default::default()
        }
    }

    pub fn change(id: &str, patch: EventPatch) -> Self {
        ChangeSet::default().and_change(id, patch)
    }

    pub fn delete(id: &str) -> Self {
        ChangeSet {
            deleted: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn and_change(mut self, id: &str, patch: EventPatch) -> Self {
        self.changed.insert(id.to_string(), patch);
        self
    }

    pub fn and_delete(mut self, id: &str) -> Self {
        self.deleted = Some(id.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.changed.is_empty() && self.deleted.is_none()
    }
}
