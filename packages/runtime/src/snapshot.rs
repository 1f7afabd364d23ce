//! Point-in-time scenes for every instance.

use std::sync::Arc;

use arscene_value::Object;

use crate::registry::InstanceId;

/// The scenes produced by one simulation tick, indexed by instance id.
///
/// A snapshot is never mutated after it is published. An entry is `None`
/// when the instance has not rendered successfully yet. The snapshot may be
/// shorter than the registry while a newly created instance waits for its
/// first tick.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    tick: u64,
    scenes: Vec<Option<Arc<Object>>>,
}

impl Snapshot {
    pub fn new(tick: u64, scenes: Vec<Option<Arc<Object>>>) -> Self {
        Self { tick, scenes }
    }

    /// Number of the tick that produced this snapshot. Zero before the first.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// The scene of instance `id`, if it has one in this snapshot.
    pub fn get(&self, id: InstanceId) -> Option<&Arc<Object>> {
        self.scenes.get(id).and_then(Option::as_ref)
    }
}
