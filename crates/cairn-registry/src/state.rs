use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, RwLock};

use cairn_types::ObjectId;

use crate::root::RegistryRoot;

/// Registry state for one store instance.
///
/// Shared (via `Arc`) by the registry, the index manager and the write-path
/// hook. Reads are non-blocking apart from short lock sections, so the hook
/// can consult it synchronously.
#[derive(Debug, Default)]
pub struct RegistryState {
    internal: RwLock<HashSet<ObjectId>>,
    root: RwLock<Option<RegistryRoot>>,
    meta_schema: RwLock<Option<ObjectId>>,
    creation: Mutex<()>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as registry/index machinery. Call before the creating write.
    pub fn mark_internal(&self, id: ObjectId) {
        self.internal
            .write()
            .expect("registry state lock poisoned")
            .insert(id);
    }

    pub fn is_internal(&self, id: &ObjectId) -> bool {
        self.internal
            .read()
            .expect("registry state lock poisoned")
            .contains(id)
    }

    pub fn internal_count(&self) -> usize {
        self.internal.read().expect("registry state lock poisoned").len()
    }

    /// The cached root, if one has been loaded or created.
    pub fn root(&self) -> Option<RegistryRoot> {
        *self.root.read().expect("registry state lock poisoned")
    }

    pub(crate) fn set_root(&self, root: RegistryRoot) {
        for id in root.ids() {
            self.mark_internal(id);
        }
        *self.root.write().expect("registry state lock poisoned") = Some(root);
    }

    pub fn meta_schema_id(&self) -> Option<ObjectId> {
        *self.meta_schema.read().expect("registry state lock poisoned")
    }

    pub fn set_meta_schema_id(&self, id: ObjectId) {
        *self.meta_schema.write().expect("registry state lock poisoned") = Some(id);
    }

    /// Serialises get-or-create sections within this process.
    pub fn creation_lock(&self) -> MutexGuard<'_, ()> {
        self.creation.lock().expect("registry creation lock poisoned")
    }
}
