//! Out-of-band store for selected file payloads.
//!
//! Upload state only ever holds [`PendingFile`](dam_core::models::PendingFile)
//! metadata; the bytes live here under the same [`FileId`].

use std::collections::HashMap;

use dam_core::models::{FileHandle, FileId};

/// Capability an upload session uses to reach file payloads.
pub trait FileRegistry: Send {
    fn set(&mut self, id: FileId, file: FileHandle);

    fn get(&self, id: &FileId) -> Option<&FileHandle>;

    /// Handles for `ids` in request order. Unknown ids are skipped.
    fn get_all(&self, ids: &[FileId]) -> Vec<&FileHandle> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    fn remove(&mut self, id: &FileId) -> Option<FileHandle>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local registry. Owned by a single upload session.
#[derive(Debug, Default)]
pub struct InMemoryFileRegistry {
    files: HashMap<FileId, FileHandle>,
}

impl InMemoryFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileRegistry for InMemoryFileRegistry {
    fn set(&mut self, id: FileId, file: FileHandle) {
        self.files.insert(id, file);
    }

    fn get(&self, id: &FileId) -> Option<&FileHandle> {
        self.files.get(id)
    }

    fn remove(&mut self, id: &FileId) -> Option<FileHandle> {
        self.files.remove(id)
    }

    fn clear(&mut self) {
        self.files.clear();
    }

    fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> FileHandle {
        FileHandle::new(name, "image/png", vec![1u8, 2, 3])
    }

    #[test]
    fn test_set_then_get() {
        let mut registry = InMemoryFileRegistry::new();
        let id = FileId::new("a.png", 1);
        registry.set(id.clone(), handle("a.png"));

        assert_eq!(registry.get(&id).map(|f| f.name.as_str()), Some("a.png"));
        assert!(registry.get(&FileId::new("a.png", 2)).is_none());
    }

    #[test]
    fn test_get_all_keeps_order_and_drops_missing() {
        let mut registry = InMemoryFileRegistry::new();
        let a = FileId::new("a.png", 1);
        let b = FileId::new("b.png", 2);
        registry.set(a.clone(), handle("a.png"));
        registry.set(b.clone(), handle("b.png"));

        let names: Vec<&str> = registry
            .get_all(&[b, FileId::from("ghost-9"), a])
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b.png", "a.png"]);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut registry = InMemoryFileRegistry::new();
        let ids: Vec<FileId> = (0..3).map(|n| FileId::new("f.png", n)).collect();
        for id in &ids {
            registry.set(id.clone(), handle("f.png"));
        }

        registry.clear();

        assert!(registry.is_empty());
        assert!(ids.iter().all(|id| registry.get(id).is_none()));
    }

    #[test]
    fn test_remove_returns_handle() {
        let mut registry = InMemoryFileRegistry::new();
        let id = FileId::new("a.png", 1);
        registry.set(id.clone(), handle("a.png"));

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert_eq!(registry.len(), 0);
    }
}
