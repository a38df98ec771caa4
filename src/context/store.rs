//! Process-wide holder of the current rendered context.

use std::sync::{Arc, RwLock};

/// Last-writer-wins holder of the rendered schema context.
///
/// The text is swapped as a whole; readers get either the previous or the new
/// document, never a mix. Cloning the store shares the same slot.
#[derive(Debug, Clone)]
pub struct SchemaContextStore {
    current: Arc<RwLock<Arc<str>>>,
}

impl SchemaContextStore {
    pub fn new(initial: impl Into<Arc<str>>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial.into())),
        }
    }

    /// Snapshot of the current context.
    pub fn get(&self) -> Arc<str> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the context wholesale.
    pub fn replace(&self, context: impl Into<Arc<str>>) {
        let next = context.into();
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }
}

impl Default for SchemaContextStore {
    fn default() -> Self {
        Self::new("")
    }
}
