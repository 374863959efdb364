//! Per-conversation serialization.
//!
//! Turns of one conversation are processed one at a time; different
//! conversations proceed in parallel. Entries are created on demand and
//! dropped again when the last holder or waiter lets go, so the registry
//! stays proportional to in-flight conversations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of async locks keyed by conversation id.
#[derive(Debug, Clone, Default)]
pub struct ConversationLocks {
    entries: Registry,
}

impl ConversationLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `conversation_id`.
    pub async fn acquire(&self, conversation_id: &str) -> ConversationGuard {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(conversation_id.to_owned()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        ConversationGuard {
            guard: Some(guard),
            lock,
            key: conversation_id.to_owned(),
            entries: Arc::clone(&self.entries),
        }
    }

    /// Number of conversations currently held or awaited.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no conversation is held or awaited.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one conversation; released on drop.
#[derive(Debug)]
pub struct ConversationGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    key: String,
    entries: Registry,
}

impl ConversationGuard {
    /// Conversation this guard covers.
    pub fn conversation_id(&self) -> &str {
        &self.key
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        // Release first so the owned guard's reference is gone before counting.
        drop(self.guard.take());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the registry's and ours. Waiters hold their own.
        if Arc::strong_count(&self.lock) == 2 {
            let same = entries
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
            if same {
                entries.remove(&self.key);
            }
        }
    }
}
