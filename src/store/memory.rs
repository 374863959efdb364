//! In-memory conversation store for tests and `serve --ephemeral`.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ConversationStore, Exchange, StoreError, Turn};

/// Vector-backed store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    turns: RwLock<Vec<Turn>>,
}

impl MemoryConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of turns recorded across all conversations.
    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    /// Whether no turn has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }

    /// Turns for one id, oldest first. Insertion order breaks timestamp ties.
    async fn ordered(&self, conversation_id: &str) -> Vec<Turn> {
        let mut turns: Vec<Turn> = self
            .turns
            .read()
            .await
            .iter()
            .filter(|t| t.conversation_id == conversation_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.timestamp);
        turns
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn fetch_history(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Exchange>, StoreError> {
        let turns = self.ordered(conversation_id).await;
        let skip = limit.map_or(0, |n| turns.len().saturating_sub(n));
        Ok(turns.iter().skip(skip).map(Turn::exchange).collect())
    }

    async fn append(&self, turn: &Turn) -> Result<(), StoreError> {
        let mut turns = self.turns.write().await;
        if turns.iter().any(|t| t.id == turn.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate turn id {}",
                turn.id
            )));
        }
        turns.push(turn.clone());
        Ok(())
    }

    async fn turns(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError> {
        Ok(self.ordered(conversation_id).await)
    }

    async fn recent(&self, limit: Option<usize>) -> Result<Vec<Turn>, StoreError> {
        let mut turns = self.turns.read().await.clone();
        // Stable sort keeps insertion order for equal stamps; reverse for newest first.
        turns.sort_by_key(|t| t.timestamp);
        turns.reverse();
        if let Some(n) = limit {
            turns.truncate(n);
        }
        Ok(turns)
    }
}
