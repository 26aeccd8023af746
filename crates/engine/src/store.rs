//! `StateStore` — where a session's snapshot lives between sessions.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::SystemState;

/// Atomic read/replace of the externally owned system snapshot.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_snapshot(&self) -> SystemState;
    async fn set_snapshot(&self, state: SystemState);
}

/// A `StateStore` held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: RwLock<SystemState>,
}

impl InMemoryStateStore {
    pub fn new(state: SystemState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_snapshot(&self) -> SystemState {
        self.state.read().await.clone()
    }

    async fn set_snapshot(&self, state: SystemState) {
        *self.state.write().await = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_replace_is_visible() {
        let store = InMemoryStateStore::default();
        let mut state = store.get_snapshot().await;
        state.graph_state.graph.add_node("a");
        store.set_snapshot(state.clone()).await;

        assert_eq!(store.get_snapshot().await, state);
    }
}
