//! Application state for the API server

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::{self, AuthService};
use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::LlmService;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};
use crate::rag::Retriever;
use crate::storage::Database;
use crate::types::User;
use crate::vector::VectorStore;

const ASSISTANT_USERNAME: &str = "learning_assistant";
const ASSISTANT_EMAIL: &str = "assistant@ultralearning.com";

/// Capacity of each room's broadcast channel
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    db: Database,
    auth: AuthService,
    llm: LlmService,
    retriever: Retriever,
    /// Per-room WebSocket fanout channels, created on demand
    rooms: DashMap<i64, broadcast::Sender<String>>,
}

impl AppState {
    /// Create state with Ollama-backed providers
    pub fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let db = Database::new(&config.database.path)?;
        tracing::info!(path = %config.database.path.display(), "Database opened");

        let (embedder, llm) =
            OllamaProvider::new(&config.llm, config.vector.dimensions).split();
        tracing::info!(
            embed_model = %config.llm.embed_model,
            chat_model = %config.llm.chat_model,
            "Ollama providers initialized"
        );

        Self::with_providers(config, db, Arc::new(embedder), Arc::new(llm))
    }

    /// Create state with explicit providers (used by tests with stubs)
    pub fn with_providers(
        config: AppConfig,
        db: Database,
        embedder: Arc<dyn EmbeddingProvider>,
        llm_provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let auth = AuthService::new(&config.auth);
        let llm = LlmService::new(llm_provider, db.clone());
        let store = VectorStore::new(&db, config.vector.dimensions);
        let retriever = Retriever::new(embedder, store, config.vector.top_k);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                auth,
                llm,
                retriever,
                rooms: DashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    pub fn llm(&self) -> &LlmService {
        &self.inner.llm
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn supervisor(&self) -> crate::agents::Supervisor {
        crate::agents::Supervisor::new(self.inner.llm.clone())
    }

    /// Broadcast channel for a room, created on first use
    pub fn room_channel(&self, room_id: i64) -> broadcast::Sender<String> {
        self.inner
            .rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Drop a room's channel once its last subscriber is gone, so the map
    /// does not accumulate entries for every room id ever joined
    pub fn prune_room_channel(&self, room_id: i64) {
        self.inner
            .rooms
            .remove_if(&room_id, |_, sender| sender.receiver_count() == 0);
    }

    /// The bot account that authors assistant replies, created on demand
    pub async fn learning_assistant(&self) -> Result<User> {
        if let Some(user) = self.inner.db.get_user_by_username(ASSISTANT_USERNAME)? {
            return Ok(user);
        }
        let hash = auth::hash_password(self.inner.config.auth.bot_password.clone()).await?;
        match self
            .inner
            .db
            .create_user(ASSISTANT_USERNAME, ASSISTANT_EMAIL, &hash, "assistant")
        {
            Ok(user) => Ok(user),
            // Lost a creation race; the row exists now
            Err(_) => self
                .inner
                .db
                .get_user_by_username(ASSISTANT_USERNAME)?
                .ok_or_else(|| {
                    crate::error::Error::Internal("assistant account unavailable".to_string())
                }),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use async_trait::async_trait;

    /// Embedder returning a constant unit vector
    pub struct FixedEmbedder(pub usize);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; self.0];
            if let Some(first) = v.first_mut() {
                *first = 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.0
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// LLM returning a canned reply
    pub struct CannedLlm(pub String);

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn chat(
            &self,
            _system: &str,
            _turns: &[crate::providers::ChatTurn],
        ) -> Result<String> {
            Ok(self.0.clone())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-model"
        }
    }

    /// App state over an in-memory database and stub providers
    pub fn test_state(reply: &str) -> AppState {
        let config = AppConfig::default();
        let db = Database::in_memory().unwrap();
        let dims = config.vector.dimensions;
        AppState::with_providers(
            config,
            db,
            Arc::new(FixedEmbedder(dims)),
            Arc::new(CannedLlm(reply.to_string())),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_state;

    #[test]
    fn test_room_channel_pruned_when_unused() {
        let state = test_state("ok");
        let sender = state.room_channel(7);
        let receiver = sender.subscribe();
        drop(sender);

        // A live subscriber keeps the channel
        state.prune_room_channel(7);
        assert!(state.inner.rooms.contains_key(&7));

        drop(receiver);
        state.prune_room_channel(7);
        assert!(!state.inner.rooms.contains_key(&7));
    }

    #[test]
    fn test_room_channel_reused_across_calls() {
        let state = test_state("ok");
        let sender = state.room_channel(1);
        let mut receiver = sender.subscribe();

        state.room_channel(1).send("hello".to_string()).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), "hello");
    }
}
