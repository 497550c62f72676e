//! LLM query service with persistent query logging
//!
//! Every prompt that goes to the model through this service is recorded in
//! `llm_query_logs`, including failures (logged with an empty response).

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{ChatTurn, LlmProvider};
use crate::storage::Database;

/// Wraps the chat provider and records every query
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    db: Database,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, db: Database) -> Self {
        Self { provider, db }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }

    /// Run a chat completion and log the prompt/response pair
    pub async fn chat(
        &self,
        user_id: Option<i64>,
        system: &str,
        turns: &[ChatTurn],
    ) -> Result<String> {
        let prompt = turns
            .last()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        match self.provider.chat(system, turns).await {
            Ok(response) => {
                self.db
                    .insert_llm_log(user_id, &prompt, Some(&response), self.provider.model())?;
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "LLM chat failed");
                self.db
                    .insert_llm_log(user_id, &prompt, None, self.provider.model())?;
                Err(e)
            }
        }
    }

    /// Single-prompt completion, logged
    pub async fn complete(&self, user_id: Option<i64>, system: &str, prompt: &str) -> Result<String> {
        self.chat(user_id, system, &[ChatTurn::user(prompt)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::test_support::CannedLlm;

    #[test]
    fn test_complete_logs_query() {
        let db = Database::in_memory().unwrap();
        let service = LlmService::new(Arc::new(CannedLlm("hi there".to_string())), db.clone());

        let reply = tokio_test::block_on(service.complete(None, "system", "hello")).unwrap();
        assert_eq!(reply, "hi there");
        assert_eq!(db.count_all("llm_query_logs").unwrap(), 1);
    }
}
