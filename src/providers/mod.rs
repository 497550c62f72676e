//! Provider abstractions for embeddings and LLM chat
//!
//! Trait-based so the Ollama backend can be swapped for a mock in tests
//! or a different local runtime later.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatTurn, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
