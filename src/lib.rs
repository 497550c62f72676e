//! ultralearn: learning-assistant backend with auth, chat, flashcards, and RAG answers
//!
//! This crate provides the complete HTTP/WebSocket API for the UltraLearning
//! application: JWT-authenticated users, chat rooms with an AI assistant,
//! flashcard packs and generation, engagement/gamification tracking, and a
//! dashboard. Everything is backed by SQLite, with retrieval-augmented
//! answers produced by a local Ollama server and an embedded vector
//! collection.

pub mod agents;
pub mod auth;
pub mod config;
pub mod error;
pub mod llm;
pub mod providers;
pub mod rag;
pub mod seed;
pub mod server;
pub mod storage;
pub mod types;
pub mod vector;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use server::ApiServer;
pub use storage::Database;
