//! Persistent storage for all relational data
//!
//! A single SQLite file holds users, chat, learning, engagement, activity,
//! and LLM-log tables. The vector collection shares the same file (see
//! [`crate::vector`]).

mod database;

pub use database::{Database, LeaderboardEntry};
