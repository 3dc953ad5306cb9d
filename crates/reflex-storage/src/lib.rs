//! Reflex Storage crate - SQLite persistence for reactions.
//!
//! Provides a WAL-mode SQLite database with migrations and the reaction
//! repository used to seed and mirror the engine's reaction store.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ReactionPersistence, ReactionRepository};
