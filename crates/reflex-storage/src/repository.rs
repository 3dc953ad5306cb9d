//! Reaction persistence.
//!
//! The engine keeps active reactions in memory; this repository mirrors
//! them so they survive restarts. It is read once at startup and written by
//! the management API on every add and remove.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension, Row};

use reflex_core::error::ReflexError;
use reflex_core::{ActionStep, Reaction};

use crate::db::Database;

/// CRUD over reactions keyed by `(event, name)`.
pub trait ReactionPersistence: Send + Sync {
    /// Every reaction, grouped by event in creation order.
    fn all(&self) -> Result<Vec<Reaction>, ReflexError>;

    fn for_event(&self, event: &str) -> Result<Vec<Reaction>, ReflexError>;

    fn get(&self, event: &str, name: &str) -> Result<Option<Reaction>, ReflexError>;

    /// Insert a reaction. An existing `(event, name)` pair is a
    /// [`ReflexError::Conflict`].
    fn create(&self, reaction: &Reaction) -> Result<(), ReflexError>;

    /// Delete a reaction. A missing pair is a [`ReflexError::NotFound`].
    fn delete(&self, event: &str, name: &str) -> Result<(), ReflexError>;
}

/// SQLite-backed [`ReactionPersistence`].
pub struct ReactionRepository {
    db: Arc<Database>,
}

impl ReactionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn count(&self) -> Result<u64, ReflexError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM reactions", [], |row| row.get(0))
                .map_err(|e| ReflexError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Reaction>, ReflexError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| ReflexError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params, |row| Ok(row_to_reaction(row)))
                .map_err(|e| ReflexError::Storage(e.to_string()))?;

            let mut reactions = Vec::new();
            for row in rows {
                let reaction = row.map_err(|e| ReflexError::Storage(e.to_string()))?;
                reactions.push(reaction?);
            }
            Ok(reactions)
        })
    }
}

impl ReactionPersistence for ReactionRepository {
    fn all(&self) -> Result<Vec<Reaction>, ReflexError> {
        self.query(
            "SELECT event, name, script, steps FROM reactions
             ORDER BY event, created_at, rowid",
            &[],
        )
    }

    fn for_event(&self, event: &str) -> Result<Vec<Reaction>, ReflexError> {
        self.query(
            "SELECT event, name, script, steps FROM reactions
             WHERE event = ?1 ORDER BY created_at, rowid",
            &[&event],
        )
    }

    fn get(&self, event: &str, name: &str) -> Result<Option<Reaction>, ReflexError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT event, name, script, steps FROM reactions
                     WHERE event = ?1 AND name = ?2",
                    rusqlite::params![event, name],
                    |row| Ok(row_to_reaction(row)),
                )
                .optional()
                .map_err(|e| ReflexError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    fn create(&self, reaction: &Reaction) -> Result<(), ReflexError> {
        let steps = serde_json::to_string(&reaction.steps)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reactions (event, name, script, steps, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    reaction.event,
                    reaction.name,
                    reaction.script,
                    steps,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    ReflexError::Conflict {
                        event: reaction.event.clone(),
                        name: reaction.name.clone(),
                    }
                }
                other => ReflexError::Storage(format!("Failed to save reaction: {}", other)),
            })?;
            Ok(())
        })
    }

    fn delete(&self, event: &str, name: &str) -> Result<(), ReflexError> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM reactions WHERE event = ?1 AND name = ?2",
                    rusqlite::params![event, name],
                )
                .map_err(|e| ReflexError::Storage(format!("Failed to delete reaction: {}", e)))?;
            if deleted == 0 {
                return Err(ReflexError::NotFound {
                    event: event.to_string(),
                    name: name.to_string(),
                });
            }
            Ok(())
        })
    }
}

fn row_to_reaction(row: &Row<'_>) -> Result<Reaction, ReflexError> {
    let event: String = row.get(0).map_err(|e| ReflexError::Storage(e.to_string()))?;
    let name: String = row.get(1).map_err(|e| ReflexError::Storage(e.to_string()))?;
    let script: String = row.get(2).map_err(|e| ReflexError::Storage(e.to_string()))?;
    let steps_json: String = row.get(3).map_err(|e| ReflexError::Storage(e.to_string()))?;

    let steps: BTreeMap<String, ActionStep> = serde_json::from_str(&steps_json)?;
    Ok(Reaction {
        name,
        event,
        script,
        steps,
    }
    .normalize())
}
