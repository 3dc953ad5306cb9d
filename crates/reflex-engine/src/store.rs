//! In-memory reaction store.
//!
//! Maps an event name to the reactions registered for it, in insertion
//! order. The dispatcher reads it once per event; the management API adds
//! and removes reactions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use reflex_core::Reaction;

use crate::error::StoreError;

/// Thread-safe map from event name to its reactions.
#[derive(Debug, Default)]
pub struct ReactionStore {
    reactions: RwLock<HashMap<String, Vec<Arc<Reaction>>>>,
}

impl ReactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reaction to the list for its event.
    ///
    /// `(event, name)` pairs are unique; adding an existing pair fails with
    /// [`StoreError::Duplicate`].
    pub fn add(&self, reaction: Reaction) -> Result<Arc<Reaction>, StoreError> {
        let reaction = Arc::new(reaction);
        let mut map = self
            .reactions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let list = map.entry(reaction.event.clone()).or_default();
        if list.iter().any(|r| r.name == reaction.name) {
            return Err(StoreError::Duplicate {
                event: reaction.event.clone(),
                name: reaction.name.clone(),
            });
        }
        list.push(Arc::clone(&reaction));
        Ok(reaction)
    }

    /// Remove the reaction `name` registered for `event`.
    pub fn remove(&self, event: &str, name: &str) -> Result<Arc<Reaction>, StoreError> {
        let mut map = self
            .reactions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let list = map
            .get_mut(event)
            .ok_or_else(|| StoreError::NoReactionsForEvent(event.to_string()))?;
        let index = list
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| StoreError::ReactionNotFound {
                event: event.to_string(),
                name: name.to_string(),
            })?;
        let removed = list.remove(index);
        if list.is_empty() {
            map.remove(event);
        }
        Ok(removed)
    }

    /// Reactions registered for `event`, in insertion order.
    ///
    /// The lock is released before returning.
    pub fn matches_for(&self, event: &str) -> Vec<Arc<Reaction>> {
        self.reactions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get(&self, event: &str, name: &str) -> Result<Arc<Reaction>, StoreError> {
        let map = self
            .reactions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let list = map
            .get(event)
            .ok_or_else(|| StoreError::NoReactionsForEvent(event.to_string()))?;
        list.iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| StoreError::ReactionNotFound {
                event: event.to_string(),
                name: name.to_string(),
            })
    }

    /// Every stored reaction, grouped by event name in sorted order.
    pub fn all(&self) -> Vec<Arc<Reaction>> {
        let map = self
            .reactions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut events: Vec<&String> = map.keys().collect();
        events.sort();
        events
            .into_iter()
            .flat_map(|event| map[event].iter().cloned())
            .collect()
    }

    /// Load reactions at startup. Duplicates are skipped and returned.
    pub fn seed(&self, reactions: impl IntoIterator<Item = Reaction>) -> Vec<StoreError> {
        reactions
            .into_iter()
            .filter_map(|reaction| self.add(reaction).err())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reactions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_core::ActionStep;

    fn reaction(event: &str, name: &str) -> Reaction {
        Reaction::new(name, event, "nextAction = 'A'; result = {}")
            .with_step(ActionStep::new("A", "m", "a", ""))
    }

    #[test]
    fn test_add_then_get_round_trip() {
        let store = ReactionStore::new();
        let original = reaction("e1", "r1");
        store.add(original.clone()).unwrap();

        let fetched = store.get("e1", "r1").unwrap();
        assert_eq!(*fetched, original);
    }

    #[test]
    fn test_remove_then_get_not_found() {
        let store = ReactionStore::new();
        store.add(reaction("e1", "r1")).unwrap();
        store.add(reaction("e1", "r2")).unwrap();

        store.remove("e1", "r1").unwrap();
        assert_eq!(
            store.get("e1", "r1").unwrap_err(),
            StoreError::ReactionNotFound {
                event: "e1".to_string(),
                name: "r1".to_string()
            }
        );

        store.remove("e1", "r2").unwrap();
        assert_eq!(
            store.get("e1", "r2").unwrap_err(),
            StoreError::NoReactionsForEvent("e1".to_string())
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_unknown_event() {
        let store = ReactionStore::new();
        assert_eq!(
            store.remove("e1", "r1").unwrap_err(),
            StoreError::NoReactionsForEvent("e1".to_string())
        );
    }

    #[test]
    fn test_remove_unknown_reaction() {
        let store = ReactionStore::new();
        store.add(reaction("e1", "r1")).unwrap();
        assert!(matches!(
            store.remove("e1", "r9"),
            Err(StoreError::ReactionNotFound { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let store = ReactionStore::new();
        store.add(reaction("e1", "r1")).unwrap();
        let err = store.add(reaction("e1", "r1")).unwrap_err();
        assert_eq!(
            err,
            StoreError::Duplicate {
                event: "e1".to_string(),
                name: "r1".to_string()
            }
        );
        // Same name under another event is fine.
        store.add(reaction("e2", "r1")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_matches_preserve_insertion_order() {
        let store = ReactionStore::new();
        store.add(reaction("e1", "b")).unwrap();
        store.add(reaction("e1", "a")).unwrap();
        store.add(reaction("e1", "c")).unwrap();
        store.add(reaction("e2", "z")).unwrap();

        let names: Vec<String> = store
            .matches_for("e1")
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(store.matches_for("nothing").is_empty());
    }

    #[test]
    fn test_all_and_seed() {
        let store = ReactionStore::new();
        let errors = store.seed(vec![
            reaction("e2", "r1"),
            reaction("e1", "r1"),
            reaction("e1", "r1"),
        ]);
        assert_eq!(errors.len(), 1);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event, "e1");
        assert_eq!(all[1].event, "e2");
    }
}
