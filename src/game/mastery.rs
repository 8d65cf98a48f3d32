//! Mastered and mistaken concepts.
//!
//! Mastered concepts are tracked by code, mistakes by name — the shapes the
//! page has always stored. A correct answer clears an earlier mistake for the
//! same concept, and a miss takes a concept back out of the mastered set.

use std::collections::BTreeSet;

use crate::catalog::Concept;
use crate::store::{PersistenceStore, keys, load_json, log_failed_write, save_json};

#[derive(Debug, Clone, Default)]
pub struct MasteryTracker {
    mastered: BTreeSet<u32>,
    mistakes: BTreeSet<String>,
}

impl MasteryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<S: PersistenceStore + ?Sized>(store: &S) -> Self {
        Self {
            mastered: load_json(store, keys::MASTERED).unwrap_or_default(),
            mistakes: load_json(store, keys::MISTAKES).unwrap_or_default(),
        }
    }

    pub fn mastered(&self) -> &BTreeSet<u32> {
        &self.mastered
    }

    pub fn mistakes(&self) -> &BTreeSet<String> {
        &self.mistakes
    }

    pub fn is_mastered(&self, code: u32) -> bool {
        self.mastered.contains(&code)
    }

    pub fn is_mistake(&self, name: &str) -> bool {
        self.mistakes.contains(name)
    }

    pub fn mark_wrong<S: PersistenceStore + ?Sized>(&mut self, concept: &Concept, store: &mut S) {
        if !concept.name.is_empty() && self.mistakes.insert(concept.name.clone()) {
            self.persist_mistakes(store);
            log::info!("[MASTERY] mistake recorded: {}", concept.name);
        }
        if self.mastered.remove(&concept.code) {
            self.persist_mastered(store);
        }
    }

    pub fn mark_mastered<S: PersistenceStore + ?Sized>(
        &mut self,
        concept: &Concept,
        store: &mut S,
    ) {
        if self.mastered.insert(concept.code) {
            self.persist_mastered(store);
            log::info!("[MASTERY] mastered: {} ({})", concept.name, concept.code);
        }
        if self.mistakes.remove(&concept.name) {
            self.persist_mistakes(store);
        }
    }

    pub fn reset_all<S: PersistenceStore + ?Sized>(&mut self, store: &mut S) {
        self.mastered.clear();
        self.mistakes.clear();
        self.persist_mastered(store);
        self.persist_mistakes(store);
        log::info!("[MASTERY] cleared");
    }

    fn persist_mastered<S: PersistenceStore + ?Sized>(&self, store: &mut S) {
        log_failed_write(keys::MASTERED, save_json(store, keys::MASTERED, &self.mastered));
    }

    fn persist_mistakes<S: PersistenceStore + ?Sized>(&self, store: &mut S) {
        log_failed_write(keys::MISTAKES, save_json(store, keys::MISTAKES, &self.mistakes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn concept(code: u32, name: &str) -> Concept {
        Concept {
            zone: code / 100,
            code,
            name: name.to_string(),
            definition: String::new(),
        }
    }

    #[test]
    fn wrong_then_mastered_heals() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        let x = concept(301, "Deadlock");
        tracker.mark_wrong(&x, &mut store);
        assert!(tracker.is_mistake("Deadlock"));
        tracker.mark_mastered(&x, &mut store);
        assert!(!tracker.is_mistake("Deadlock"));
        assert!(tracker.is_mastered(301));

        let reloaded = MasteryTracker::load(&store);
        assert!(!reloaded.is_mistake("Deadlock"));
        assert!(reloaded.is_mastered(301));
    }

    #[test]
    fn wrong_after_mastered_unmasters() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        let x = concept(402, "Index");
        tracker.mark_mastered(&x, &mut store);
        tracker.mark_wrong(&x, &mut store);
        assert!(!tracker.is_mastered(402));
        assert!(tracker.is_mistake("Index"));
    }

    #[test]
    fn unnamed_concept_still_unmasters() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        let x = concept(205, "");
        tracker.mark_mastered(&x, &mut store);
        tracker.mark_wrong(&x, &mut store);
        assert!(!tracker.is_mastered(205));
        assert!(tracker.mistakes().is_empty());
        assert_eq!(store.get(keys::MASTERED), Some("[]".to_string()));
    }

    #[test]
    fn persisted_as_json_arrays() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        tracker.mark_mastered(&concept(101, "Stack"), &mut store);
        tracker.mark_wrong(&concept(102, "Queue"), &mut store);
        assert_eq!(store.get(keys::MASTERED), Some("[101]".to_string()));
        assert_eq!(store.get(keys::MISTAKES), Some(r#"["Queue"]"#.to_string()));
    }

    #[test]
    fn reset_all_clears_both() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        tracker.mark_mastered(&concept(101, "Stack"), &mut store);
        tracker.mark_wrong(&concept(102, "Queue"), &mut store);
        tracker.reset_all(&mut store);
        assert!(tracker.mastered().is_empty());
        assert!(tracker.mistakes().is_empty());
        assert_eq!(store.get(keys::MASTERED), Some("[]".to_string()));
    }

    #[test]
    fn malformed_storage_starts_empty() {
        let mut store = MemoryStore::new();
        store.seed(keys::MASTERED, "{not an array".to_string());
        store.seed(keys::MISTAKES, r#"["Trie"]"#.to_string());
        let tracker = MasteryTracker::load(&store);
        assert!(tracker.mastered().is_empty());
        assert!(tracker.is_mistake("Trie"));
    }

    #[test]
    fn repeat_marks_do_not_rewrite() {
        let mut store = MemoryStore::new();
        let mut tracker = MasteryTracker::new();
        let x = concept(101, "Stack");
        tracker.mark_mastered(&x, &mut store);
        store.take_pending();
        tracker.mark_mastered(&x, &mut store);
        assert!(store.take_pending().is_empty());
    }
}
