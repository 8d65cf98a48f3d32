//! Free-text answers the player typed for a question, keyed `"{zone}-{code}"`.

use std::collections::BTreeMap;

use crate::catalog::Concept;
use crate::store::{PersistenceStore, keys, load_json, log_failed_write, save_json};

/// Longest answer kept, in characters.
const MAX_ANSWER_CHARS: usize = 2000;

pub fn answer_key(concept: &Concept) -> String {
    format!("{}-{}", concept.zone, concept.code)
}

#[derive(Debug, Clone, Default)]
pub struct AnswerJournal {
    answers: BTreeMap<String, String>,
}

impl AnswerJournal {
    pub fn load<S: PersistenceStore + ?Sized>(store: &S) -> Self {
        Self {
            answers: load_json(store, keys::ANSWERS).unwrap_or_default(),
        }
    }

    pub fn get(&self, concept: &Concept) -> Option<&str> {
        self.answers.get(&answer_key(concept)).map(String::as_str)
    }

    /// Save (or, for blank text, forget) the answer for a concept.
    pub fn record<S: PersistenceStore + ?Sized>(
        &mut self,
        concept: &Concept,
        text: &str,
        store: &mut S,
    ) {
        let text = text.trim();
        let key = answer_key(concept);
        if text.is_empty() {
            if self.answers.remove(&key).is_none() {
                return;
            }
        } else {
            let text: String = text.chars().take(MAX_ANSWER_CHARS).collect();
            self.answers.insert(key, text);
        }
        self.persist(store);
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn clear<S: PersistenceStore + ?Sized>(&mut self, store: &mut S) {
        self.answers.clear();
        store.remove(keys::ANSWERS);
    }

    fn persist<S: PersistenceStore + ?Sized>(&self, store: &mut S) {
        log_failed_write(keys::ANSWERS, save_json(store, keys::ANSWERS, &self.answers));
    }
}
