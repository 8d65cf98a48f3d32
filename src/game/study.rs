//! Study mode — browse the catalog one card at a time.
//!
//! The filtered list is derived from the catalog and the mistake set every
//! time a filter is applied; nothing here is persisted.

use rand::Rng;

use crate::catalog::{Concept, ConceptCatalog};
use crate::game::mastery::MasteryTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudySource {
    #[default]
    All,
    /// Only concepts currently in the mistake set.
    Mistakes,
}

impl StudySource {
    pub fn parse(s: &str) -> Self {
        match s {
            "mistakes" => Self::Mistakes,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Mistakes => "mistakes",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyFilter {
    pub source: StudySource,
    pub zone: Option<u32>,
    pub search: String,
}

impl StudyFilter {
    fn matches(&self, concept: &Concept, mastery: &MasteryTracker, needle: &str) -> bool {
        if self.zone.is_some_and(|z| concept.zone != z) {
            return false;
        }
        if self.source == StudySource::Mistakes && !mastery.is_mistake(&concept.name) {
            return false;
        }
        needle.is_empty() || concept.name.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudyBrowser {
    filter: StudyFilter,
    /// Codes of the concepts that passed the filter, in catalog order.
    entries: Vec<u32>,
    cursor: usize,
}

impl StudyBrowser {
    pub fn filter(&self) -> &StudyFilter {
        &self.filter
    }

    /// Recompute the list. The cursor is kept when still in range.
    pub fn apply(&mut self, filter: StudyFilter, catalog: &ConceptCatalog, mastery: &MasteryTracker) {
        let needle = filter.search.trim().to_lowercase();
        self.entries = catalog
            .iter()
            .filter(|c| filter.matches(c, mastery, &needle))
            .map(|c| c.code)
            .collect();
        self.filter = filter;
        if self.cursor >= self.entries.len() {
            self.cursor = 0;
        }
        log::debug!("[STUDY] {} concepts match {:?}", self.entries.len(), self.filter);
    }

    /// Re-run the current filter (e.g. after the mistake set changed).
    pub fn refresh(&mut self, catalog: &ConceptCatalog, mastery: &MasteryTracker) {
        let filter = self.filter.clone();
        self.apply(filter, catalog, mastery);
    }

    pub fn current<'a>(&self, catalog: &'a ConceptCatalog) -> Option<&'a Concept> {
        self.entries.get(self.cursor).and_then(|code| catalog.find(*code))
    }

    pub fn next(&mut self) {
        if !self.entries.is_empty() {
            self.cursor = (self.cursor + 1) % self.entries.len();
        }
    }

    pub fn random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.entries.is_empty() {
            self.cursor = rng.random_range(0..self.entries.len());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 0-based cursor into the filtered list.
    pub fn position(&self) -> usize {
        self.cursor
    }
}
