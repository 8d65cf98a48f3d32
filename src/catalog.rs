//! Concept catalog — zone → ordered list of `{name, definition}` entries.
//!
//! The catalog is read-only for the rest of the crate. A default catalog is
//! compiled in from `data/concepts.json`; the page can swap it at runtime via
//! `POST /api/catalog/load`.
//!
//! Every concept gets a derived `code` of `zone * 100 + position` (1-based),
//! which is only stable as long as the catalog ordering is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../data/concepts.json");

/// A single quiz concept, annotated with its zone and derived code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub zone: u32,
    pub code: u32,
    pub name: String,
    pub definition: String,
}

/// Raw catalog entry as it appears in the JSON source.
#[derive(Debug, Deserialize)]
struct ConceptEntry {
    name: String,
    #[serde(default)]
    definition: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid concept catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("zone {0} is not a positive zone identifier")]
    InvalidZone(u32),
    #[error("zone {0} is too large to derive concept codes from")]
    ZoneTooLarge(u32),
    #[error("zone {zone} has {count} concepts; at most 99 fit its code range")]
    TooManyConcepts { zone: u32, count: usize },
}

/// Positions 1..=99 map onto the two low decimal digits of a code.
pub const MAX_ZONE_CONCEPTS: usize = 99;

/// Largest zone whose codes still fit in a `u32`.
pub const MAX_ZONE: u32 = (u32::MAX - MAX_ZONE_CONCEPTS as u32) / 100;

/// Derive the stable concept code for a 1-based position within a zone.
/// `None` when the pair falls outside the code range.
pub fn concept_code(zone: u32, position: usize) -> Option<u32> {
    if position == 0 || position > MAX_ZONE_CONCEPTS || zone > MAX_ZONE {
        return None;
    }
    Some(zone * 100 + position as u32)
}

#[derive(Debug, Clone, Default)]
pub struct ConceptCatalog {
    zones: BTreeMap<u32, Vec<Concept>>,
}

impl ConceptCatalog {
    /// Parse a catalog from a JSON object keyed by zone number.
    ///
    /// ```text
    /// { "1": [ { "name": "...", "definition": "..." }, ... ], "3": [ ... ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<u32, Vec<ConceptEntry>> = serde_json::from_str(json)?;
        let mut zones = BTreeMap::new();
        for (zone, entries) in raw {
            if zone == 0 {
                return Err(CatalogError::InvalidZone(zone));
            }
            if zone > MAX_ZONE {
                return Err(CatalogError::ZoneTooLarge(zone));
            }
            if entries.len() > MAX_ZONE_CONCEPTS {
                return Err(CatalogError::TooManyConcepts {
                    zone,
                    count: entries.len(),
                });
            }
            let mut concepts = Vec::with_capacity(entries.len());
            for (i, entry) in entries.into_iter().enumerate() {
                let code = concept_code(zone, i + 1).ok_or(CatalogError::TooManyConcepts {
                    zone,
                    count: i + 1,
                })?;
                concepts.push(Concept {
                    zone,
                    code,
                    name: entry.name,
                    definition: entry.definition,
                });
            }
            zones.insert(zone, concepts);
        }
        Ok(Self { zones })
    }

    /// The catalog compiled into the binary.
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_CATALOG).unwrap_or_else(|e| {
            log::error!("[CATALOG] bundled catalog failed to load: {}", e);
            Self::default()
        })
    }

    /// Concepts in a zone, in catalog order. Unknown zones are empty.
    pub fn zone(&self, zone: u32) -> &[Concept] {
        self.zones.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Zone identifiers present in the catalog, ascending.
    pub fn zone_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.zones.keys().copied()
    }

    /// Every concept across all zones, in zone then position order.
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.zones.values().flatten()
    }

    pub fn find(&self, code: u32) -> Option<&Concept> {
        self.zone(code / 100).iter().find(|c| c.code == code)
    }

    pub fn len(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses() {
        let catalog = ConceptCatalog::bundled();
        assert!(!catalog.is_empty());
        let zones: Vec<u32> = catalog.zone_ids().collect();
        assert_eq!(zones, vec![1, 2, 3, 4, 5, 9]);
    }

    #[test]
    fn codes_follow_zone_and_position() {
        let catalog = ConceptCatalog::from_json(
            r#"{"5":[{"name":"a","definition":"x"},{"name":"b","definition":"y"}]}"#,
        )
        .unwrap();
        let zone = catalog.zone(5);
        assert_eq!(zone[0].code, 501);
        assert_eq!(zone[1].code, 502);
        assert_eq!(zone[1].zone, 5);
        assert_eq!(catalog.find(502).map(|c| c.name.as_str()), Some("b"));
    }

    #[test]
    fn unknown_zone_is_empty() {
        let catalog = ConceptCatalog::bundled();
        assert!(catalog.zone(42).is_empty());
        assert!(catalog.find(4201).is_none());
    }

    #[test]
    fn missing_definition_defaults_to_empty() {
        let catalog = ConceptCatalog::from_json(r#"{"2":[{"name":"only name"}]}"#).unwrap();
        assert_eq!(catalog.zone(2)[0].definition, "");
    }

    #[test]
    fn zero_zone_is_rejected() {
        let result = ConceptCatalog::from_json(r#"{"0":[{"name":"a","definition":"b"}]}"#);
        assert!(matches!(result, Err(CatalogError::InvalidZone(0))));
    }

    #[test]
    fn oversized_zone_is_rejected() {
        let entries: Vec<String> = (1..=100)
            .map(|i| format!(r#"{{"name":"c{i}","definition":""}}"#))
            .collect();
        let json = format!(r#"{{"1":[{}],"2":[{{"name":"z2","definition":""}}]}}"#, entries.join(","));
        let result = ConceptCatalog::from_json(&json);
        assert!(matches!(
            result,
            Err(CatalogError::TooManyConcepts { zone: 1, count: 100 })
        ));
    }

    #[test]
    fn full_zone_keeps_codes_distinct() {
        let entries: Vec<String> = (1..=99)
            .map(|i| format!(r#"{{"name":"c{i}","definition":""}}"#))
            .collect();
        let json = format!(r#"{{"1":[{}],"2":[{{"name":"z2","definition":""}}]}}"#, entries.join(","));
        let catalog = ConceptCatalog::from_json(&json).unwrap();
        assert_eq!(catalog.zone(1)[98].code, 199);
        assert_eq!(catalog.find(201).map(|c| c.name.as_str()), Some("z2"));
    }

    #[test]
    fn huge_zone_is_rejected_without_overflow() {
        let result = ConceptCatalog::from_json(r#"{"50000000":[{"name":"a","definition":"b"}]}"#);
        assert!(matches!(result, Err(CatalogError::ZoneTooLarge(50000000))));
        assert!(ConceptCatalog::from_json(&format!(
            r#"{{"{}":[{{"name":"a","definition":"b"}}]}}"#,
            MAX_ZONE
        ))
        .is_ok());
    }

    #[test]
    fn concept_code_range() {
        assert_eq!(concept_code(3, 1), Some(301));
        assert_eq!(concept_code(3, 99), Some(399));
        assert_eq!(concept_code(3, 100), None);
        assert_eq!(concept_code(MAX_ZONE + 1, 1), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ConceptCatalog::from_json("not json").is_err());
    }

    #[test]
    fn iter_walks_zones_in_order() {
        let catalog = ConceptCatalog::from_json(
            r#"{"3":[{"name":"c","definition":""}],"1":[{"name":"a","definition":""},{"name":"b","definition":""}]}"#,
        )
        .unwrap();
        let names: Vec<&str> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(catalog.len(), 3);
    }
}
