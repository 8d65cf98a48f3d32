//! Concept selection for a round.
//!
//! Unmastered concepts are preferred; once a zone is fully mastered the whole
//! zone is back in play so the game never stalls. The concept asked last is
//! held out when the pool can spare it.

use rand::Rng;
use std::collections::BTreeSet;

use crate::catalog::{Concept, ConceptCatalog};

/// Pick up to `count` concepts from `zone`, in random order.
///
/// Returns an empty vector only when the zone has no concepts at all.
pub fn sample<R: Rng + ?Sized>(
    catalog: &ConceptCatalog,
    zone: u32,
    count: usize,
    mastered: &BTreeSet<u32>,
    previous_pick: Option<u32>,
    rng: &mut R,
) -> Vec<Concept> {
    let all = catalog.zone(zone);
    if all.is_empty() {
        return Vec::new();
    }

    let mut pool: Vec<&Concept> = all.iter().filter(|c| !mastered.contains(&c.code)).collect();
    if pool.is_empty() {
        pool = all.iter().collect();
    }

    if let Some(prev) = previous_pick {
        if pool.len() > 1 {
            pool.retain(|c| c.code != prev);
        }
    }

    shuffle(&mut pool, rng);
    pool.into_iter().take(count).cloned().collect()
}

/// Fisher–Yates: walk from the last index down to 1, swapping each slot with
/// a uniformly chosen slot at or below it.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
