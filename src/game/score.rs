//! Score ledger — the only place points change.
//!
//! Every mutation is written through to the store before returning, so the
//! score on screen is always the score that was last persisted.

use crate::store::{PersistenceStore, keys, log_failed_write};

/// Result of a score mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub total: i64,
    /// The target was crossed by this mutation.
    pub win: bool,
    /// The score is at or below the fail threshold after this mutation.
    pub fail: bool,
}

#[derive(Debug, Clone)]
pub struct ScoreLedger {
    points: i64,
    target: i64,
    fail_threshold: Option<i64>,
    /// Latched once the target is reached; re-armed when the score drops
    /// back below the target or is reset.
    won: bool,
}

impl ScoreLedger {
    pub fn new(target: i64, fail_threshold: Option<i64>) -> Self {
        Self {
            points: 0,
            target,
            fail_threshold,
            won: false,
        }
    }

    /// Load the persisted score. A missing or unparsable value starts at 0.
    ///
    /// A persisted score already at or above the target counts as won, so
    /// reloading the page does not re-announce an old win.
    pub fn load<S: PersistenceStore + ?Sized>(
        store: &S,
        target: i64,
        fail_threshold: Option<i64>,
    ) -> Self {
        let mut ledger = Self::new(target, fail_threshold);
        if let Some(raw) = store.get(keys::SCORE) {
            match raw.trim().parse::<i64>() {
                Ok(points) => ledger.points = points,
                Err(e) => log::warn!("[SCORE] ignoring stored score {:?}: {}", raw, e),
            }
        }
        ledger.won = ledger.points >= target;
        ledger
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn fail_threshold(&self) -> Option<i64> {
        self.fail_threshold
    }

    pub fn is_won(&self) -> bool {
        self.won
    }

    pub fn is_failed(&self) -> bool {
        self.fail_threshold.is_some_and(|f| self.points <= f)
    }

    /// Add `amount`, persist, and report any threshold signals.
    pub fn apply_delta<S: PersistenceStore + ?Sized>(
        &mut self,
        amount: i64,
        store: &mut S,
    ) -> ScoreUpdate {
        self.points = self.points.saturating_add(amount);
        self.persist(store);
        let update = self.evaluate();
        log::info!(
            "[SCORE] {:+} -> {} (win:{} fail:{})",
            amount,
            update.total,
            update.win,
            update.fail
        );
        update
    }

    /// Check the thresholds against the current score.
    pub fn evaluate(&mut self) -> ScoreUpdate {
        let mut win = false;
        if self.points >= self.target {
            if !self.won {
                self.won = true;
                win = true;
            }
        } else {
            self.won = false;
        }
        ScoreUpdate {
            total: self.points,
            win,
            fail: self.is_failed(),
        }
    }

    /// Zero the score, persist, and clear the win latch.
    pub fn reset<S: PersistenceStore + ?Sized>(&mut self, store: &mut S) {
        self.points = 0;
        self.won = false;
        self.persist(store);
        log::info!("[SCORE] reset");
    }

    fn persist<S: PersistenceStore + ?Sized>(&self, store: &mut S) {
        log_failed_write(keys::SCORE, store.set(keys::SCORE, self.points.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn apply_delta_persists_total() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, Some(-25));
        let update = ledger.apply_delta(5, &mut store);
        assert_eq!(update.total, 5);
        assert_eq!(store.get(keys::SCORE), Some("5".to_string()));
    }

    #[test]
    fn reload_matches_memory() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, Some(-25));
        ledger.apply_delta(3, &mut store);
        ledger.apply_delta(-10, &mut store);
        ledger.apply_delta(5, &mut store);
        let reloaded = ScoreLedger::load(&store, 50, Some(-25));
        assert_eq!(reloaded.points(), ledger.points());
        assert_eq!(reloaded.points(), -2);
    }

    #[test]
    fn win_signalled_once_at_crossing() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, Some(-25));
        let mut wins = Vec::new();
        for _ in 0..5 {
            wins.push(ledger.apply_delta(5, &mut store).win);
        }
        assert_eq!(ledger.points(), 25);
        for _ in 0..5 {
            wins.push(ledger.apply_delta(5, &mut store).win);
        }
        assert_eq!(ledger.points(), 50);
        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
        assert!(wins[9]);

        // Staying above the target does not re-signal.
        assert!(!ledger.apply_delta(5, &mut store).win);
    }

    #[test]
    fn win_rearms_after_dropping_below_target() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(10, None);
        assert!(ledger.apply_delta(10, &mut store).win);
        assert!(!ledger.apply_delta(-5, &mut store).win);
        assert!(ledger.apply_delta(5, &mut store).win);
    }

    #[test]
    fn win_rearms_after_reset() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(10, None);
        assert!(ledger.apply_delta(10, &mut store).win);
        ledger.reset(&mut store);
        assert!(!ledger.is_won());
        assert!(ledger.apply_delta(10, &mut store).win);
    }

    #[test]
    fn fail_at_threshold() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, Some(-25));
        assert!(!ledger.apply_delta(-10, &mut store).fail);
        assert!(!ledger.apply_delta(-10, &mut store).fail);
        let update = ledger.apply_delta(-10, &mut store);
        assert_eq!(update.total, -30);
        assert!(update.fail);
        assert!(ledger.is_failed());
    }

    #[test]
    fn no_fail_without_threshold() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, None);
        assert!(!ledger.apply_delta(-1000, &mut store).fail);
    }

    #[test]
    fn reset_zeroes_and_persists() {
        let mut store = MemoryStore::new();
        let mut ledger = ScoreLedger::new(50, Some(-25));
        ledger.apply_delta(-30, &mut store);
        ledger.reset(&mut store);
        assert_eq!(ledger.points(), 0);
        assert!(!ledger.is_failed());
        assert_eq!(store.get(keys::SCORE), Some("0".to_string()));
    }

    #[test]
    fn garbage_score_loads_as_zero() {
        let mut store = MemoryStore::new();
        store.seed(keys::SCORE, "lots".to_string());
        let ledger = ScoreLedger::load(&store, 50, Some(-25));
        assert_eq!(ledger.points(), 0);
    }

    #[test]
    fn loaded_win_is_not_reannounced() {
        let mut store = MemoryStore::new();
        store.seed(keys::SCORE, "55".to_string());
        let mut ledger = ScoreLedger::load(&store, 50, Some(-25));
        assert!(ledger.is_won());
        assert!(!ledger.apply_delta(5, &mut store).win);
    }

    #[test]
    fn extreme_stored_score_saturates() {
        let mut store = MemoryStore::new();
        store.seed(keys::SCORE, i64::MAX.to_string());
        let mut ledger = ScoreLedger::load(&store, 50, Some(-25));
        let update = ledger.apply_delta(5, &mut store);
        assert_eq!(update.total, i64::MAX);
        assert!(!update.fail);
        assert!(!update.win);

        store.seed(keys::SCORE, i64::MIN.to_string());
        let mut ledger = ScoreLedger::load(&store, 50, Some(-25));
        assert_eq!(ledger.apply_delta(-20, &mut store).total, i64::MIN);
    }

    #[test]
    fn failed_write_keeps_score_in_memory() {
        let mut store = MemoryStore::with_quota(4);
        let mut ledger = ScoreLedger::new(50, None);
        let update = ledger.apply_delta(5, &mut store);
        assert_eq!(update.total, 5);
        assert_eq!(store.get(keys::SCORE), None);
    }
}
