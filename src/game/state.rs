//! Session container — one owner for every piece of quiz state.
//!
//! `Session` holds the configuration, catalog, store, RNG and the components
//! built on them, and hands each transition exactly the parts it touches.
//! The route layer reaches the single browser session through
//! `thread_local!` + `RefCell`; the Web Worker keeps the WASM module alive,
//! so the session lives for the whole page visit.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::catalog::ConceptCatalog;
use crate::config::{GameConfig, ResetPolicy};
use crate::game::answers::AnswerJournal;
use crate::game::mastery::MasteryTracker;
use crate::game::round::{Evaluation, GameContext, Outcome, RoundEngine, RoundError, Tick};
use crate::game::score::ScoreLedger;
use crate::game::study::{StudyBrowser, StudyFilter, StudySource};
use crate::game::timer::{TimerHandle, format_time};
use crate::store::{MemoryStore, PersistenceStore, keys, log_failed_write, save_json};

/// Seed used until the page supplies one.
pub const DEFAULT_SEED: u64 = 0x5EED_C0DE;

/// Everything the player has earned, for export/import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBundle {
    pub score: i64,
    #[serde(default)]
    pub mastered: BTreeSet<u32>,
    #[serde(default)]
    pub mistakes: BTreeSet<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("progress decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-outs for the page, serialized by `GET /api/game/state`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: &'static str,
    pub zone: Option<u32>,
    pub question_number: Option<usize>,
    pub questions_in_round: usize,
    pub concept: Option<String>,
    pub code: Option<u32>,
    pub timer: String,
    pub timer_seconds: u32,
    pub timer_handle: Option<u64>,
    pub score: i64,
    pub target: i64,
    pub fail_score: Option<i64>,
    pub won: bool,
    pub failed: bool,
    pub show_win: bool,
    pub rounds_completed: u32,
    pub mastered: usize,
    pub mistakes: usize,
}

pub struct Session<S: PersistenceStore = MemoryStore> {
    pub config: GameConfig,
    pub catalog: ConceptCatalog,
    pub engine: RoundEngine,
    pub ledger: ScoreLedger,
    pub mastery: MasteryTracker,
    pub answers: AnswerJournal,
    pub study: StudyBrowser,
    pub store: S,
    rng: Pcg32,
    /// Win banner is up; cleared by the player.
    show_win: bool,
}

impl<S: PersistenceStore> Session<S> {
    /// Build a session, loading score, mastery and answers from `store`.
    pub fn new(config: GameConfig, catalog: ConceptCatalog, store: S, seed: u64) -> Self {
        let ledger = ScoreLedger::load(&store, config.target_score, config.fail_score);
        let mastery = MasteryTracker::load(&store);
        let answers = AnswerJournal::load(&store);
        let engine = RoundEngine::new(&config);
        let mut study = StudyBrowser::default();
        study.apply(StudyFilter::default(), &catalog, &mastery);
        log::info!(
            "[SESSION] loaded score:{} mastered:{} mistakes:{} answers:{}",
            ledger.points(),
            mastery.mastered().len(),
            mastery.mistakes().len(),
            answers.len()
        );
        Self {
            config,
            catalog,
            engine,
            ledger,
            mastery,
            answers,
            study,
            store,
            rng: Pcg32::seed_from_u64(seed),
            show_win: false,
        }
    }

    fn split(&mut self) -> (&mut RoundEngine, GameContext<'_, S, Pcg32>) {
        (
            &mut self.engine,
            GameContext {
                config: &self.config,
                catalog: &self.catalog,
                ledger: &mut self.ledger,
                mastery: &mut self.mastery,
                store: &mut self.store,
                rng: &mut self.rng,
            },
        )
    }

    pub fn show_win(&self) -> bool {
        self.show_win
    }

    pub fn start_game(&mut self) {
        self.show_win = false;
        self.engine.start_game(&self.config);
    }

    pub fn spin(&mut self, zones: &[u32]) -> Option<u32> {
        self.engine.spin(zones, &self.config, &mut self.rng)
    }

    pub fn begin_round(&mut self) -> Result<bool, RoundError> {
        let (engine, mut ctx) = self.split();
        engine.begin_round(&mut ctx)
    }

    pub fn evaluate(&mut self, evaluation: Evaluation) -> Option<Outcome> {
        let (engine, mut ctx) = self.split();
        let outcome = engine.evaluate(evaluation, &mut ctx);
        if let Some(o) = &outcome {
            self.after_outcome(o);
        }
        outcome
    }

    pub fn tick(&mut self, handle: TimerHandle) -> Tick {
        let (engine, mut ctx) = self.split();
        let tick = engine.tick(handle, &mut ctx);
        if let Tick::TimedOut(o) = &tick {
            self.after_outcome(o);
        }
        tick
    }

    pub fn acknowledge(&mut self) -> bool {
        self.engine.acknowledge(&self.config)
    }

    /// Score reset following the configured policy.
    pub fn reset_score(&mut self) {
        let policy = self.config.reset_policy;
        self.reset_with(policy);
    }

    /// Score, mastery and saved answers, regardless of policy.
    pub fn reset_all(&mut self) {
        self.reset_with(ResetPolicy::Full);
        self.answers.clear(&mut self.store);
    }

    pub fn dismiss_win(&mut self) {
        self.show_win = false;
    }

    /// Save the player's free-text answer for the question on screen.
    pub fn record_answer(&mut self, text: &str) -> bool {
        let concept = match self.engine.current_question() {
            Some(c) => c.clone(),
            None => return false,
        };
        self.answers.record(&concept, text, &mut self.store);
        true
    }

    pub fn apply_study_filter(&mut self, filter: StudyFilter) {
        self.study.apply(filter, &self.catalog, &self.mastery);
    }

    pub fn study_next(&mut self) {
        self.study.next();
    }

    pub fn study_random(&mut self) {
        self.study.random(&mut self.rng);
    }

    /// Swap in a new catalog. Any round in progress is abandoned because its
    /// codes may no longer point at the same concepts.
    pub fn replace_catalog(&mut self, catalog: ConceptCatalog) {
        self.catalog = catalog;
        self.engine.start_game(&self.config);
        self.study.refresh(&self.catalog, &self.mastery);
        log::info!("[CATALOG] loaded {} concepts", self.catalog.len());
    }

    pub fn progress(&self) -> ProgressBundle {
        ProgressBundle {
            score: self.ledger.points(),
            mastered: self.mastery.mastered().clone(),
            mistakes: self.mastery.mistakes().clone(),
            answers: self.answers.entries().clone(),
        }
    }

    /// Progress as URL-safe base64 JSON.
    pub fn export_progress(&self) -> String {
        let json = serde_json::to_vec(&self.progress()).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Restore progress exported by [`Session::export_progress`]; writes every
    /// key through the store and reloads the components from it.
    pub fn import_progress(&mut self, encoded: &str) -> Result<(), ImportError> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded.trim())?;
        let bundle: ProgressBundle = serde_json::from_slice(&bytes)?;

        log_failed_write(keys::SCORE, self.store.set(keys::SCORE, bundle.score.to_string()));
        log_failed_write(keys::MASTERED, save_json(&mut self.store, keys::MASTERED, &bundle.mastered));
        log_failed_write(keys::MISTAKES, save_json(&mut self.store, keys::MISTAKES, &bundle.mistakes));
        log_failed_write(keys::ANSWERS, save_json(&mut self.store, keys::ANSWERS, &bundle.answers));

        self.ledger = ScoreLedger::load(&self.store, self.config.target_score, self.config.fail_score);
        self.mastery = MasteryTracker::load(&self.store);
        self.answers = AnswerJournal::load(&self.store);
        self.show_win = false;
        self.study.refresh(&self.catalog, &self.mastery);
        log::info!("[SESSION] imported progress score:{}", self.ledger.points());
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let round = self.engine.round();
        let current = self.engine.current_question();
        let timer = self.engine.timer();
        SessionSnapshot {
            phase: self.engine.phase().as_str(),
            zone: round.zone,
            question_number: current.map(|_| round.index + 1),
            questions_in_round: round.questions.len(),
            concept: current.map(|c| c.name.clone()),
            code: current.map(|c| c.code),
            timer: format_time(timer.remaining()),
            timer_seconds: timer.remaining(),
            timer_handle: timer.handle().map(|h| h.0),
            score: self.ledger.points(),
            target: self.ledger.target(),
            fail_score: self.ledger.fail_threshold(),
            won: self.ledger.is_won(),
            failed: self.ledger.is_failed(),
            show_win: self.show_win,
            rounds_completed: self.engine.rounds_completed(),
            mastered: self.mastery.mastered().len(),
            mistakes: self.mastery.mistakes().len(),
        }
    }

    fn reset_with(&mut self, policy: ResetPolicy) {
        let (engine, mut ctx) = self.split();
        engine.reset_score(policy, &mut ctx);
        self.show_win = false;
        self.study.refresh(&self.catalog, &self.mastery);
    }

    fn after_outcome(&mut self, outcome: &Outcome) {
        if outcome.score.win {
            self.show_win = true;
        }
        if self.study.filter().source == StudySource::Mistakes {
            self.study.refresh(&self.catalog, &self.mastery);
        }
    }
}

impl Session<MemoryStore> {
    /// A session over an empty store with the bundled catalog.
    pub fn fresh() -> Self {
        Self::new(
            GameConfig::default(),
            ConceptCatalog::bundled(),
            MemoryStore::new(),
            DEFAULT_SEED,
        )
    }
}

thread_local! {
    static SESSION: RefCell<Session> = RefCell::new(Session::fresh());
}

/// Execute a closure with read access to the session.
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&Session) -> R,
{
    SESSION.with(|s| f(&s.borrow()))
}

/// Execute a closure with mutable access to the session.
pub fn with_session_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut Session) -> R,
{
    SESSION.with(|s| f(&mut s.borrow_mut()))
}

/// Replace the whole session (page restore, tests).
pub fn replace_session(session: Session) {
    SESSION.with(|s| {
        *s.borrow_mut() = session;
    });
}

/// Export the read-outs as JSON.
pub fn export_state_json() -> String {
    with_session(|s| serde_json::to_string(&s.snapshot()).unwrap_or_else(|_| "{}".to_string()))
}
