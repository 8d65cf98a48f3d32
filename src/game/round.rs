//! Round engine — the quiz state machine.
//!
//! ```text
//!            start_game (any phase)
//!                  │
//!                  ▼
//!   ┌────────►   Idle ──spin──► ZoneSelecting ──begin_round──► QuestionActive ◄─┐
//!   │                                 │ (empty zone)            │   evaluate /   │
//!   │                                 ▼                         │   timeout      │
//!   └──spin── RoundComplete ◄─────────┴─────── last question ◄──┤                │
//!                                                               ▼                │
//!                                         Reviewing ──acknowledge───────────────┘
//!
//!   any score mutation at or below the fail threshold ──► GameOver
//!   GameOver ──reset_score / start_game──► Idle
//! ```
//!
//! Duplicate or stale events (a second evaluation for the same question, a
//! tick from a retired timer, a spin mid-round) are ignored rather than
//! reported. The one reported failure is a zone with no concepts.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Concept, ConceptCatalog};
use crate::config::{GameConfig, ResetPolicy, Scoring};
use crate::game::mastery::MasteryTracker;
use crate::game::sampler;
use crate::game::score::{ScoreLedger, ScoreUpdate};
use crate::game::timer::{Countdown, TickOutcome, TimerHandle};
use crate::store::PersistenceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ZoneSelecting { zone: u32 },
    QuestionActive,
    /// Definition on screen after a miss; waiting for the player to continue.
    Reviewing,
    RoundComplete,
    GameOver,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ZoneSelecting { .. } => "zone_selecting",
            Self::QuestionActive => "question_active",
            Self::Reviewing => "reviewing",
            Self::RoundComplete => "round_complete",
            Self::GameOver => "game_over",
        }
    }
}

/// Self-reported result for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Correct,
    Partial,
    Wrong,
    Timeout,
}

impl Evaluation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "correct" => Some(Self::Correct),
            "partial" => Some(Self::Partial),
            "wrong" => Some(Self::Wrong),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn delta(self, scoring: &Scoring) -> i64 {
        match self {
            Self::Correct => scoring.correct,
            Self::Partial => scoring.partial,
            Self::Wrong => scoring.wrong,
            Self::Timeout => scoring.timeout,
        }
    }

    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("zone {zone} has no concepts")]
    EmptyZone { zone: u32 },
}

/// The active round.
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    pub zone: Option<u32>,
    pub questions: Vec<Concept>,
    pub index: usize,
    pub awaiting_evaluation: bool,
}

impl RoundState {
    pub fn current(&self) -> Option<&Concept> {
        self.questions.get(self.index)
    }
}

/// The answer shown to the player after an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    pub concept: Concept,
    pub evaluation: Evaluation,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reveal: Reveal,
    pub score: ScoreUpdate,
    /// Phase after the evaluation was applied.
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Stale,
    Running { remaining: u32 },
    TimedOut(Outcome),
}

/// Everything a transition may read or mutate besides the engine itself.
pub struct GameContext<'a, S: PersistenceStore + ?Sized, R: Rng + ?Sized> {
    pub config: &'a GameConfig,
    pub catalog: &'a ConceptCatalog,
    pub ledger: &'a mut ScoreLedger,
    pub mastery: &'a mut MasteryTracker,
    pub store: &'a mut S,
    pub rng: &'a mut R,
}

#[derive(Debug, Clone)]
pub struct RoundEngine {
    phase: Phase,
    round: RoundState,
    timer: Countdown,
    /// Code of the last concept asked, held out of the next draw.
    previous_pick: Option<u32>,
    last_reveal: Option<Reveal>,
    rounds_completed: u32,
}

impl RoundEngine {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            phase: Phase::Idle,
            round: RoundState::default(),
            timer: Countdown::new(config.question_seconds),
            previous_pick: None,
            last_reveal: None,
            rounds_completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn last_reveal(&self) -> Option<&Reveal> {
        self.last_reveal.as_ref()
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    /// The question currently waiting for an evaluation.
    pub fn current_question(&self) -> Option<&Concept> {
        if self.round.awaiting_evaluation {
            self.round.current()
        } else {
            None
        }
    }

    pub fn can_spin(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::RoundComplete)
    }

    /// Reset the round and leave any game-over state.
    pub fn start_game(&mut self, config: &GameConfig) {
        self.round = RoundState::default();
        self.timer.reset(config.question_seconds);
        self.last_reveal = None;
        self.phase = Phase::Idle;
        log::info!("[ROUND] game started");
    }

    /// Pick a zone uniformly from `active_zones` (or the configured defaults
    /// when none are selected). Returns `None` if a round is in progress or
    /// the game is over.
    pub fn spin<R: Rng + ?Sized>(
        &mut self,
        active_zones: &[u32],
        config: &GameConfig,
        rng: &mut R,
    ) -> Option<u32> {
        if !self.can_spin() {
            log::debug!("[ROUND] spin ignored in {:?}", self.phase);
            return None;
        }
        let zones = if active_zones.is_empty() {
            config.default_zones.as_slice()
        } else {
            active_zones
        };
        if zones.is_empty() {
            return None;
        }
        let zone = zones[rng.random_range(0..zones.len())];
        self.round = RoundState {
            zone: Some(zone),
            ..RoundState::default()
        };
        self.last_reveal = None;
        self.phase = Phase::ZoneSelecting { zone };
        log::info!("[ROUND] spun zone {}", zone);
        Some(zone)
    }

    /// Draw the round's questions once the wheel has stopped. Returns
    /// `Ok(false)` when no spin is pending.
    pub fn begin_round<S, R>(&mut self, ctx: &mut GameContext<'_, S, R>) -> Result<bool, RoundError>
    where
        S: PersistenceStore + ?Sized,
        R: Rng + ?Sized,
    {
        let Phase::ZoneSelecting { zone } = self.phase else {
            log::debug!("[ROUND] begin_round ignored in {:?}", self.phase);
            return Ok(false);
        };

        let questions = sampler::sample(
            ctx.catalog,
            zone,
            ctx.config.questions_per_round,
            ctx.mastery.mastered(),
            self.previous_pick,
            &mut *ctx.rng,
        );
        if questions.is_empty() {
            self.round = RoundState {
                zone: Some(zone),
                ..RoundState::default()
            };
            self.phase = Phase::RoundComplete;
            log::error!("[ROUND] zone {} has no concepts; round not started", zone);
            return Err(RoundError::EmptyZone { zone });
        }

        log::info!("[ROUND] zone {} round with {} questions", zone, questions.len());
        self.round = RoundState {
            zone: Some(zone),
            questions,
            index: 0,
            awaiting_evaluation: false,
        };
        self.start_question(ctx.config);
        Ok(true)
    }

    /// Apply a self-reported evaluation to the current question.
    pub fn evaluate<S, R>(
        &mut self,
        evaluation: Evaluation,
        ctx: &mut GameContext<'_, S, R>,
    ) -> Option<Outcome>
    where
        S: PersistenceStore + ?Sized,
        R: Rng + ?Sized,
    {
        if self.phase != Phase::QuestionActive || !self.round.awaiting_evaluation {
            log::debug!("[ROUND] {:?} ignored in {:?}", evaluation, self.phase);
            return None;
        }
        Some(self.resolve(evaluation, ctx))
    }

    /// Advance the countdown. Expiry resolves the question as a timeout.
    pub fn tick<S, R>(&mut self, handle: TimerHandle, ctx: &mut GameContext<'_, S, R>) -> Tick
    where
        S: PersistenceStore + ?Sized,
        R: Rng + ?Sized,
    {
        match self.timer.tick(handle) {
            TickOutcome::Stale => Tick::Stale,
            TickOutcome::Running { remaining } => Tick::Running { remaining },
            TickOutcome::Expired => match self.evaluate(Evaluation::Timeout, ctx) {
                Some(outcome) => Tick::TimedOut(outcome),
                None => Tick::Stale,
            },
        }
    }

    /// Leave the review pause and move on.
    pub fn acknowledge(&mut self, config: &GameConfig) -> bool {
        if self.phase != Phase::Reviewing {
            return false;
        }
        self.advance(config);
        true
    }

    /// Zero the score and, depending on `policy`, the mastery history. The
    /// round itself is left alone; a game-over is lifted.
    pub fn reset_score<S, R>(&mut self, policy: ResetPolicy, ctx: &mut GameContext<'_, S, R>)
    where
        S: PersistenceStore + ?Sized,
        R: Rng + ?Sized,
    {
        ctx.ledger.reset(&mut *ctx.store);
        if policy == ResetPolicy::Full {
            ctx.mastery.reset_all(&mut *ctx.store);
        }
        if self.phase == Phase::GameOver {
            self.phase = Phase::Idle;
        }
    }

    fn start_question(&mut self, config: &GameConfig) {
        if self.round.index >= self.round.questions.len() {
            self.finish_round();
            return;
        }
        self.round.awaiting_evaluation = true;
        let handle = self.timer.start(config.question_seconds);
        self.phase = Phase::QuestionActive;
        log::debug!(
            "[ROUND] question {}/{} timer {:?}",
            self.round.index + 1,
            self.round.questions.len(),
            handle
        );
    }

    fn advance(&mut self, config: &GameConfig) {
        if self.round.index >= self.round.questions.len() {
            self.finish_round();
        } else {
            self.start_question(config);
        }
    }

    fn finish_round(&mut self) {
        self.round.awaiting_evaluation = false;
        self.timer.cancel();
        self.rounds_completed += 1;
        self.phase = Phase::RoundComplete;
        log::info!("[ROUND] round complete ({} total)", self.rounds_completed);
    }

    fn resolve<S, R>(&mut self, evaluation: Evaluation, ctx: &mut GameContext<'_, S, R>) -> Outcome
    where
        S: PersistenceStore + ?Sized,
        R: Rng + ?Sized,
    {
        self.round.awaiting_evaluation = false;
        if evaluation == Evaluation::Timeout {
            self.timer.expire();
        } else {
            self.timer.cancel();
        }

        let concept = self.round.questions[self.round.index].clone();
        let delta = evaluation.delta(&ctx.config.scoring);
        let score = ctx.ledger.apply_delta(delta, &mut *ctx.store);
        if evaluation.is_correct() {
            ctx.mastery.mark_mastered(&concept, &mut *ctx.store);
        } else {
            ctx.mastery.mark_wrong(&concept, &mut *ctx.store);
        }

        self.previous_pick = Some(concept.code);
        self.round.index += 1;
        let reveal = Reveal {
            concept,
            evaluation,
            delta,
        };
        self.last_reveal = Some(reveal.clone());

        if score.fail {
            self.timer.cancel();
            self.round.questions.clear();
            self.round.index = 0;
            self.phase = Phase::GameOver;
            log::info!("[ROUND] game over at {}", score.total);
        } else if evaluation.is_correct() || !ctx.config.pause_for_review {
            self.advance(ctx.config);
        } else {
            self.phase = Phase::Reviewing;
        }

        Outcome {
            reveal,
            score,
            phase: self.phase,
        }
    }
}
