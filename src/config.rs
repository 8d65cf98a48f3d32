//! Game configuration. Defaults reproduce the classic rules: three questions
//! per round, five minutes per question, win at 50, fail at -25.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Score deltas per evaluation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    pub correct: i64,
    pub partial: i64,
    pub wrong: i64,
    pub timeout: i64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            correct: 5,
            partial: 3,
            wrong: -10,
            timeout: -20,
        }
    }
}

/// What a score reset also clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Score, mastered set and mistake set.
    #[default]
    Full,
    /// Score only; study history survives.
    ScoreOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub questions_per_round: usize,
    /// Countdown length per question, in one-second ticks.
    pub question_seconds: u32,
    /// How long the wheel animation runs before the round begins.
    pub spin_delay_ms: u32,
    /// Zones used when the player has not selected any.
    pub default_zones: Vec<u32>,
    pub scoring: Scoring,
    pub target_score: i64,
    pub fail_score: Option<i64>,
    pub reset_policy: ResetPolicy,
    /// Hold on the definition after a partial/wrong/timeout until acknowledged.
    pub pause_for_review: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_round: 3,
            question_seconds: 300,
            spin_delay_ms: 2000,
            default_zones: vec![1, 3, 4, 5],
            scoring: Scoring::default(),
            target_score: 50,
            fail_score: Some(-25),
            reset_policy: ResetPolicy::Full,
            pause_for_review: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("default_zones must not be empty")]
    NoDefaultZones,
    #[error("fail_score ({fail}) must be below target_score ({target})")]
    FailAboveTarget { fail: i64, target: i64 },
}

impl GameConfig {
    /// Parse a (possibly partial) config; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions_per_round == 0 {
            return Err(ConfigError::Zero("questions_per_round"));
        }
        if self.question_seconds == 0 {
            return Err(ConfigError::Zero("question_seconds"));
        }
        if self.default_zones.is_empty() {
            return Err(ConfigError::NoDefaultZones);
        }
        if let Some(fail) = self.fail_score {
            if fail >= self.target_score {
                return Err(ConfigError::FailAboveTarget {
                    fail,
                    target: self.target_score,
                });
            }
        }
        Ok(())
    }
}
