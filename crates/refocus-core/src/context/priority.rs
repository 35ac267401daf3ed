//! Snapshot priority scoring.
//!
//! Scores a [`WorkContext`] in `[0, 1]` from three factors:
//! - Recency (step function of age since capture)
//! - Richness (how much restorable state the snapshot carries)
//! - Activity importance (fixed table per [`ActivityKind`])
//!
//! The score is recomputed on every call and never cached, so it tracks
//! wall-clock age. The store uses it for listing order and eviction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityKind, WorkContext};

/// Weights of each factor in the final score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityWeights {
    pub recency: f64,
    pub richness: f64,
    pub activity: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            recency: 0.4,
            richness: 0.3,
            activity: 0.3,
        }
    }
}

/// One step of the recency curve: snapshots at most `max_age_minutes` old score `score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecencyStep {
    pub max_age_minutes: f64,
    pub score: f64,
}

/// Increments used to compute context richness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RichnessWeights {
    pub per_open_file: f64,
    pub open_files_cap: f64,
    pub active_file: f64,
    pub selected_text: f64,
    pub current_task: f64,
    pub current_goal: f64,
    pub per_recent_action: f64,
    pub recent_actions_cap: f64,
}

impl Default for RichnessWeights {
    fn default() -> Self {
        Self {
            per_open_file: 0.05,
            open_files_cap: 0.3,
            active_file: 0.1,
            selected_text: 0.1,
            current_task: 0.2,
            current_goal: 0.1,
            per_recent_action: 0.02,
            recent_actions_cap: 0.2,
        }
    }
}

impl RichnessWeights {
    fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("per_open_file", self.per_open_file),
            ("open_files_cap", self.open_files_cap),
            ("active_file", self.active_file),
            ("selected_text", self.selected_text),
            ("current_task", self.current_task),
            ("current_goal", self.current_goal),
            ("per_recent_action", self.per_recent_action),
            ("recent_actions_cap", self.recent_actions_cap),
        ]
    }
}

/// Importance of each activity kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActivityImportance {
    pub coding: f64,
    pub debugging: f64,
    pub testing: f64,
    pub reviewing: f64,
    pub learning: f64,
    pub researching: f64,
    pub meeting: f64,
    /// Used for [`ActivityKind::Other`]
    pub other: f64,
}

impl Default for ActivityImportance {
    fn default() -> Self {
        Self {
            coding: 0.9,
            debugging: 0.8,
            testing: 0.7,
            reviewing: 0.6,
            learning: 0.5,
            researching: 0.4,
            meeting: 0.3,
            other: 0.5,
        }
    }
}

impl ActivityImportance {
    pub fn get(&self, kind: ActivityKind) -> f64 {
        match kind {
            ActivityKind::Coding => self.coding,
            ActivityKind::Debugging => self.debugging,
            ActivityKind::Testing => self.testing,
            ActivityKind::Reviewing => self.reviewing,
            ActivityKind::Learning => self.learning,
            ActivityKind::Researching => self.researching,
            ActivityKind::Meeting => self.meeting,
            ActivityKind::Other => self.other,
        }
    }
}

/// Priority scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityConfig {
    /// Score for snapshots older than the last step
    pub recency_floor: f64,
    pub weights: PriorityWeights,
    /// Ascending by `max_age_minutes`
    pub recency_steps: Vec<RecencyStep>,
    pub richness: RichnessWeights,
    pub activity_importance: ActivityImportance,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            recency_floor: 0.1,
            weights: PriorityWeights::default(),
            recency_steps: vec![
                RecencyStep { max_age_minutes: 5.0, score: 1.0 },
                RecencyStep { max_age_minutes: 30.0, score: 0.8 },
                RecencyStep { max_age_minutes: 120.0, score: 0.6 },
                RecencyStep { max_age_minutes: 480.0, score: 0.4 },
                RecencyStep { max_age_minutes: 1440.0, score: 0.2 },
            ],
            richness: RichnessWeights::default(),
            activity_importance: ActivityImportance::default(),
        }
    }
}

impl PriorityConfig {
    /// Check that weights and scores are usable.
    ///
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        let w = &self.weights;
        for (name, value) in [("recency", w.recency), ("richness", w.richness), ("activity", w.activity)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("weights.{name} must be a non-negative number"));
            }
        }
        let mut previous = f64::NEG_INFINITY;
        for step in &self.recency_steps {
            if step.max_age_minutes.is_nan() || step.max_age_minutes < previous {
                return Err("recency_steps must be sorted by max_age_minutes".to_string());
            }
            if !(0.0..=1.0).contains(&step.score) {
                return Err("recency step scores must be within [0, 1]".to_string());
            }
            previous = step.max_age_minutes;
        }
        if !(0.0..=1.0).contains(&self.recency_floor) {
            return Err("recency_floor must be within [0, 1]".to_string());
        }
        for (name, value) in self.richness.entries() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("richness.{name} must be a non-negative number"));
            }
        }
        for kind in ActivityKind::ALL {
            if !(0.0..=1.0).contains(&self.activity_importance.get(kind)) {
                return Err(format!("activity_importance.{kind} must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Per-factor view of a score, for display and diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriorityBreakdown {
    pub recency: f64,
    pub richness: f64,
    pub activity: f64,
    pub total: f64,
}

/// Computes snapshot priority scores.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    config: PriorityConfig,
}

impl PriorityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PriorityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PriorityConfig {
        &self.config
    }

    /// Priority of `context` at `now`, in `[0, 1]`.
    pub fn score(&self, context: &WorkContext, now: DateTime<Utc>) -> f64 {
        self.breakdown(context, now).total
    }

    pub fn breakdown(&self, context: &WorkContext, now: DateTime<Utc>) -> PriorityBreakdown {
        let recency = self.recency(context.age_minutes(now));
        let richness = self.richness(context);
        let activity = self.activity_importance(context.activity());
        let w = &self.config.weights;
        let total = (w.recency * recency + w.richness * richness + w.activity * activity).clamp(0.0, 1.0);

        PriorityBreakdown {
            recency,
            richness,
            activity,
            total,
        }
    }

    /// Recency score for a snapshot `age_minutes` old.
    pub fn recency(&self, age_minutes: f64) -> f64 {
        self.config
            .recency_steps
            .iter()
            .find(|step| age_minutes <= step.max_age_minutes)
            .map(|step| step.score)
            .unwrap_or(self.config.recency_floor)
    }

    /// Richness score, capped at 1.0.
    pub fn richness(&self, context: &WorkContext) -> f64 {
        let r = &self.config.richness;
        let mut score = (r.per_open_file * context.open_files().len() as f64).min(r.open_files_cap);

        if context.active_file().is_some() {
            score += r.active_file;
        }
        if context.selected_text().is_some() {
            score += r.selected_text;
        }
        if context.current_task().is_some() {
            score += r.current_task;
        }
        if context.current_goal().is_some() {
            score += r.current_goal;
        }
        score += (r.per_recent_action * context.recent_actions().len() as f64).min(r.recent_actions_cap);

        score.min(1.0)
    }

    pub fn activity_importance(&self, kind: ActivityKind) -> f64 {
        self.config.activity_importance.get(kind)
    }
}
