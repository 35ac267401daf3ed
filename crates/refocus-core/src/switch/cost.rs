//! Context-switch cost model.
//!
//! `cost = base × duration × reason × type`, where
//! `base = recovery_minutes + |impact| × impact_scale`. All multipliers come
//! from [`SwitchCostConfig`], whose defaults are the reference tables; they
//! can be overridden from configuration without changing the formula.

use serde::{Deserialize, Serialize};

use super::{ContextSwitchEvent, SwitchReason, SwitchType};

/// Duration multiplier applied when the previous context lasted at most `max_minutes`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DurationStep {
    pub max_minutes: i64,
    pub multiplier: f64,
}

/// Multipliers per [`SwitchReason`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasonMultipliers {
    pub interruption: f64,
    pub distraction: f64,
    pub priority_change: f64,
    pub blocked: f64,
    pub planned: f64,
    pub completion: f64,
    pub unknown: f64,
}

impl Default for ReasonMultipliers {
    fn default() -> Self {
        Self {
            interruption: 1.5,
            distraction: 1.3,
            priority_change: 1.0,
            blocked: 0.8,
            planned: 0.7,
            completion: 0.5,
            unknown: 1.0,
        }
    }
}

impl ReasonMultipliers {
    pub fn get(&self, reason: SwitchReason) -> f64 {
        match reason {
            SwitchReason::Interruption => self.interruption,
            SwitchReason::Distraction => self.distraction,
            SwitchReason::PriorityChange => self.priority_change,
            SwitchReason::Blocked => self.blocked,
            SwitchReason::Planned => self.planned,
            SwitchReason::Completion => self.completion,
            SwitchReason::Unknown => self.unknown,
        }
    }

    fn values(&self) -> [(&'static str, f64); 7] {
        [
            ("interruption", self.interruption),
            ("distraction", self.distraction),
            ("priority_change", self.priority_change),
            ("blocked", self.blocked),
            ("planned", self.planned),
            ("completion", self.completion),
            ("unknown", self.unknown),
        ]
    }
}

/// Multipliers per [`SwitchType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TypeMultipliers {
    pub project_change: f64,
    pub interruption: f64,
    pub task_change: f64,
    pub activity_change: f64,
    pub return_from_break: f64,
    pub file_change: f64,
    #[serde(rename = "break")]
    pub break_: f64,
}

impl Default for TypeMultipliers {
    fn default() -> Self {
        Self {
            project_change: 1.4,
            interruption: 1.3,
            task_change: 1.2,
            activity_change: 1.0,
            return_from_break: 0.8,
            file_change: 0.6,
            break_: 0.3,
        }
    }
}

impl TypeMultipliers {
    pub fn get(&self, switch_type: SwitchType) -> f64 {
        match switch_type {
            SwitchType::ProjectChange => self.project_change,
            SwitchType::Interruption => self.interruption,
            SwitchType::TaskChange => self.task_change,
            SwitchType::ActivityChange => self.activity_change,
            SwitchType::ReturnFromBreak => self.return_from_break,
            SwitchType::FileChange => self.file_change,
            SwitchType::Break => self.break_,
        }
    }

    fn values(&self) -> [(&'static str, f64); 7] {
        [
            ("project_change", self.project_change),
            ("interruption", self.interruption),
            ("task_change", self.task_change),
            ("activity_change", self.activity_change),
            ("return_from_break", self.return_from_break),
            ("file_change", self.file_change),
            ("break", self.break_),
        ]
    }
}

/// Thresholds of the significance predicate.
///
/// A switch is significant iff any of:
/// - reason is interruption and impact < `interruption_impact`
/// - recovery minutes > `recovery_minutes`
/// - prior duration > `prior_duration_minutes` and impact < `prolonged_impact`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignificanceThresholds {
    pub interruption_impact: f64,
    pub recovery_minutes: i64,
    pub prior_duration_minutes: i64,
    pub prolonged_impact: f64,
}

impl Default for SignificanceThresholds {
    fn default() -> Self {
        Self {
            interruption_impact: -0.3,
            recovery_minutes: 5,
            prior_duration_minutes: 10,
            prolonged_impact: -0.2,
        }
    }
}

/// Switch cost configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwitchCostConfig {
    /// Points per unit of absolute productivity impact
    pub impact_scale: f64,
    /// Multiplier for durations beyond the last step
    pub duration_ceiling: f64,
    /// Ascending by `max_minutes`
    pub duration_steps: Vec<DurationStep>,
    pub reasons: ReasonMultipliers,
    pub types: TypeMultipliers,
    pub significance: SignificanceThresholds,
}

impl Default for SwitchCostConfig {
    fn default() -> Self {
        Self {
            impact_scale: 10.0,
            duration_ceiling: 1.5,
            duration_steps: vec![
                DurationStep { max_minutes: 5, multiplier: 0.5 },
                DurationStep { max_minutes: 15, multiplier: 0.8 },
                DurationStep { max_minutes: 30, multiplier: 1.0 },
                DurationStep { max_minutes: 60, multiplier: 1.2 },
            ],
            reasons: ReasonMultipliers::default(),
            types: TypeMultipliers::default(),
            significance: SignificanceThresholds::default(),
        }
    }
}

impl SwitchCostConfig {
    /// Costs must stay non-negative, so every factor must be non-negative.
    pub fn check(&self) -> Result<(), String> {
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        if !non_negative(self.impact_scale) {
            return Err("impact_scale must be a non-negative number".to_string());
        }
        if !non_negative(self.duration_ceiling) {
            return Err("duration_ceiling must be a non-negative number".to_string());
        }
        let mut previous = i64::MIN;
        for step in &self.duration_steps {
            if step.max_minutes < previous {
                return Err("duration_steps must be sorted by max_minutes".to_string());
            }
            if !non_negative(step.multiplier) {
                return Err("duration multipliers must be non-negative".to_string());
            }
            previous = step.max_minutes;
        }
        for (name, value) in self.reasons.values() {
            if !non_negative(value) {
                return Err(format!("reasons.{name} must be non-negative"));
            }
        }
        for (name, value) in self.types.values() {
            if !non_negative(value) {
                return Err(format!("types.{name} must be non-negative"));
            }
        }
        Ok(())
    }
}

/// Computes switching costs and significance.
#[derive(Debug, Clone, Default)]
pub struct SwitchCostModel {
    config: SwitchCostConfig,
}

impl SwitchCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SwitchCostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SwitchCostConfig {
        &self.config
    }

    /// Productivity cost of `event`; never negative for a checked config.
    pub fn cost(&self, event: &ContextSwitchEvent) -> f64 {
        let base = event.recovery_minutes() as f64
            + event.productivity_impact().abs() * self.config.impact_scale;

        base * self.duration_multiplier(event.previous_context_duration_minutes())
            * self.reason_multiplier(event.reason())
            * self.type_multiplier(event.switch_type())
    }

    pub fn duration_multiplier(&self, minutes: i64) -> f64 {
        self.config
            .duration_steps
            .iter()
            .find(|step| minutes <= step.max_minutes)
            .map(|step| step.multiplier)
            .unwrap_or(self.config.duration_ceiling)
    }

    pub fn reason_multiplier(&self, reason: SwitchReason) -> f64 {
        self.config.reasons.get(reason)
    }

    pub fn type_multiplier(&self, switch_type: SwitchType) -> f64 {
        self.config.types.get(switch_type)
    }

    pub fn is_significant(&self, event: &ContextSwitchEvent) -> bool {
        let t = &self.config.significance;
        let impact = event.productivity_impact();

        (event.reason() == SwitchReason::Interruption && impact < t.interruption_impact)
            || event.recovery_minutes() > t.recovery_minutes
            || (event.previous_context_duration_minutes() > t.prior_duration_minutes
                && impact < t.prolonged_impact)
    }
}
