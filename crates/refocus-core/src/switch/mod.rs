//! Context-switch events.
//!
//! A [`ContextSwitchEvent`] is an append-only audit record of one developer
//! moving from one context to another. Out-of-range numeric inputs are clamped
//! when the event is built rather than rejected:
//!
//! - `interruption_count >= 0`
//! - `recovery_minutes >= 0`
//! - `previous_context_duration_minutes >= 0`
//! - `productivity_impact` within `[-1.0, 1.0]`
//!
//! The significance predicate and the switching cost are derived on demand by
//! [`SwitchCostModel`].

pub mod cost;
pub mod recorder;

pub use cost::{SignificanceThresholds, SwitchCostConfig, SwitchCostModel};
pub use recorder::{MemorySwitchLog, SwitchLog, SwitchRecorder, SwitchSummary, TimeWindow};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ActivityKind;
use crate::error::ValidationError;

/// Kind of transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SwitchType {
    TaskChange,
    ProjectChange,
    ActivityChange,
    FileChange,
    Interruption,
    Break,
    ReturnFromBreak,
}

/// Why the transition happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SwitchReason {
    Planned,
    Interruption,
    Distraction,
    Completion,
    Blocked,
    PriorityChange,
    Unknown,
}

impl SwitchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchType::TaskChange => "task_change",
            SwitchType::ProjectChange => "project_change",
            SwitchType::ActivityChange => "activity_change",
            SwitchType::FileChange => "file_change",
            SwitchType::Interruption => "interruption",
            SwitchType::Break => "break",
            SwitchType::ReturnFromBreak => "return_from_break",
        }
    }
}

impl SwitchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchReason::Planned => "planned",
            SwitchReason::Interruption => "interruption",
            SwitchReason::Distraction => "distraction",
            SwitchReason::Completion => "completion",
            SwitchReason::Blocked => "blocked",
            SwitchReason::PriorityChange => "priority_change",
            SwitchReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace(['-', ' '], "_")
}

impl FromStr for SwitchType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "task_change" | "task" => Ok(SwitchType::TaskChange),
            "project_change" | "project" => Ok(SwitchType::ProjectChange),
            "activity_change" | "activity" => Ok(SwitchType::ActivityChange),
            "file_change" | "file" => Ok(SwitchType::FileChange),
            "interruption" => Ok(SwitchType::Interruption),
            "break" => Ok(SwitchType::Break),
            "return_from_break" | "return" => Ok(SwitchType::ReturnFromBreak),
            other => Err(ValidationError::InvalidValue {
                field: "switch_type".to_string(),
                message: format!("unknown switch type '{other}'"),
            }),
        }
    }
}

impl FromStr for SwitchReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "planned" => Ok(SwitchReason::Planned),
            "interruption" => Ok(SwitchReason::Interruption),
            "distraction" => Ok(SwitchReason::Distraction),
            "completion" => Ok(SwitchReason::Completion),
            "blocked" => Ok(SwitchReason::Blocked),
            "priority_change" => Ok(SwitchReason::PriorityChange),
            "unknown" => Ok(SwitchReason::Unknown),
            other => Err(ValidationError::InvalidValue {
                field: "reason".to_string(),
                message: format!("unknown switch reason '{other}'"),
            }),
        }
    }
}

/// Describes one side of a transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextDescriptor {
    pub project_id: Option<String>,
    pub task: Option<String>,
    pub activity: Option<ActivityKind>,
    pub file: Option<String>,
    /// Snapshot captured for this side of the switch, if any
    pub work_context_id: Option<String>,
}

/// Immutable record of a context switch.
///
/// Deserialization goes through [`SwitchEventDraft`], so stored or hand-written
/// records are clamped the same way as freshly built ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "SwitchEventDraft")]
pub struct ContextSwitchEvent {
    id: String,
    developer_id: String,
    occurred_at: DateTime<Utc>,
    switch_type: SwitchType,
    reason: SwitchReason,
    previous: ContextDescriptor,
    next: ContextDescriptor,
    previous_context_duration_minutes: i64,
    interruption_count: u32,
    interruption_source: Option<String>,
    productivity_impact: f64,
    recovery_minutes: i64,
}

impl ContextSwitchEvent {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn developer_id(&self) -> &str {
        &self.developer_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn switch_type(&self) -> SwitchType {
        self.switch_type
    }

    pub fn reason(&self) -> SwitchReason {
        self.reason
    }

    pub fn previous(&self) -> &ContextDescriptor {
        &self.previous
    }

    pub fn next(&self) -> &ContextDescriptor {
        &self.next
    }

    pub fn previous_context_duration_minutes(&self) -> i64 {
        self.previous_context_duration_minutes
    }

    pub fn interruption_count(&self) -> u32 {
        self.interruption_count
    }

    pub fn interruption_source(&self) -> Option<&str> {
        self.interruption_source.as_deref()
    }

    /// Estimated productivity impact in `[-1.0, 1.0]`.
    pub fn productivity_impact(&self) -> f64 {
        self.productivity_impact
    }

    pub fn recovery_minutes(&self) -> i64 {
        self.recovery_minutes
    }

    /// Significance under the default cost model.
    pub fn is_significant(&self) -> bool {
        SwitchCostModel::default().is_significant(self)
    }

    /// Switching cost under the default cost model.
    pub fn switching_cost(&self) -> f64 {
        SwitchCostModel::default().cost(self)
    }
}

/// Raw inputs for a [`ContextSwitchEvent`]; numeric fields are clamped on build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchEventDraft {
    pub id: Option<String>,
    pub developer_id: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub switch_type: SwitchType,
    pub reason: SwitchReason,
    pub previous: ContextDescriptor,
    pub next: ContextDescriptor,
    pub previous_context_duration_minutes: i64,
    pub interruption_count: i64,
    pub interruption_source: Option<String>,
    pub productivity_impact: f64,
    pub recovery_minutes: i64,
}

impl Default for SwitchEventDraft {
    fn default() -> Self {
        Self {
            id: None,
            developer_id: String::new(),
            occurred_at: None,
            switch_type: SwitchType::TaskChange,
            reason: SwitchReason::Unknown,
            previous: ContextDescriptor::default(),
            next: ContextDescriptor::default(),
            previous_context_duration_minutes: 0,
            interruption_count: 0,
            interruption_source: None,
            productivity_impact: 0.0,
            recovery_minutes: 0,
        }
    }
}

impl SwitchEventDraft {
    pub fn new(developer_id: impl Into<String>, switch_type: SwitchType, reason: SwitchReason) -> Self {
        Self {
            developer_id: developer_id.into(),
            switch_type,
            reason,
            ..Self::default()
        }
    }

    /// Build the event, clamping numeric fields into range.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] if the developer id or a
    /// supplied event id is empty.
    pub fn build(self, now: DateTime<Utc>) -> Result<ContextSwitchEvent, ValidationError> {
        if self.developer_id.trim().is_empty() {
            return Err(ValidationError::MissingField("developer_id"));
        }
        let id = match self.id {
            Some(id) if id.trim().is_empty() => return Err(ValidationError::MissingField("id")),
            Some(id) => id,
            None => format!("switch-{}", Uuid::new_v4()),
        };

        let productivity_impact = if self.productivity_impact.is_nan() {
            0.0
        } else {
            self.productivity_impact.clamp(-1.0, 1.0)
        };

        Ok(ContextSwitchEvent {
            id,
            developer_id: self.developer_id,
            occurred_at: self.occurred_at.unwrap_or(now),
            switch_type: self.switch_type,
            reason: self.reason,
            previous: self.previous,
            next: self.next,
            previous_context_duration_minutes: self.previous_context_duration_minutes.max(0),
            interruption_count: self.interruption_count.clamp(0, u32::MAX as i64) as u32,
            interruption_source: self.interruption_source,
            productivity_impact,
            recovery_minutes: self.recovery_minutes.max(0),
        })
    }
}

impl TryFrom<SwitchEventDraft> for ContextSwitchEvent {
    type Error = ValidationError;

    /// Rebuild a recorded event. Unlike [`SwitchEventDraft::build`], the id
    /// and timestamp must already be present.
    fn try_from(draft: SwitchEventDraft) -> Result<Self, Self::Error> {
        if draft.id.is_none() {
            return Err(ValidationError::MissingField("id"));
        }
        let occurred_at = draft
            .occurred_at
            .ok_or(ValidationError::MissingField("occurred_at"))?;
        draft.build(occurred_at)
    }
}
