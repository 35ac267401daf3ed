//! Work-context snapshots.
//!
//! A [`WorkContext`] captures what a developer had in flight at the moment of
//! an interruption: open files, cursor, task and goal, notes, links to active
//! sessions. Snapshots are built once from a [`WorkContextDraft`] and are
//! read-only afterwards; every accessor hands out borrowed views.
//!
//! Lifecycle:
//! - created by [`WorkContextDraft::capture`] (validated)
//! - expires passively once `now >= expires_at`
//! - removed by explicit deletion or a store sweep

pub mod priority;

pub use priority::{PriorityBreakdown, PriorityConfig, PriorityScorer};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Default snapshot lifetime.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Longest configurable snapshot lifetime.
pub const MAX_TTL_DAYS: i64 = 3650;

/// Maximum number of recent actions kept on a snapshot (most recent last).
pub const MAX_RECENT_ACTIONS: usize = 50;

/// What the developer was doing when the snapshot was taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[default]
    Coding,
    Debugging,
    Testing,
    Reviewing,
    Learning,
    Researching,
    Meeting,
    /// Any activity the scorer has no dedicated weight for
    Other,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 8] = [
        ActivityKind::Coding,
        ActivityKind::Debugging,
        ActivityKind::Testing,
        ActivityKind::Reviewing,
        ActivityKind::Learning,
        ActivityKind::Researching,
        ActivityKind::Meeting,
        ActivityKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Coding => "coding",
            ActivityKind::Debugging => "debugging",
            ActivityKind::Testing => "testing",
            ActivityKind::Reviewing => "reviewing",
            ActivityKind::Learning => "learning",
            ActivityKind::Researching => "researching",
            ActivityKind::Meeting => "meeting",
            ActivityKind::Other => "other",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coding" => Ok(ActivityKind::Coding),
            "debugging" => Ok(ActivityKind::Debugging),
            "testing" => Ok(ActivityKind::Testing),
            "reviewing" => Ok(ActivityKind::Reviewing),
            "learning" => Ok(ActivityKind::Learning),
            "researching" => Ok(ActivityKind::Researching),
            "meeting" => Ok(ActivityKind::Meeting),
            "other" => Ok(ActivityKind::Other),
            other => Err(ValidationError::InvalidValue {
                field: "activity".to_string(),
                message: format!("unknown activity kind '{other}'"),
            }),
        }
    }
}

/// A pointer into source code the developer considered relevant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeReference {
    /// File path
    pub path: String,
    /// 1-based line number, if known
    #[serde(default)]
    pub line: Option<u32>,
    /// Why this location matters
    #[serde(default)]
    pub description: Option<String>,
}

/// Immutable snapshot of a developer's in-progress working state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkContext {
    id: String,
    developer_id: String,
    project_id: String,
    activity: ActivityKind,
    captured_at: DateTime<Utc>,
    open_files: Vec<String>,
    active_file: Option<String>,
    cursor_position: u64,
    selected_text: Option<String>,
    ide_state: BTreeMap<String, serde_json::Value>,
    current_task: Option<String>,
    current_goal: Option<String>,
    recent_actions: Vec<String>,
    code_references: Vec<CodeReference>,
    recent_searches: Vec<String>,
    learning_session_id: Option<String>,
    productivity_session_id: Option<String>,
    mental_model: Option<String>,
    developer_notes: Vec<String>,
    restoration_hints: BTreeMap<String, String>,
    expires_at: DateTime<Utc>,
}

impl WorkContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn developer_id(&self) -> &str {
        &self.developer_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn activity(&self) -> ActivityKind {
        self.activity
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn open_files(&self) -> &[String] {
        &self.open_files
    }

    /// Active file, ignoring blank values.
    pub fn active_file(&self) -> Option<&str> {
        non_blank(&self.active_file)
    }

    pub fn cursor_position(&self) -> u64 {
        self.cursor_position
    }

    /// Selected text, ignoring empty selections.
    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref().filter(|s| !s.is_empty())
    }

    pub fn ide_state(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.ide_state
    }

    pub fn current_task(&self) -> Option<&str> {
        non_blank(&self.current_task)
    }

    pub fn current_goal(&self) -> Option<&str> {
        non_blank(&self.current_goal)
    }

    pub fn recent_actions(&self) -> &[String] {
        &self.recent_actions
    }

    pub fn code_references(&self) -> &[CodeReference] {
        &self.code_references
    }

    pub fn recent_searches(&self) -> &[String] {
        &self.recent_searches
    }

    pub fn learning_session_id(&self) -> Option<&str> {
        non_blank(&self.learning_session_id)
    }

    pub fn productivity_session_id(&self) -> Option<&str> {
        non_blank(&self.productivity_session_id)
    }

    pub fn mental_model(&self) -> Option<&str> {
        non_blank(&self.mental_model)
    }

    pub fn developer_notes(&self) -> &[String] {
        &self.developer_notes
    }

    pub fn restoration_hints(&self) -> &BTreeMap<String, String> {
        &self.restoration_hints
    }

    /// A snapshot is expired from `expires_at` onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Fractional minutes since capture; never negative.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.captured_at).num_milliseconds().max(0);
        millis as f64 / 60_000.0
    }

    /// True if at least one restoration step would be produced for this snapshot.
    pub fn has_restorable_state(&self) -> bool {
        !self.open_files.is_empty()
            || self.active_file().is_some()
            || !self.ide_state.is_empty()
            || self.current_task().is_some()
            || self.current_goal().is_some()
            || self.mental_model().is_some()
            || !self.developer_notes.is_empty()
    }

    /// Re-check construction invariants.
    ///
    /// Snapshots built through [`WorkContextDraft::capture`] always pass; this
    /// guards records that arrive through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.developer_id.trim().is_empty() {
            return Err(ValidationError::MissingField("developer_id"));
        }
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::MissingField("project_id"));
        }
        if self.expires_at <= self.captured_at {
            return Err(ValidationError::InvalidTimeRange {
                start: self.captured_at,
                end: self.expires_at,
            });
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Options used to build a [`WorkContext`].
///
/// All fields are public so callers can fill in what they have and leave the
/// rest at their defaults. `captured_at` defaults to the capture instant and
/// `expires_at` to `captured_at + ttl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkContextDraft {
    pub id: Option<String>,
    pub developer_id: String,
    pub project_id: String,
    pub activity: ActivityKind,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub open_files: Vec<String>,
    pub active_file: Option<String>,
    pub cursor_position: i64,
    pub selected_text: Option<String>,
    pub ide_state: BTreeMap<String, serde_json::Value>,
    pub current_task: Option<String>,
    pub current_goal: Option<String>,
    pub recent_actions: Vec<String>,
    pub code_references: Vec<CodeReference>,
    pub recent_searches: Vec<String>,
    pub learning_session_id: Option<String>,
    pub productivity_session_id: Option<String>,
    pub mental_model: Option<String>,
    pub developer_notes: Vec<String>,
    pub restoration_hints: BTreeMap<String, String>,
}

impl WorkContextDraft {
    pub fn new(developer_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            developer_id: developer_id.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Build the snapshot with the default TTL and action bound.
    pub fn capture(self, now: DateTime<Utc>) -> Result<WorkContext, ValidationError> {
        self.capture_with(now, Duration::days(DEFAULT_TTL_DAYS), MAX_RECENT_ACTIONS)
    }

    /// Build the snapshot.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if an identifier is empty, the cursor is
    /// negative, or the expiry is out of range or does not come after the
    /// capture time.
    pub fn capture_with(
        self,
        now: DateTime<Utc>,
        ttl: Duration,
        max_recent_actions: usize,
    ) -> Result<WorkContext, ValidationError> {
        if self.developer_id.trim().is_empty() {
            return Err(ValidationError::MissingField("developer_id"));
        }
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::MissingField("project_id"));
        }
        if self.cursor_position < 0 {
            return Err(ValidationError::NegativeCursor(self.cursor_position));
        }

        let id = match self.id {
            Some(id) if id.trim().is_empty() => return Err(ValidationError::MissingField("id")),
            Some(id) => id,
            None => format!("ctx-{}", Uuid::new_v4()),
        };

        let captured_at = self.captured_at.unwrap_or(now);
        let expires_at = match self.expires_at {
            Some(at) => at,
            None => captured_at
                .checked_add_signed(ttl)
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "expires_at".to_string(),
                    message: format!("captured_at {captured_at} plus the TTL is out of range"),
                })?,
        };
        if expires_at <= captured_at {
            return Err(ValidationError::InvalidTimeRange {
                start: captured_at,
                end: expires_at,
            });
        }

        let mut recent_actions = self.recent_actions;
        if recent_actions.len() > max_recent_actions {
            let overflow = recent_actions.len() - max_recent_actions;
            recent_actions.drain(..overflow);
        }

        Ok(WorkContext {
            id,
            developer_id: self.developer_id,
            project_id: self.project_id,
            activity: self.activity,
            captured_at,
            open_files: self.open_files,
            active_file: self.active_file,
            cursor_position: self.cursor_position as u64,
            selected_text: self.selected_text,
            ide_state: self.ide_state,
            current_task: self.current_task,
            current_goal: self.current_goal,
            recent_actions,
            code_references: self.code_references,
            recent_searches: self.recent_searches,
            learning_session_id: self.learning_session_id,
            productivity_session_id: self.productivity_session_id,
            mental_model: self.mental_model,
            developer_notes: self.developer_notes,
            restoration_hints: self.restoration_hints,
            expires_at,
        })
    }
}
