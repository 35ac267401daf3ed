//! Append-only context-switch log.
//!
//! [`SwitchRecorder`] validates events and appends them to a [`SwitchLog`]
//! keyed by developer. Reads return events in chronological order and
//! aggregate their costs through the configured [`SwitchCostModel`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{ContextSwitchEvent, SwitchCostModel, SwitchEventDraft, SwitchReason};
use crate::error::{CoreError, StoreError, ValidationError};

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// # Errors
    /// Returns [`ValidationError::InvalidTimeRange`] if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `hours` leading up to and including `now`.
    ///
    /// Spans reaching past the earliest representable time start there.
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Self {
        let start = Duration::try_hours(hours.max(0))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now
            .checked_add_signed(Duration::milliseconds(1))
            .unwrap_or(now);
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Storage for switch events.
pub trait SwitchLog: Send + Sync {
    fn append(&self, event: &ContextSwitchEvent) -> Result<(), StoreError>;

    /// Events for `developer_id` inside `window`, oldest first.
    fn events(&self, developer_id: &str, window: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, StoreError>;
}

/// In-process switch log.
#[derive(Debug, Default)]
pub struct MemorySwitchLog {
    events: RwLock<HashMap<String, Vec<ContextSwitchEvent>>>,
}

impl MemorySwitchLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwitchLog for MemorySwitchLog {
    /// Appending an id that is already logged is a no-op.
    fn append(&self, event: &ContextSwitchEvent) -> Result<(), StoreError> {
        let mut guard = self.events.write();
        if guard.values().flatten().any(|e| e.id() == event.id()) {
            return Ok(());
        }
        guard
            .entry(event.developer_id().to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn events(&self, developer_id: &str, window: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, StoreError> {
        let guard = self.events.read();
        let mut found: Vec<ContextSwitchEvent> = guard
            .get(developer_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| window.contains(e.occurred_at()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps append order for identical timestamps
        found.sort_by_key(|e| e.occurred_at());
        Ok(found)
    }
}

/// Aggregated view of a developer's switches in a window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchSummary {
    pub developer_id: String,
    pub window: TimeWindow,
    pub total_switches: usize,
    pub significant_switches: usize,
    pub total_cost: f64,
    pub total_recovery_minutes: i64,
    pub by_reason: BTreeMap<SwitchReason, usize>,
}

/// Records switch events and answers history and cost queries.
pub struct SwitchRecorder {
    log: Arc<dyn SwitchLog>,
    cost_model: SwitchCostModel,
}

impl SwitchRecorder {
    pub fn new(log: Arc<dyn SwitchLog>, cost_model: SwitchCostModel) -> Self {
        Self { log, cost_model }
    }

    /// Recorder backed by a fresh [`MemorySwitchLog`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySwitchLog::new()), SwitchCostModel::default())
    }

    pub fn cost_model(&self) -> &SwitchCostModel {
        &self.cost_model
    }

    /// Build, clamp and append an event.
    pub fn record(&self, draft: SwitchEventDraft, now: DateTime<Utc>) -> Result<ContextSwitchEvent, CoreError> {
        let event = draft.build(now)?;
        self.append(&event)?;
        Ok(event)
    }

    /// Append an already-built event.
    pub fn append(&self, event: &ContextSwitchEvent) -> Result<(), CoreError> {
        self.log.append(event)?;
        tracing::debug!(
            developer = event.developer_id(),
            switch_type = %event.switch_type(),
            reason = %event.reason(),
            "recorded context switch"
        );
        Ok(())
    }

    /// Events in `window`, oldest first.
    pub fn history(&self, developer_id: &str, window: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, CoreError> {
        Ok(self.log.events(developer_id, window)?)
    }

    /// Sum of switching costs in `window`.
    pub fn aggregate_cost(&self, developer_id: &str, window: &TimeWindow) -> Result<f64, CoreError> {
        let events = self.history(developer_id, window)?;
        Ok(events.iter().map(|e| self.cost_model.cost(e)).sum())
    }

    pub fn summary(&self, developer_id: &str, window: &TimeWindow) -> Result<SwitchSummary, CoreError> {
        let events = self.history(developer_id, window)?;
        let mut by_reason = BTreeMap::new();
        for event in &events {
            *by_reason.entry(event.reason()).or_insert(0) += 1;
        }

        Ok(SwitchSummary {
            developer_id: developer_id.to_string(),
            window: *window,
            total_switches: events.len(),
            significant_switches: events.iter().filter(|e| self.cost_model.is_significant(e)).count(),
            total_cost: events.iter().map(|e| self.cost_model.cost(e)).sum(),
            total_recovery_minutes: events.iter().map(|e| e.recovery_minutes()).sum(),
            by_reason,
        })
    }
}
