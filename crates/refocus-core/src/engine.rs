//! Engine facade.
//!
//! [`ContextEngine`] wires the snapshot store, switch recorder, priority
//! scorer, cost model and restoration planner behind the operations callers
//! use. Every operation has an `*_at` variant taking `now` explicitly; the
//! plain variant uses the wall clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::context::{PriorityBreakdown, PriorityScorer, WorkContext, WorkContextDraft};
use crate::error::{CoreError, ErrorCode};
use crate::restore::{RestorationPlanner, RestorationResult};
use crate::storage::{Database, EngineConfig};
use crate::store::{self, Lookup, MemoryBackend, RankedContext, SnapshotBackend, SnapshotStore};
use crate::switch::{
    ContextSwitchEvent, MemorySwitchLog, SwitchCostModel, SwitchEventDraft, SwitchLog, SwitchRecorder,
    SwitchSummary, TimeWindow,
};

/// Message used whenever a resume finds nothing usable.
pub const NOTHING_TO_RESTORE: &str = "nothing to restore";

/// A switch event together with the snapshot captured for the context being left.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCapture {
    pub event: ContextSwitchEvent,
    pub context: WorkContext,
}

/// Capture, rank and restore work contexts; record context switches.
pub struct ContextEngine {
    config: EngineConfig,
    store: Arc<SnapshotStore>,
    recorder: SwitchRecorder,
    planner: RestorationPlanner,
}

impl ContextEngine {
    /// Engine over the given persistence backends.
    pub fn with_backends(
        config: EngineConfig,
        snapshots: Arc<dyn SnapshotBackend>,
        switches: Arc<dyn SwitchLog>,
    ) -> Self {
        let scorer = PriorityScorer::with_config(config.priority.clone());
        let store = SnapshotStore::new(snapshots, scorer, config.store.max_snapshots_per_developer);
        let recorder = SwitchRecorder::new(switches, SwitchCostModel::with_config(config.switch_cost.clone()));
        Self {
            config,
            store: Arc::new(store),
            recorder,
            planner: RestorationPlanner::new(),
        }
    }

    /// Engine with in-process storage only.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(MemoryBackend::new()),
            Arc::new(MemorySwitchLog::new()),
        )
    }

    /// Engine using the config file and SQLite database in the data directory.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or the
    /// database cannot be opened.
    pub fn open_default() -> Result<Self, CoreError> {
        Self::open(EngineConfig::load()?)
    }

    /// Engine using `config` and the SQLite database in the data directory.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(config: EngineConfig) -> Result<Self, CoreError> {
        let db = Arc::new(Database::open()?);
        Ok(Self::with_backends(config, db.clone(), db))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn recorder(&self) -> &SwitchRecorder {
        &self.recorder
    }

    pub fn scorer(&self) -> &PriorityScorer {
        self.store.scorer()
    }

    pub fn cost_model(&self) -> &SwitchCostModel {
        self.recorder.cost_model()
    }

    // =====================================================================
    // Capture
    // =====================================================================

    /// Validate a draft and store it as a snapshot.
    pub fn capture_context(&self, draft: WorkContextDraft) -> Result<WorkContext, CoreError> {
        self.capture_context_at(draft, Utc::now())
    }

    /// # Errors
    /// Returns a validation error for an invalid draft, or a store error if
    /// the snapshot cannot be persisted.
    pub fn capture_context_at(&self, draft: WorkContextDraft, now: DateTime<Utc>) -> Result<WorkContext, CoreError> {
        let context = self.build_context(draft, now)?;
        let evicted = self.store.put(context.clone(), now)?;
        tracing::debug!(
            id = context.id(),
            developer = context.developer_id(),
            evicted = evicted.len(),
            "captured work context"
        );
        Ok(context)
    }

    fn build_context(&self, draft: WorkContextDraft, now: DateTime<Utc>) -> Result<WorkContext, CoreError> {
        Ok(draft.capture_with(now, self.config.store.ttl(), self.config.store.max_recent_actions)?)
    }

    /// Record a switch and snapshot the context being left in one step.
    pub fn capture_on_switch(
        &self,
        event: SwitchEventDraft,
        context: WorkContextDraft,
    ) -> Result<SwitchCapture, CoreError> {
        self.capture_on_switch_at(event, context, Utc::now())
    }

    /// Both drafts are validated before anything is stored. The event is
    /// logged before the snapshot is written. The event's
    /// `previous.work_context_id` is filled with the new snapshot id unless
    /// the caller set one.
    ///
    /// # Errors
    /// Returns a validation error if either draft is invalid, or a store
    /// error if persisting fails.
    pub fn capture_on_switch_at(
        &self,
        mut event: SwitchEventDraft,
        context: WorkContextDraft,
        now: DateTime<Utc>,
    ) -> Result<SwitchCapture, CoreError> {
        let context = self.build_context(context, now)?;
        if event.previous.work_context_id.is_none() {
            event.previous.work_context_id = Some(context.id().to_string());
        }
        let event = event.build(now)?;

        self.recorder.append(&event)?;
        self.store.put(context.clone(), now)?;
        Ok(SwitchCapture { event, context })
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// Highest-priority valid snapshot for a developer, optionally within one project.
    pub fn get_best_context(&self, developer_id: &str, project_id: Option<&str>) -> Result<Option<WorkContext>, CoreError> {
        self.get_best_context_at(developer_id, project_id, Utc::now())
    }

    pub fn get_best_context_at(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkContext>, CoreError> {
        self.store.best(developer_id, project_id, now)
    }

    /// Valid snapshots, highest priority first.
    pub fn list_contexts(&self, developer_id: &str, project_id: Option<&str>) -> Result<Vec<WorkContext>, CoreError> {
        self.list_contexts_at(developer_id, project_id, Utc::now())
    }

    pub fn list_contexts_at(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkContext>, CoreError> {
        self.store.list_by_developer(developer_id, project_id, now)
    }

    /// Like [`list_contexts_at`](Self::list_contexts_at) with each priority attached.
    pub fn list_ranked_at(
        &self,
        developer_id: &str,
        project_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedContext>, CoreError> {
        self.store.list_ranked(developer_id, project_id, now)
    }

    /// Look up one snapshot, distinguishing expired from missing.
    pub fn lookup_at(&self, id: &str, now: DateTime<Utc>) -> Result<Lookup, CoreError> {
        self.store.lookup(id, now)
    }

    pub fn priority_breakdown_at(&self, context: &WorkContext, now: DateTime<Utc>) -> PriorityBreakdown {
        self.scorer().breakdown(context, now)
    }

    /// Remove a snapshot regardless of expiry.
    pub fn delete_context(&self, id: &str) -> Result<bool, CoreError> {
        self.store.delete(id)
    }

    pub fn sweep_expired(&self) -> Result<usize, CoreError> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        self.store.sweep_expired(now)
    }

    /// Start the background expiry sweep on the current tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        store::spawn_sweeper(Arc::clone(&self.store), self.config.store.sweep_interval())
    }

    // =====================================================================
    // Restoration
    // =====================================================================

    /// Plan the restoration of a snapshot the caller already holds.
    pub fn plan_restoration(&self, context: &WorkContext) -> RestorationResult {
        self.plan_restoration_at(context, Utc::now())
    }

    pub fn plan_restoration_at(&self, context: &WorkContext, now: DateTime<Utc>) -> RestorationResult {
        self.planner.plan(context, now)
    }

    /// Plan the restoration of a stored snapshot.
    pub fn plan_restoration_by_id(&self, id: &str) -> RestorationResult {
        self.plan_restoration_by_id_at(id, Utc::now())
    }

    /// Absent, expired and unreadable snapshots all yield a failure result.
    pub fn plan_restoration_by_id_at(&self, id: &str, now: DateTime<Utc>) -> RestorationResult {
        match self.store.lookup(id, now) {
            Ok(lookup) => self.planner.plan_lookup(lookup, now),
            Err(e) => {
                tracing::warn!(id, error = %e, "restoration lookup failed");
                RestorationResult::failure(e.to_string(), e.code())
            }
        }
    }

    /// Plan the restoration of the best snapshot in scope.
    pub fn resume(&self, developer_id: &str, project_id: Option<&str>) -> RestorationResult {
        self.resume_at(developer_id, project_id, Utc::now())
    }

    /// Never fails outright: no snapshot, or a store failure, degrades to a
    /// "nothing to restore" failure result.
    pub fn resume_at(&self, developer_id: &str, project_id: Option<&str>, now: DateTime<Utc>) -> RestorationResult {
        match self.store.best(developer_id, project_id, now) {
            Ok(Some(context)) => self.planner.plan(&context, now),
            Ok(None) => RestorationResult::failure(NOTHING_TO_RESTORE, Some(ErrorCode::StateNotFound)),
            Err(e) => {
                tracing::warn!(developer = developer_id, error = %e, "resume degraded to nothing to restore");
                RestorationResult::failure(format!("{NOTHING_TO_RESTORE}: {e}"), e.code())
            }
        }
    }

    // =====================================================================
    // Switches
    // =====================================================================

    /// Clamp and append a switch event.
    pub fn record_switch(&self, draft: SwitchEventDraft) -> Result<ContextSwitchEvent, CoreError> {
        self.record_switch_at(draft, Utc::now())
    }

    pub fn record_switch_at(&self, draft: SwitchEventDraft, now: DateTime<Utc>) -> Result<ContextSwitchEvent, CoreError> {
        self.recorder.record(draft, now)
    }

    pub fn switch_history(&self, developer_id: &str, window: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, CoreError> {
        self.recorder.history(developer_id, window)
    }

    pub fn switch_cost(&self, developer_id: &str, window: &TimeWindow) -> Result<f64, CoreError> {
        self.recorder.aggregate_cost(developer_id, window)
    }

    pub fn switch_summary(&self, developer_id: &str, window: &TimeWindow) -> Result<SwitchSummary, CoreError> {
        self.recorder.summary(developer_id, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::switch::{SwitchReason, SwitchType};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn engine() -> ContextEngine {
        ContextEngine::in_memory(EngineConfig::default())
    }

    /// Backend whose every call fails.
    struct DownBackend;

    impl SnapshotBackend for DownBackend {
        fn put(&self, _: &WorkContext) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn get(&self, _: &str) -> Result<Option<WorkContext>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn scan_developer(&self, _: &str) -> Result<Vec<WorkContext>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn developers(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    /// Switch log whose appends fail.
    struct DownLog;

    impl SwitchLog for DownLog {
        fn append(&self, _: &ContextSwitchEvent) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn events(&self, _: &str, _: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[test]
    fn capture_then_resume_plans_best_context() {
        let engine = engine();
        let draft = WorkContextDraft {
            open_files: vec!["a.go".into(), "b.go".into()],
            active_file: Some("a.go".into()),
            cursor_position: 42,
            current_task: Some("fix bug".into()),
            ..WorkContextDraft::new("dev", "proj")
        };
        let ctx = engine.capture_context_at(draft, now()).unwrap();

        let result = engine.resume_at("dev", Some("proj"), now() + Duration::minutes(2));
        assert!(result.is_success());
        assert_eq!(result.context().unwrap().id(), ctx.id());
        assert_eq!(result.plan().unwrap().steps().len(), 3);
    }

    #[test]
    fn capture_uses_configured_ttl() {
        let mut config = EngineConfig::default();
        config.store.default_ttl_days = 1;
        let engine = ContextEngine::in_memory(config);
        let ctx = engine
            .capture_context_at(WorkContextDraft::new("dev", "proj"), now())
            .unwrap();
        assert_eq!(ctx.expires_at(), now() + Duration::days(1));
    }

    #[test]
    fn oversized_ttl_is_clamped_at_capture() {
        let mut config = EngineConfig::default();
        config.store.default_ttl_days = 100_000_000;
        let engine = ContextEngine::in_memory(config);
        let ctx = engine
            .capture_context_at(WorkContextDraft::new("dev", "proj"), now())
            .unwrap();
        assert_eq!(ctx.expires_at(), now() + Duration::days(crate::context::MAX_TTL_DAYS));
    }

    #[test]
    fn capture_rejects_invalid_draft() {
        let engine = engine();
        let draft = WorkContextDraft {
            cursor_position: -1,
            ..WorkContextDraft::new("dev", "proj")
        };
        let err = engine.capture_context_at(draft, now()).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        assert!(engine.list_contexts_at("dev", None, now()).unwrap().is_empty());
    }

    #[test]
    fn resume_without_snapshots_is_nothing_to_restore() {
        let result = engine().resume_at("nobody", None, now());
        assert!(!result.is_success());
        assert_eq!(result.message(), Some(NOTHING_TO_RESTORE));
        assert_eq!(result.error_code(), Some(ErrorCode::StateNotFound));
    }

    #[test]
    fn resume_degrades_store_failure() {
        let engine = ContextEngine::with_backends(
            EngineConfig::default(),
            Arc::new(DownBackend),
            Arc::new(MemorySwitchLog::new()),
        );
        let result = engine.resume_at("dev", None, now());
        assert!(!result.is_success());
        assert_eq!(result.error_code(), Some(ErrorCode::StoreUnavailable));
        assert!(result.message().unwrap().starts_with(NOTHING_TO_RESTORE));

        let result = engine.plan_restoration_by_id_at("x", now());
        assert_eq!(result.error_code(), Some(ErrorCode::StoreUnavailable));
    }

    #[test]
    fn plan_by_id_reports_expired_then_not_found() {
        let engine = engine();
        let draft = WorkContextDraft {
            captured_at: Some(now() - Duration::days(8)),
            ..WorkContextDraft::new("dev", "proj")
        };
        let ctx = engine.capture_context_at(draft, now()).unwrap();

        let result = engine.plan_restoration_by_id_at(ctx.id(), now());
        assert_eq!(result.error_code(), Some(ErrorCode::StateExpired));
        let result = engine.plan_restoration_by_id_at(ctx.id(), now());
        assert_eq!(result.error_code(), Some(ErrorCode::StateNotFound));
    }

    #[test]
    fn capture_on_switch_links_event_to_snapshot() {
        let engine = engine();
        let event = SwitchEventDraft {
            recovery_minutes: 8,
            ..SwitchEventDraft::new("dev", SwitchType::Interruption, SwitchReason::Interruption)
        };
        let context = WorkContextDraft {
            current_task: Some("write docs".into()),
            ..WorkContextDraft::new("dev", "proj")
        };
        let captured = engine.capture_on_switch_at(event, context, now()).unwrap();

        assert_eq!(
            captured.event.previous().work_context_id.as_deref(),
            Some(captured.context.id())
        );
        let window = TimeWindow::last_hours(now(), 1);
        assert_eq!(engine.switch_history("dev", &window).unwrap().len(), 1);
        assert_eq!(
            engine.get_best_context_at("dev", None, now()).unwrap().unwrap().id(),
            captured.context.id()
        );
    }

    #[test]
    fn capture_on_switch_stores_nothing_when_event_is_invalid() {
        let engine = engine();
        let event = SwitchEventDraft::new("", SwitchType::Break, SwitchReason::Planned);
        let result = engine.capture_on_switch_at(event, WorkContextDraft::new("dev", "proj"), now());
        assert!(result.is_err());
        assert!(engine.list_contexts_at("dev", None, now()).unwrap().is_empty());
    }

    #[test]
    fn capture_on_switch_stores_nothing_when_log_fails() {
        let engine = ContextEngine::with_backends(
            EngineConfig::default(),
            Arc::new(MemoryBackend::new()),
            Arc::new(DownLog),
        );
        let event = SwitchEventDraft::new("dev", SwitchType::Break, SwitchReason::Planned);
        let err = engine
            .capture_on_switch_at(event, WorkContextDraft::new("dev", "proj"), now())
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::StoreUnavailable));
        assert!(engine.list_contexts_at("dev", None, now()).unwrap().is_empty());
    }

    #[test]
    fn record_switch_and_aggregate_cost() {
        let engine = engine();
        let draft = SwitchEventDraft {
            productivity_impact: -0.5,
            recovery_minutes: 8,
            previous_context_duration_minutes: 20,
            ..SwitchEventDraft::new("dev", SwitchType::Interruption, SwitchReason::Interruption)
        };
        let event = engine.record_switch_at(draft, now()).unwrap();
        assert!(engine.cost_model().is_significant(&event));

        let window = TimeWindow::last_hours(now(), 24);
        let cost = engine.switch_cost("dev", &window).unwrap();
        assert!((cost - 25.35).abs() < 1e-9);
        let summary = engine.switch_summary("dev", &window).unwrap();
        assert_eq!(summary.total_switches, 1);
        assert_eq!(summary.significant_switches, 1);
    }

    #[test]
    fn delete_and_sweep() {
        let engine = engine();
        let kept = engine
            .capture_context_at(WorkContextDraft::new("dev", "proj"), now())
            .unwrap();
        let gone = engine
            .capture_context_at(WorkContextDraft::new("dev", "proj"), now())
            .unwrap();
        assert!(engine.delete_context(gone.id()).unwrap());
        assert_eq!(engine.sweep_expired_at(now() + Duration::days(7)).unwrap(), 1);
        assert!(matches!(engine.lookup_at(kept.id(), now()).unwrap(), Lookup::Missing { .. }));
    }
}
