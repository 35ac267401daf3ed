//! # Refocus Core Library
//!
//! This library captures a developer's in-progress work context at the moment
//! of an interruption and later turns it into a concrete, time-estimated plan
//! for getting back into it. The `refocus` CLI is a thin layer over the same
//! library.
//!
//! ## Architecture
//!
//! - **Snapshots**: immutable, validated work-context records with a TTL
//! - **Snapshot Store**: per-developer partitioned store with priority-based
//!   eviction and expiry sweeps, over a pluggable persistence backend
//! - **Scoring**: pure priority scorer and switch cost model, both driven by
//!   overridable tables
//! - **Restoration**: pure planner producing ordered restoration steps
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`ContextEngine`]: Facade over every operation
//! - [`SnapshotStore`]: TTL-aware snapshot store
//! - [`RestorationPlanner`]: Snapshot to restoration plan
//! - [`SwitchRecorder`]: Append-only context-switch log
//! - [`EngineConfig`]: Engine configuration management

pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod restore;
pub mod storage;
pub mod store;
pub mod switch;

pub use context::{
    ActivityKind, CodeReference, PriorityBreakdown, PriorityConfig, PriorityScorer, WorkContext, WorkContextDraft,
};
pub use engine::{ContextEngine, SwitchCapture};
pub use error::{ConfigError, CoreError, ErrorCode, StoreError, ValidationError};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use restore::{RestorationPlan, RestorationPlanner, RestorationResult, RestorationStep};
pub use storage::{data_dir, Database, EngineConfig, StoreConfig};
pub use store::{Lookup, MemoryBackend, RankedContext, SnapshotBackend, SnapshotStore};
pub use switch::{
    ContextDescriptor, ContextSwitchEvent, MemorySwitchLog, SwitchCostConfig, SwitchCostModel, SwitchEventDraft,
    SwitchLog, SwitchReason, SwitchRecorder, SwitchSummary, SwitchType, TimeWindow,
};
