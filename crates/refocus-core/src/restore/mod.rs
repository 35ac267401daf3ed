//! Restoration plans and results.
//!
//! A [`RestorationPlan`] is an ordered, numbered list of steps an editor
//! integration executes to bring a developer back into a captured context.
//! Plans are computed on demand and never persisted here.

pub mod planner;

pub use planner::RestorationPlanner;

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::WorkContext;
use crate::error::ErrorCode;

/// One step of a restoration plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestorationStep {
    number: u32,
    title: String,
    description: String,
    estimated_minutes: f64,
    instructions: Vec<String>,
}

impl RestorationStep {
    /// Negative or non-finite estimates are clamped to zero. The step number
    /// is assigned when the step is added to a plan.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        estimated_minutes: f64,
        instructions: Vec<String>,
    ) -> Self {
        let estimated_minutes = if estimated_minutes.is_finite() {
            estimated_minutes.max(0.0)
        } else {
            0.0
        };
        Self {
            number: 0,
            title: title.into(),
            description: description.into(),
            estimated_minutes,
            instructions,
        }
    }

    /// 1-based position in the plan.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn estimated_minutes(&self) -> f64 {
        self.estimated_minutes
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }
}

/// Ordered restoration steps with their total estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestorationPlan {
    steps: Vec<RestorationStep>,
    total_estimated_minutes: f64,
}

impl RestorationPlan {
    /// Number the steps in order and total their estimates.
    pub fn new(steps: Vec<RestorationStep>) -> Self {
        let steps: Vec<RestorationStep> = steps
            .into_iter()
            .zip(1u32..)
            .map(|(step, number)| RestorationStep { number, ..step })
            .collect();
        let total_estimated_minutes = steps.iter().map(|s| s.estimated_minutes).sum();
        Self {
            steps,
            total_estimated_minutes,
        }
    }

    pub fn steps(&self) -> &[RestorationStep] {
        &self.steps
    }

    pub fn total_estimated_minutes(&self) -> f64 {
        self.total_estimated_minutes
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All instructions in execution order.
    pub fn instructions(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.instructions.iter().map(String::as_str))
            .collect()
    }

    /// Numbered plain-text rendering for terminals.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            let _ = writeln!(
                out,
                "{}. {} (~{:.1} min)",
                step.number, step.title, step.estimated_minutes
            );
            let _ = writeln!(out, "   {}", step.description);
            for instruction in &step.instructions {
                let _ = writeln!(out, "   - {instruction}");
            }
        }
        let _ = write!(out, "Total: ~{:.1} min", self.total_estimated_minutes);
        out
    }
}

/// Outcome of planning a restoration: either a plan or a typed failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestorationResult {
    Success {
        context: Box<WorkContext>,
        plan: RestorationPlan,
    },
    Failure {
        message: String,
        error_code: Option<ErrorCode>,
    },
}

impl RestorationResult {
    pub fn success(context: WorkContext, plan: RestorationPlan) -> Self {
        RestorationResult::Success {
            context: Box::new(context),
            plan,
        }
    }

    pub fn failure(message: impl Into<String>, error_code: Option<ErrorCode>) -> Self {
        RestorationResult::Failure {
            message: message.into(),
            error_code,
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::failure(format!("no work context '{id}' to restore"), Some(ErrorCode::StateNotFound))
    }

    pub fn expired(id: &str, expired_at: DateTime<Utc>) -> Self {
        Self::failure(
            format!("work context '{id}' expired at {}", expired_at.to_rfc3339()),
            Some(ErrorCode::StateExpired),
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RestorationResult::Success { .. })
    }

    pub fn context(&self) -> Option<&WorkContext> {
        match self {
            RestorationResult::Success { context, .. } => Some(&**context),
            RestorationResult::Failure { .. } => None,
        }
    }

    pub fn plan(&self) -> Option<&RestorationPlan> {
        match self {
            RestorationResult::Success { plan, .. } => Some(plan),
            RestorationResult::Failure { .. } => None,
        }
    }

    /// Flattened instructions; empty on failure.
    pub fn instructions(&self) -> Vec<&str> {
        self.plan().map(RestorationPlan::instructions).unwrap_or_default()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            RestorationResult::Success { .. } => None,
            RestorationResult::Failure { error_code, .. } => *error_code,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RestorationResult::Success { .. } => None,
            RestorationResult::Failure { message, .. } => Some(message),
        }
    }
}
