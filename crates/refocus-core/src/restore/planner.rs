//! Restoration planning.
//!
//! Turns a snapshot into an ordered step list. Steps are emitted in a fixed
//! order and skipped when their driving field is empty:
//!
//! 1. Open files
//! 2. Focus the active file, cursor and selection
//! 3. Replay editor state
//! 4. Show task and goal
//! 5. Show notes and mental model
//!
//! Planning is pure: no I/O, no store access.

use chrono::{DateTime, Utc};

use super::{RestorationPlan, RestorationResult, RestorationStep};
use crate::context::WorkContext;
use crate::store::Lookup;

const OPEN_FILES_BASE_MINUTES: f64 = 1.0;
const OPEN_FILES_PER_FILE_MINUTES: f64 = 0.2;
const FIXED_STEP_MINUTES: f64 = 1.0;

/// Builds restoration plans from snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestorationPlanner;

impl RestorationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan the restoration of `context`, failing if it has expired at `now`.
    pub fn plan(&self, context: &WorkContext, now: DateTime<Utc>) -> RestorationResult {
        if context.is_expired(now) {
            return RestorationResult::expired(context.id(), context.expires_at());
        }
        RestorationResult::success(context.clone(), self.steps_for(context))
    }

    /// Plan from a store lookup, mapping absence and expiry to typed failures.
    pub fn plan_lookup(&self, lookup: Lookup, now: DateTime<Utc>) -> RestorationResult {
        match lookup {
            Lookup::Found(context) => self.plan(&context, now),
            Lookup::Expired { id, expired_at } => RestorationResult::expired(&id, expired_at),
            Lookup::Missing { id } => RestorationResult::not_found(&id),
        }
    }

    /// The step sequence for `context`, without the expiry check.
    pub fn steps_for(&self, context: &WorkContext) -> RestorationPlan {
        let steps = [
            open_files_step(context),
            focus_step(context),
            ide_state_step(context),
            task_step(context),
            notes_step(context),
        ];
        RestorationPlan::new(steps.into_iter().flatten().collect())
    }
}

fn open_files_step(context: &WorkContext) -> Option<RestorationStep> {
    let files = context.open_files();
    if files.is_empty() {
        return None;
    }
    let minutes = (OPEN_FILES_BASE_MINUTES + OPEN_FILES_PER_FILE_MINUTES * files.len() as f64)
        .max(OPEN_FILES_BASE_MINUTES);
    Some(RestorationStep::new(
        "Open files",
        format!("Reopen the {} file(s) that were open", files.len()),
        minutes,
        files.iter().map(|path| format!("Open {path}")).collect(),
    ))
}

fn focus_step(context: &WorkContext) -> Option<RestorationStep> {
    let file = context.active_file()?;
    let mut instructions = vec![
        format!("Focus {file}"),
        format!("Move cursor to offset {}", context.cursor_position()),
    ];
    if let Some(selection) = context.selected_text() {
        instructions.push(format!("Select text: {selection}"));
    }
    Some(RestorationStep::new(
        "Restore editor focus",
        format!("Return to where you were in {file}"),
        FIXED_STEP_MINUTES,
        instructions,
    ))
}

fn ide_state_step(context: &WorkContext) -> Option<RestorationStep> {
    let state = context.ide_state();
    if state.is_empty() {
        return None;
    }
    let instructions = state
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("Set {key} = {s}"),
            other => format!("Set {key} = {other}"),
        })
        .collect();
    Some(RestorationStep::new(
        "Restore IDE state",
        "Replay the saved editor settings",
        FIXED_STEP_MINUTES,
        instructions,
    ))
}

fn task_step(context: &WorkContext) -> Option<RestorationStep> {
    let task = context.current_task();
    let goal = context.current_goal();
    if task.is_none() && goal.is_none() {
        return None;
    }
    let mut instructions = Vec::with_capacity(2);
    if let Some(task) = task {
        instructions.push(format!("Current task: {task}"));
    }
    if let Some(goal) = goal {
        instructions.push(format!("Current goal: {goal}"));
    }
    Some(RestorationStep::new(
        "Review task",
        "Recall what you were working on and why",
        FIXED_STEP_MINUTES,
        instructions,
    ))
}

fn notes_step(context: &WorkContext) -> Option<RestorationStep> {
    let mental_model = context.mental_model();
    let notes = context.developer_notes();
    if mental_model.is_none() && notes.is_empty() {
        return None;
    }
    let mut instructions = Vec::with_capacity(notes.len() + 1);
    if let Some(model) = mental_model {
        instructions.push(format!("Mental model: {model}"));
    }
    instructions.extend(notes.iter().map(|note| format!("Note: {note}")));
    Some(RestorationStep::new(
        "Review notes",
        "Read the notes you left yourself",
        FIXED_STEP_MINUTES,
        instructions,
    ))
}
