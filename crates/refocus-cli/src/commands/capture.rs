//! Work-context capture command.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Args;
use refocus_core::{ActivityKind, ContextEngine, WorkContextDraft};

#[derive(Args)]
pub struct CaptureArgs {
    /// Developer ID
    #[arg(long, required_unless_present = "from")]
    developer: Option<String>,
    /// Project ID
    #[arg(long, required_unless_present = "from")]
    project: Option<String>,
    /// Activity: coding, debugging, testing, reviewing, learning, researching, meeting, other
    #[arg(long, default_value = "coding")]
    activity: String,
    /// Open file (repeatable, in tab order)
    #[arg(long = "file")]
    files: Vec<String>,
    /// File with focus
    #[arg(long)]
    active_file: Option<String>,
    /// Cursor byte offset in the active file
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    cursor: i64,
    /// Selected text
    #[arg(long)]
    selection: Option<String>,
    /// Current task
    #[arg(long)]
    task: Option<String>,
    /// Current goal
    #[arg(long)]
    goal: Option<String>,
    /// Recent action (repeatable, oldest first)
    #[arg(long = "action")]
    actions: Vec<String>,
    /// Note to self (repeatable)
    #[arg(long = "note")]
    notes: Vec<String>,
    /// Free-text mental model
    #[arg(long)]
    mental_model: Option<String>,
    /// Override the configured lifetime
    #[arg(long)]
    ttl_days: Option<i64>,
    /// Read the whole draft from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["developer", "project"])]
    from: Option<PathBuf>,
}

impl CaptureArgs {
    fn into_draft(self) -> Result<WorkContextDraft, Box<dyn std::error::Error>> {
        if let Some(path) = self.from {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            return Ok(serde_json::from_str(&content)?);
        }

        let now = Utc::now();
        let expires_at = match self.ttl_days {
            Some(days) => Some(
                Duration::try_days(days)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| format!("--ttl-days {days} is out of range"))?,
            ),
            None => None,
        };
        Ok(WorkContextDraft {
            activity: self.activity.parse::<ActivityKind>()?,
            captured_at: Some(now),
            expires_at,
            open_files: self.files,
            active_file: self.active_file,
            cursor_position: self.cursor,
            selected_text: self.selection,
            current_task: self.task,
            current_goal: self.goal,
            recent_actions: self.actions,
            developer_notes: self.notes,
            mental_model: self.mental_model,
            ..WorkContextDraft::new(
                self.developer.unwrap_or_default(),
                self.project.unwrap_or_default(),
            )
        })
    }
}

pub fn run(args: CaptureArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let draft = args.into_draft()?;
    let engine = ContextEngine::open_default()?;
    let context = engine.capture_context(draft)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else {
        println!("Captured: {}", context.id());
        println!("Expires:  {}", context.expires_at().to_rfc3339());
    }
    Ok(())
}
