//! Context-switch commands.

use chrono::Utc;
use clap::Subcommand;
use refocus_core::{ContextDescriptor, ContextEngine, SwitchEventDraft, SwitchReason, SwitchType, TimeWindow};

#[derive(Subcommand)]
pub enum SwitchAction {
    /// Record a context switch
    Record {
        #[arg(long)]
        developer: String,
        /// task-change, project-change, activity-change, file-change, interruption, break, return-from-break
        #[arg(long = "type")]
        switch_type: String,
        /// planned, interruption, distraction, completion, blocked, priority-change, unknown
        #[arg(long, default_value = "unknown")]
        reason: String,
        /// Productivity impact in [-1, 1]
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        impact: f64,
        /// Minutes needed to get back up to speed
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        recovery: i64,
        /// Minutes spent in the context being left
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        prior_duration: i64,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        interruptions: i64,
        /// Who or what interrupted
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        from_project: Option<String>,
        #[arg(long)]
        from_task: Option<String>,
        /// Snapshot of the context being left
        #[arg(long)]
        from_context: Option<String>,
        #[arg(long)]
        to_project: Option<String>,
        #[arg(long)]
        to_task: Option<String>,
    },
    /// Switches in the last N hours, oldest first
    History {
        #[arg(long)]
        developer: String,
        #[arg(long, default_value = "24")]
        hours: i64,
    },
    /// Aggregate switching cost over the last N hours
    Cost {
        #[arg(long)]
        developer: String,
        #[arg(long, default_value = "24")]
        hours: i64,
    },
}

pub fn run(action: SwitchAction, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;

    match action {
        SwitchAction::Record {
            developer,
            switch_type,
            reason,
            impact,
            recovery,
            prior_duration,
            interruptions,
            source,
            from_project,
            from_task,
            from_context,
            to_project,
            to_task,
        } => {
            let draft = SwitchEventDraft {
                previous: ContextDescriptor {
                    project_id: from_project,
                    task: from_task,
                    work_context_id: from_context,
                    ..ContextDescriptor::default()
                },
                next: ContextDescriptor {
                    project_id: to_project,
                    task: to_task,
                    ..ContextDescriptor::default()
                },
                productivity_impact: impact,
                recovery_minutes: recovery,
                previous_context_duration_minutes: prior_duration,
                interruption_count: interruptions,
                interruption_source: source,
                ..SwitchEventDraft::new(
                    developer,
                    switch_type.parse::<SwitchType>()?,
                    reason.parse::<SwitchReason>()?,
                )
            };
            let event = engine.record_switch(draft)?;
            let cost = engine.cost_model().cost(&event);
            let significant = engine.cost_model().is_significant(&event);

            if json {
                let value = serde_json::json!({
                    "event": event,
                    "cost": cost,
                    "significant": significant,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Switch recorded: {}", event.id());
                println!("Cost: {cost:.2}{}", if significant { " (significant)" } else { "" });
            }
        }
        SwitchAction::History { developer, hours } => {
            let window = TimeWindow::last_hours(Utc::now(), hours);
            let events = engine.switch_history(&developer, &window)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No switches in the last {hours}h");
            } else {
                for event in &events {
                    println!(
                        "{}  {}  {}  {}  cost {:.2}",
                        event.occurred_at().format("%Y-%m-%d %H:%M"),
                        event.id(),
                        event.switch_type(),
                        event.reason(),
                        engine.cost_model().cost(event),
                    );
                }
            }
        }
        SwitchAction::Cost { developer, hours } => {
            let window = TimeWindow::last_hours(Utc::now(), hours);
            let summary = engine.switch_summary(&developer, &window)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Switches:    {} ({} significant)", summary.total_switches, summary.significant_switches);
                println!("Total cost:  {:.2}", summary.total_cost);
                println!("Recovery:    {} min", summary.total_recovery_minutes);
                for (reason, count) in &summary.by_reason {
                    println!("  {reason}: {count}");
                }
            }
        }
    }
    Ok(())
}
