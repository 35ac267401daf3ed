//! Stored-context commands: list, show, delete, sweep.

use chrono::Utc;
use refocus_core::{ContextEngine, Lookup};

pub fn list(developer: &str, project: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let ranked = engine.list_ranked_at(developer, project, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }
    if ranked.is_empty() {
        println!("No contexts for {developer}");
        return Ok(());
    }
    for entry in &ranked {
        let ctx = &entry.context;
        println!(
            "{:.2}  {}  {}  {}  {}  {}",
            entry.priority,
            ctx.id(),
            ctx.project_id(),
            ctx.activity(),
            ctx.captured_at().format("%Y-%m-%d %H:%M"),
            ctx.current_task().unwrap_or("-"),
        );
    }
    Ok(())
}

pub fn show(id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let now = Utc::now();

    match engine.lookup_at(id, now)? {
        Lookup::Found(context) => {
            let breakdown = engine.priority_breakdown_at(&context, now);
            if json {
                let value = serde_json::json!({
                    "context": context,
                    "priority": breakdown,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("ID:        {}", context.id());
                println!("Developer: {}", context.developer_id());
                println!("Project:   {}", context.project_id());
                println!("Activity:  {}", context.activity());
                println!("Captured:  {}", context.captured_at().to_rfc3339());
                println!("Expires:   {}", context.expires_at().to_rfc3339());
                println!("Files:     {}", context.open_files().join(", "));
                if let Some(task) = context.current_task() {
                    println!("Task:      {task}");
                }
                if let Some(goal) = context.current_goal() {
                    println!("Goal:      {goal}");
                }
                println!(
                    "Priority:  {:.2} (recency {:.2}, richness {:.2}, activity {:.2})",
                    breakdown.total, breakdown.recency, breakdown.richness, breakdown.activity
                );
            }
        }
        Lookup::Expired { id, expired_at } => {
            eprintln!("Context expired: {id} ({})", expired_at.to_rfc3339());
            std::process::exit(1);
        }
        Lookup::Missing { id } => {
            eprintln!("Context not found: {id}");
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn delete(id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let deleted = engine.delete_context(id)?;
    if json {
        println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
    } else if deleted {
        println!("Context deleted: {id}");
    } else {
        println!("Context not found: {id}");
    }
    Ok(())
}

pub fn sweep(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let removed = engine.sweep_expired()?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Removed {removed} expired context(s)");
    }
    Ok(())
}
