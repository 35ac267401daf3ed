//! Restoration planning commands.

use refocus_core::{ContextEngine, RestorationResult};

fn print_result(result: &RestorationResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match (result.context(), result.plan()) {
        (Some(context), Some(plan)) => {
            println!("Restoring {} ({})", context.id(), context.project_id());
            if plan.is_empty() {
                println!("Nothing recorded beyond the project itself.");
            } else {
                println!("{}", plan.render());
            }
        }
        _ => {
            let code = result
                .error_code()
                .map(|c| format!(" [{c}]"))
                .unwrap_or_default();
            println!("{}{code}", result.message().unwrap_or_default());
        }
    }
    Ok(())
}

/// Plan the best context for a developer. Finding nothing is not an error.
pub fn resume(developer: &str, project: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let result = engine.resume(developer, project);
    print_result(&result, json)
}

/// Plan one stored context. Exits non-zero if it cannot be restored.
pub fn plan(id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContextEngine::open_default()?;
    let result = engine.plan_restoration_by_id(id);
    print_result(&result, json)?;
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
