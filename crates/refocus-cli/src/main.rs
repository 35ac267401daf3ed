use clap::{Parser, Subcommand};
use refocus_core::{init_logging, EngineConfig};

mod commands;

#[derive(Parser)]
#[command(name = "refocus", version, about = "Capture and restore developer work context")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the current work context
    Capture(commands::capture::CaptureArgs),
    /// Plan the restoration of the best context for a developer
    Resume {
        #[arg(long)]
        developer: String,
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,
    },
    /// Plan the restoration of one stored context
    Plan {
        /// Context ID
        id: String,
    },
    /// List valid contexts, highest priority first
    List {
        #[arg(long)]
        developer: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Show one stored context
    Show {
        /// Context ID
        id: String,
    },
    /// Delete a stored context
    Delete {
        /// Context ID
        id: String,
    },
    /// Remove all expired contexts
    Sweep,
    /// Context-switch log
    Switch {
        #[command(subcommand)]
        action: commands::switch::SwitchAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = EngineConfig::load_or_default();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("warning: {e}");
    }

    let json = cli.json;
    let result = match cli.command {
        Commands::Capture(args) => commands::capture::run(args, json),
        Commands::Resume { developer, project } => commands::restore::resume(&developer, project.as_deref(), json),
        Commands::Plan { id } => commands::restore::plan(&id, json),
        Commands::List { developer, project } => commands::contexts::list(&developer, project.as_deref(), json),
        Commands::Show { id } => commands::contexts::show(&id, json),
        Commands::Delete { id } => commands::contexts::delete(&id, json),
        Commands::Sweep => commands::contexts::sweep(json),
        Commands::Switch { action } => commands::switch::run(action, json),
        Commands::Config { action } => commands::config::run(action, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
