use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "daywright", version, about = "Daywright workday scheduler")]
struct Cli {
    /// Calendar owner (default: defaults.owner from the config)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Fixed calendar events
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Work window and break length
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Automatic scheduling
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Today's plan upkeep
    Today {
        #[command(subcommand)]
        action: commands::today::TodayAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DAYWRIGHT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let owner = cli.owner;
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, owner),
        Commands::Event { action } => commands::event::run(action, owner),
        Commands::Project { action } => commands::project::run(action, owner),
        Commands::Settings { action } => commands::settings::run(action, owner),
        Commands::Schedule { action } => commands::schedule::run(action, owner),
        Commands::Today { action } => commands::today::run(action, owner),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "daywright", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
