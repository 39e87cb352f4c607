use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "zonekeeper", version, about = "Zonekeeper CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zone boundaries and maximum heart rate
    Zone {
        #[command(subcommand)]
        action: commands::zone::ZoneAction,
    },
    /// Shared settings document
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Wire envelope inspection
    Envelope {
        #[command(subcommand)]
        action: commands::envelope::EnvelopeAction,
    },
    /// Workout sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ZONEKEEPER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Zone { action } => commands::zone::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Envelope { action } => commands::envelope::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
