mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bringup_core::Plan;

#[derive(Parser)]
#[command(
    name = "bringup",
    about = "Gate-checked bring-up for the DevFlow service stack",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root containing the compose file, .env, and bringup.yaml
    /// (default: current directory)
    #[arg(long, global = true, env = "BRINGUP_ROOT")]
    root: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log stage progress (to stderr)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Development bring-up: data tier, migrations, then the application
    DevStart {
        /// Env file to load (default: the manifest's env_file)
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Production deploy: hardening checks, image build, migrations, and an
    /// application health wait (the data tier is managed separately)
    ProdDeploy {
        /// Env file to load (default: the manifest's env_file)
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Validate the configuration without touching the container runtime
    Check {
        /// Validate against production requirements
        #[arg(long)]
        production: bool,

        /// Env file to load (default: the manifest's env_file)
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    // Progress goes to stderr so stdout stays clean for the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = cli.root.unwrap_or_else(|| PathBuf::from("."));

    let result = match cli.command {
        Commands::DevStart { env_file } => {
            cmd::up::run(&root, env_file.as_deref(), cli.json, Plan::Dev)
        }
        Commands::ProdDeploy { env_file } => {
            cmd::up::run(&root, env_file.as_deref(), cli.json, Plan::Prod)
        }
        Commands::Check {
            production,
            env_file,
        } => cmd::check::run(&root, env_file.as_deref(), production, cli.json),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
