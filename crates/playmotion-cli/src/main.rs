mod cmd;
mod output;

use clap::{Parser, Subcommand};
use playmotion_cli::client::{MotionClient, DEFAULT_URL};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "playmotion",
    about = "Single-slot motion execution service: serve predefined motions and run them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Motion server URL for client commands
    #[arg(long, global = true, env = "PLAYMOTION_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the motion service and its HTTP server
    Serve {
        /// Motion definition file (YAML)
        #[arg(long, env = "PLAYMOTION_MOTIONS")]
        motions: PathBuf,

        /// Port to listen on (0 = OS-assigned)
        #[arg(long, env = "PLAYMOTION_PORT", default_value = "3142")]
        port: u16,

        /// Start unconfigured and wait for lifecycle transitions
        #[arg(long)]
        no_activate: bool,
    },

    /// Run a motion and wait for it to finish
    Run {
        /// Motion key
        motion: String,

        /// Play the motion as defined, without planning an approach
        #[arg(long)]
        skip_planning: bool,

        /// Seconds to wait for the motion before canceling it
        #[arg(long, default_value = "120")]
        timeout: u64,

        /// Return after the goal is accepted and print its id
        #[arg(long, conflicts_with = "timeout")]
        no_wait: bool,
    },

    /// Cancel a running goal
    Cancel {
        /// Goal id printed by `run --no-wait`
        goal_id: Uuid,
    },

    /// List motion keys
    List,

    /// Show a motion definition
    Info {
        /// Motion key
        motion: String,
    },

    /// Check whether a motion can be run right now
    Ready {
        /// Motion key
        motion: String,
    },

    /// Add a motion from a file with one motion entry
    Add {
        /// Key to register the motion under
        motion: String,

        /// File with `joints`, `positions`, `times_from_start` and optional `meta`
        file: PathBuf,

        /// Replace an existing motion with the same key
        #[arg(long)]
        overwrite: bool,
    },

    /// Remove a motion
    Remove {
        /// Motion key
        motion: String,
    },

    /// Show the service lifecycle state, or request a transition
    Lifecycle {
        /// configure | activate | deactivate | cleanup | shutdown
        transition: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let client = MotionClient::new(&cli.url);

    let result = match cli.command {
        Commands::Serve {
            motions,
            port,
            no_activate,
        } => cmd::serve::run(&motions, port, !no_activate),
        Commands::Run {
            motion,
            skip_planning,
            no_wait: true,
            ..
        } => cmd::run::submit(&client, &motion, skip_planning, cli.json),
        Commands::Run {
            motion,
            skip_planning,
            timeout,
            ..
        } => cmd::run::run(
            &client,
            &motion,
            skip_planning,
            Duration::from_secs(timeout),
            cli.json,
        ),
        Commands::Cancel { goal_id } => cmd::run::cancel(&client, goal_id, cli.json),
        Commands::List => cmd::motion::list(&client, cli.json),
        Commands::Info { motion } => cmd::motion::info(&client, &motion, cli.json),
        Commands::Ready { motion } => cmd::motion::ready(&client, &motion, cli.json),
        Commands::Add {
            motion,
            file,
            overwrite,
        } => cmd::motion::add(&client, &motion, &file, overwrite, cli.json),
        Commands::Remove { motion } => cmd::motion::remove(&client, &motion, cli.json),
        Commands::Lifecycle { transition } => {
            cmd::lifecycle::run(&client, transition.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
