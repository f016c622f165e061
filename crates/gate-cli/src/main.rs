use anyhow::Result;
use clap::{Parser, Subcommand};
use gate_cli::commands::{self, run::RunOptions};
use gate_cli::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "launch-gate")]
#[command(about = "Launch configurations once their prerequisites print what they wait for")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "launch-gate.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configuration after its before-launch tasks pass
    Run {
        /// Configuration name
        name: String,

        /// Executor to launch with (defaults to settings.executor, then "run")
        #[arg(short, long)]
        executor: Option<String>,

        /// Execution target id (defaults to the first ready target)
        #[arg(short, long)]
        target: Option<String>,

        /// Do not stop prerequisites when the main process exits; wait for them instead
        #[arg(long)]
        keep_running: bool,
    },

    /// Validate configuration file
    Validate {
        /// Strict mode - fail on missing environment variables
        #[arg(short, long)]
        strict: bool,
    },

    /// List configurations and their before-launch tasks
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::configured_level(&cli.config).as_deref());

    match cli.command {
        Commands::Run {
            name,
            executor,
            target,
            keep_running,
        } => {
            let options = RunOptions {
                name,
                executor,
                target,
                keep_running,
            };
            let code = commands::run::run(&cli.config, options)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Validate { strict } => commands::validate::run(&cli.config, strict),
        Commands::List { json } => commands::list::run(&cli.config, json),
    }
}
