//! Sandprof CLI - static analysis and replay of profiled sandbox runs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{analyze, replay};

#[derive(Parser)]
#[command(name = "sandprof")]
#[command(about = "Execution profiler for sandboxed code runs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, env = "SANDPROF_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print complexity metrics of a source file
    Analyze {
        /// Source file to analyze
        file: PathBuf,

        /// Declared template (nextjs-developer, python, ...)
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Replay a recorded lifecycle event log and print its report
    Replay {
        /// JSON event log
        events: PathBuf,

        /// Source file of the run, overriding the log's code
        #[arg(long)]
        code: Option<PathBuf>,

        /// Declared template, overriding the log's template
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to ~/.sandprof/config.toml
        #[arg(long)]
        save: bool,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    let config = config::load_config(cli.config)?;

    match cli.command {
        Commands::Analyze { file, template } => {
            let json = analyze::analyze_file(&file, template.as_deref(), &config)?;
            println!("{}", json);
        }
        Commands::Replay {
            events,
            code,
            template,
        } => {
            let output = replay::replay_file(&events, code.as_deref(), template, &config)?;
            println!("{}", output.report_json);
            if config.output.recommendations {
                for recommendation in &output.recommendations {
                    eprintln!("- {}", recommendation);
                }
            }
        }
        Commands::Config { save } => {
            if save {
                let path = commands::config::write_default(&config)?;
                println!("Configuration written to {}", path.display());
            } else {
                print!("{}", commands::config::show_config(&config)?);
            }
        }
    }

    Ok(())
}
