use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tometo_core::{ScoringClock, TaskDraft, calculate_priority};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod board_cmd;
mod config;
mod state;
mod timer_cmd;

use board_cmd::BoardCommand;
use config::{Config, config_path, init_config, load_config};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TOMETO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "tometo", version = VERSION, about = "Pomodoro focus timer and priority-sorted task board")]
struct Cli {
    /// Config file (default: ~/.tometo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preview the priority a task would get, with its breakdown
    Score {
        #[command(flatten)]
        fields: TaskFields,

        /// Evaluate at this RFC3339 instant instead of now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    #[command(flatten)]
    Board(BoardCommand),

    /// Run the Pomodoro timer in the terminal
    Timer {
        /// Number of phases to run before exiting (work and breaks each count)
        #[arg(long, default_value_t = 1)]
        phases: u32,
    },

    /// Manage ~/.tometo/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config (file + environment)
    Show,
    /// Print the config file location
    Path,
}

/// Priority inputs shared by `score`, `add` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Importance 1-5
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=5))]
    pub importance: Option<i32>,

    /// Urgency 1-5
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=5))]
    pub urgency: Option<i32>,

    /// Estimated Pomodoro units
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    pub estimate: Option<i32>,

    /// Label (repeatable); "blocker" boosts priority
    #[arg(long = "label")]
    pub labels: Vec<String>,
}

impl TaskFields {
    /// Overlay the given fields onto a draft.
    pub fn apply(&self, draft: &mut TaskDraft) -> Result<()> {
        if let Some(due) = &self.due {
            draft.due_date = Some(tometo_core::parse_due_date(due)?);
        }
        if self.importance.is_some() {
            draft.importance = self.importance;
        }
        if self.urgency.is_some() {
            draft.urgency = self.urgency;
        }
        if self.estimate.is_some() {
            draft.estimate_pomodori = self.estimate;
        }
        for label in &self.labels {
            draft.add_label(label);
        }
        Ok(())
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tometo_cli={level},tometo_store={level},warn").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run_config(command: ConfigCommand, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => config_path()?,
    };
    match command {
        ConfigCommand::Init => init_config(&path),
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = load_config(Some(path.as_path()))?.redacted();
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            Ok(())
        }
    }
}

fn score(fields: TaskFields, now: Option<DateTime<Utc>>, json: bool, cfg: &Config) -> Result<()> {
    let tz = cfg.tz()?;
    let clock = match now {
        Some(now) => ScoringClock::in_zone(now, tz),
        None => ScoringClock::system(tz),
    };
    let mut draft = TaskDraft::default();
    fields.apply(&mut draft)?;
    let result = calculate_priority(&draft, &clock);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Score {} ({})", result.score, result.label);
    let b = result.breakdown;
    println!("  importance  {:+}", b.importance);
    println!("  urgency     {:+}", b.urgency);
    println!("  due date    {:+}", b.due_date);
    println!("  effort      {:+}", -b.effort);
    println!("  blocker     {:+}", b.blocker);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Config { command } => {
            run_config(command, cli.config)?;
        }

        Command::Score { fields, now, json } => {
            let cfg = load_config(cli.config.as_deref())?;
            score(fields, now, json, &cfg)?;
        }

        Command::Board(cmd) => {
            let cfg = load_config(cli.config.as_deref())?;
            tracing::debug!(backend = ?cfg.backend.kind, timezone = %cfg.timezone, "loaded config");
            board_cmd::run(cmd, &cfg).await?;
        }

        Command::Timer { phases } => {
            let cfg = load_config(cli.config.as_deref())?;
            timer_cmd::run(cfg.timer_settings(), phases).await?;
        }
    }

    Ok(())
}
