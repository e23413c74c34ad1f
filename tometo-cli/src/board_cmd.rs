use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use clap::Subcommand;
use serde::Serialize;
use tometo_core::{BoardState, ScoringClock, Task, TaskDraft};
use tometo_store::{BoardService, LocalStore, MoveResult, RestStore, SuggestReport, TaskStore};

use crate::TaskFields;
use crate::config::{BackendKind, Config};

#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Print every column with its tasks, highest priority first
    Board {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Create a task; its priority is computed and stored with it
    Add {
        title: String,

        /// Column id or title (default: first column)
        #[arg(long)]
        column: Option<String>,

        #[arg(long)]
        desc: Option<String>,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Change a task's fields and re-score it
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        desc: Option<String>,

        /// Column id or title
        #[arg(long)]
        column: Option<String>,

        #[command(flatten)]
        fields: TaskFields,

        /// Remove a label (repeatable)
        #[arg(long = "rm-label")]
        rm_labels: Vec<String>,

        #[arg(long, default_value_t = false)]
        clear_due: bool,
    },

    /// Move a task to another column
    Move {
        id: String,
        /// Column id or title
        column: String,
    },

    /// Delete a task
    Delete { id: String },

    /// Re-score every task on the board and store the new priorities
    Suggest {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub async fn run(cmd: BoardCommand, cfg: &Config) -> Result<()> {
    let tz = cfg.tz()?;
    match cfg.backend.kind {
        BackendKind::Local => {
            let path = cfg.local_path()?;
            let store = LocalStore::open(&path)
                .await
                .with_context(|| format!("open {}", path.display()))?;
            run_with(store, cmd, cfg, tz).await
        }
        BackendKind::Rest => {
            let store = RestStore::new(cfg.rest_config()?)?;
            run_with(store, cmd, cfg, tz).await
        }
    }
}

async fn run_with<S: TaskStore>(store: S, cmd: BoardCommand, cfg: &Config, tz: Tz) -> Result<()> {
    let mut svc = BoardService::load(store, &cfg.backend.board_id)
        .await
        .with_context(|| format!("load board {}", cfg.backend.board_id))?
        .with_concurrency(cfg.suggest.concurrency);
    let clock = ScoringClock::system(tz);

    match cmd {
        BoardCommand::Board { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&board_json(svc.state()))?);
            } else {
                print_board(svc.state());
            }
        }

        BoardCommand::Add { title, column, desc, fields } => {
            let column = match column {
                Some(c) => c,
                None => match svc.state().columns().first() {
                    Some(c) => c.id.clone(),
                    None => bail!("board {} has no columns", cfg.backend.board_id),
                },
            };
            let mut draft = TaskDraft::new(title, column);
            draft.description = desc;
            fields.apply(&mut draft)?;

            let task = svc.create_task(draft, &clock).await?;
            println!("Created {}", task_line(&task));
        }

        BoardCommand::Edit { id, title, desc, column, fields, rm_labels, clear_due } => {
            let Some(existing) = svc.state().task(&id) else {
                bail!("no task with id {id}");
            };
            let mut draft = existing.draft();
            if let Some(title) = title {
                draft.title = title;
            }
            if desc.is_some() {
                draft.description = desc;
            }
            if let Some(column) = column {
                draft.column_id = column;
            }
            if clear_due {
                draft.due_date = None;
            }
            for label in &rm_labels {
                draft.remove_label(label);
            }
            fields.apply(&mut draft)?;

            let task = svc.update_task(&id, draft, &clock).await?;
            println!("Updated {}", task_line(&task));
        }

        BoardCommand::Move { id, column } => match svc.move_task(&id, Some(column.as_str())).await? {
            MoveResult::Moved(task) => println!("Moved {}", task_line(&task)),
            MoveResult::Unchanged => println!("{id} is already in {column}"),
            MoveResult::Cancelled => println!("Move cancelled"),
        },

        BoardCommand::Delete { id } => {
            svc.delete_task(&id).await?;
            println!("Deleted {id}");
        }

        BoardCommand::Suggest { json } => {
            let report = svc.suggest_all(&clock).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if !report.is_complete() {
                bail!(
                    "{} of {} tasks were not updated",
                    report.failed.len(),
                    report.total()
                );
            }
        }
    }

    Ok(())
}

fn task_line(t: &Task) -> String {
    let score = match (t.priority_score, t.priority_label) {
        (Some(s), Some(l)) => format!("{s:>3} {l:<6}"),
        (Some(s), None) => format!("{s:>3} {:<6}", "-"),
        _ => format!("{:>3} {:<6}", "-", "-"),
    };

    let mut extras = Vec::new();
    if let Some(due) = t.due_date {
        extras.push(format!("due {due}"));
    }
    if let Some(est) = t.estimate_pomodori {
        extras.push(format!("est {est}"));
    }
    for l in &t.labels {
        extras.push(format!("#{l}"));
    }

    if extras.is_empty() {
        format!("[{}] {} {}", t.id, score, t.title)
    } else {
        format!("[{}] {} {} ({})", t.id, score, t.title, extras.join(", "))
    }
}

fn print_board(state: &BoardState) {
    if state.columns().is_empty() {
        println!("Board {} has no columns.", state.board_id());
        return;
    }
    for view in state.column_views() {
        println!("== {} ({}) ==", view.column.title, view.tasks.len());
        for t in &view.tasks {
            println!("  {}", task_line(t));
        }
        println!();
    }
}

fn print_report(report: &SuggestReport) {
    println!("Re-scored {} of {} tasks\n", report.updated.len(), report.total());
    for s in &report.updated {
        let previous = s
            .previous_score
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] {:>3} -> {:>3} {:<6} {}",
            s.task_id, previous, s.priority.score, s.priority.label, s.title
        );
    }
    if !report.failed.is_empty() {
        println!("\nNot updated:");
        for f in &report.failed {
            println!("  [{}] {}: {}", f.task_id, f.title, f.error);
        }
    }
}

#[derive(Serialize)]
struct ColumnJson<'a> {
    id: &'a str,
    title: &'a str,
    tasks: Vec<&'a Task>,
}

fn board_json(state: &BoardState) -> Vec<ColumnJson<'_>> {
    state
        .column_views()
        .into_iter()
        .map(|v| ColumnJson {
            id: &v.column.id,
            title: &v.column.title,
            tasks: v.tasks,
        })
        .collect()
}
