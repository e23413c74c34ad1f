//! BoardService: the board's in-memory state kept in step with a TaskStore.
//!
//! Rules:
//! - single writes (create, update, move, delete) fail closed: the board
//!   snapshot only changes after the store accepted the write
//! - `suggest_all` re-scores every loaded task and writes each one on its own,
//!   with bounded concurrency; a failed write never stops the others and the
//!   report names every task that was not updated

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tometo_core::{
    BoardState, DropOutcome, NewTask, PriorityResult, ScoringClock, Task, TaskDraft, TaskPatch,
    calculate_priority,
};

use crate::error::StoreError;
use crate::store::TaskStore;

pub const DEFAULT_SUGGEST_CONCURRENCY: usize = 8;

/// Per-task outcome of a bulk re-score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestReport {
    pub updated: Vec<ScoredTask>,
    pub failed: Vec<FailedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTask {
    pub task_id: String,
    pub title: String,
    pub previous_score: Option<i32>,
    pub priority: PriorityResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTask {
    pub task_id: String,
    pub title: String,
    pub error: String,
}

impl SuggestReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len()
    }
}

/// Result of a drop gesture after persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveResult {
    Cancelled,
    Unchanged,
    Moved(Task),
}

pub struct BoardService<S> {
    store: S,
    state: BoardState,
    concurrency: usize,
}

impl<S: TaskStore> BoardService<S> {
    /// Load a board: its columns, then every task in those columns.
    pub async fn load(store: S, board_id: &str) -> Result<Self, StoreError> {
        let columns = store.list_columns(board_id).await?;
        let column_ids: Vec<String> = columns.iter().map(|c| c.id.clone()).collect();
        let tasks = store.list_tasks(&column_ids).await?;
        tracing::debug!(board_id, columns = columns.len(), tasks = tasks.len(), "loaded board");

        Ok(Self {
            store,
            state: BoardState::new(board_id, columns, tasks),
            concurrency: DEFAULT_SUGGEST_CONCURRENCY,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reload from the store, replacing the snapshot only on success.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let board_id = self.state.board_id().to_string();
        let columns = self.store.list_columns(&board_id).await?;
        let column_ids: Vec<String> = columns.iter().map(|c| c.id.clone()).collect();
        let tasks = self.store.list_tasks(&column_ids).await?;
        self.state = BoardState::new(board_id, columns, tasks);
        Ok(())
    }

    fn resolve_column(&self, draft: &mut TaskDraft) -> Result<(), StoreError> {
        draft.validate().map_err(|e| StoreError::Invalid(e.to_string()))?;
        let column = self
            .state
            .find_column(&draft.column_id)
            .ok_or_else(|| StoreError::ColumnNotFound(draft.column_id.clone()))?;
        draft.column_id = column.id.clone();
        Ok(())
    }

    /// Score the draft, insert it, then add the stored row to the board.
    pub async fn create_task(&mut self, mut draft: TaskDraft, clock: &ScoringClock) -> Result<Task, StoreError> {
        self.resolve_column(&mut draft)?;
        let priority = calculate_priority(&draft, clock);
        let task = self.store.insert_task(&NewTask::scored(draft, &priority)).await?;

        tracing::info!(task_id = %task.id, score = priority.score, label = %priority.label, "created task");
        self.state = self.state.inserted(task.clone());
        Ok(task)
    }

    /// Replace a task's fields with the draft and re-score it.
    pub async fn update_task(
        &mut self,
        id: &str,
        mut draft: TaskDraft,
        clock: &ScoringClock,
    ) -> Result<Task, StoreError> {
        if self.state.task(id).is_none() {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        self.resolve_column(&mut draft)?;
        let priority = calculate_priority(&draft, clock);
        let task = self
            .store
            .update_task(id, &TaskPatch::from_draft(&draft, &priority))
            .await?;

        tracing::info!(task_id = %task.id, score = priority.score, label = %priority.label, "updated task");
        self.state = self.state.replaced(task.clone());
        Ok(task)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        if self.state.task(id).is_none() {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        self.store.delete_task(id).await?;
        tracing::info!(task_id = id, "deleted task");
        self.state = self.state.removed(id);
        Ok(())
    }

    /// Apply a drop gesture: `over` is the column (id or title) released over.
    pub async fn move_task(&mut self, id: &str, over: Option<&str>) -> Result<MoveResult, StoreError> {
        match self.state.resolve_drop(id, over) {
            DropOutcome::Cancelled => Ok(MoveResult::Cancelled),
            DropOutcome::Unchanged => Ok(MoveResult::Unchanged),
            DropOutcome::Rejected { reason } => {
                if self.state.task(id).is_none() {
                    Err(StoreError::TaskNotFound(id.to_string()))
                } else {
                    Err(StoreError::ColumnNotFound(reason))
                }
            }
            DropOutcome::Moved { task_id, column_id } => {
                let task = self
                    .store
                    .update_task(&task_id, &TaskPatch::column(column_id.as_str()))
                    .await?;
                tracing::info!(task_id = %task.id, column_id = %column_id, "moved task");
                self.state = self.state.replaced(task.clone());
                Ok(MoveResult::Moved(task))
            }
        }
    }

    /// Re-score every loaded task and persist each score independently.
    pub async fn suggest_all(&mut self, clock: &ScoringClock) -> SuggestReport {
        let jobs: Vec<(usize, Task, PriorityResult)> = self
            .state
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.clone(), calculate_priority(t, clock)))
            .collect();

        tracing::info!(tasks = jobs.len(), concurrency = self.concurrency, "re-scoring all tasks");

        let store = &self.store;
        let mut outcomes: Vec<_> = stream::iter(jobs)
            .map(|(i, task, priority)| async move {
                let written = store.update_task(&task.id, &TaskPatch::priority(&priority)).await;
                (i, task, priority, written)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(i, ..)| *i);

        let mut report = SuggestReport::default();
        let mut stored = Vec::new();
        for (_, task, priority, written) in outcomes {
            match written {
                Ok(row) => {
                    report.updated.push(ScoredTask {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                        previous_score: task.priority_score,
                        priority,
                    });
                    stored.push(row);
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "failed to store suggested priority");
                    report.failed.push(FailedTask {
                        task_id: task.id,
                        title: task.title,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.state = self.state.replaced_all(stored);
        if !report.is_complete() {
            tracing::warn!(
                failed = report.failed.len(),
                total = report.total(),
                "some tasks were not re-scored"
            );
        }
        report
    }
}
