//! LocalStore: a single JSON file (or memory only) holding one or more boards.
//!
//! The whole document is rewritten after each mutation, through a temp file
//! and a rename so a crash never leaves a half-written board behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tometo_core::{Column, NewTask, Task, TaskPatch};

use crate::error::StoreError;
use crate::store::TaskStore;

pub const DEFAULT_BOARD_ID: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalData {
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    next_id: u64,
}

impl LocalData {
    fn seeded() -> Self {
        Self {
            columns: default_columns(DEFAULT_BOARD_ID),
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    fn has_column(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c.id == id)
    }

    fn has_task(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Raise `next_id` past every `task-N` already stored, so files written
    /// by hand or without a counter never hand out a taken id.
    fn with_next_id_after_rows(mut self) -> Self {
        let highest = self
            .tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix("task-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest.saturating_add(1)).max(1);
        self
    }

    /// Take the next free generated id.
    fn allocate_id(&mut self) -> String {
        loop {
            let id = format!("task-{}", self.next_id.max(1));
            self.next_id = self.next_id.max(1) + 1;
            if !self.has_task(&id) {
                return id;
            }
        }
    }
}

/// The three workflow columns a fresh board starts with.
pub fn default_columns(board_id: &str) -> Vec<Column> {
    vec![
        Column::new("todo", board_id, "To do", 0),
        Column::new("doing", board_id, "Doing", 1),
        Column::new("done", board_id, "Done", 2),
    ]
}

#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    data: Mutex<LocalData>,
}

impl LocalStore {
    /// Memory-only store seeded with the default board.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(LocalData::seeded()),
        }
    }

    /// Memory-only store with the given contents.
    pub fn from_parts(columns: Vec<Column>, tasks: Vec<Task>) -> Self {
        let data = LocalData { columns, tasks, next_id: 1 }.with_next_id_after_rows();
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    /// Open a board file, creating it with the default board if missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<LocalData>(&raw)?.with_next_id_after_rows()
        } else {
            let data = LocalData::seeded();
            write_atomic(&path, &data).await?;
            tracing::info!(path = %path.display(), "created local board file");
            data
        };
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &LocalData) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => write_atomic(path, data).await,
            None => Ok(()),
        }
    }
}

async fn write_atomic(path: &Path, data: &LocalData) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl TaskStore for LocalStore {
    async fn list_columns(&self, board_id: &str) -> Result<Vec<Column>, StoreError> {
        let data = self.data.lock().await;
        let mut columns: Vec<Column> = data
            .columns
            .iter()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.position);
        Ok(columns)
    }

    async fn list_tasks(&self, column_ids: &[String]) -> Result<Vec<Task>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .tasks
            .iter()
            .filter(|t| column_ids.contains(&t.column_id))
            .cloned()
            .collect())
    }

    async fn insert_task(&self, new: &NewTask) -> Result<Task, StoreError> {
        let mut data = self.data.lock().await;
        if !data.has_column(&new.draft.column_id) {
            return Err(StoreError::ColumnNotFound(new.draft.column_id.clone()));
        }

        let mut next = data.clone();
        let id = next.allocate_id();

        let draft = &new.draft;
        let task = Task {
            id,
            column_id: draft.column_id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            importance: draft.importance,
            urgency: draft.urgency,
            estimate_pomodori: draft.estimate_pomodori,
            labels: draft.labels.clone(),
            priority_score: Some(new.priority_score),
            priority_label: Some(new.priority_label),
        };

        next.tasks.push(task.clone());
        self.persist(&next).await?;
        *data = next;
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut data = self.data.lock().await;
        if let Some(column_id) = &patch.column_id {
            if !data.has_column(column_id) {
                return Err(StoreError::ColumnNotFound(column_id.clone()));
            }
        }

        let mut next = data.clone();
        let task = next
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))?;
        patch.apply_to(task);
        let updated = task.clone();

        self.persist(&next).await?;
        *data = next;
        Ok(updated)
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if !data.tasks.iter().any(|t| t.id == id) {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        let mut next = data.clone();
        next.tasks.retain(|t| t.id != id);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}
