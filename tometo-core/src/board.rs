//! BoardState: an immutable-by-convention snapshot of one board.
//!
//! Every mutation returns a new snapshot, so a failed write upstream simply
//! keeps the old one.
//!
//! Ordering within a column:
//! - priority_score DESC (unscored tasks order as 0)
//! - fetch/insertion order for ties (stable sort)

use crate::task::{Column, Task};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    board_id: String,
    columns: Vec<Column>,
    tasks: Vec<Task>,
}

/// One column with its tasks in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView<'a> {
    pub column: &'a Column,
    pub tasks: Vec<&'a Task>,
}

/// What a drop gesture resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Released outside any column.
    Cancelled,
    /// Dropped back onto its own column.
    Unchanged,
    Moved { task_id: String, column_id: String },
    Rejected { reason: String },
}

impl BoardState {
    /// Columns are kept sorted by position; tasks keep the given order.
    pub fn new(board_id: impl Into<String>, mut columns: Vec<Column>, tasks: Vec<Task>) -> Self {
        columns.sort_by_key(|c| c.position);
        Self {
            board_id: board_id.into(),
            columns,
            tasks,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Find a column by id, or by case-insensitive title.
    pub fn find_column(&self, key: &str) -> Option<&Column> {
        self.column(key).or_else(|| {
            self.columns
                .iter()
                .find(|c| c.title.eq_ignore_ascii_case(key))
        })
    }

    pub fn inserted(&self, task: Task) -> Self {
        let mut next = self.clone();
        next.tasks.push(task);
        next
    }

    /// Replace the task with the same id; unknown ids leave the board as is.
    pub fn replaced(&self, task: Task) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
        next
    }

    pub fn replaced_all(&self, tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut next = self.clone();
        for task in tasks {
            if let Some(slot) = next.tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            }
        }
        next
    }

    pub fn removed(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.tasks.retain(|t| t.id != id);
        next
    }

    /// Tasks of one column in display order.
    pub fn column_tasks(&self, column_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.column_id == column_id)
            .collect();
        sort_by_priority(&mut tasks);
        tasks
    }

    pub fn column_views(&self) -> Vec<ColumnView<'_>> {
        self.columns
            .iter()
            .map(|column| ColumnView {
                column,
                tasks: self.column_tasks(&column.id),
            })
            .collect()
    }

    /// Resolve a drag gesture ending over `over` (a column id, or nothing).
    pub fn resolve_drop(&self, task_id: &str, over: Option<&str>) -> DropOutcome {
        let Some(over) = over else {
            return DropOutcome::Cancelled;
        };
        let Some(task) = self.task(task_id) else {
            return DropOutcome::Rejected {
                reason: format!("unknown task {task_id}"),
            };
        };
        let Some(column) = self.find_column(over) else {
            return DropOutcome::Rejected {
                reason: format!("unknown column {over}"),
            };
        };
        if task.column_id == column.id {
            return DropOutcome::Unchanged;
        }
        DropOutcome::Moved {
            task_id: task.id.clone(),
            column_id: column.id.clone(),
        }
    }
}

/// Stable sort by descending ordering score.
pub fn sort_by_priority(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| b.ordering_score().cmp(&a.ordering_score()));
}
