//! The persistence seam: everything the board needs from a backend.

use async_trait::async_trait;
use tometo_core::{Column, NewTask, Task, TaskPatch};

use crate::error::StoreError;

/// CRUD over tasks keyed by an opaque id, grouped into columns of a board.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Columns of a board, ordered by position.
    async fn list_columns(&self, board_id: &str) -> Result<Vec<Column>, StoreError>;

    /// Tasks in any of the given columns, in backend order.
    async fn list_tasks(&self, column_ids: &[String]) -> Result<Vec<Task>, StoreError>;

    async fn insert_task(&self, task: &NewTask) -> Result<Task, StoreError>;

    /// Apply a patch and return the stored row.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError>;

    async fn delete_task(&self, id: &str) -> Result<(), StoreError>;
}
