//! tometo-store: task persistence backends and the board service built on them

pub mod error;
pub mod local;
pub mod rest;
pub mod retry;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use local::{LocalStore, DEFAULT_BOARD_ID, default_columns};
pub use rest::{RestConfig, RestStore};
pub use retry::RetryPolicy;
pub use service::{BoardService, FailedTask, MoveResult, ScoredTask, SuggestReport};
pub use store::TaskStore;
