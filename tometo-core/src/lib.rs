//! tometo-core: priority scoring, board model and focus timer for Tometo

pub mod board;
pub mod pomodoro;
pub mod priority;
pub mod task;
pub mod time;

pub use board::{BoardState, ColumnView, DropOutcome, sort_by_priority};
pub use pomodoro::{Phase, PhaseComplete, PomodoroTimer, TimerSettings, format_clock};
pub use priority::{
    PriorityAttributes, PriorityBreakdown, PriorityLabel, PriorityResult, calculate_priority,
    BLOCKER_LABEL,
};
pub use task::{Column, NewTask, Task, TaskDraft, TaskPatch};
pub use time::{ScoringClock, parse_due_date, parse_timezone};
