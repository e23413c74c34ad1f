//! Task board model: tasks as stored by the backend, the form-state draft used
//! to create or edit one, and the patches written back.
//!
//! Rows come from a hosted table API, so deserialization is lenient: `null`
//! is accepted for every optional field, ids may be strings or numbers, and a
//! due date may be empty or timestamp-shaped, and priority labels match in
//! any case.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::priority::{PriorityAttributes, PriorityLabel, PriorityResult};
use crate::time::parse_due_date;

/// A workflow bucket on the board ("To do", "Doing", "Done").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "id_string_or_empty")]
    pub board_id: String,
    pub title: String,
    #[serde(default)]
    pub position: i32,
}

impl Column {
    pub fn new(id: impl Into<String>, board_id: impl Into<String>, title: impl Into<String>, position: i32) -> Self {
        Self {
            id: id.into(),
            board_id: board_id.into(),
            title: title.into(),
            position,
        }
    }
}

/// A persisted task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub column_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,

    /// 1-5, treated as 1 when absent.
    #[serde(default)]
    pub importance: Option<i32>,

    /// 1-5, treated as 1 when absent.
    #[serde(default)]
    pub urgency: Option<i32>,

    /// Effort in Pomodoro units, treated as 1 when absent.
    #[serde(default)]
    pub estimate_pomodori: Option<i32>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,

    /// Last persisted score. `None` until the task has been scored; other
    /// writers sharing the table may have stored values outside 0..=100.
    #[serde(default)]
    pub priority_score: Option<i32>,
    /// Decoded case-insensitively; labels other writers invented read as unset.
    #[serde(default, deserialize_with = "lenient_label")]
    pub priority_label: Option<PriorityLabel>,
}

impl Task {
    /// Score used for ordering only: unscored tasks sort as 0.
    pub fn ordering_score(&self) -> i32 {
        self.priority_score.unwrap_or(0)
    }

    /// Prefill an edit form from this task.
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            column_id: self.column_id.clone(),
            due_date: self.due_date,
            importance: self.importance,
            urgency: self.urgency,
            estimate_pomodori: self.estimate_pomodori,
            labels: self.labels.clone(),
        }
    }
}

/// Form state for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub column_id: String,
    pub due_date: Option<NaiveDate>,
    pub importance: Option<i32>,
    pub urgency: Option<i32>,
    pub estimate_pomodori: Option<i32>,
    pub labels: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, column_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            column_id: column_id.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn with_urgency(mut self, urgency: i32) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn with_estimate(mut self, pomodori: i32) -> Self {
        self.estimate_pomodori = Some(pomodori);
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.add_label(label);
        self
    }

    /// Add a trimmed label; blanks and duplicates are ignored.
    pub fn add_label(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.labels.iter().any(|l| l == label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    pub fn remove_label(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != label);
        self.labels.len() != before
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("task title must not be empty");
        }
        if self.column_id.trim().is_empty() {
            bail!("task must belong to a column");
        }
        Ok(())
    }
}

/// Insert payload: the draft plus its freshly computed priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    #[serde(flatten)]
    pub draft: TaskDraft,
    pub priority_score: i32,
    pub priority_label: PriorityLabel,
}

impl NewTask {
    pub fn scored(draft: TaskDraft, priority: &PriorityResult) -> Self {
        Self {
            draft,
            priority_score: i32::from(priority.score),
            priority_label: priority.label,
        }
    }
}

/// Partial update. Only `Some` fields are written; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Option<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Option<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_pomodori: Option<Option<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_label: Option<PriorityLabel>,
}

impl TaskPatch {
    /// Full form update: every draft field plus the recomputed priority.
    pub fn from_draft(draft: &TaskDraft, priority: &PriorityResult) -> Self {
        Self {
            title: Some(draft.title.clone()),
            description: Some(draft.description.clone()),
            column_id: Some(draft.column_id.clone()),
            due_date: Some(draft.due_date),
            importance: Some(draft.importance),
            urgency: Some(draft.urgency),
            estimate_pomodori: Some(draft.estimate_pomodori),
            labels: Some(draft.labels.clone()),
            ..Self::priority(priority)
        }
    }

    pub fn priority(priority: &PriorityResult) -> Self {
        Self {
            priority_score: Some(i32::from(priority.score)),
            priority_label: Some(priority.label),
            ..Self::default()
        }
    }

    pub fn column(column_id: impl Into<String>) -> Self {
        Self {
            column_id: Some(column_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.description {
            task.description = v.clone();
        }
        if let Some(v) = &self.column_id {
            task.column_id = v.clone();
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(v) = self.importance {
            task.importance = v;
        }
        if let Some(v) = self.urgency {
            task.urgency = v;
        }
        if let Some(v) = self.estimate_pomodori {
            task.estimate_pomodori = v;
        }
        if let Some(v) = &self.labels {
            task.labels = v.clone();
        }
        if let Some(v) = self.priority_score {
            task.priority_score = Some(v);
        }
        if let Some(v) = self.priority_label {
            task.priority_label = Some(v);
        }
    }
}

impl PriorityAttributes for Task {
    fn importance(&self) -> Option<i32> {
        self.importance
    }
    fn urgency(&self) -> Option<i32> {
        self.urgency
    }
    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
    fn estimate_pomodori(&self) -> Option<i32> {
        self.estimate_pomodori
    }
    fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl PriorityAttributes for TaskDraft {
    fn importance(&self) -> Option<i32> {
        self.importance
    }
    fn urgency(&self) -> Option<i32> {
        self.urgency
    }
    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
    fn estimate_pomodori(&self) -> Option<i32> {
        self.estimate_pomodori
    }
    fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(d).map(String::from)
}

fn id_string_or_empty<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(d)?
        .map(String::from)
        .unwrap_or_default())
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

fn lenient_label<'de, D>(d: D) -> std::result::Result<Option<PriorityLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(PriorityLabel::parse))
}

fn lenient_date<'de, D>(d: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_due_date(s).map(Some).map_err(serde::de::Error::custom),
    }
}
