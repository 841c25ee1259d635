use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api;
pub mod repository;
pub mod service;
pub mod store;
pub mod validation;
pub mod web;

pub use repository::{FileTodoRepository, TodoRepository};
pub use service::{ServiceError, TodoService};
pub use store::{StoreError, TodoStore};

/// A single todo entry, exactly as it is held in memory and written to disk.
///
/// Records are plain values: the store hands out clones and takes ownership of
/// whatever it is given, so a caller can never reach into the store's state.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoRecord {
    /// Creates an incomplete record with a fresh id, stamped with the current time.
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description: None,
            due_date: None,
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the due date.
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns true when the record is incomplete and its due date lies before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < today)
    }
}
