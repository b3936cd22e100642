use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;

pub const TITLE_REQUIRED: &str = "Task title is required";

/// The status of a task.
/// Corresponds to the `task_status` SQL enum. Any value may replace any other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,
    Complete,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Complete => "Complete",
        }
    }
}

/// The kind of work item.
/// Corresponds to the `task_type` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "task_type")]
pub enum TaskType {
    #[default]
    Task,
    Incident,
    Bug,
    Feature,
    Maintenance,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed(TITLE_REQUIRED));
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must contain a non-whitespace character; at most 200 characters.
    /// A missing key is treated like an empty title.
    #[serde(default)]
    #[validate(
        custom = "not_blank",
        length(max = 200, message = "Task title must be at most 200 characters")
    )]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
}

/// Body of `PUT /api/tasks/{id}`. Absent keys are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(
        custom = "not_blank",
        length(max = 200, message = "Task title must be at most 200 characters")
    )]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
}

/// A task as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Owner of the task.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing filters; listing is always scoped to the caller.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
}

/// Validated, trimmed field changes for an update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
}

impl Task {
    /// Builds a task owned by `user_id` from validated input, applying defaults.
    pub fn new(input: TaskInput, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            task_type: input.task_type.unwrap_or_default(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies only the provided fields and bumps `updated_at`.
    pub fn apply(&mut self, changes: &TaskChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(task_type) = changes.task_type {
            self.task_type = task_type;
        }
        self.updated_at = Utc::now();
    }

    pub fn matches(&self, query: &TaskQuery) -> bool {
        query.status.map_or(true, |status| self.status == status)
            && query.task_type.map_or(true, |t| self.task_type == t)
    }
}

impl TaskInput {
    /// Trims and validates the body, then turns it into a task owned by
    /// `user_id`. Length limits apply to the trimmed text.
    pub fn into_task(mut self, user_id: Uuid) -> Result<Task, AppError> {
        self.title = self.title.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string());
        self.validate()?;
        Ok(Task::new(self, user_id))
    }
}

impl TaskUpdate {
    /// Trims the provided strings, then validates them.
    pub fn into_changes(self) -> Result<TaskChanges, AppError> {
        let update = TaskUpdate {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            ..self
        };
        update.validate()?;
        Ok(TaskChanges {
            title: update.title,
            description: update.description,
            status: update.status,
            task_type: update.task_type,
        })
    }
}

/// Parses a task id from a path segment; malformed ids are a bad request.
pub fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid task ID".into()))
}
