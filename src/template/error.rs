//! Error types for the worksheet importer

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read workbook {}: {reason}", .path.display())]
    Workbook { path: PathBuf, reason: String },

    #[error("Sheet '{name}' not found. Available sheets: {}", .available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },

    #[error("Worksheet '{0}' has no used range (empty sheet?)")]
    EmptySheet(String),

    #[error("Template failed schema validation: {}", .issues.join("; "))]
    Schema { issues: Vec<String> },

    #[error("Expected {expected} weeks, got {got}")]
    WeekCount { expected: usize, got: usize },

    #[error("Expected {expected} workouts in week {week}, got {got}")]
    WorkoutCount { week: u32, expected: usize, got: usize },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to write template: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode template: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
