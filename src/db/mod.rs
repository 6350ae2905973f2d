//! Database module - SQLite storage for templates, runs and logged sets

mod accounts;
mod runs;
mod templates;

pub use accounts::User;
pub use runs::{
    CompletedWorkout, ExerciseDetail, ExerciseSession, HISTORY_LIMIT, HistoryEntry, LoggedSet,
    RunStatus, RunStatusKind, StartedRun, UserProgram, WorkoutDetail, WorkoutInstance,
};

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row, Transaction, params_from_iter};
use thiserror::Error;
use tracing::debug;

/// Rows per multi-row INSERT
pub const INSERT_CHUNK_SIZE: usize = 200;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("program_templates with slug '{0}' already exists. Re-run with --force to delete and re-import.")]
    TemplateExists(String),

    #[error("program template '{slug}' has {runs} user run(s); refusing to delete it")]
    TemplateInUse { slug: String, runs: i64 },

    #[error("program template '{0}' not found; import it first")]
    TemplateNotFound(String),

    #[error("week {week}, workout {workout_index} not found in template")]
    WorkoutNotFound { week: u32, workout_index: u32 },

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("user '{0}' already exists")]
    UserExists(String),

    #[error("Invite required for {0}")]
    InviteRequired(String),

    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("no active run; start the program first")]
    NoActiveRun,

    #[error("user program {0} not found")]
    RunNotFound(i64),

    #[error("workout instance {0} not found")]
    InstanceNotFound(i64),

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Fresh database that lives as long as the handle
    pub fn open_in_memory() -> Result<Self> {
        let db = Self { conn: Connection::open_in_memory()? };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS program_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                weeks INTEGER NOT NULL CHECK (weeks > 0)
            );

            CREATE TABLE IF NOT EXISTS week_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                program_template_id INTEGER NOT NULL
                    REFERENCES program_templates(id) ON DELETE CASCADE,
                week_number INTEGER NOT NULL CHECK (week_number BETWEEN 1 AND 12),
                UNIQUE (program_template_id, week_number)
            );

            CREATE TABLE IF NOT EXISTS workout_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                week_template_id INTEGER NOT NULL
                    REFERENCES week_templates(id) ON DELETE CASCADE,
                workout_index INTEGER NOT NULL CHECK (workout_index BETWEEN 1 AND 4),
                label TEXT NOT NULL CHECK (label IN ('Upper', 'Lower')),
                UNIQUE (week_template_id, workout_index)
            );

            CREATE TABLE IF NOT EXISTS exercise_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_template_id INTEGER NOT NULL
                    REFERENCES workout_templates(id) ON DELETE CASCADE,
                order_index INTEGER NOT NULL CHECK (order_index > 0),
                name TEXT NOT NULL,
                warmup_sets_target TEXT,
                working_sets_target INTEGER,
                reps_target TEXT,
                rpe_target TEXT,
                rest_target TEXT,
                notes TEXT,
                primary_video_url TEXT,
                sub1_name TEXT,
                sub1_video_url TEXT,
                sub2_name TEXT,
                sub2_video_url TEXT,
                UNIQUE (workout_template_id, order_index)
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS invited_emails (
                email TEXT PRIMARY KEY,
                invited_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_settings (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                theme TEXT NOT NULL DEFAULT 'system',
                default_unit TEXT NOT NULL DEFAULT 'kg',
                auto_rest_on_set_done INTEGER NOT NULL DEFAULT 0,
                focus_mode INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS user_programs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                program_template_id INTEGER NOT NULL REFERENCES program_templates(id),
                started_at TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('active', 'completed', 'abandoned'))
            );

            CREATE TABLE IF NOT EXISTS workout_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_program_id INTEGER NOT NULL
                    REFERENCES user_programs(id) ON DELETE CASCADE,
                workout_number INTEGER NOT NULL CHECK (workout_number BETWEEN 1 AND 48),
                week_number INTEGER NOT NULL,
                workout_index INTEGER NOT NULL,
                performed_at TEXT NOT NULL,
                duration_seconds INTEGER,
                UNIQUE (user_program_id, workout_number)
            );

            CREATE TABLE IF NOT EXISTS exercise_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_instance_id INTEGER NOT NULL
                    REFERENCES workout_instances(id) ON DELETE CASCADE,
                exercise_template_id INTEGER
                    REFERENCES exercise_templates(id) ON DELETE SET NULL,
                order_index INTEGER NOT NULL,
                substitution_choice TEXT NOT NULL
                    CHECK (substitution_choice IN ('primary', 'sub1', 'sub2')),
                performed_exercise_name TEXT,
                performed_video_url TEXT
            );

            CREATE TABLE IF NOT EXISTS set_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise_instance_id INTEGER NOT NULL
                    REFERENCES exercise_instances(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('warmup', 'working')),
                set_number INTEGER NOT NULL,
                weight REAL,
                unit TEXT,
                reps INTEGER,
                rpe REAL,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_exercise_instances_name
                ON exercise_instances (performed_exercise_name);",
        )?;
        Ok(())
    }
}

/// Insert `rows` into `table` with multi-row statements of at most
/// [`INSERT_CHUNK_SIZE`] rows. With `returning`, each inserted row is
/// mapped back through `map`.
fn insert_chunked<T>(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[&str],
    rows: &[Vec<Value>],
    returning: Option<&str>,
    mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let mut out = Vec::new();

    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        if chunk.iter().any(|r| r.len() != columns.len()) {
            return Err(DbError::Internal(format!("column count mismatch inserting into {table}")));
        }
        let values = vec![placeholders.as_str(); chunk.len()].join(", ");
        let mut sql = format!("INSERT INTO {table} ({}) VALUES {values}", columns.join(", "));
        let params = params_from_iter(chunk.iter().flatten());

        match returning {
            Some(cols) => {
                sql.push_str(" RETURNING ");
                sql.push_str(cols);
                let mut stmt = tx.prepare(&sql)?;
                let mapped = stmt.query_map(params, &mut map)?;
                for row in mapped {
                    out.push(row?);
                }
            }
            None => {
                tx.execute(&sql, params)?;
            }
        }
        debug!(table, rows = chunk.len(), "inserted chunk");
    }
    Ok(out)
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
    }

    #[test]
    fn test_insert_chunked_spans_chunks() {
        let mut db = Database::open_in_memory().unwrap();
        let tx = db.conn.transaction().unwrap();
        let rows: Vec<Vec<Value>> = (0..450)
            .map(|i| vec![Value::from(format!("u{i}@example.com")), Value::from("2024-01-01T00:00:00Z".to_string())])
            .collect();
        let ids = insert_chunked(&tx, "users", &["email", "created_at"], &rows, Some("id"), |r| r.get::<_, i64>(0))
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(ids.len(), 450);

        let count: i64 = db.conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 450);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gymlog.db");
        {
            let db = Database::open(&path).unwrap();
            db.invite("a@example.com").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.is_invited("A@example.com").unwrap());
    }
}
