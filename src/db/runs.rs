//! Program runs, completed workouts and logged sets

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::{debug, info};

use super::{Database, DbError, Result, insert_chunked, is_unique_violation, parse_enum, parse_time};
use crate::program::{TOTAL_WORKOUTS, WorkoutSlot, compute_week_and_workout_index, label_for_workout_index};
use crate::session::{SetKind, SubstitutionChoice, WorkoutSubmission, compare_best_set};

/// Most recent workouts shown in history
pub const HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatusKind {
    Active,
    Completed,
    Abandoned,
}

impl RunStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatusKind::Active => "active",
            RunStatusKind::Completed => "completed",
            RunStatusKind::Abandoned => "abandoned",
        }
    }
}

impl FromStr for RunStatusKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(RunStatusKind::Active),
            "completed" => Ok(RunStatusKind::Completed),
            "abandoned" => Ok(RunStatusKind::Abandoned),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

impl fmt::Display for RunStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's run of a program template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgram {
    pub id: i64,
    pub user_id: i64,
    pub program_template_id: i64,
    pub started_at: DateTime<Utc>,
    pub status: RunStatusKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartedRun {
    Created(UserProgram),
    /// An active run already existed and was kept
    AlreadyActive(UserProgram),
}

impl StartedRun {
    pub fn run(&self) -> &UserProgram {
        match self {
            StartedRun::Created(run) | StartedRun::AlreadyActive(run) => run,
        }
    }
}

/// Progress through the active run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub run: UserProgram,
    pub completed: u32,
    /// First workout not logged yet; `None` once all 48 are done
    pub next: Option<WorkoutSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutInstance {
    pub id: i64,
    pub user_program_id: i64,
    pub workout_number: u32,
    pub slot: WorkoutSlot,
    pub performed_at: DateTime<Utc>,
    pub duration_seconds: Option<i64>,
}

/// Outcome of recording a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletedWorkout {
    Logged(i64),
    /// The workout number was already recorded for this run
    AlreadyLogged(i64),
}

impl CompletedWorkout {
    pub fn instance_id(&self) -> i64 {
        match self {
            CompletedWorkout::Logged(id) | CompletedWorkout::AlreadyLogged(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub instance: WorkoutInstance,
    pub label: &'static str,
    pub run_started_at: DateTime<Utc>,
    pub run_status: RunStatusKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedSet {
    pub id: i64,
    pub kind: SetKind,
    pub set_number: u32,
    pub weight: Option<f64>,
    pub unit: Option<String>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseDetail {
    pub id: i64,
    pub exercise_template_id: Option<i64>,
    pub order_index: u32,
    pub choice: SubstitutionChoice,
    pub performed_name: Option<String>,
    pub performed_video_url: Option<String>,
    pub sets: Vec<LoggedSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutDetail {
    pub instance: WorkoutInstance,
    pub exercises: Vec<ExerciseDetail>,
}

/// One past occurrence of an exercise, with its working sets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseSession {
    pub exercise_instance_id: i64,
    pub workout_instance_id: i64,
    pub performed_at: DateTime<Utc>,
    pub performed_name: String,
    pub sets: Vec<LoggedSet>,
}

impl ExerciseSession {
    pub fn last_set(&self) -> Option<&LoggedSet> {
        self.sets.iter().max_by_key(|s| s.set_number)
    }

    /// Heaviest set with both weight and reps recorded
    pub fn best_set(&self) -> Option<&LoggedSet> {
        self.sets
            .iter()
            .filter_map(|s| Some((s, s.weight?, s.reps?)))
            .max_by(|a, b| compare_best_set(Some((a.1, a.2)), Some((b.1, b.2))))
            .map(|(s, _, _)| s)
    }
}

const INSTANCE_COLUMNS: &str =
    "wi.id, wi.user_program_id, wi.workout_number, wi.week_number, wi.workout_index, wi.performed_at, wi.duration_seconds";

const SET_COLUMNS: &str = "id, kind, set_number, weight, unit, reps, rpe, notes";

impl Database {
    /// Start a run of the program, or return the run that is already active
    pub fn start_program(
        &self,
        user_id: i64,
        program_template_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<StartedRun> {
        if let Some(run) = self.active_run(user_id, program_template_id)? {
            debug!(user_id, run_id = run.id, "run already active");
            return Ok(StartedRun::AlreadyActive(run));
        }

        self.conn.execute(
            "INSERT INTO user_programs (user_id, program_template_id, started_at, status)
             VALUES (?1, ?2, ?3, 'active')",
            params![user_id, program_template_id, started_at.to_rfc3339()],
        )?;
        let run = self.run(self.conn.last_insert_rowid())?;
        info!(user_id, run_id = run.id, "started program run");
        Ok(StartedRun::Created(run))
    }

    pub fn active_run(&self, user_id: i64, program_template_id: i64) -> Result<Option<UserProgram>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, program_template_id, started_at, status FROM user_programs
                 WHERE user_id = ?1 AND program_template_id = ?2 AND status = 'active'
                 ORDER BY started_at DESC, id DESC LIMIT 1",
                params![user_id, program_template_id],
                user_program,
            )
            .optional()?)
    }

    pub fn run(&self, run_id: i64) -> Result<UserProgram> {
        self.conn
            .query_row(
                "SELECT id, user_id, program_template_id, started_at, status FROM user_programs WHERE id = ?1",
                params![run_id],
                user_program,
            )
            .optional()?
            .ok_or(DbError::RunNotFound(run_id))
    }

    /// Mark a run as abandoned so a new one can be started
    pub fn abandon_run(&self, user_id: i64, run_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE user_programs SET status = 'abandoned' WHERE id = ?1 AND user_id = ?2 AND status = 'active'",
            params![run_id, user_id],
        )?;
        if changed == 0 {
            return Err(DbError::RunNotFound(run_id));
        }
        info!(user_id, run_id, "abandoned program run");
        Ok(())
    }

    pub fn run_status(&self, user_id: i64, program_template_id: i64) -> Result<RunStatus> {
        let run = self.active_run(user_id, program_template_id)?.ok_or(DbError::NoActiveRun)?;
        let logged = logged_numbers(&self.conn, run.id)?;
        let next = (1..=TOTAL_WORKOUTS)
            .find(|n| !logged.contains(n))
            .map(compute_week_and_workout_index);
        Ok(RunStatus { run, completed: logged.len() as u32, next })
    }

    /// Id of the instance already logged for this workout number, if any
    pub fn find_workout_instance(&self, user_program_id: i64, workout_number: u32) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM workout_instances WHERE user_program_id = ?1 AND workout_number = ?2",
                params![user_program_id, workout_number],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// Record a completed workout with its exercises and working sets.
    ///
    /// A workout number that is already logged for the run resolves to the
    /// existing instance instead of creating a second one.
    pub fn complete_workout(
        &mut self,
        user_id: i64,
        user_program_id: i64,
        submission: &WorkoutSubmission,
        performed_at: DateTime<Utc>,
    ) -> Result<CompletedWorkout> {
        let run = self.run(user_program_id)?;
        if run.user_id != user_id {
            return Err(DbError::RunNotFound(user_program_id));
        }

        let number = submission.workout_number;
        if !(1..=TOTAL_WORKOUTS).contains(&number) {
            return Err(DbError::InvalidSubmission(format!("workout number {number} not in 1..={TOTAL_WORKOUTS}")));
        }

        // a logged workout resolves to its instance whatever the run status
        if let Some(existing) = self.find_workout_instance(run.id, number)? {
            info!(run_id = run.id, workout_number = number, instance_id = existing, "workout already logged");
            return Ok(CompletedWorkout::AlreadyLogged(existing));
        }
        if run.status != RunStatusKind::Active {
            return Err(DbError::InvalidSubmission(format!("run {} is {}", run.id, run.status)));
        }

        self.insert_workout(&run, submission, performed_at)
    }

    /// Validate and insert a workout in one transaction. A concurrent insert
    /// of the same workout number surfaces as a UNIQUE violation and resolves
    /// to the stored instance.
    fn insert_workout(
        &mut self,
        run: &UserProgram,
        submission: &WorkoutSubmission,
        performed_at: DateTime<Utc>,
    ) -> Result<CompletedWorkout> {
        let number = submission.workout_number;
        let slot = compute_week_and_workout_index(number);
        let plan = self.workout_plan(run.program_template_id, slot)?;
        let planned: HashMap<u32, _> = plan.exercises.iter().map(|e| (e.order_index, e)).collect();

        let mut logs: Vec<_> = submission.exercises.iter().collect();
        logs.sort_by_key(|l| l.order_index);
        let mut seen = HashSet::new();
        for log in &logs {
            if !planned.contains_key(&log.order_index) {
                return Err(DbError::InvalidSubmission(format!(
                    "week {} workout {} has no exercise {}",
                    slot.week, slot.workout_index, log.order_index
                )));
            }
            if !seen.insert(log.order_index) {
                return Err(DbError::InvalidSubmission(format!("exercise {} listed twice", log.order_index)));
            }
            let mut set_numbers = HashSet::new();
            if let Some(dup) = log.sets.iter().find(|s| !set_numbers.insert(s.set_number)) {
                return Err(DbError::InvalidSubmission(format!(
                    "exercise {} has set {} twice",
                    log.order_index, dup.set_number
                )));
            }
        }

        let duration = submission.resolve_duration(performed_at);
        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO workout_instances
                (user_program_id, workout_number, week_number, workout_index, performed_at, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run.id, number, slot.week, slot.workout_index, performed_at.to_rfc3339(), duration],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                drop(tx);
                return match self.find_workout_instance(run.id, number)? {
                    Some(existing) => Ok(CompletedWorkout::AlreadyLogged(existing)),
                    None => Err(e.into()),
                };
            }
            Err(e) => return Err(e.into()),
        }
        let instance_id = tx.last_insert_rowid();

        let exercise_rows: Vec<Vec<Value>> = logs
            .iter()
            .map(|log| {
                let ex = planned[&log.order_index];
                vec![
                    Value::from(instance_id),
                    Value::from(ex.id),
                    Value::from(log.order_index),
                    Value::from(log.choice.as_str().to_string()),
                    Value::from(ex.performed_name(log.choice).to_string()),
                    Value::from(ex.performed_video(log.choice).map(str::to_string)),
                ]
            })
            .collect();
        let exercise_ids: HashMap<u32, i64> = insert_chunked(
            &tx,
            "exercise_instances",
            &[
                "workout_instance_id",
                "exercise_template_id",
                "order_index",
                "substitution_choice",
                "performed_exercise_name",
                "performed_video_url",
            ],
            &exercise_rows,
            Some("id, order_index"),
            |r| Ok((r.get::<_, u32>(1)?, r.get::<_, i64>(0)?)),
        )?
        .into_iter()
        .collect();

        let unit = submission.unit.as_str();
        let mut set_rows = Vec::new();
        for log in &logs {
            let exercise_id = exercise_ids.get(&log.order_index).copied().ok_or_else(|| {
                DbError::Internal(format!("missing exercise_instances id for exercise {}", log.order_index))
            })?;
            for set in log.sets.iter().filter(|s| !s.is_blank()) {
                set_rows.push(vec![
                    Value::from(exercise_id),
                    Value::from(SetKind::Working.as_str().to_string()),
                    Value::from(set.set_number),
                    Value::from(set.weight),
                    Value::from(unit.to_string()),
                    Value::from(set.reps),
                    Value::from(set.rpe),
                ]);
            }
        }
        insert_chunked(
            &tx,
            "set_logs",
            &["exercise_instance_id", "kind", "set_number", "weight", "unit", "reps", "rpe"],
            &set_rows,
            None,
            |_| Ok(()),
        )?;

        let logged = logged_numbers(&tx, run.id)?;
        if logged.len() as u32 >= TOTAL_WORKOUTS {
            tx.execute("UPDATE user_programs SET status = 'completed' WHERE id = ?1", params![run.id])?;
            info!(run_id = run.id, "program run completed");
        }
        tx.commit()?;

        info!(
            run_id = run.id,
            workout_number = number,
            instance_id,
            exercises = exercise_rows.len(),
            sets = set_rows.len(),
            "logged workout"
        );
        Ok(CompletedWorkout::Logged(instance_id))
    }

    /// Completed workouts across all of a user's runs, newest first
    pub fn history(&self, user_id: i64, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INSTANCE_COLUMNS}, up.started_at, up.status
             FROM workout_instances wi
             JOIN user_programs up ON up.id = wi.user_program_id
             WHERE up.user_id = ?1
             ORDER BY wi.performed_at DESC, wi.id DESC
             LIMIT ?2"
        ))?;
        let entries = stmt
            .query_map(params![user_id, limit as i64], |r| {
                let instance = workout_instance(r)?;
                Ok(HistoryEntry {
                    label: label_for_workout_index(instance.slot.workout_index),
                    instance,
                    run_started_at: parse_time(r, 7)?,
                    run_status: parse_enum(r, 8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// A logged workout with its exercises and sets
    pub fn workout_detail(&self, user_id: i64, instance_id: i64) -> Result<WorkoutDetail> {
        let instance = self
            .conn
            .query_row(
                &format!(
                    "SELECT {INSTANCE_COLUMNS}
                     FROM workout_instances wi
                     JOIN user_programs up ON up.id = wi.user_program_id
                     WHERE wi.id = ?1 AND up.user_id = ?2"
                ),
                params![instance_id, user_id],
                workout_instance,
            )
            .optional()?
            .ok_or(DbError::InstanceNotFound(instance_id))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_template_id, order_index, substitution_choice,
                    performed_exercise_name, performed_video_url
             FROM exercise_instances WHERE workout_instance_id = ?1
             ORDER BY order_index ASC",
        )?;
        let mut exercises = stmt
            .query_map(params![instance.id], |r| {
                Ok(ExerciseDetail {
                    id: r.get(0)?,
                    exercise_template_id: r.get(1)?,
                    order_index: r.get(2)?,
                    choice: parse_enum(r, 3)?,
                    performed_name: r.get(4)?,
                    performed_video_url: r.get(5)?,
                    sets: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for exercise in &mut exercises {
            exercise.sets = sets_for(&self.conn, exercise.id, false)?;
        }
        Ok(WorkoutDetail { instance, exercises })
    }

    /// Past sessions of an exercise (by performed name) within a program, newest first
    pub fn exercise_history(
        &self,
        user_id: i64,
        program_template_id: i64,
        exercise_name: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExerciseSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT ei.id, wi.id, wi.performed_at, ei.performed_exercise_name
             FROM exercise_instances ei
             JOIN workout_instances wi ON wi.id = ei.workout_instance_id
             JOIN user_programs up ON up.id = wi.user_program_id
             WHERE up.user_id = ?1 AND up.program_template_id = ?2 AND ei.performed_exercise_name = ?3
             ORDER BY wi.performed_at DESC, ei.id DESC
             LIMIT ?4 OFFSET ?5",
        )?;
        let mut sessions = stmt
            .query_map(
                params![user_id, program_template_id, exercise_name, limit as i64, offset as i64],
                |r| {
                    Ok(ExerciseSession {
                        exercise_instance_id: r.get(0)?,
                        workout_instance_id: r.get(1)?,
                        performed_at: parse_time(r, 2)?,
                        performed_name: r.get(3)?,
                        sets: Vec::new(),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for session in &mut sessions {
            session.sets = sets_for(&self.conn, session.exercise_instance_id, true)?;
        }
        Ok(sessions)
    }

    /// Most recent session for each name, in the order the names were given
    pub fn last_performance(
        &self,
        user_id: i64,
        program_template_id: i64,
        names: &[String],
    ) -> Result<Vec<(String, Option<ExerciseSession>)>> {
        let mut out = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if !seen.insert(name) {
                continue;
            }
            let last = self.exercise_history(user_id, program_template_id, name, 1, 0)?.into_iter().next();
            out.push((name.to_string(), last));
        }
        Ok(out)
    }
}

fn logged_numbers(conn: &Connection, user_program_id: i64) -> Result<BTreeSet<u32>> {
    let mut stmt = conn.prepare("SELECT workout_number FROM workout_instances WHERE user_program_id = ?1")?;
    let numbers = stmt
        .query_map(params![user_program_id], |r| r.get::<_, u32>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(numbers)
}

fn sets_for(conn: &Connection, exercise_instance_id: i64, working_only: bool) -> Result<Vec<LoggedSet>> {
    let filter = if working_only { " AND kind = 'working'" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {SET_COLUMNS} FROM set_logs WHERE exercise_instance_id = ?1{filter}
         ORDER BY kind ASC, set_number ASC"
    ))?;
    let sets = stmt
        .query_map(params![exercise_instance_id], |r| {
            Ok(LoggedSet {
                id: r.get(0)?,
                kind: parse_enum(r, 1)?,
                set_number: r.get(2)?,
                weight: r.get(3)?,
                unit: r.get(4)?,
                reps: r.get(5)?,
                rpe: r.get(6)?,
                notes: r.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sets)
}

fn user_program(r: &Row<'_>) -> rusqlite::Result<UserProgram> {
    Ok(UserProgram {
        id: r.get(0)?,
        user_id: r.get(1)?,
        program_template_id: r.get(2)?,
        started_at: parse_time(r, 3)?,
        status: parse_enum(r, 4)?,
    })
}

fn workout_instance(r: &Row<'_>) -> rusqlite::Result<WorkoutInstance> {
    Ok(WorkoutInstance {
        id: r.get(0)?,
        user_program_id: r.get(1)?,
        workout_number: r.get(2)?,
        slot: WorkoutSlot { week: r.get(3)?, workout_index: r.get(4)? },
        performed_at: parse_time(r, 5)?,
        duration_seconds: r.get(6)?,
    })
}
