//! Template persistence and lookup

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params};
use tracing::{info, warn};

use super::{Database, DbError, Result, insert_chunked};
use crate::program::{WORKOUTS_PER_WEEK, WorkoutSlot};
use crate::session::{PlannedExercise, WorkoutPlan};
use crate::template::{ProgramTemplate, WorkoutLabel};

const EXERCISE_COLUMNS: &str = "id, order_index, name, warmup_sets_target, working_sets_target, \
     reps_target, rpe_target, rest_target, notes, primary_video_url, sub1_name, sub1_video_url, \
     sub2_name, sub2_video_url";

impl Database {
    /// Write a validated template into the four template tables.
    ///
    /// An existing template with the same slug is an error unless `force`
    /// is set, in which case it is deleted first. Everything happens in one
    /// transaction: a failure leaves the database untouched.
    pub fn persist_template(&mut self, template: &ProgramTemplate, force: bool) -> Result<i64> {
        let slug = template.program.slug.as_str();
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row("SELECT id FROM program_templates WHERE slug = ?1", params![slug], |r| r.get(0))
            .optional()?;

        if let Some(id) = existing {
            if !force {
                return Err(DbError::TemplateExists(slug.to_string()));
            }
            let runs: i64 = tx.query_row(
                "SELECT COUNT(*) FROM user_programs WHERE program_template_id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if runs > 0 {
                return Err(DbError::TemplateInUse { slug: slug.to_string(), runs });
            }
            warn!(slug, id, "deleting existing program template");
            tx.execute("DELETE FROM program_templates WHERE id = ?1", params![id])?;
        }

        tx.execute(
            "INSERT INTO program_templates (slug, name, weeks) VALUES (?1, ?2, ?3)",
            params![slug, template.program.name, template.program.weeks],
        )?;
        let program_id = tx.last_insert_rowid();

        let week_rows: Vec<Vec<Value>> = template
            .weeks
            .iter()
            .map(|w| vec![Value::from(program_id), Value::from(w.week_number)])
            .collect();
        let week_ids: HashMap<u32, i64> = insert_chunked(
            &tx,
            "week_templates",
            &["program_template_id", "week_number"],
            &week_rows,
            Some("id, week_number"),
            |r| Ok((r.get::<_, u32>(1)?, r.get::<_, i64>(0)?)),
        )?
        .into_iter()
        .collect();

        let week_id_for = |week_number: u32| {
            week_ids
                .get(&week_number)
                .copied()
                .ok_or_else(|| DbError::Internal(format!("missing week_templates id for week {week_number}")))
        };

        let mut workout_rows = Vec::new();
        for week in &template.weeks {
            let week_id = week_id_for(week.week_number)?;
            for workout in &week.workouts {
                workout_rows.push(vec![
                    Value::from(week_id),
                    Value::from(workout.workout_index),
                    Value::from(workout.label.as_str().to_string()),
                ]);
            }
        }
        let workout_ids: HashMap<(i64, u32), i64> = insert_chunked(
            &tx,
            "workout_templates",
            &["week_template_id", "workout_index", "label"],
            &workout_rows,
            Some("id, week_template_id, workout_index"),
            |r| Ok(((r.get::<_, i64>(1)?, r.get::<_, u32>(2)?), r.get::<_, i64>(0)?)),
        )?
        .into_iter()
        .collect();

        let mut exercise_rows = Vec::new();
        for week in &template.weeks {
            let week_id = week_id_for(week.week_number)?;
            for workout in &week.workouts {
                let workout_id = workout_ids.get(&(week_id, workout.workout_index)).copied().ok_or_else(|| {
                    DbError::Internal(format!(
                        "missing workout_templates id for week {} workout {}",
                        week.week_number, workout.workout_index
                    ))
                })?;
                for ex in &workout.exercises {
                    exercise_rows.push(vec![
                        Value::from(workout_id),
                        Value::from(ex.order_index),
                        Value::from(ex.name.clone()),
                        Value::from(ex.warmup_sets_target.clone()),
                        Value::from(ex.working_sets_target),
                        Value::from(ex.reps_target.clone()),
                        Value::from(ex.rpe_target.clone()),
                        Value::from(ex.rest_target.clone()),
                        Value::from(ex.notes.clone()),
                        Value::from(ex.primary_video_url.clone()),
                        Value::from(ex.sub1_name.clone()),
                        Value::from(ex.sub1_video_url.clone()),
                        Value::from(ex.sub2_name.clone()),
                        Value::from(ex.sub2_video_url.clone()),
                    ]);
                }
            }
        }
        insert_chunked(
            &tx,
            "exercise_templates",
            &[
                "workout_template_id",
                "order_index",
                "name",
                "warmup_sets_target",
                "working_sets_target",
                "reps_target",
                "rpe_target",
                "rest_target",
                "notes",
                "primary_video_url",
                "sub1_name",
                "sub1_video_url",
                "sub2_name",
                "sub2_video_url",
            ],
            &exercise_rows,
            None,
            |_| Ok(()),
        )?;

        tx.commit()?;
        info!(
            slug,
            program_id,
            weeks = week_rows.len(),
            workouts = workout_rows.len(),
            exercises = exercise_rows.len(),
            "persisted program template"
        );
        Ok(program_id)
    }

    /// Id and name of the template with this slug
    pub fn program_by_slug(&self, slug: &str) -> Result<(i64, String)> {
        self.conn
            .query_row(
                "SELECT id, name FROM program_templates WHERE slug = ?1",
                params![slug],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| DbError::TemplateNotFound(slug.to_string()))
    }

    /// One template workout with its exercises in order
    pub fn workout_plan(&self, program_template_id: i64, slot: WorkoutSlot) -> Result<WorkoutPlan> {
        let program_name: String = self
            .conn
            .query_row(
                "SELECT name FROM program_templates WHERE id = ?1",
                params![program_template_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::TemplateNotFound(program_template_id.to_string()))?;

        let workout: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT wo.id, wo.label
                 FROM workout_templates wo
                 JOIN week_templates w ON w.id = wo.week_template_id
                 WHERE w.program_template_id = ?1 AND w.week_number = ?2 AND wo.workout_index = ?3",
                params![program_template_id, slot.week, slot.workout_index],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let (workout_id, label) = workout.ok_or(DbError::WorkoutNotFound {
            week: slot.week,
            workout_index: slot.workout_index,
        })?;
        let label = WorkoutLabel::from_cell(&label)
            .ok_or_else(|| DbError::Internal(format!("unknown workout label '{label}'")))?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercise_templates
             WHERE workout_template_id = ?1 ORDER BY order_index ASC"
        ))?;
        let exercises = stmt
            .query_map(params![workout_id], planned_exercise)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(WorkoutPlan { program_template_id, program_name, slot, label, exercises })
    }

    /// All workouts of one template week
    pub fn week_plan(&self, program_template_id: i64, week: u32) -> Result<Vec<WorkoutPlan>> {
        (1..=WORKOUTS_PER_WEEK)
            .map(|workout_index| {
                let slot = WorkoutSlot::new(week, workout_index).ok_or(DbError::WorkoutNotFound { week, workout_index })?;
                self.workout_plan(program_template_id, slot)
            })
            .collect()
    }
}

fn planned_exercise(r: &Row<'_>) -> rusqlite::Result<PlannedExercise> {
    Ok(PlannedExercise {
        id: r.get(0)?,
        order_index: r.get(1)?,
        name: r.get(2)?,
        warmup_sets_target: r.get(3)?,
        working_sets_target: r.get(4)?,
        reps_target: r.get(5)?,
        rpe_target: r.get(6)?,
        rest_target: r.get(7)?,
        notes: r.get(8)?,
        primary_video_url: r.get(9)?,
        sub1_name: r.get(10)?,
        sub1_video_url: r.get(11)?,
        sub2_name: r.get(12)?,
        sub2_video_url: r.get(13)?,
    })
}
