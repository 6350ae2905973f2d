//! Worksheet-to-template parser
//!
//! The worksheet has no fixed coordinates for weeks or workouts. Structure
//! is inferred from the label column (B):
//!
//! - `Week N` opens a week
//! - `Upper` / `Lower` opens a workout inside the current week; the same
//!   row already holds that workout's first exercise
//! - anything containing `rest days` stops exercise collection
//!
//! Every other row inside an open workout is an exercise row.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::error::{ImportError, Result};
use super::sheet::{Sheet, XlsxWorkbook};
use super::{
    ExerciseTemplate, ProgramInfo, ProgramTemplate, SCHEMA_VERSION, WeekTemplate, WorkoutLabel,
    WorkoutTemplate,
};
use crate::program::{PROGRAM_NAME, PROGRAM_SLUG, WEEKS};

pub const DEFAULT_SHEET: &str = "4x Program";

// Column layout
const COL_LABEL: u32 = 2; // B
const COL_NAME: u32 = 3; // C
const COL_WARMUP: u32 = 4; // D
const COL_WORKING: u32 = 5; // E
const COL_REPS: u32 = 6; // F
const COL_RPE: u32 = 8; // H
const COL_REST: u32 = 9; // I
const COL_SUB1: u32 = 10; // J
const COL_SUB2: u32 = 11; // K
const COL_NOTES: u32 = 12; // L

static WEEK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^Week\s+(\d+)$").unwrap());
static SUPERSET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([A-Z]\d+)\s*:").unwrap());
static DROPSET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)dropset").unwrap());

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub sheet_name: String,
    pub slug: String,
    pub name: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET.to_string(),
            slug: PROGRAM_SLUG.to_string(),
            name: PROGRAM_NAME.to_string(),
        }
    }
}

/// Open a workbook and parse the configured sheet
pub fn parse_workbook(path: &Path, opts: &ParseOptions) -> Result<ProgramTemplate> {
    let book = XlsxWorkbook::open(path)?;
    let sheet = book.sheet(&opts.sheet_name)?;
    parse_program(&sheet, opts)
}

/// Scan state carried from row to row
#[derive(Debug, Default)]
struct Scan {
    week: Option<u32>,
    workout_index: u32,
    label: Option<WorkoutLabel>,
}

/// Parse a sheet into a validated program template
pub fn parse_program(sheet: &impl Sheet, opts: &ParseOptions) -> Result<ProgramTemplate> {
    let max_row = sheet.max_row();
    if max_row == 0 {
        return Err(ImportError::EmptySheet(sheet.name().to_string()));
    }

    let mut weeks: Vec<WeekTemplate> = Vec::new();
    let mut scan = Scan::default();

    for row in 1..=max_row {
        let label_cell = sheet.display(COL_LABEL, row);

        if let Some(week_number) = week_marker(&label_cell) {
            scan = Scan { week: Some(week_number), workout_index: 0, label: None };
            if !weeks.iter().any(|w| w.week_number == week_number) {
                weeks.push(WeekTemplate { week_number, workouts: Vec::new() });
            }
            continue;
        }

        if let Some(label) = WorkoutLabel::from_cell(&label_cell) {
            let Some(week_number) = scan.week else { continue };
            scan.workout_index += 1;
            scan.label = Some(label);

            let week = find_week(&mut weeks, week_number)?;
            if !week.workouts.iter().any(|w| w.workout_index == scan.workout_index) {
                week.workouts.push(WorkoutTemplate {
                    workout_index: scan.workout_index,
                    label,
                    exercises: Vec::new(),
                });
            }
            // fall through: the label row holds the first exercise
        }

        if label_cell.to_lowercase().contains("rest days") {
            scan.label = None;
            continue;
        }

        let (Some(week_number), Some(_)) = (scan.week, scan.label) else { continue };
        if scan.workout_index == 0 {
            continue;
        }

        let name = sheet.display(COL_NAME, row);
        if name.is_empty() || name == "Exercise" {
            continue;
        }

        let workout_index = scan.workout_index;
        let week = find_week(&mut weeks, week_number)?;
        let workout = week
            .workouts
            .iter_mut()
            .find(|w| w.workout_index == workout_index)
            .ok_or_else(|| {
                ImportError::Internal(format!("workout {workout_index} missing for week {week_number}"))
            })?;

        let order_index = workout.exercises.len() as u32 + 1;
        let exercise = read_exercise(sheet, row, order_index, name);
        debug!(row, week = week_number, workout = workout_index, name = %exercise.name, "exercise row");
        workout.exercises.push(exercise);
    }

    weeks.sort_by_key(|w| w.week_number);
    for week in &mut weeks {
        week.workouts.sort_by_key(|w| w.workout_index);
        for workout in &mut week.workouts {
            workout.exercises.sort_by_key(|e| e.order_index);
        }
    }

    let template = ProgramTemplate {
        schema_version: SCHEMA_VERSION,
        program: ProgramInfo { slug: opts.slug.clone(), name: opts.name.clone(), weeks: WEEKS },
        weeks,
    };
    template.validate()?;

    info!(
        sheet = sheet.name(),
        weeks = template.weeks.len(),
        exercises = template.total_exercises(),
        "parsed program template"
    );
    Ok(template)
}

fn week_marker(text: &str) -> Option<u32> {
    WEEK_RE.captures(text)?.get(1)?.as_str().parse().ok()
}

fn find_week(weeks: &mut [WeekTemplate], week_number: u32) -> Result<&mut WeekTemplate> {
    weeks
        .iter_mut()
        .find(|w| w.week_number == week_number)
        .ok_or_else(|| ImportError::Internal(format!("week {week_number} missing")))
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn read_exercise(sheet: &impl Sheet, row: u32, order_index: u32, name: String) -> ExerciseTemplate {
    let reps_target = non_empty(sheet.display(COL_REPS, row));
    ExerciseTemplate {
        order_index,
        warmup_sets_target: non_empty(sheet.display(COL_WARMUP, row)),
        working_sets_target: sheet.number(COL_WORKING, row).map(|n| n.trunc() as i64),
        is_dropset: reps_target.as_deref().map(|r| DROPSET_RE.is_match(r)),
        reps_target,
        rpe_target: non_empty(sheet.display(COL_RPE, row)),
        rest_target: non_empty(sheet.display(COL_REST, row)),
        notes: non_empty(sheet.display(COL_NOTES, row)),
        primary_video_url: sheet.hyperlink(COL_NAME, row),
        sub1_name: non_empty(sheet.display(COL_SUB1, row)),
        sub1_video_url: sheet.hyperlink(COL_SUB1, row),
        sub2_name: non_empty(sheet.display(COL_SUB2, row)),
        sub2_video_url: sheet.hyperlink(COL_SUB2, row),
        superset_tag: superset_tag(&name),
        name,
    }
}

/// Leading `A1:` style tag of a superset exercise
pub fn superset_tag(name: &str) -> Option<String> {
    SUPERSET_RE.captures(name).map(|c| c[1].to_string())
}
