//! Program template model and the worksheet importer
//!
//! A template is the shared definition of the program: weeks, their
//! workouts and the exercise targets for each workout. It is produced by
//! [`parse_program`] and serialized as a versioned JSON artifact.

pub mod error;
pub mod parser;
pub mod sheet;

pub use error::{ImportError, Result};
pub use parser::{DEFAULT_SHEET, ParseOptions, parse_program, parse_workbook, superset_tag};
pub use sheet::{Cell, CellValue, GridSheet, Sheet, XlsxWorkbook};

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::program::{WEEKS, WORKOUTS_PER_WEEK};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutLabel {
    Upper,
    Lower,
}

impl WorkoutLabel {
    /// Exact match on the label cell text
    pub fn from_cell(text: &str) -> Option<Self> {
        match text {
            "Upper" => Some(WorkoutLabel::Upper),
            "Lower" => Some(WorkoutLabel::Lower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutLabel::Upper => "Upper",
            WorkoutLabel::Lower => "Lower",
        }
    }
}

impl fmt::Display for WorkoutLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTemplate {
    pub schema_version: u32,
    pub program: ProgramInfo,
    pub weeks: Vec<WeekTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub slug: String,
    pub name: String,
    /// Declared number of weeks
    pub weeks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTemplate {
    pub week_number: u32,
    pub workouts: Vec<WorkoutTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub workout_index: u32,
    pub label: WorkoutLabel,
    pub exercises: Vec<ExerciseTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTemplate {
    pub order_index: u32,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_sets_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_sets_target: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub1_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub1_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub2_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub2_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dropset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superset_tag: Option<String>,
}

impl ProgramTemplate {
    /// Check the template against the artifact schema.
    /// All issues are collected before failing.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if self.schema_version != SCHEMA_VERSION {
            issues.push(format!("schemaVersion: expected {SCHEMA_VERSION}, got {}", self.schema_version));
        }
        if self.program.slug.is_empty() {
            issues.push("program.slug: must not be empty".to_string());
        }
        if self.program.name.is_empty() {
            issues.push("program.name: must not be empty".to_string());
        }
        if self.program.weeks == 0 {
            issues.push("program.weeks: must be positive".to_string());
        }

        for (wi, week) in self.weeks.iter().enumerate() {
            let at = format!("weeks[{wi}]");
            if !(1..=WEEKS).contains(&week.week_number) {
                issues.push(format!("{at}.weekNumber: {} not in 1..={WEEKS}", week.week_number));
            }
            for (oi, workout) in week.workouts.iter().enumerate() {
                let at = format!("{at}.workouts[{oi}]");
                if !(1..=WORKOUTS_PER_WEEK).contains(&workout.workout_index) {
                    issues.push(format!(
                        "{at}.workoutIndex: {} not in 1..={WORKOUTS_PER_WEEK}",
                        workout.workout_index
                    ));
                }
                for (ei, exercise) in workout.exercises.iter().enumerate() {
                    exercise.collect_issues(&format!("{at}.exercises[{ei}]"), &mut issues);
                }
            }
        }

        if issues.is_empty() { Ok(()) } else { Err(ImportError::Schema { issues }) }
    }

    /// Importer rule on top of the schema: exactly 12 weeks of 4 workouts
    pub fn validate_structure(&self) -> Result<()> {
        if self.weeks.len() != WEEKS as usize {
            return Err(ImportError::WeekCount { expected: WEEKS as usize, got: self.weeks.len() });
        }
        for week in &self.weeks {
            if week.workouts.len() != WORKOUTS_PER_WEEK as usize {
                return Err(ImportError::WorkoutCount {
                    week: week.week_number,
                    expected: WORKOUTS_PER_WEEK as usize,
                    got: week.workouts.len(),
                });
            }
        }
        Ok(())
    }

    pub fn total_exercises(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|w| &w.workouts)
            .map(|wo| wo.exercises.len())
            .sum()
    }

    pub fn summary(&self) -> TemplateSummary {
        let weeks = self
            .weeks
            .iter()
            .map(|w| {
                let counts: Vec<usize> = w.workouts.iter().map(|wo| wo.exercises.len()).collect();
                WeekSummary { week: w.week_number, total: counts.iter().sum(), counts }
            })
            .collect();
        TemplateSummary { slug: self.program.slug.clone(), weeks }
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the JSON artifact, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "wrote template artifact");
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let template: ProgramTemplate = serde_json::from_str(&content)?;
        template.validate()?;
        Ok(template)
    }
}

impl ExerciseTemplate {
    fn collect_issues(&self, at: &str, issues: &mut Vec<String>) {
        if self.order_index == 0 {
            issues.push(format!("{at}.orderIndex: must be positive"));
        }
        if self.name.is_empty() {
            issues.push(format!("{at}.name: must not be empty"));
        }
        if let Some(sets) = self.working_sets_target
            && sets <= 0
        {
            issues.push(format!("{at}.workingSetsTarget: {sets} must be positive"));
        }
        let links = [
            ("primaryVideoUrl", &self.primary_video_url),
            ("sub1VideoUrl", &self.sub1_video_url),
            ("sub2VideoUrl", &self.sub2_video_url),
        ];
        for (field, link) in links {
            if let Some(link) = link
                && url::Url::parse(link).is_err()
            {
                issues.push(format!("{at}.{field}: '{link}' is not a valid URL"));
            }
        }
    }
}

/// Exercise counts per week, as printed after an import
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSummary {
    pub slug: String,
    pub weeks: Vec<WeekSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub week: u32,
    pub counts: Vec<usize>,
    pub total: usize,
}

impl TemplateSummary {
    pub fn total(&self) -> usize {
        self.weeks.iter().map(|w| w.total).sum()
    }
}

impl fmt::Display for TemplateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Parsed {}: weeks={}, totalExercises={}",
            self.slug,
            self.weeks.len(),
            self.total()
        )?;
        for w in &self.weeks {
            let counts: Vec<String> = w.counts.iter().map(|c| c.to_string()).collect();
            writeln!(f, "- Week {}: workouts={} total={}", w.week, counts.join(","), w.total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(order_index: u32, name: &str) -> ExerciseTemplate {
        ExerciseTemplate { order_index, name: name.to_string(), ..Default::default() }
    }

    fn template(weeks: u32, workouts: u32) -> ProgramTemplate {
        ProgramTemplate {
            schema_version: SCHEMA_VERSION,
            program: ProgramInfo { slug: "essentials-4x".into(), name: "Essentials".into(), weeks: 12 },
            weeks: (1..=weeks)
                .map(|week_number| WeekTemplate {
                    week_number,
                    workouts: (1..=workouts)
                        .map(|workout_index| WorkoutTemplate {
                            workout_index,
                            label: if workout_index % 2 == 1 { WorkoutLabel::Upper } else { WorkoutLabel::Lower },
                            exercises: vec![exercise(1, "Squat"), exercise(2, "Curl")],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_template_passes() {
        let t = template(12, 4);
        assert!(t.validate().is_ok());
        assert!(t.validate_structure().is_ok());
        assert_eq!(t.total_exercises(), 96);
    }

    #[test]
    fn test_schema_issues_are_collected() {
        let mut t = template(1, 1);
        t.schema_version = 2;
        t.weeks[0].week_number = 13;
        t.weeks[0].workouts[0].exercises[0].working_sets_target = Some(0);
        t.weeks[0].workouts[0].exercises[1].primary_video_url = Some("not a url".into());

        match t.validate() {
            Err(ImportError::Schema { issues }) => assert_eq!(issues.len(), 4),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_structure_counts() {
        assert!(matches!(
            template(11, 4).validate_structure(),
            Err(ImportError::WeekCount { expected: 12, got: 11 })
        ));
        assert!(matches!(
            template(12, 3).validate_structure(),
            Err(ImportError::WorkoutCount { week: 1, expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_json_uses_camel_case_and_omits_absent_fields() {
        let json = template(1, 1).to_json().unwrap();
        assert!(json.contains("\"schemaVersion\": 1"));
        assert!(json.contains("\"workoutIndex\": 1"));
        assert!(json.contains("\"label\": \"Upper\""));
        assert!(!json.contains("repsTarget"));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_summary_lines() {
        let text = template(2, 4).summary().to_string();
        assert_eq!(
            text,
            "Parsed essentials-4x: weeks=2, totalExercises=16\n\
             - Week 1: workouts=2,2,2,2 total=8\n\
             - Week 2: workouts=2,2,2,2 total=8\n"
        );
    }

    #[test]
    fn test_write_and_read_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("template.json");
        let t = template(12, 4);
        t.write_json(&path).unwrap();
        assert_eq!(ProgramTemplate::read_json(&path).unwrap(), t);
    }
}
