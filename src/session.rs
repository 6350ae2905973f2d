//! Workout sessions: what the user did with a template workout
//!
//! A submission names the workout number, the substitution picked for each
//! exercise slot and the working sets entered. Names and videos of the
//! performed variant are resolved from the template, not trusted from input.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::program::WorkoutSlot;
use crate::template::WorkoutLabel;

/// Weight unit of a logged set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Kg,
    Lb,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::Lb => "lb",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Unit::Kg => Unit::Lb,
            Unit::Lb => Unit::Kg,
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kg" => Ok(Unit::Kg),
            "lb" => Ok(Unit::Lb),
            other => Err(format!("unknown unit '{other}' (expected kg or lb)")),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which variant of an exercise slot was performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionChoice {
    #[default]
    Primary,
    Sub1,
    Sub2,
}

impl SubstitutionChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubstitutionChoice::Primary => "primary",
            SubstitutionChoice::Sub1 => "sub1",
            SubstitutionChoice::Sub2 => "sub2",
        }
    }

    /// Next choice in primary → sub1 → sub2 order, skipping empty slots
    pub fn cycle(&self, exercise: &PlannedExercise) -> Self {
        let order = [SubstitutionChoice::Primary, SubstitutionChoice::Sub1, SubstitutionChoice::Sub2];
        let start = order.iter().position(|c| c == self).unwrap_or(0);
        (1..=order.len())
            .map(|step| order[(start + step) % order.len()])
            .find(|c| exercise.has_variant(*c))
            .unwrap_or(SubstitutionChoice::Primary)
    }
}

impl FromStr for SubstitutionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(SubstitutionChoice::Primary),
            "sub1" => Ok(SubstitutionChoice::Sub1),
            "sub2" => Ok(SubstitutionChoice::Sub2),
            other => Err(format!("unknown substitution choice '{other}'")),
        }
    }
}

impl fmt::Display for SubstitutionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetKind {
    Warmup,
    Working,
}

impl SetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetKind::Warmup => "warmup",
            SetKind::Working => "working",
        }
    }
}

impl FromStr for SetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warmup" => Ok(SetKind::Warmup),
            "working" => Ok(SetKind::Working),
            other => Err(format!("unknown set kind '{other}'")),
        }
    }
}

/// Template exercise as stored in the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub id: i64,
    pub order_index: u32,
    pub name: String,
    pub warmup_sets_target: Option<String>,
    pub working_sets_target: Option<i64>,
    pub reps_target: Option<String>,
    pub rpe_target: Option<String>,
    pub rest_target: Option<String>,
    pub notes: Option<String>,
    pub primary_video_url: Option<String>,
    pub sub1_name: Option<String>,
    pub sub1_video_url: Option<String>,
    pub sub2_name: Option<String>,
    pub sub2_video_url: Option<String>,
}

impl PlannedExercise {
    pub fn has_variant(&self, choice: SubstitutionChoice) -> bool {
        match choice {
            SubstitutionChoice::Primary => true,
            SubstitutionChoice::Sub1 => self.sub1_name.as_deref().is_some_and(|n| !n.is_empty()),
            SubstitutionChoice::Sub2 => self.sub2_name.as_deref().is_some_and(|n| !n.is_empty()),
        }
    }

    /// Name of the performed variant, falling back to the primary movement
    pub fn performed_name(&self, choice: SubstitutionChoice) -> &str {
        let sub = match choice {
            SubstitutionChoice::Primary => None,
            SubstitutionChoice::Sub1 => self.sub1_name.as_deref(),
            SubstitutionChoice::Sub2 => self.sub2_name.as_deref(),
        };
        sub.filter(|n| !n.is_empty()).unwrap_or(&self.name)
    }

    /// Video of the performed variant, falling back to the primary video
    pub fn performed_video(&self, choice: SubstitutionChoice) -> Option<&str> {
        let sub = match choice {
            SubstitutionChoice::Primary => None,
            SubstitutionChoice::Sub1 => self.sub1_video_url.as_deref(),
            SubstitutionChoice::Sub2 => self.sub2_video_url.as_deref(),
        };
        sub.filter(|v| !v.is_empty())
            .or(self.primary_video_url.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Number of working-set rows to offer
    pub fn working_set_rows(&self) -> u32 {
        self.working_sets_target.unwrap_or(1).max(1) as u32
    }
}

/// One template workout with its exercises, ordered by order index
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutPlan {
    pub program_template_id: i64,
    pub program_name: String,
    pub slot: WorkoutSlot,
    pub label: WorkoutLabel,
    pub exercises: Vec<PlannedExercise>,
}

/// A set as entered; blank fields stay `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEntry {
    pub set_number: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: Option<i64>,
    #[serde(default)]
    pub rpe: Option<f64>,
}

impl SetEntry {
    pub fn is_blank(&self) -> bool {
        self.weight.is_none() && self.reps.is_none() && self.rpe.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    pub order_index: u32,
    #[serde(default)]
    pub choice: SubstitutionChoice,
    #[serde(default)]
    pub sets: Vec<SetEntry>,
}

/// Everything needed to record a completed workout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSubmission {
    pub workout_number: u32,
    #[serde(default)]
    pub unit: Unit,
    /// Client-measured duration; wins over `started_at`
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercises: Vec<ExerciseLog>,
}

impl WorkoutSubmission {
    /// Duration in whole seconds, never negative
    pub fn resolve_duration(&self, performed_at: DateTime<Utc>) -> Option<i64> {
        if let Some(secs) = self.duration_seconds.filter(|s| s.is_finite()) {
            return Some(secs.round().max(0.0) as i64);
        }
        self.started_at.map(|started| {
            let millis = (performed_at - started).num_milliseconds();
            ((millis as f64) / 1000.0).round().max(0.0) as i64
        })
    }
}

/// Heavier weight wins, then more reps
pub fn compare_best_set(a: Option<(f64, i64)>, b: Option<(f64, i64)>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some((wa, ra)), Some((wb, rb))) => wa.total_cmp(&wb).then(ra.cmp(&rb)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::cmp::Ordering;

    fn bench() -> PlannedExercise {
        PlannedExercise {
            id: 1,
            order_index: 1,
            name: "Bench Press".into(),
            primary_video_url: Some("https://youtu.be/bench".into()),
            sub1_name: Some("DB Press".into()),
            sub1_video_url: None,
            sub2_name: Some("Machine Press".into()),
            sub2_video_url: Some("https://youtu.be/machine".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_performed_variant_resolution() {
        let ex = bench();
        assert_eq!(ex.performed_name(SubstitutionChoice::Primary), "Bench Press");
        assert_eq!(ex.performed_name(SubstitutionChoice::Sub1), "DB Press");
        assert_eq!(ex.performed_video(SubstitutionChoice::Sub1), Some("https://youtu.be/bench"));
        assert_eq!(ex.performed_video(SubstitutionChoice::Sub2), Some("https://youtu.be/machine"));
    }

    #[test]
    fn test_empty_slot_falls_back_to_primary() {
        let ex = PlannedExercise { name: "Squat".into(), sub1_name: Some(String::new()), ..Default::default() };
        assert_eq!(ex.performed_name(SubstitutionChoice::Sub1), "Squat");
        assert_eq!(ex.performed_name(SubstitutionChoice::Sub2), "Squat");
        assert_eq!(ex.performed_video(SubstitutionChoice::Sub2), None);
    }

    #[test]
    fn test_cycle_skips_missing_variants() {
        let mut ex = bench();
        assert_eq!(SubstitutionChoice::Primary.cycle(&ex), SubstitutionChoice::Sub1);
        assert_eq!(SubstitutionChoice::Sub2.cycle(&ex), SubstitutionChoice::Primary);
        ex.sub1_name = None;
        assert_eq!(SubstitutionChoice::Primary.cycle(&ex), SubstitutionChoice::Sub2);
        ex.sub2_name = None;
        assert_eq!(SubstitutionChoice::Primary.cycle(&ex), SubstitutionChoice::Primary);
    }

    #[test]
    fn test_working_set_rows() {
        let mut ex = bench();
        assert_eq!(ex.working_set_rows(), 1);
        ex.working_sets_target = Some(3);
        assert_eq!(ex.working_set_rows(), 3);
        ex.working_sets_target = Some(0);
        assert_eq!(ex.working_set_rows(), 1);
    }

    #[test]
    fn test_duration_resolution() {
        let now = Utc::now();
        let mut sub = WorkoutSubmission { workout_number: 1, ..Default::default() };
        assert_eq!(sub.resolve_duration(now), None);

        sub.started_at = Some(now - Duration::seconds(3600));
        assert_eq!(sub.resolve_duration(now), Some(3600));

        sub.started_at = Some(now + Duration::seconds(10));
        assert_eq!(sub.resolve_duration(now), Some(0));

        sub.duration_seconds = Some(1799.6);
        assert_eq!(sub.resolve_duration(now), Some(1800));
    }

    #[test]
    fn test_submission_json() {
        let json = r#"{
            "workoutNumber": 5,
            "unit": "lb",
            "exercises": [
                {"orderIndex": 2, "choice": "sub2", "sets": [{"setNumber": 1, "weight": 135, "reps": 8}]},
                {"orderIndex": 1}
            ]
        }"#;
        let sub: WorkoutSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(sub.unit, Unit::Lb);
        assert_eq!(sub.exercises[0].choice, SubstitutionChoice::Sub2);
        assert_eq!(sub.exercises[0].sets[0].weight, Some(135.0));
        assert!(sub.exercises[0].sets[0].rpe.is_none());
        assert_eq!(sub.exercises[1].choice, SubstitutionChoice::Primary);
    }

    #[test]
    fn test_best_set_ordering() {
        assert_eq!(compare_best_set(None, None), Ordering::Equal);
        assert_eq!(compare_best_set(None, Some((20.0, 5))), Ordering::Less);
        assert_eq!(compare_best_set(Some((100.0, 3)), Some((90.0, 10))), Ordering::Greater);
        assert_eq!(compare_best_set(Some((100.0, 3)), Some((100.0, 5))), Ordering::Less);
    }
}
