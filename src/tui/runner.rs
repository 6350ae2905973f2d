//! Workout runner state, independent of the terminal

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::rest::{format_clock, parse_rest_seconds};
use crate::session::{
    ExerciseLog, PlannedExercise, SetEntry, SubstitutionChoice, Unit, WorkoutPlan, WorkoutSubmission,
};
use crate::settings::UserSettings;

/// How long a finished timer stays on screen
const DONE_GRACE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, PartialEq)]
pub struct RestTimer {
    pub label: String,
    pub ends_at: Instant,
}

impl RestTimer {
    pub fn remaining_secs(&self, now: Instant) -> u32 {
        let left = self.ends_at.saturating_duration_since(now);
        left.as_millis().div_ceil(1000) as u32
    }
}

pub struct RunnerState {
    pub plan: WorkoutPlan,
    pub workout_number: u32,
    pub unit: Unit,
    pub auto_rest: bool,
    pub focus_mode: bool,
    pub selected: usize,
    pub rest: Option<RestTimer>,
    pub started_at: DateTime<Utc>,
    expanded: HashSet<u32>,
    choices: HashMap<u32, SubstitutionChoice>,
    sets: HashMap<u32, Vec<SetEntry>>,
}

impl RunnerState {
    pub fn new(plan: WorkoutPlan, settings: &UserSettings, started_at: DateTime<Utc>) -> Self {
        let workout_number = plan.slot.workout_number();
        // first exercise starts expanded
        let expanded = plan.exercises.first().map(|e| e.order_index).into_iter().collect();
        Self {
            plan,
            workout_number,
            unit: settings.default_unit,
            auto_rest: settings.auto_rest_on_set_done,
            focus_mode: settings.focus_mode,
            selected: 0,
            rest: None,
            started_at,
            expanded,
            choices: HashMap::new(),
            sets: HashMap::new(),
        }
    }

    pub fn exercises(&self) -> &[PlannedExercise] {
        &self.plan.exercises
    }

    pub fn selected_exercise(&self) -> Option<&PlannedExercise> {
        self.plan.exercises.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.plan.exercises.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn is_expanded(&self, order_index: u32) -> bool {
        self.expanded.contains(&order_index)
    }

    pub fn toggle_expanded(&mut self) {
        let Some(order) = self.selected_exercise().map(|e| e.order_index) else { return };
        if !self.expanded.remove(&order) {
            self.expanded.insert(order);
        }
    }

    pub fn choice(&self, order_index: u32) -> SubstitutionChoice {
        self.choices.get(&order_index).copied().unwrap_or_default()
    }

    /// Switch the selected slot to its next available variant
    pub fn cycle_choice(&mut self) {
        let Some(ex) = self.selected_exercise() else { return };
        let order = ex.order_index;
        let next = self.choice(order).cycle(ex);
        self.choices.insert(order, next);
    }

    pub fn toggle_unit(&mut self) {
        self.unit = self.unit.toggled();
    }

    pub fn sets(&self, order_index: u32) -> &[SetEntry] {
        self.sets.get(&order_index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start the rest timer for the selected exercise
    pub fn start_rest(&mut self, now: Instant) {
        let Some(ex) = self.selected_exercise() else { return };
        let secs = parse_rest_seconds(ex.rest_target.as_deref());
        let label = ex.performed_name(self.choice(ex.order_index)).to_string();
        self.rest = Some(RestTimer { label, ends_at: now + Duration::from_secs(secs.into()) });
    }

    pub fn dismiss_rest(&mut self) {
        self.rest = None;
    }

    /// Clear a finished timer once it has been shown long enough
    pub fn tick(&mut self, now: Instant) {
        if let Some(rest) = &self.rest
            && now >= rest.ends_at + DONE_GRACE
        {
            self.rest = None;
        }
    }

    /// Banner text: label and either the countdown or "Done"
    pub fn rest_banner(&self, now: Instant) -> Option<(String, String)> {
        let rest = self.rest.as_ref()?;
        let remaining = rest.remaining_secs(now);
        let clock = if remaining > 0 { format_clock(remaining) } else { "Done".to_string() };
        Some((rest.label.clone(), clock))
    }

    /// Log the next working set of the selected exercise from
    /// `weight reps [rpe]`; `-` leaves a field blank
    pub fn log_set(&mut self, input: &str, now: Instant) -> Result<(), String> {
        let Some(order) = self.selected_exercise().map(|e| e.order_index) else {
            return Err("no exercise selected".to_string());
        };
        let entry = parse_set_input(input)?;
        let sets = self.sets.entry(order).or_default();
        sets.push(SetEntry { set_number: sets.len() as u32 + 1, ..entry });
        if self.auto_rest {
            self.start_rest(now);
        }
        Ok(())
    }

    pub fn undo_set(&mut self) {
        if let Some(order) = self.selected_exercise().map(|e| e.order_index)
            && let Some(sets) = self.sets.get_mut(&order)
        {
            sets.pop();
        }
    }

    /// Submission covering every exercise of the workout
    pub fn submission(&self) -> WorkoutSubmission {
        WorkoutSubmission {
            workout_number: self.workout_number,
            unit: self.unit,
            duration_seconds: None,
            started_at: Some(self.started_at),
            exercises: self
                .plan
                .exercises
                .iter()
                .map(|ex| ExerciseLog {
                    order_index: ex.order_index,
                    choice: self.choice(ex.order_index),
                    sets: self.sets(ex.order_index).to_vec(),
                })
                .collect(),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, what: &str) -> Result<Option<T>, String> {
    match field {
        None | Some("-") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| format!("invalid {what} '{text}'")),
    }
}

/// Parse `weight reps [rpe]`
pub fn parse_set_input(input: &str) -> Result<SetEntry, String> {
    let mut fields = input.split_whitespace();
    let weight: Option<f64> = parse_field(fields.next(), "weight")?;
    let reps: Option<i64> = parse_field(fields.next(), "reps")?;
    let rpe: Option<f64> = parse_field(fields.next(), "rpe")?;
    if fields.next().is_some() {
        return Err("expected: weight reps [rpe]".to_string());
    }
    let entry = SetEntry { set_number: 0, weight, reps, rpe };
    if entry.is_blank() {
        return Err("empty set".to_string());
    }
    Ok(entry)
}
