//! Program constants and workout numbering
//!
//! A run is 48 workouts long. Workout numbers are 1-based and map onto
//! (week, workout index) in blocks of four.

use serde::{Deserialize, Serialize};

/// Slug of the only program the app knows about
pub const PROGRAM_SLUG: &str = "essentials-4x";
pub const PROGRAM_NAME: &str = "Essentials Program - 4x/Week";

pub const WEEKS: u32 = 12;
pub const WORKOUTS_PER_WEEK: u32 = 4;
pub const TOTAL_WORKOUTS: u32 = WEEKS * WORKOUTS_PER_WEEK;

/// Position of a workout inside the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSlot {
    pub week: u32,
    pub workout_index: u32,
}

impl WorkoutSlot {
    /// Build a slot, rejecting positions outside the 12x4 grid
    pub fn new(week: u32, workout_index: u32) -> Option<Self> {
        if (1..=WEEKS).contains(&week) && (1..=WORKOUTS_PER_WEEK).contains(&workout_index) {
            Some(Self { week, workout_index })
        } else {
            None
        }
    }

    /// Sequential workout number across the whole run (1..=48)
    pub fn workout_number(&self) -> u32 {
        (self.week - 1) * WORKOUTS_PER_WEEK + self.workout_index
    }
}

/// Map a 1-based workout number onto its week and workout index
pub fn compute_week_and_workout_index(workout_number: u32) -> WorkoutSlot {
    let n = workout_number.max(1) - 1;
    WorkoutSlot {
        week: n / WORKOUTS_PER_WEEK + 1,
        workout_index: n % WORKOUTS_PER_WEEK + 1,
    }
}

/// Odd workouts are upper body days, even ones lower
pub fn label_for_workout_index(workout_index: u32) -> &'static str {
    if workout_index % 2 == 1 { "Upper" } else { "Lower" }
}
