//! Shared fixtures for integration tests

#![allow(dead_code)]

use gymlog::Database;
use gymlog::db::User;
use gymlog::template::{Cell, GridSheet, ParseOptions, ProgramTemplate, parse_program};

pub const BENCH_VIDEO: &str = "https://www.youtube.com/watch?v=bench01";
pub const DB_PRESS_VIDEO: &str = "https://youtu.be/dbpress1";

const UPPER: [&str; 3] = ["Bench Press", "Cable Row", "A1: Curl"];
const LOWER: [&str; 3] = ["Squat", "Romanian Deadlift", "Calf Raise"];

/// Worksheet laid out like the real program: `weeks` weeks of
/// Upper/Lower/Upper/Lower, three exercises each, with rest-day rows
/// after the second and fourth workout
pub fn program_sheet(weeks: u32) -> GridSheet {
    let mut sheet = GridSheet::new("4x Program");
    let mut row = 1;
    for week in 1..=weeks {
        sheet.set_row(row, &["", &format!("Week {week}")]);
        sheet.set_row(
            row + 1,
            &["", "", "Exercise", "Warm-up Sets", "Working Sets", "Reps", "", "RPE", "Rest", "Sub 1", "Sub 2", "Notes"],
        );
        row += 2;

        for (i, label) in ["Upper", "Lower", "Upper", "Lower"].into_iter().enumerate() {
            let names = if label == "Upper" { UPPER } else { LOWER };
            for (j, name) in names.into_iter().enumerate() {
                let label_cell = if j == 0 { label } else { "" };
                let reps = if name == "Calf Raise" { "12 + dropset" } else { "8-10" };
                sheet.set_row(
                    row,
                    &["", label_cell, name, "2", "3", reps, "", "8", "~2 min", "", "", "Control the eccentric"],
                );
                if name == "Bench Press" {
                    sheet
                        .set(3, row, Cell::text(name).with_link(BENCH_VIDEO))
                        .set(10, row, Cell::text("DB Press").with_link(DB_PRESS_VIDEO))
                        .set(11, row, Cell::text("Machine Press"));
                }
                row += 1;
            }
            if i == 1 {
                sheet.set_row(row, &["", "Suggested 1-2 Rest Days"]);
                row += 1;
            }
        }
        sheet.set_row(row, &["", "Rest days"]);
        row += 2;
    }
    sheet
}

pub fn program_template() -> ProgramTemplate {
    parse_program(&program_sheet(12), &ParseOptions::default()).unwrap()
}

/// Database with the program imported and one signed-up user
pub fn seeded_db() -> (Database, User, i64) {
    let mut db = Database::open_in_memory().unwrap();
    let program_id = db.persist_template(&program_template(), false).unwrap();
    db.invite("lifter@example.com").unwrap();
    let user = db.signup("lifter@example.com").unwrap();
    (db, user, program_id)
}
