mod common;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use common::{DB_PRESS_VIDEO, program_template, seeded_db};
use gymlog::Database;
use gymlog::db::{CompletedWorkout, DbError, RunStatusKind, StartedRun};
use gymlog::program::{TOTAL_WORKOUTS, WorkoutSlot};
use gymlog::session::{ExerciseLog, SetEntry, SubstitutionChoice, Unit, WorkoutSubmission};
use gymlog::template::WorkoutLabel;

fn set(set_number: u32, weight: f64, reps: i64) -> SetEntry {
    SetEntry { set_number, weight: Some(weight), reps: Some(reps), rpe: None }
}

fn quick(workout_number: u32) -> WorkoutSubmission {
    WorkoutSubmission { workout_number, ..Default::default() }
}

#[test]
fn test_persist_requires_force() {
    let mut db = Database::open_in_memory().unwrap();
    let template = program_template();
    let first = db.persist_template(&template, false).unwrap();

    assert!(matches!(db.persist_template(&template, false), Err(DbError::TemplateExists(slug)) if slug == "essentials-4x"));

    let second = db.persist_template(&template, true).unwrap();
    assert_ne!(first, second);
    let (id, name) = db.program_by_slug("essentials-4x").unwrap();
    assert_eq!(id, second);
    assert_eq!(name, "Essentials Program - 4x/Week");
}

#[test]
fn test_force_refused_while_runs_exist() {
    let (mut db, user, program_id) = seeded_db();
    db.start_program(user.id, program_id, Utc::now()).unwrap();

    match db.persist_template(&program_template(), true) {
        Err(DbError::TemplateInUse { runs, .. }) => assert_eq!(runs, 1),
        other => panic!("expected TemplateInUse, got {other:?}"),
    }
    // the original template is untouched
    assert_eq!(db.program_by_slug("essentials-4x").unwrap().0, program_id);
}

#[test]
fn test_workout_plan_from_stored_template() {
    let (db, _, program_id) = seeded_db();
    let plan = db.workout_plan(program_id, WorkoutSlot::new(3, 2).unwrap()).unwrap();
    assert_eq!(plan.label, WorkoutLabel::Lower);
    let names: Vec<&str> = plan.exercises.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Squat", "Romanian Deadlift", "Calf Raise"]);
    assert_eq!(plan.exercises[0].working_sets_target, Some(3));
    assert_eq!(plan.exercises[0].rest_target.as_deref(), Some("~2 min"));

    let week = db.week_plan(program_id, 12).unwrap();
    assert_eq!(week.len(), 4);
    assert_eq!(week[3].slot.workout_number(), 48);

    assert!(matches!(db.week_plan(program_id, 13), Err(DbError::WorkoutNotFound { week: 13, .. })));
}

#[test]
fn test_start_keeps_active_run() {
    let (db, user, program_id) = seeded_db();
    let started = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();

    let first = db.start_program(user.id, program_id, started).unwrap();
    assert!(matches!(first, StartedRun::Created(_)));
    assert_eq!(first.run().started_at, started);

    let again = db.start_program(user.id, program_id, Utc::now()).unwrap();
    assert!(matches!(again, StartedRun::AlreadyActive(_)));
    assert_eq!(again.run().id, first.run().id);

    db.abandon_run(user.id, first.run().id).unwrap();
    assert!(matches!(db.run_status(user.id, program_id), Err(DbError::NoActiveRun)));
    let fresh = db.start_program(user.id, program_id, Utc::now()).unwrap();
    assert_ne!(fresh.run().id, first.run().id);
}

#[test]
fn test_status_tracks_first_missing_workout() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();

    let status = db.run_status(user.id, program_id).unwrap();
    assert_eq!(status.completed, 0);
    assert_eq!(status.next, Some(WorkoutSlot { week: 1, workout_index: 1 }));

    db.complete_workout(user.id, run.id, &quick(1), Utc::now()).unwrap();
    db.complete_workout(user.id, run.id, &quick(3), Utc::now()).unwrap();
    let status = db.run_status(user.id, program_id).unwrap();
    assert_eq!(status.completed, 2);
    assert_eq!(status.next, Some(WorkoutSlot { week: 1, workout_index: 2 }));
}

#[test]
fn test_duplicate_completion_resolves_to_existing() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();

    let first = db.complete_workout(user.id, run.id, &quick(5), Utc::now()).unwrap();
    let CompletedWorkout::Logged(id) = first else {
        panic!("expected a new instance, got {first:?}");
    };
    let second = db.complete_workout(user.id, run.id, &quick(5), Utc::now()).unwrap();
    assert_eq!(second, CompletedWorkout::AlreadyLogged(id));
    assert_eq!(db.find_workout_instance(run.id, 5).unwrap(), Some(id));
    assert_eq!(db.history(user.id, 10).unwrap().len(), 1);
}

#[test]
fn test_logged_workout_detail() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();
    let performed_at = Utc.with_ymd_and_hms(2024, 3, 5, 18, 0, 0).unwrap();

    let submission = WorkoutSubmission {
        workout_number: 1,
        unit: Unit::Lb,
        duration_seconds: None,
        started_at: Some(performed_at - Duration::minutes(50)),
        exercises: vec![
            ExerciseLog {
                order_index: 1,
                choice: SubstitutionChoice::Sub1,
                sets: vec![
                    set(1, 60.0, 10),
                    set(2, 65.0, 8),
                    SetEntry { set_number: 3, ..Default::default() },
                ],
            },
            ExerciseLog { order_index: 2, choice: SubstitutionChoice::Primary, sets: vec![set(1, 50.0, 12)] },
        ],
    };
    let id = db.complete_workout(user.id, run.id, &submission, performed_at).unwrap().instance_id();

    let detail = db.workout_detail(user.id, id).unwrap();
    assert_eq!(detail.instance.workout_number, 1);
    assert_eq!(detail.instance.slot, WorkoutSlot { week: 1, workout_index: 1 });
    assert_eq!(detail.instance.performed_at, performed_at);
    assert_eq!(detail.instance.duration_seconds, Some(3000));
    assert_eq!(detail.exercises.len(), 2);

    let press = &detail.exercises[0];
    assert_eq!(press.choice, SubstitutionChoice::Sub1);
    assert_eq!(press.performed_name.as_deref(), Some("DB Press"));
    assert_eq!(press.performed_video_url.as_deref(), Some(DB_PRESS_VIDEO));
    // the blank third set is not stored
    assert_eq!(press.sets.len(), 2);
    assert_eq!(press.sets[1].weight, Some(65.0));
    assert_eq!(press.sets[1].unit.as_deref(), Some("lb"));

    let history = db.history(user.id, 10).unwrap();
    assert_eq!(history[0].instance.id, id);
    assert_eq!(history[0].label, "Upper");
    assert_eq!(history[0].run_status, RunStatusKind::Active);

    assert!(matches!(db.workout_detail(user.id + 1, id), Err(DbError::InstanceNotFound(_))));
}

#[test]
fn test_last_performance_and_progress() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();
    let day1 = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();

    for (n, weight) in [(1, 100.0), (3, 105.0)] {
        let submission = WorkoutSubmission {
            workout_number: n,
            exercises: vec![ExerciseLog {
                order_index: 1,
                choice: SubstitutionChoice::Primary,
                sets: vec![set(1, weight, 5), set(2, weight - 10.0, 8)],
            }],
            ..Default::default()
        };
        db.complete_workout(user.id, run.id, &submission, day1 + Duration::days(n as i64)).unwrap();
    }

    let names = vec!["Bench Press".to_string(), " Bench Press ".to_string(), "Squat".to_string()];
    let last = db.last_performance(user.id, program_id, &names).unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last[0].0, "Bench Press");
    let session = last[0].1.as_ref().unwrap();
    assert_eq!(session.performed_at, day1 + Duration::days(3));
    assert_eq!(session.last_set().unwrap().set_number, 2);
    assert_eq!(session.best_set().unwrap().weight, Some(105.0));
    assert_eq!(last[1], ("Squat".to_string(), None));

    let sessions = db.exercise_history(user.id, program_id, "Bench Press", 10, 0).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[1].best_set().unwrap().weight, Some(100.0));
    assert_eq!(db.exercise_history(user.id, program_id, "Bench Press", 10, 1).unwrap().len(), 1);
}

#[test]
fn test_invalid_submissions_are_rejected() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();

    let out_of_range = quick(TOTAL_WORKOUTS + 1);
    assert!(matches!(
        db.complete_workout(user.id, run.id, &out_of_range, Utc::now()),
        Err(DbError::InvalidSubmission(_))
    ));

    let unknown_exercise = WorkoutSubmission {
        workout_number: 1,
        exercises: vec![ExerciseLog { order_index: 9, ..Default::default() }],
        ..Default::default()
    };
    assert!(matches!(
        db.complete_workout(user.id, run.id, &unknown_exercise, Utc::now()),
        Err(DbError::InvalidSubmission(_))
    ));

    let repeated_set = WorkoutSubmission {
        workout_number: 1,
        exercises: vec![ExerciseLog { order_index: 1, sets: vec![set(1, 50.0, 5), set(1, 55.0, 5)], ..Default::default() }],
        ..Default::default()
    };
    assert!(matches!(
        db.complete_workout(user.id, run.id, &repeated_set, Utc::now()),
        Err(DbError::InvalidSubmission(_))
    ));

    assert!(matches!(db.complete_workout(user.id + 1, run.id, &quick(1), Utc::now()), Err(DbError::RunNotFound(_))));
    assert_eq!(db.find_workout_instance(run.id, 1).unwrap(), None);
}

#[test]
fn test_run_completes_after_last_workout() {
    let (mut db, user, program_id) = seeded_db();
    let run = db.start_program(user.id, program_id, Utc::now()).unwrap().run().clone();

    for n in 1..=TOTAL_WORKOUTS {
        db.complete_workout(user.id, run.id, &quick(n), Utc::now()).unwrap();
    }
    assert_eq!(db.run(run.id).unwrap().status, RunStatusKind::Completed);

    let last = db.find_workout_instance(run.id, TOTAL_WORKOUTS).unwrap().unwrap();
    let again = db.complete_workout(user.id, run.id, &quick(TOTAL_WORKOUTS), Utc::now()).unwrap();
    assert_eq!(again, CompletedWorkout::AlreadyLogged(last));
    assert!(matches!(db.run_status(user.id, program_id), Err(DbError::NoActiveRun)));
    assert_eq!(db.history(user.id, 100).unwrap().len(), 48);
}
