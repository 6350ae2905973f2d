//! gymlog - 12-week strength program tracker

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use gymlog::config::{Config, DATABASE_ENV};
use gymlog::db::{CompletedWorkout, HISTORY_LIMIT, LoggedSet, StartedRun, User};
use gymlog::program::{PROGRAM_SLUG, TOTAL_WORKOUTS, WorkoutSlot};
use gymlog::session::{Unit, WorkoutPlan, WorkoutSubmission};
use gymlog::settings::Theme;
use gymlog::template::{DEFAULT_SHEET, ParseOptions, parse_workbook};
use gymlog::tui::App;
use gymlog::video::YouTubeVideo;
use gymlog::Database;

const DEFAULT_WORKBOOK: &str = "./Essentials_Program_-_4x.xlsx";
const DEFAULT_ARTIFACT: &str = "artifacts/essentials-4x.template.json";

#[derive(Parser)]
#[command(name = "gymlog")]
#[command(author, version, about = "Essentials 4x/week strength program tracker")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "GYMLOG_DATABASE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the program workbook into a template
    Import {
        /// Workbook to read
        #[arg(long, default_value = DEFAULT_WORKBOOK)]
        xlsx: PathBuf,

        /// Worksheet name
        #[arg(long, default_value = DEFAULT_SHEET)]
        sheet: String,

        /// Write the JSON artifact
        #[arg(long)]
        write_json: bool,

        /// Artifact path
        #[arg(long, default_value = DEFAULT_ARTIFACT)]
        out: PathBuf,

        /// Store the template in the database
        #[arg(long)]
        push_db: bool,

        /// Replace an existing template with the same slug
        #[arg(long)]
        force: bool,
    },

    /// Add an email to the invite list
    Invite { email: String },

    /// Create a user for an invited email
    Signup { email: String },

    /// Start the program (keeps an active run if there is one)
    Start {
        user: String,

        /// Start date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Abandon the active run
    Abandon { user: String },

    /// Show run progress and the next workout
    Status { user: String },

    /// Show template workouts for a week
    Plan {
        week: u32,
        workout: Option<u32>,
    },

    /// Record a completed workout
    Complete {
        user: String,

        /// Submission JSON
        #[arg(long, conflicts_with = "quick", required_unless_present = "quick")]
        file: Option<PathBuf>,

        /// Mark the next workout done without sets
        #[arg(long)]
        quick: bool,
    },

    /// List completed workouts, newest first
    History {
        user: String,

        #[arg(short, long, default_value_t = HISTORY_LIMIT)]
        limit: usize,
    },

    /// Show one logged workout
    Show { user: String, id: i64 },

    /// Last performance of one or more exercises
    Last {
        user: String,
        #[arg(required = true)]
        exercises: Vec<String>,
    },

    /// Past sessions of an exercise with the best set of each
    Progress {
        user: String,
        exercise: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show or change user settings
    Settings {
        user: String,

        #[arg(long)]
        theme: Option<Theme>,

        #[arg(long)]
        unit: Option<Unit>,

        #[arg(long)]
        auto_rest: Option<bool>,

        #[arg(long)]
        focus_mode: Option<bool>,
    },

    /// Print the embeddable player URL for a YouTube link
    Video { url: String },

    /// Run the next workout in the terminal
    Run { user: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // .env must be loaded before clap reads env defaults
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cli = Cli::parse();
    match run(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &Config) -> Result<ExitCode> {
    let db_path = cli.db;

    match cli.command {
        Commands::Import { xlsx, sheet, write_json, out, push_db, force } => {
            if !write_json && !push_db {
                eprintln!("Nothing to do: pass --write-json and/or --push-db");
                return Ok(ExitCode::from(2));
            }
            let mut db = if push_db { Some(open_db(db_path.as_deref(), config)?) } else { None };

            let opts = ParseOptions { sheet_name: sheet, ..Default::default() };
            let template = parse_workbook(&xlsx, &opts)
                .with_context(|| format!("parsing {}", xlsx.display()))?;
            template.validate_structure()?;
            print!("{}", template.summary());

            if write_json {
                template.write_json(&out).with_context(|| format!("writing {}", out.display()))?;
                println!("Wrote {}", out.display());
            }
            if let Some(db) = db.as_mut() {
                let id = db.persist_template(&template, force)?;
                println!("Stored template {} (id: {})", template.program.slug, id);
            }
        }

        Commands::Invite { email } => {
            let db = open_db(db_path.as_deref(), config)?;
            db.invite(&email)?;
            println!("Invited {}", email.trim().to_lowercase());
        }

        Commands::Signup { email } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.signup(&email)?;
            println!("Created user {} (id: {})", user.email, user.id);
        }

        Commands::Start { user, date } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, name) = db.program_by_slug(PROGRAM_SLUG)?;
            let started_at = date.map_or_else(Utc::now, |d| d.and_time(NaiveTime::MIN).and_utc());
            match db.start_program(user.id, program_id, started_at)? {
                StartedRun::Created(run) => println!("Started {} (run {})", name, run.id),
                StartedRun::AlreadyActive(run) => println!(
                    "{} already active since {} (run {})",
                    name,
                    run.started_at.format("%Y-%m-%d"),
                    run.id
                ),
            }
        }

        Commands::Abandon { user } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
            let status = db.run_status(user.id, program_id)?;
            db.abandon_run(user.id, status.run.id)?;
            println!("Abandoned run {} after {} workouts", status.run.id, status.completed);
        }

        Commands::Status { user } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, name) = db.program_by_slug(PROGRAM_SLUG)?;
            let status = db.run_status(user.id, program_id)?;
            println!("{} - run {} since {}", name, status.run.id, status.run.started_at.format("%Y-%m-%d"));
            println!("Completed: {}/{}", status.completed, TOTAL_WORKOUTS);
            match status.next {
                Some(slot) => {
                    let plan = db.workout_plan(program_id, slot)?;
                    println!("Next: #{} Week {} Workout {} ({})", slot.workout_number(), slot.week, slot.workout_index, plan.label);
                }
                None => println!("Program complete"),
            }
        }

        Commands::Plan { week, workout } => {
            let db = open_db(db_path.as_deref(), config)?;
            let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
            let plans = match workout {
                Some(index) => {
                    let slot = WorkoutSlot::new(week, index)
                        .with_context(|| format!("no workout {index} in week {week}"))?;
                    vec![db.workout_plan(program_id, slot)?]
                }
                None => db.week_plan(program_id, week)?,
            };
            for plan in &plans {
                print_plan(plan);
            }
        }

        Commands::Complete { user, file, .. } => {
            let mut db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
            let status = db.run_status(user.id, program_id)?;

            let submission = match file {
                Some(path) => read_submission(&path)?,
                None => {
                    let slot = status.next.context("all workouts of this run are already logged")?;
                    WorkoutSubmission {
                        workout_number: slot.workout_number(),
                        unit: db.settings(user.id)?.default_unit,
                        ..Default::default()
                    }
                }
            };
            report_completion(db.complete_workout(user.id, status.run.id, &submission, Utc::now())?, &submission);
        }

        Commands::History { user, limit } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let entries = db.history(user.id, limit)?;
            println!("Workout history:");
            println!("{:-<60}", "");
            for e in &entries {
                println!(
                    "{} | #{:>2} | Week {:>2} Workout {} ({}) | {} | id {}",
                    e.instance.performed_at.format("%Y-%m-%d %H:%M"),
                    e.instance.workout_number,
                    e.instance.slot.week,
                    e.instance.slot.workout_index,
                    e.label,
                    format_duration(e.instance.duration_seconds),
                    e.instance.id
                );
            }
        }

        Commands::Show { user, id } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let detail = db.workout_detail(user.id, id)?;
            let i = &detail.instance;
            println!(
                "#{} Week {} Workout {} - {} ({})",
                i.workout_number,
                i.slot.week,
                i.slot.workout_index,
                i.performed_at.format("%Y-%m-%d %H:%M"),
                format_duration(i.duration_seconds)
            );
            for ex in &detail.exercises {
                println!("{}. {} [{}]", ex.order_index, ex.performed_name.as_deref().unwrap_or("-"), ex.choice);
                for set in &ex.sets {
                    println!("   {}", format_set(set));
                }
            }
        }

        Commands::Last { user, exercises } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
            for (name, session) in db.last_performance(user.id, program_id, &exercises)? {
                match session.as_ref().and_then(|s| s.last_set().map(|set| (s, set))) {
                    Some((s, set)) => {
                        println!("{}: {} on {}", name, format_set(set), s.performed_at.format("%Y-%m-%d"))
                    }
                    None => println!("{name}: no sets logged"),
                }
            }
        }

        Commands::Progress { user, exercise, limit, offset } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
            let sessions = db.exercise_history(user.id, program_id, exercise.trim(), limit, offset)?;
            println!("{} - {} session(s)", exercise.trim(), sessions.len());
            println!("{:-<40}", "");
            for s in &sessions {
                let best = s.best_set().map(format_set).unwrap_or_else(|| "-".to_string());
                println!("{} | {} set(s) | best {}", s.performed_at.format("%Y-%m-%d"), s.sets.len(), best);
            }
        }

        Commands::Settings { user, theme, unit, auto_rest, focus_mode } => {
            let db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            let mut settings = db.settings(user.id)?;
            let changed = theme.is_some() || unit.is_some() || auto_rest.is_some() || focus_mode.is_some();
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            if let Some(unit) = unit {
                settings.default_unit = unit;
            }
            if let Some(auto_rest) = auto_rest {
                settings.auto_rest_on_set_done = auto_rest;
            }
            if let Some(focus_mode) = focus_mode {
                settings.focus_mode = focus_mode;
            }
            if changed {
                db.save_settings(user.id, &settings)?;
            }
            println!("theme: {}", settings.theme);
            println!("unit: {}", settings.default_unit);
            println!("auto rest: {}", settings.auto_rest_on_set_done);
            println!("focus mode: {}", settings.focus_mode);
        }

        Commands::Video { url } => match YouTubeVideo::parse(&url) {
            Some(video) => println!("{}", video.embed_url()),
            None => bail!("not a YouTube link: {url}"),
        },

        Commands::Run { user } => {
            let mut db = open_db(db_path.as_deref(), config)?;
            let user = db.require_user(&user)?;
            run_workout(&mut db, &user)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `--db` wins over the configured path; having neither is an error
fn open_db(path: Option<&Path>, config: &Config) -> Result<Database> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(config.require(DATABASE_ENV).context("pass --db or set it")?),
    };
    Database::open(&path).with_context(|| format!("opening database {}", path.display()))
}

fn read_submission(path: &Path) -> Result<WorkoutSubmission> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing submission {}", path.display()))
}

fn run_workout(db: &mut Database, user: &User) -> Result<()> {
    let (program_id, _) = db.program_by_slug(PROGRAM_SLUG)?;
    let status = db.run_status(user.id, program_id)?;
    let slot = status.next.context("all workouts of this run are already logged")?;
    let plan = db.workout_plan(program_id, slot)?;
    let settings = db.settings(user.id)?;

    info!(user = %user.email, workout_number = slot.workout_number(), "starting workout runner");
    match App::new(plan, &settings).run()? {
        Some(submission) => {
            let outcome = db.complete_workout(user.id, status.run.id, &submission, Utc::now())?;
            report_completion(outcome, &submission);
        }
        None => println!("Workout not saved"),
    }
    Ok(())
}

fn report_completion(outcome: CompletedWorkout, submission: &WorkoutSubmission) {
    match outcome {
        CompletedWorkout::Logged(id) => {
            println!("Logged workout #{} (id: {})", submission.workout_number, id)
        }
        CompletedWorkout::AlreadyLogged(id) => {
            println!("Workout #{} was already logged (id: {})", submission.workout_number, id)
        }
    }
}

fn print_plan(plan: &WorkoutPlan) {
    println!("Week {} Workout {} - {}", plan.slot.week, plan.slot.workout_index, plan.label);
    println!("{:-<60}", "");
    for ex in &plan.exercises {
        println!(
            "{:>2}. {:30} {} x {} | RPE {} | rest {}",
            ex.order_index,
            ex.name,
            ex.working_sets_target.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
            ex.reps_target.as_deref().unwrap_or("-"),
            ex.rpe_target.as_deref().unwrap_or("-"),
            ex.rest_target.as_deref().unwrap_or("-"),
        );
        let subs: Vec<&str> = [ex.sub1_name.as_deref(), ex.sub2_name.as_deref()].into_iter().flatten().collect();
        if !subs.is_empty() {
            println!("    subs: {}", subs.join(", "));
        }
    }
    println!();
}

fn format_set(set: &LoggedSet) -> String {
    let weight = match (set.weight, set.unit.as_deref()) {
        (Some(w), Some(unit)) => format!("{w} {unit}"),
        (Some(w), None) => w.to_string(),
        (None, _) => "-".to_string(),
    };
    let reps = set.reps.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
    let rpe = set.rpe.map(|r| format!(" @ RPE {r}")).unwrap_or_default();
    format!("set {}: {} x {}{}", set.set_number, weight, reps, rpe)
}

fn format_duration(seconds: Option<i64>) -> String {
    match seconds {
        Some(s) => format!("{}m{:02}s", s / 60, s % 60),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_db_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_file = dir.path().join("configured.db");
        let secrets = dir.path().join("gymlog.secrets");
        fs::write(&secrets, format!("{DATABASE_ENV}={}\n", db_file.display())).unwrap();
        let config = Config::from_file(&secrets).unwrap();

        open_db(None, &config).unwrap();
        assert!(db_file.exists());

        let explicit = dir.path().join("explicit.db");
        open_db(Some(&explicit), &config).unwrap();
        assert!(explicit.exists());
    }

    #[test]
    fn test_open_db_without_path_fails() {
        if std::env::var(DATABASE_ENV).is_ok_and(|v| !v.is_empty()) {
            return;
        }
        let err = open_db(None, &Config::default()).err().unwrap();
        assert!(format!("{err:#}").contains(&format!("Missing required env var: {DATABASE_ENV}")));
    }
}
