//! TUI module - workout runner with ratatui

mod runner;

pub use runner::{RestTimer, RunnerState, parse_set_input};

use anyhow::Result;
use chrono::Utc;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use crate::session::{PlannedExercise, SubstitutionChoice, WorkoutPlan, WorkoutSubmission};
use crate::settings::UserSettings;
use crate::video::YouTubeVideo;

type Tui = Terminal<CrosstermBackend<Stdout>>;

enum Mode {
    Normal,
    /// Typing a set as `weight reps [rpe]`
    Input(String),
}

/// App state for TUI
pub struct App {
    state: RunnerState,
    mode: Mode,
    message: Option<String>,
    should_quit: bool,
    finished: bool,
}

impl App {
    pub fn new(plan: WorkoutPlan, settings: &UserSettings) -> Self {
        Self {
            state: RunnerState::new(plan, settings, Utc::now()),
            mode: Mode::Normal,
            message: None,
            should_quit: false,
            finished: false,
        }
    }

    /// Run the workout; returns the submission when the user finishes it,
    /// `None` when they quit without saving
    pub fn run(mut self) -> Result<Option<WorkoutSubmission>> {
        let mut terminal = init_terminal()?;
        let outcome = self.event_loop(&mut terminal);
        restore_terminal()?;
        outcome?;

        Ok(self.finished.then(|| self.state.submission()))
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            let now = Instant::now();
            self.state.tick(now);
            terminal.draw(|frame| self.render(frame, now))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame, now: Instant) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        let plan = &self.state.plan;
        let header = Paragraph::new(format!(
            "{} | Week {} Workout {}: {} | {}",
            plan.program_name,
            plan.slot.week,
            plan.slot.workout_index,
            plan.label,
            self.state.unit,
        ))
        .style(Style::default().fg(Color::Cyan).bold())
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let rest = match self.state.rest_banner(now) {
            Some((label, clock)) => Paragraph::new(format!("Rest: {label}  {clock}"))
                .style(Style::default().fg(Color::Yellow).bold()),
            None => Paragraph::new("Rest timer idle").style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(rest.block(Block::default().borders(Borders::ALL)), chunks[1]);

        let mut lines = Vec::new();
        for (i, ex) in self.state.exercises().iter().enumerate() {
            let selected = i == self.state.selected;
            if self.state.focus_mode && !selected {
                continue;
            }
            self.exercise_lines(ex, selected, &mut lines);
        }
        let list = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Exercises"));
        frame.render_widget(list, chunks[2]);

        let footer_text = match &self.mode {
            Mode::Input(buf) => format!("set> {buf}_   (weight reps [rpe], Enter: save, Esc: cancel)"),
            Mode::Normal => match &self.message {
                Some(msg) => msg.clone(),
                None => "j/k: move | enter: expand | l: log set | d: undo | s: swap | u: unit | t: rest | x: dismiss | c: finish | q: quit"
                    .to_string(),
            },
        };
        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn exercise_lines(&self, ex: &PlannedExercise, selected: bool, lines: &mut Vec<Line<'static>>) {
        let choice = self.state.choice(ex.order_index);
        let marker = if selected { "▸" } else { " " };
        let mut title = format!("{marker} {}. {}", ex.order_index, ex.performed_name(choice));
        if ex.has_variant(SubstitutionChoice::Sub1) || ex.has_variant(SubstitutionChoice::Sub2) {
            title.push_str(&format!(" [{choice}]"));
        }
        let style = if selected { Style::default().bold() } else { Style::default() };
        lines.push(Line::styled(title, style));

        if !self.state.is_expanded(ex.order_index) {
            return;
        }

        let target = [
            ex.working_sets_target.map(|n| format!("{n} sets")),
            ex.reps_target.as_ref().map(|r| format!("{r} reps")),
            ex.rpe_target.as_ref().map(|r| format!("RPE {r}")),
            ex.rest_target.as_ref().map(|r| format!("rest {r}")),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" | ");
        if !target.is_empty() {
            lines.push(Line::raw(format!("    {target}")));
        }
        if let Some(notes) = &ex.notes {
            lines.push(Line::styled(format!("    {notes}"), Style::default().fg(Color::DarkGray)));
        }
        if let Some(link) = ex.performed_video(choice) {
            let url = YouTubeVideo::parse(link).map(|v| v.embed_url()).unwrap_or_else(|| link.to_string());
            lines.push(Line::styled(format!("    video: {url}"), Style::default().fg(Color::Blue)));
        }

        let sets = self.state.sets(ex.order_index);
        for row in 0..ex.working_set_rows().max(sets.len() as u32) {
            let text = match sets.get(row as usize) {
                Some(set) => format!(
                    "    set {}: {} x {}{}",
                    set.set_number,
                    set.weight.map(|w| format!("{w} {}", self.state.unit)).unwrap_or_else(|| "-".into()),
                    set.reps.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                    set.rpe.map(|r| format!(" @ {r}")).unwrap_or_default(),
                ),
                None => format!("    set {}: -", row + 1),
            };
            lines.push(Line::raw(text));
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.handle_key(key.code);
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        self.mode = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Input(mut buf) => match code {
                KeyCode::Char(c) => {
                    buf.push(c);
                    Mode::Input(buf)
                }
                KeyCode::Backspace => {
                    buf.pop();
                    Mode::Input(buf)
                }
                KeyCode::Enter => {
                    self.message = self.state.log_set(&buf, Instant::now()).err();
                    Mode::Normal
                }
                KeyCode::Esc => Mode::Normal,
                _ => Mode::Input(buf),
            },
            Mode::Normal => {
                self.message = None;
                let mut next = Mode::Normal;
                match code {
                    KeyCode::Char('q') => self.should_quit = true,
                    KeyCode::Char('c') => {
                        self.finished = true;
                        self.should_quit = true;
                    }
                    KeyCode::Down | KeyCode::Char('j') => self.state.select_next(),
                    KeyCode::Up | KeyCode::Char('k') => self.state.select_prev(),
                    KeyCode::Enter | KeyCode::Char(' ') => self.state.toggle_expanded(),
                    KeyCode::Char('l') => next = Mode::Input(String::new()),
                    KeyCode::Char('d') => self.state.undo_set(),
                    KeyCode::Char('s') => self.state.cycle_choice(),
                    KeyCode::Char('u') => self.state.toggle_unit(),
                    KeyCode::Char('t') => self.state.start_rest(Instant::now()),
                    KeyCode::Char('x') => self.state.dismiss_rest(),
                    _ => {}
                }
                next
            }
        };
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::WorkoutSlot;
    use crate::template::WorkoutLabel;

    fn app() -> App {
        let plan = WorkoutPlan {
            program_template_id: 1,
            program_name: "Essentials".into(),
            slot: WorkoutSlot { week: 1, workout_index: 1 },
            label: WorkoutLabel::Upper,
            exercises: vec![PlannedExercise { id: 1, order_index: 1, name: "Squat".into(), ..Default::default() }],
        };
        App::new(plan, &UserSettings::default())
    }

    fn type_keys(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typed_set_is_logged() {
        let mut app = app();
        app.handle_key(KeyCode::Char('l'));
        type_keys(&mut app, "80 55");
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Enter);

        assert!(app.message.is_none());
        let sets = app.state.sets(1);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].weight, Some(80.0));
        assert_eq!(sets[0].reps, Some(5));
    }

    #[test]
    fn test_bad_input_sets_message() {
        let mut app = app();
        app.handle_key(KeyCode::Char('l'));
        type_keys(&mut app, "abc");
        app.handle_key(KeyCode::Enter);
        assert!(app.message.is_some());
        assert!(app.state.sets(1).is_empty());
    }

    #[test]
    fn test_escape_cancels_input() {
        let mut app = app();
        app.handle_key(KeyCode::Char('l'));
        type_keys(&mut app, "100 5");
        app.handle_key(KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.state.sets(1).is_empty());
        // 'q' in input mode is text, in normal mode it quits
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
        assert!(!app.finished);
    }

    #[test]
    fn test_finish_marks_workout_done() {
        let mut app = app();
        app.handle_key(KeyCode::Char('c'));
        assert!(app.should_quit);
        assert!(app.finished);
    }
}
