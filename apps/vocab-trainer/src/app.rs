//! Application state and logic.

use crate::config::Config;
use crate::db::Database;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::seq::SliceRandom;
use srs_engine::store::UserStore;
use srs_engine::{
    parse_range, Drill, DrillSummary, Practice, Reminder, Scheduler, SessionSummary, UserId,
    UserProfile, Verdict,
};
use std::collections::BTreeMap;

/// Praise shown after a correct answer.
const SUCCESS: &[&str] = &["Correct!", "Well done!", "Perfect!", "Nice one!", "Exactly right!"];

const DEFAULT_USER: UserId = 1;

pub struct App {
    pub db: Database,
    pub config: Config,
    pub view: View,
    pub user_id: UserId,
    pub practice: Option<Practice>,
    pub drill: Option<Drill>,
    pub summary: Option<SessionSummary>,
    pub drill_summary: Option<DrillSummary>,
    pub input_buffer: String,
    pub feedback: Option<Feedback>,
    pub message: Option<String>,
    pub show_help: bool,
    // drill setup
    pub tags: Vec<String>,
    pub selected_tag: usize,
    pub drill_step: DrillStep,
    // home/stats panel data
    pub streak: u32,
    pub due_today: usize,
    pub total_vocab: usize,
    pub level_counts: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Practice,
    DrillSetup,
    Drill,
    Summary,
    DrillReport,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillStep {
    PickTag,
    PickRange,
}

/// Result of the learner's last answer, shown until the next submit.
#[derive(Debug, Clone)]
pub enum Feedback {
    Correct { praise: String, sentence: String },
    Incorrect { expected: String, sentence: String },
}

impl App {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        if Config::config_path().is_some_and(|p| !p.exists()) {
            // write the defaults so the learner has a file to edit
            config.save()?;
        }
        let db_path = Config::db_path().unwrap_or_else(|| "vocab.db".into());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;

        if let Some(path) = &config.data.vocab_file {
            db.import_vocab_file(path)?;
        }

        let reminders: Vec<Reminder> = config
            .study
            .reminders
            .iter()
            .filter_map(|r| Reminder::parse(r))
            .collect();
        db.ensure_user(&UserProfile {
            user_id: DEFAULT_USER,
            name: config.study.name.clone(),
            n_words: config.study.n_words,
            max_vocabs: config.study.max_vocabs,
            streak: 0,
            reminders,
            sign_up: Utc::now(),
        })?;
        // config stays the source of truth for the daily quotas
        db.update_quotas(DEFAULT_USER, config.study.n_words, config.study.max_vocabs)?;

        let mut app = Self {
            db,
            config,
            view: View::Home,
            user_id: DEFAULT_USER,
            practice: None,
            drill: None,
            summary: None,
            drill_summary: None,
            input_buffer: String::new(),
            feedback: None,
            message: None,
            show_help: false,
            tags: Vec::new(),
            selected_tag: 0,
            drill_step: DrillStep::PickTag,
            streak: 0,
            due_today: 0,
            total_vocab: 0,
            level_counts: BTreeMap::new(),
        };
        app.refresh_home();
        Ok(app)
    }

    /// `q` only quits from the home screen; elsewhere it navigates back
    /// or is part of a typed answer.
    pub fn can_quit(&self) -> bool {
        self.view == View::Home
    }

    fn refresh_home(&mut self) {
        self.streak = UserStore::get(&self.db, self.user_id)
            .ok()
            .flatten()
            .map_or(0, |p| p.streak);
        self.due_today = self.db.due_count(self.user_id, Utc::now()).unwrap_or(0);
        self.total_vocab = self.db.vocab_count().unwrap_or(0);
        self.level_counts = self.db.level_counts(self.user_id).unwrap_or_default();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        match self.view {
            View::Home => self.handle_home_key(key),
            View::Practice | View::Drill => self.handle_answer_key(key),
            View::DrillSetup => self.handle_drill_setup_key(key),
            View::Summary | View::DrillReport | View::Stats => self.handle_report_key(key),
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('p') | KeyCode::Enter => self.start_practice(),
            KeyCode::Char('d') => self.open_drill_setup(),
            KeyCode::Char('s') => self.view = View::Stats,
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_answer_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('t') {
                self.mark_typo();
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.leave_session(),
            KeyCode::Enter => self.submit_answer(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_drill_setup_key(&mut self, key: KeyEvent) {
        match self.drill_step {
            DrillStep::PickTag => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    if !self.tags.is_empty() {
                        self.selected_tag = (self.selected_tag + 1).min(self.tags.len() - 1);
                    }
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.selected_tag = self.selected_tag.saturating_sub(1);
                }
                KeyCode::Enter => {
                    if !self.tags.is_empty() {
                        self.drill_step = DrillStep::PickRange;
                        self.input_buffer.clear();
                    }
                }
                KeyCode::Esc => self.view = View::Home,
                _ => {}
            },
            DrillStep::PickRange => match key.code {
                KeyCode::Esc => self.drill_step = DrillStep::PickTag,
                KeyCode::Enter => self.start_drill(),
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                KeyCode::Char(c) => self.input_buffer.push(c),
                _ => {}
            },
        }
    }

    fn handle_report_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.view = View::Home;
                self.summary = None;
                self.drill_summary = None;
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn start_practice(&mut self) {
        if self.total_vocab == 0 {
            self.message =
                Some("No vocabulary loaded. Set data.vocab_file in the config.".to_string());
            return;
        }

        let scheduler = Scheduler::new(&self.db, &self.db, &self.db, &self.db);
        match scheduler.start_practice(self.user_id, Utc::now(), &mut rand::thread_rng()) {
            Ok(practice) => {
                self.feedback = None;
                self.input_buffer.clear();
                if practice.resumed() {
                    self.message = Some("Resuming today's session.".to_string());
                }
                self.practice = Some(practice);
                self.view = View::Practice;
                if self.practice.as_ref().is_some_and(|p| p.is_done()) {
                    // nothing due and nothing new: finalize right away
                    self.finalize_practice();
                }
            }
            Err(e) => self.message = Some(format!("Could not start practice: {e}")),
        }
    }

    fn open_drill_setup(&mut self) {
        match self.db.tags() {
            Ok(tags) if !tags.is_empty() => {
                self.tags = tags;
                self.selected_tag = 0;
                self.drill_step = DrillStep::PickTag;
                self.input_buffer.clear();
                self.view = View::DrillSetup;
            }
            Ok(_) => self.message = Some("No vocabulary loaded.".to_string()),
            Err(e) => self.message = Some(format!("Could not load word groups: {e}")),
        }
    }

    fn start_drill(&mut self) {
        let Some(tag) = self.tags.get(self.selected_tag).cloned() else {
            return;
        };
        let Some((start, end)) = parse_range(&self.input_buffer) else {
            self.message = Some("Range must look like 0-20 with start < end.".to_string());
            return;
        };

        match Drill::over_range(&self.db, &tag, start, end) {
            Ok(drill) => {
                self.drill = Some(drill);
                self.feedback = None;
                self.input_buffer.clear();
                self.view = View::Drill;
            }
            Err(e) => self.message = Some(format!("{e}")),
        }
    }

    fn submit_answer(&mut self) {
        let reply = std::mem::take(&mut self.input_buffer);

        let verdict = match self.view {
            View::Practice => self.practice.as_mut().and_then(|p| p.answer(&reply)),
            View::Drill => self.drill.as_mut().and_then(|d| d.answer(&reply)),
            _ => None,
        };

        self.feedback = verdict.map(|v| match v {
            Verdict::Correct { entry } => Feedback::Correct {
                praise: SUCCESS
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or("Correct!")
                    .to_string(),
                sentence: entry.target_sentence,
            },
            Verdict::Incorrect { entry } => Feedback::Incorrect {
                expected: entry.target,
                sentence: entry.target_sentence,
            },
        });

        self.finish_if_done();
    }

    /// Typo recovery: retroactively accept the last miss.
    fn mark_typo(&mut self) {
        if !matches!(self.feedback, Some(Feedback::Incorrect { .. })) {
            return;
        }

        let fixed = match self.view {
            View::Practice => self.practice.as_mut().and_then(|p| p.mark_last_correct()),
            View::Drill => self.drill.as_mut().and_then(|d| d.mark_last_correct()),
            _ => None,
        };

        if let Some(entry) = fixed {
            self.message = Some(format!(
                "Typo? Not a problem. Marked \"{}\" as correct.",
                entry.source
            ));
            self.feedback = None;
            self.finish_if_done();
        }
    }

    fn finish_if_done(&mut self) {
        match self.view {
            View::Practice => {
                if self.practice.as_ref().is_some_and(|p| p.is_done()) {
                    self.finalize_practice();
                }
            }
            View::Drill => {
                if self.drill.as_ref().is_some_and(|d| d.is_done()) {
                    self.drill_summary = self.drill.as_ref().map(|d| d.summary());
                    self.drill = None;
                    self.feedback = None;
                    self.view = View::DrillReport;
                }
            }
            _ => {}
        }
    }

    fn finalize_practice(&mut self) {
        let result = {
            let scheduler = Scheduler::new(&self.db, &self.db, &self.db, &self.db);
            self.practice
                .as_mut()
                .map(|p| scheduler.finish_practice(p, Utc::now()))
        };

        match result {
            Some(Ok(summary)) => {
                self.summary = Some(summary);
                self.view = View::Summary;
            }
            Some(Err(e)) => {
                self.message = Some(format!("Could not finish session: {e}"));
                self.view = View::Home;
            }
            None => self.view = View::Home,
        }
        self.practice = None;
        self.feedback = None;
        self.refresh_home();
    }

    /// Leave without finalizing. The session row is already persisted,
    /// so practice can resume later today from the same word list.
    fn leave_session(&mut self) {
        if self.view == View::Practice {
            self.message = Some("Session paused. Start practice again to resume.".to_string());
        }
        self.practice = None;
        self.drill = None;
        self.feedback = None;
        self.input_buffer.clear();
        self.view = View::Home;
        self.refresh_home();
    }
}
