use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::celebration::Confetti;
use crate::config::Config;
use crate::feedback::{FeedbackEvent, FeedbackListener};
use crate::session::{Phase, Session, Standing};
use crate::vocabulary::OPTION_COUNT;

/// What a text prompt is collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    HostName,
    RoomCode,
    GuestName,
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Prompt::HostName => "Your name",
            Prompt::RoomCode => "Room code or link",
            Prompt::GuestName => "Your name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub prompt: Prompt,
    pub value: String,
}

impl TextInput {
    fn new(prompt: Prompt, value: impl Into<String>) -> Self {
        Self {
            prompt,
            value: value.into(),
        }
    }
}

/// Rings the terminal bell on feedback events unless muted.
pub struct TerminalBell {
    muted: Rc<Cell<bool>>,
}

impl TerminalBell {
    pub fn new(muted: Rc<Cell<bool>>) -> Self {
        Self { muted }
    }
}

impl FeedbackListener for TerminalBell {
    fn on_feedback(&mut self, event: FeedbackEvent) {
        if self.muted.get() {
            return;
        }
        use std::io::Write;
        let mut out = std::io::stdout();
        let rings = match event {
            FeedbackEvent::Correct { .. } => "\x07",
            FeedbackEvent::Incorrect { .. } | FeedbackEvent::TimeUp { .. } => "\x07\x07",
        };
        if let Err(e) = out.write_all(rings.as_bytes()).and_then(|_| out.flush()) {
            log::debug!("bell failed: {e}");
        }
    }
}

/// Terminal front-end state wrapped around a [`Session`]
#[derive(Debug)]
pub struct App {
    pub session: Session,
    pub input: Option<TextInput>,
    pub date_cursor: usize,
    pub confetti: Confetti,
    pub status: Option<String>,
    pub should_quit: bool,
    muted: Rc<Cell<bool>>,
    last_phase: Phase,
    area: (u16, u16),
}

impl App {
    pub fn new(session: Session, muted: bool) -> Self {
        let last_phase = session.phase();
        let mut app = Self {
            session,
            input: None,
            date_cursor: 0,
            confetti: Confetti::default(),
            status: None,
            should_quit: false,
            muted: Rc::new(Cell::new(muted)),
            last_phase,
            area: (80, 24),
        };
        app.sync_prompt();
        app
    }

    /// Shared mute flag, for listeners that need to honour it.
    pub fn mute_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.muted)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    /// Fold what should outlive the process back into `cfg`.
    pub fn save_into(&self, cfg: &mut Config) {
        cfg.player_name = self.session.player_name().to_string();
        cfg.selected_dates = self.session.selected_dates().to_vec();
        cfg.muted = self.is_muted();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.area = (width, height);
    }

    /// Let time pass for the session and the animation.
    pub fn advance(&mut self, elapsed: Duration) {
        self.session.advance(elapsed);
        self.confetti.update(elapsed);
        self.after_change();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.input.is_some() {
            self.on_prompt_key(key);
        } else {
            self.on_command_key(key);
        }
        self.after_change();
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => input.value.push(c),
            KeyCode::Backspace => {
                input.value.pop();
            }
            KeyCode::Esc => {
                self.input = None;
                if self.session.phase() == Phase::Setup {
                    self.session.restart();
                }
            }
            KeyCode::Enter => {
                if let Some(input) = self.input.take() {
                    self.submit_prompt(input);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, input: TextInput) {
        let result = match input.prompt {
            Prompt::HostName => self.session.create_room(&input.value),
            Prompt::RoomCode => self.session.open_link(&input.value),
            Prompt::GuestName => match self.session.pending_room_code().map(str::to_string) {
                Some(code) => self.session.join_room(&input.value, &code),
                None => Ok(()),
            },
        };
        match result {
            Ok(()) => self.status = None,
            Err(reason) => {
                self.status = Some(reason.to_string());
                // ask again
                self.input = Some(input);
            }
        }
    }

    fn on_command_key(&mut self, key: KeyEvent) {
        let phase = self.session.phase();
        let result = match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char('m') => {
                self.muted.set(!self.muted.get());
                Ok(())
            }
            KeyCode::Char('r') => {
                self.confetti.stop();
                self.session.restart();
                Ok(())
            }
            KeyCode::Up if is_selecting(phase) => {
                self.date_cursor = self.date_cursor.saturating_sub(1);
                Ok(())
            }
            KeyCode::Down if is_selecting(phase) => {
                let last = self.session.store().date_sets().len().saturating_sub(1);
                self.date_cursor = (self.date_cursor + 1).min(last);
                Ok(())
            }
            KeyCode::Char(' ') if is_selecting(phase) => match self.cursor_label() {
                Some(label) => self.session.toggle_date(&label),
                None => Ok(()),
            },
            KeyCode::Char('s') if phase == Phase::Menu => self.session.start_single(),
            KeyCode::Char('h') if phase == Phase::Menu => {
                self.input = Some(TextInput::new(Prompt::HostName, self.session.player_name()));
                Ok(())
            }
            KeyCode::Char('j') if phase == Phase::Menu => {
                self.input = Some(TextInput::new(Prompt::RoomCode, ""));
                Ok(())
            }
            KeyCode::Enter if phase == Phase::Waiting => self.session.start_match(),
            KeyCode::Char(c @ '1'..='9') if phase == Phase::Playing => {
                let option_index = (c as usize) - ('1' as usize);
                if option_index < OPTION_COUNT {
                    self.session.answer_local(option_index).map(|_| ())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        };

        self.status = result.err().map(|reason| reason.to_string());
    }

    fn cursor_label(&self) -> Option<String> {
        self.session
            .store()
            .date_sets()
            .get(self.date_cursor)
            .map(|set| set.label.clone())
    }

    fn after_change(&mut self) {
        let phase = self.session.phase();
        if phase != self.last_phase {
            if phase == Phase::Result
                && self.session.standing() == Some(Standing::Winner(self.session.local_player_id()))
            {
                self.confetti.start(self.area.0, self.area.1);
            }
            self.last_phase = phase;
            self.sync_prompt();
        }
    }

    /// A guest arriving from a link is asked for a name straight away.
    fn sync_prompt(&mut self) {
        if self.session.phase() == Phase::Setup && self.input.is_none() {
            self.input = Some(TextInput::new(Prompt::GuestName, self.session.player_name()));
        }
    }
}

fn is_selecting(phase: Phase) -> bool {
    matches!(phase, Phase::Menu | Phase::Setup | Phase::Waiting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GameMode, SessionSettings, HOST_ID};
    use crate::vocabulary::VocabularyStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        let store = VocabularyStore::builtin().unwrap();
        App::new(Session::with_seed(store, SessionSettings::default(), 7), true)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn space_toggles_the_date_under_the_cursor() {
        let mut app = app();
        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Char(' ')));
        assert_eq!(app.session.selected_dates().len(), 2);

        app.on_key(key(KeyCode::Up));
        app.on_key(key(KeyCode::Char(' ')));
        assert_eq!(app.session.selected_dates().len(), 1);
    }

    #[test]
    fn hosting_collects_a_name() {
        let mut app = app();
        app.on_key(key(KeyCode::Char('h')));
        assert_eq!(app.input.as_ref().map(|i| i.prompt), Some(Prompt::HostName));

        for _ in 0.."Player".len() {
            app.on_key(key(KeyCode::Backspace));
        }
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.status.as_deref(), Some("please enter your name"));
        assert!(app.input.is_some());

        type_text(&mut app, "Mei");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.phase(), Phase::Waiting);
        assert_eq!(app.session.mode(), GameMode::Multi);
        assert!(app.input.is_none());
    }

    #[test]
    fn joining_asks_for_code_then_name() {
        let mut app = app();
        app.on_key(key(KeyCode::Char('j')));
        type_text(&mut app, "k7pq2m");
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.session.phase(), Phase::Setup);
        assert_eq!(app.input.as_ref().map(|i| i.prompt), Some(Prompt::GuestName));

        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.phase(), Phase::Waiting);
        assert_eq!(app.session.room_code(), Some("K7PQ2M"));
    }

    #[test]
    fn escape_from_setup_returns_to_menu() {
        let mut app = app();
        app.session.open_link("ABCDEF").unwrap();
        app.on_key(key(KeyCode::Null));
        assert!(app.input.is_some());

        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.session.phase(), Phase::Menu);
        assert!(!app.should_quit);

        app.on_key(key(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn number_keys_answer() {
        let mut app = app();
        app.on_key(key(KeyCode::Char('s')));
        app.advance(Duration::from_secs(3));
        assert_eq!(app.session.phase(), Phase::Playing);

        app.on_key(key(KeyCode::Char('1')));
        assert!(app.session.has_answered(HOST_ID, 0));

        app.on_key(key(KeyCode::Char('2')));
        assert_eq!(app.status.as_deref(), Some("question 0 already answered"));
        assert_eq!(app.session.answers_of(HOST_ID).map(|a| a.len()), Some(1));
    }

    #[test]
    fn mute_toggles_and_is_saved() {
        let mut app = app();
        assert!(app.is_muted());
        app.on_key(key(KeyCode::Char('m')));
        assert!(!app.is_muted());

        let mut cfg = Config::default();
        app.save_into(&mut cfg);
        assert!(!cfg.muted);
        assert_eq!(cfg.selected_dates, vec!["Apr. 1".to_string()]);
    }
}
