use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::feedback::{FeedbackBus, FeedbackEvent, FeedbackListener};
use crate::opponent::{ComputerOpponent, MockPeer, PeerContext, PeerEvent, PeerTransport, COMPUTER_NAME};
use crate::room::{self, Room, RoomError, RoomRegistry};
use crate::scheduler::{Scheduler, TaskId};
use crate::timer::{Countdown, ScoreBands, Tick};
use crate::vocabulary::{
    build_question, Question, QuestionSelector, ShuffledSelector, VocabularyEntry, VocabularyStore,
};
use crate::wire::WireMessage;

pub use crate::room::{Player, PlayerId, GUEST_ID, HOST_ID};

/// Recorded as the chosen option when the clock ran out.
pub const NO_ANSWER: &str = "(no answer)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Menu,
    Setup,
    Waiting,
    Countdown,
    Playing,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerAnswer {
    pub player_id: PlayerId,
    pub player_name: String,
    pub is_correct: bool,
    pub elapsed_secs: u32,
    pub chosen_option: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Standing {
    Winner(PlayerId),
    Tie,
}

/// Why a session operation did nothing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("not allowed during {0}")]
    WrongPhase(Phase),
    #[error("no player {0} in this session")]
    UnknownPlayer(PlayerId),
    #[error("option {0} does not exist")]
    InvalidOption(usize),
    #[error("question {0} already answered")]
    AlreadyAnswered(usize),
    #[error("question {0} is closed")]
    RoundClosed(usize),
    #[error("no question is being asked")]
    NoQuestion,
    #[error("question {got} is not the current question {current}")]
    StaleRound { got: usize, current: usize },
    #[error("waiting for a second player")]
    WaitingForPeer,
    #[error("only the host can do that")]
    NotHost,
    #[error("only a guest can do that")]
    NotGuest,
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// A successfully recorded answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub answer: PlayerAnswer,
    pub points: u32,
    pub round_resolved: bool,
}

/// Typed input to the session. Timers, opponents and front-ends all talk to
/// the session through these.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ToggleDate(String),
    SelectDates(Vec<String>),
    StartSingle,
    CreateRoom { name: String },
    OpenLink { link: String },
    JoinRoom { name: String, room_code: String },
    StartMatch,
    Answer { player_id: PlayerId, option_index: usize },
    Peer(PeerEvent),
    Elapsed(Duration),
    Restart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub question_count: usize,
    pub round_secs: u32,
    pub countdown_secs: u32,
    /// Pause after a round resolves by answers, and how long feedback stays up.
    pub feedback_delay: Duration,
    /// Pause after a single-player round runs out of time.
    pub time_up_delay: Duration,
    pub skip_delay: Duration,
    pub peer_poll_interval: Duration,
    pub peer_act_chance: f64,
    pub computer: ComputerOpponent,
    pub bands: ScoreBands,
    pub share_base_url: String,
    pub host_placeholder: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            question_count: cfg.question_count,
            round_secs: cfg.round_secs,
            countdown_secs: cfg.countdown_secs,
            feedback_delay: Duration::from_millis(cfg.feedback_delay_ms),
            time_up_delay: Duration::from_millis(cfg.time_up_delay_ms),
            skip_delay: Duration::from_millis(cfg.skip_delay_ms),
            peer_poll_interval: Duration::from_millis(cfg.peer_poll_ms),
            peer_act_chance: cfg.peer_act_chance,
            computer: ComputerOpponent::new(
                cfg.computer_accuracy,
                cfg.computer_min_reaction_secs,
                cfg.computer_max_reaction_secs,
            ),
            bands: ScoreBands::default(),
            share_base_url: cfg.share_base_url.clone(),
            host_placeholder: "Host".to_string(),
        }
    }
}

impl SessionSettings {
    const MIN_ROUND_SECS: u32 = 1;
    const FALLBACK_PEER_POLL: Duration = Duration::from_millis(1000);

    /// Replace values that would stop virtual time from moving a game
    /// along: a round without a clock, or a poll alarm due immediately
    /// after itself.
    pub fn validate(&mut self) -> Vec<Diagnostic> {
        let mut adjusted = Vec::new();
        if self.round_secs < Self::MIN_ROUND_SECS {
            self.round_secs = Self::MIN_ROUND_SECS;
            adjusted.push(Diagnostic::SettingAdjusted {
                setting: "round_secs",
                used: u64::from(Self::MIN_ROUND_SECS),
            });
        }
        if self.peer_poll_interval.is_zero() {
            self.peer_poll_interval = Self::FALLBACK_PEER_POLL;
            adjusted.push(Diagnostic::SettingAdjusted {
                setting: "peer_poll_ms",
                used: Self::FALLBACK_PEER_POLL.as_millis() as u64,
            });
        }
        adjusted
    }
}

/// Read-only view handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub mode: GameMode,
    pub selected_dates: Vec<String>,
    pub room_code: Option<String>,
    pub share_link: Option<String>,
    pub pending_room_code: Option<String>,
    pub roster: Vec<Player>,
    pub local_player_id: PlayerId,
    pub question_index: usize,
    pub question_count: usize,
    pub word: Option<String>,
    pub note: Option<String>,
    pub options: Vec<String>,
    pub time_remaining: u32,
    pub lobby_remaining: u32,
    pub scores: [u32; 2],
    pub last_answer: Option<PlayerAnswer>,
    pub answered: [bool; 2],
    pub standing: Option<Standing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alarm {
    LobbyStep,
    ClockTick { round: usize },
    ComputerReact { round: usize },
    Advance { round: usize },
    SkipInvalid { round: usize },
    ClearFeedback,
    PeerPoll,
}

/// Alarms belonging to the round in progress
#[derive(Debug, Default)]
struct RoundTasks {
    ticks: Vec<TaskId>,
    reaction: Option<TaskId>,
    resolved: bool,
}

/// Sole owner of quiz session state.
///
/// Everything that changes the session arrives as a method call or a
/// [`SessionEvent`]. Timers are alarms in the session's own [`Scheduler`],
/// which only moves forward when [`Session::advance`] is called; the peer
/// transport is polled from one of those alarms and can only hand back
/// [`PeerEvent`]s.
pub struct Session {
    settings: SessionSettings,
    store: VocabularyStore,
    definitions: Vec<String>,
    selector: Box<dyn QuestionSelector>,
    registry: RoomRegistry,
    rng: StdRng,
    scheduler: Scheduler<Alarm>,
    transport: Option<Box<dyn PeerTransport>>,
    feedback: FeedbackBus,
    diagnostics: Diagnostics,

    mode: GameMode,
    phase: Phase,
    selected_dates: Vec<String>,
    player_name: String,
    pending_room_code: Option<String>,
    room: Room,
    local_id: PlayerId,
    questions: Vec<VocabularyEntry>,
    index: usize,
    current: Option<Question>,
    clock: Countdown,
    lobby: Countdown,
    answers: [BTreeMap<usize, PlayerAnswer>; 2],
    last_answer: Option<PlayerAnswer>,
    feedback_task: Option<TaskId>,
    round: RoundTasks,
    standing: Option<Standing>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("index", &self.index)
            .field("scores", &self.scores())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: VocabularyStore, settings: SessionSettings) -> Self {
        Self::with_rng(store, settings, StdRng::from_entropy())
    }

    pub fn with_seed(store: VocabularyStore, settings: SessionSettings, seed: u64) -> Self {
        Self::with_rng(store, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: VocabularyStore, mut settings: SessionSettings, rng: StdRng) -> Self {
        let corrections = settings.validate();
        let definitions = store.all_definitions();
        let selected_dates = store.first_label().map(str::to_string).into_iter().collect();
        let registry = RoomRegistry::new(settings.host_placeholder.clone());
        let round_secs = settings.round_secs;
        let countdown_secs = settings.countdown_secs;
        let mut diagnostics = Diagnostics::default();
        diagnostics.extend(corrections);

        Self {
            settings,
            store,
            definitions,
            selector: Box::new(ShuffledSelector),
            registry,
            rng,
            scheduler: Scheduler::new(),
            transport: None,
            feedback: FeedbackBus::default(),
            diagnostics,
            mode: GameMode::Single,
            phase: Phase::Menu,
            selected_dates,
            player_name: "Player".to_string(),
            pending_room_code: None,
            room: empty_room(),
            local_id: HOST_ID,
            questions: Vec::new(),
            index: 0,
            current: None,
            clock: Countdown::new(round_secs),
            lobby: Countdown::new(countdown_secs),
            answers: Default::default(),
            last_answer: None,
            feedback_task: None,
            round: RoundTasks::default(),
            standing: None,
        }
    }

    pub fn with_selector(mut self, selector: Box<dyn QuestionSelector>) -> Self {
        self.selector = selector;
        self
    }

    // -- accessors ---------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &VocabularyStore {
        &self.store
    }

    pub fn selected_dates(&self) -> &[String] {
        &self.selected_dates
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn roster(&self) -> &[Player] {
        &self.room.roster
    }

    pub fn local_player_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn peer_id(&self) -> PlayerId {
        if self.local_id == HOST_ID {
            GUEST_ID
        } else {
            HOST_ID
        }
    }

    pub fn room_code(&self) -> Option<&str> {
        match self.mode {
            GameMode::Multi if !self.room.code.is_empty() => Some(&self.room.code),
            _ => None,
        }
    }

    pub fn share_link(&self) -> Option<String> {
        self.room_code()
            .map(|code| room::share_link(&self.settings.share_base_url, code))
    }

    pub fn pending_room_code(&self) -> Option<&str> {
        self.pending_room_code.as_deref()
    }

    pub fn questions(&self) -> &[VocabularyEntry] {
        &self.questions
    }

    pub fn question_index(&self) -> usize {
        self.index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn time_remaining(&self) -> u32 {
        self.clock.remaining()
    }

    pub fn lobby_remaining(&self) -> u32 {
        self.lobby.remaining()
    }

    pub fn scores(&self) -> [u32; 2] {
        let score = |id| self.room.player(id).map_or(0, |p| p.score);
        [score(HOST_ID), score(GUEST_ID)]
    }

    pub fn answer(&self, player_id: PlayerId, index: usize) -> Option<&PlayerAnswer> {
        slot_of(player_id).and_then(|s| self.answers[s].get(&index))
    }

    pub fn answers_of(&self, player_id: PlayerId) -> Option<&BTreeMap<usize, PlayerAnswer>> {
        slot_of(player_id).map(|s| &self.answers[s])
    }

    pub fn has_answered(&self, player_id: PlayerId, index: usize) -> bool {
        self.answer(player_id, index).is_some()
    }

    pub fn last_answer(&self) -> Option<&PlayerAnswer> {
        self.last_answer.as_ref()
    }

    pub fn standing(&self) -> Option<Standing> {
        self.standing
    }

    /// Virtual time since the session was created.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// When the computer will answer the current round, if it still will.
    pub fn computer_reaction_due(&self) -> Option<Duration> {
        self.round
            .reaction
            .and_then(|id| self.scheduler.due_at(id))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_slice()
    }

    pub fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    pub fn subscribe(&mut self, listener: Box<dyn FeedbackListener>) {
        self.feedback.subscribe(listener);
    }

    /// Replace the peer transport, closing the old one.
    pub fn attach_transport(&mut self, transport: Box<dyn PeerTransport>) {
        if let Some(mut old) = self.transport.replace(transport) {
            old.close();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            mode: self.mode,
            selected_dates: self.selected_dates.clone(),
            room_code: self.room_code().map(str::to_string),
            share_link: self.share_link(),
            pending_room_code: self.pending_room_code.clone(),
            roster: self.room.roster.clone(),
            local_player_id: self.local_id,
            question_index: self.index,
            question_count: self.questions.len(),
            word: self.current.as_ref().map(|q| q.entry.word.clone()),
            note: self.current.as_ref().and_then(|q| q.entry.note.clone()),
            options: self
                .current
                .as_ref()
                .map(|q| q.options.clone())
                .unwrap_or_default(),
            time_remaining: self.clock.remaining(),
            lobby_remaining: self.lobby.remaining(),
            scores: self.scores(),
            last_answer: self.last_answer.clone(),
            answered: [
                self.has_answered(HOST_ID, self.index),
                self.has_answered(GUEST_ID, self.index),
            ],
            standing: self.standing,
        }
    }

    // -- events ------------------------------------------------------------

    pub fn handle(&mut self, event: SessionEvent) -> Result<(), Rejection> {
        match event {
            SessionEvent::ToggleDate(label) => self.toggle_date(&label),
            SessionEvent::SelectDates(dates) => self.select_dates(dates),
            SessionEvent::StartSingle => self.start_single(),
            SessionEvent::CreateRoom { name } => self.create_room(&name),
            SessionEvent::OpenLink { link } => self.open_link(&link),
            SessionEvent::JoinRoom { name, room_code } => self.join_room(&name, &room_code),
            SessionEvent::StartMatch => self.start_match(),
            SessionEvent::Answer {
                player_id,
                option_index,
            } => self.submit_answer(player_id, option_index).map(|_| ()),
            SessionEvent::Peer(event) => self.receive_peer(event),
            SessionEvent::Elapsed(elapsed) => {
                self.advance(elapsed);
                Ok(())
            }
            SessionEvent::Restart => {
                self.restart();
                Ok(())
            }
        }
    }

    pub fn set_player_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.player_name = name.to_string();
        }
    }

    pub fn toggle_date(&mut self, label: &str) -> Result<(), Rejection> {
        let result = self.ensure_selecting().map(|_| {
            if let Some(pos) = self.selected_dates.iter().position(|d| d == label) {
                self.selected_dates.remove(pos);
            } else if self.store.contains(label) {
                self.selected_dates.push(label.to_string());
            } else {
                self.diagnostics.record(Diagnostic::UnknownDateSet {
                    label: label.to_string(),
                });
            }
        });
        self.note(None, result)
    }

    pub fn select_dates(&mut self, dates: Vec<String>) -> Result<(), Rejection> {
        let result = self.ensure_selecting().map(|_| self.selected_dates = dates);
        self.note(None, result)
    }

    pub fn start_single(&mut self) -> Result<(), Rejection> {
        let result = self.ensure_phase(&[Phase::Menu]).map(|_| {
            self.mode = GameMode::Single;
            self.local_id = HOST_ID;
            self.room = Room {
                code: String::new(),
                roster: vec![
                    Player::new(HOST_ID, self.player_name.clone(), true),
                    Player::new(GUEST_ID, COMPUTER_NAME, false),
                ],
            };
            log::info!("single-player game for {}", self.player_name);
            self.enter_countdown();
        });
        self.note(None, result)
    }

    pub fn create_room(&mut self, name: &str) -> Result<(), Rejection> {
        let result = self.try_create_room(name);
        self.note(None, result)
    }

    fn try_create_room(&mut self, name: &str) -> Result<(), Rejection> {
        self.ensure_phase(&[Phase::Menu])?;
        let room = self.registry.create(name, &mut self.rng)?;
        log::info!("hosting room {}", room.code);

        if let Some(host) = room.player(HOST_ID) {
            self.player_name = host.name.clone();
        }
        self.enter_multiplayer(room, HOST_ID);
        Ok(())
    }

    /// Arrive from a shared link: remember the code and ask for a name.
    pub fn open_link(&mut self, link: &str) -> Result<(), Rejection> {
        let result = self.try_open_link(link);
        self.note(None, result)
    }

    fn try_open_link(&mut self, link: &str) -> Result<(), Rejection> {
        self.ensure_phase(&[Phase::Menu])?;
        let code = room::room_code_from_link(link).ok_or(RoomError::EmptyRoomCode)?;

        self.mode = GameMode::Multi;
        self.pending_room_code = Some(code);
        self.set_phase(Phase::Setup);
        Ok(())
    }

    pub fn join_room(&mut self, name: &str, room_code: &str) -> Result<(), Rejection> {
        let result = self.try_join_room(name, room_code);
        self.note(None, result)
    }

    fn try_join_room(&mut self, name: &str, room_code: &str) -> Result<(), Rejection> {
        self.ensure_phase(&[Phase::Menu, Phase::Setup])?;
        let room = self.registry.join(room_code, name)?;
        log::info!("joining room {}", room.code);

        if let Some(guest) = room.player(GUEST_ID) {
            self.player_name = guest.name.clone();
        }
        self.pending_room_code = None;
        self.enter_multiplayer(room, GUEST_ID);
        Ok(())
    }

    /// Host only: begin the match once the guest is in.
    pub fn start_match(&mut self) -> Result<(), Rejection> {
        let result = self.try_start_match();
        self.note(None, result)
    }

    fn try_start_match(&mut self) -> Result<(), Rejection> {
        self.ensure_phase(&[Phase::Waiting])?;
        if self.local_id != HOST_ID {
            return Err(Rejection::NotHost);
        }
        if !self.room.is_full() {
            return Err(Rejection::WaitingForPeer);
        }

        self.send(WireMessage::GameStart {
            selected_dates: self.selected_dates.clone(),
        });
        self.enter_countdown();
        Ok(())
    }

    pub fn submit_answer(
        &mut self,
        player_id: PlayerId,
        option_index: usize,
    ) -> Result<AnswerOutcome, Rejection> {
        let result = self.try_answer(player_id, option_index);
        self.note(Some(player_id), result)
    }

    /// Answer on behalf of whoever sits at this terminal.
    pub fn answer_local(&mut self, option_index: usize) -> Result<AnswerOutcome, Rejection> {
        self.submit_answer(self.local_id, option_index)
    }

    /// Entry point for anything arriving from the other participant.
    pub fn receive_peer(&mut self, event: PeerEvent) -> Result<(), Rejection> {
        let peer = self.peer_id();
        let result = self.try_receive_peer(event);
        self.note(Some(peer), result)
    }

    fn try_receive_peer(&mut self, event: PeerEvent) -> Result<(), Rejection> {
        if self.mode != GameMode::Multi {
            return Err(Rejection::WrongPhase(self.phase));
        }

        match event {
            PeerEvent::Joined { name } => {
                self.ensure_phase(&[Phase::Waiting])?;
                if self.local_id != HOST_ID {
                    return Err(Rejection::NotHost);
                }
                if self.room.add_guest(name) {
                    log::info!("peer joined room {}", self.room.code);
                }
                Ok(())
            }
            PeerEvent::GameStarted { selected_dates } => {
                self.ensure_phase(&[Phase::Waiting])?;
                if self.local_id != GUEST_ID {
                    return Err(Rejection::NotGuest);
                }
                if !selected_dates.is_empty() {
                    self.selected_dates = selected_dates;
                }
                self.enter_countdown();
                Ok(())
            }
            PeerEvent::Answered {
                question_index,
                option_index,
            } => {
                self.ensure_phase(&[Phase::Playing])?;
                if question_index != self.index {
                    self.diagnostics.record(Diagnostic::StalePeerAnswer {
                        question_index,
                        current: self.index,
                    });
                    return Err(Rejection::StaleRound {
                        got: question_index,
                        current: self.index,
                    });
                }
                self.try_answer(self.peer_id(), option_index).map(|_| ())
            }
            PeerEvent::Left => {
                let peer = self.peer_id();
                if let Some(p) = self.room.roster.iter_mut().find(|p| p.id == peer) {
                    p.online = false;
                }
                log::info!("peer left room {}", self.room.code);
                Ok(())
            }
        }
    }

    /// Abort whatever is happening and go back to the menu. Date selection
    /// and the player's name are kept.
    pub fn restart(&mut self) {
        self.scheduler.clear();
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }

        self.mode = GameMode::Single;
        self.pending_room_code = None;
        self.room = empty_room();
        self.local_id = HOST_ID;
        self.questions.clear();
        self.index = 0;
        self.current = None;
        self.clock = Countdown::new(self.settings.round_secs);
        self.lobby = Countdown::new(self.settings.countdown_secs);
        self.answers = Default::default();
        self.last_answer = None;
        self.feedback_task = None;
        self.round = RoundTasks::default();
        self.standing = None;
        self.set_phase(Phase::Menu);
    }

    /// Let `elapsed` of virtual time pass, firing every alarm that falls due.
    pub fn advance(&mut self, elapsed: Duration) {
        let deadline = self.scheduler.now() + elapsed;
        while let Some(alarm) = self.scheduler.pop_due(deadline) {
            self.on_alarm(alarm);
        }
        self.scheduler.settle(deadline);
    }

    // -- internals ---------------------------------------------------------

    fn on_alarm(&mut self, alarm: Alarm) {
        match alarm {
            Alarm::LobbyStep => self.on_lobby_step(),
            Alarm::ClockTick { round } if self.is_live_round(round) => {
                if self.clock.tick() == Tick::Expired {
                    self.on_time_up();
                }
            }
            Alarm::ComputerReact { round } if self.is_live_round(round) => {
                self.round.reaction = None;
                self.on_computer_reaction();
            }
            Alarm::Advance { round } | Alarm::SkipInvalid { round }
                if self.phase == Phase::Playing && round == self.index =>
            {
                self.clear_feedback();
                self.enter_round(round + 1);
            }
            Alarm::ClearFeedback => {
                self.feedback_task = None;
                self.last_answer = None;
            }
            Alarm::PeerPoll => self.on_peer_poll(),
            stale => log::trace!("dropping stale alarm {stale:?}"),
        }
    }

    fn is_live_round(&self, round: usize) -> bool {
        self.phase == Phase::Playing && round == self.index && !self.round.resolved
    }

    fn enter_multiplayer(&mut self, room: Room, local_id: PlayerId) {
        self.mode = GameMode::Multi;
        self.local_id = local_id;
        self.room = room;
        let peer = MockPeer::new(self.rng.next_u64(), self.settings.peer_act_chance);
        self.attach_transport(Box::new(peer));
        self.set_phase(Phase::Waiting);
        self.scheduler
            .schedule(self.settings.peer_poll_interval, Alarm::PeerPoll);
    }

    fn enter_countdown(&mut self) {
        self.set_phase(Phase::Countdown);
        self.lobby.restart();
        if self.lobby.is_running() {
            self.scheduler.schedule(Duration::from_secs(1), Alarm::LobbyStep);
        } else {
            self.begin_playing();
        }
    }

    fn on_lobby_step(&mut self) {
        if self.phase != Phase::Countdown {
            return;
        }
        match self.lobby.tick() {
            Tick::Running(_) => {
                self.scheduler.schedule(Duration::from_secs(1), Alarm::LobbyStep);
            }
            Tick::Expired | Tick::Idle => self.begin_playing(),
        }
    }

    fn begin_playing(&mut self) {
        let selection = self.selector.select_questions(
            &self.store,
            &self.selected_dates,
            self.settings.question_count,
            &mut self.rng,
        );
        self.diagnostics.extend(selection.diagnostics);
        if !selection.dates.is_empty() {
            self.selected_dates = selection.dates;
        }

        self.questions = selection.entries;
        self.answers = Default::default();
        self.last_answer = None;
        self.standing = None;
        for player in &mut self.room.roster {
            player.score = 0;
        }

        log::info!(
            "{} questions from {}",
            self.questions.len(),
            self.selected_dates.join(", ")
        );
        self.set_phase(Phase::Playing);
        self.send(WireMessage::QuestionsReady {
            question_count: self.questions.len(),
        });
        self.enter_round(0);
    }

    fn enter_round(&mut self, index: usize) {
        self.index = index;
        self.current = None;
        self.round = RoundTasks::default();

        if index >= self.questions.len() {
            self.finish();
            return;
        }

        let Some(question) =
            build_question(&self.questions[index], &self.definitions, &mut self.rng)
        else {
            self.diagnostics
                .record(Diagnostic::InvalidQuestion { index });
            self.round.resolved = true;
            self.scheduler
                .schedule(self.settings.skip_delay, Alarm::SkipInvalid { round: index });
            return;
        };

        self.clock.restart();
        for second in 1..=u64::from(self.settings.round_secs) {
            let id = self
                .scheduler
                .schedule(Duration::from_secs(second), Alarm::ClockTick { round: index });
            self.round.ticks.push(id);
        }

        if self.mode == GameMode::Single {
            let offset = self.settings.computer.plan_reaction(&mut self.rng);
            self.round.reaction = Some(self.scheduler.schedule(
                Duration::from_secs(u64::from(offset)),
                Alarm::ComputerReact { round: index },
            ));
        }

        log::debug!("question {index}: {}", question.entry.word);
        self.send(WireMessage::NewQuestion {
            question_index: index,
            options: question.options.clone(),
        });
        self.current = Some(question);
    }

    fn try_answer(
        &mut self,
        player_id: PlayerId,
        option_index: usize,
    ) -> Result<AnswerOutcome, Rejection> {
        self.ensure_phase(&[Phase::Playing])?;
        let index = self.index;
        let slot = match slot_of(player_id) {
            Some(slot) if self.room.player(player_id).is_some() => slot,
            _ => return Err(Rejection::UnknownPlayer(player_id)),
        };
        if self.answers[slot].contains_key(&index) {
            return Err(Rejection::AlreadyAnswered(index));
        }
        let question = self.current.as_ref().ok_or(Rejection::NoQuestion)?;
        if self.round.resolved {
            return Err(Rejection::RoundClosed(index));
        }
        let chosen_option = question
            .option(option_index)
            .ok_or(Rejection::InvalidOption(option_index))?
            .to_string();

        let is_correct = question.is_correct(option_index);
        let points = self.settings.bands.points(self.clock.remaining(), is_correct);
        let answer = PlayerAnswer {
            player_id,
            player_name: self.player_display_name(player_id),
            is_correct,
            elapsed_secs: self.clock.elapsed(),
            chosen_option,
        };
        let total = self.record(slot, index, answer.clone(), points);

        self.feedback.emit(if is_correct {
            FeedbackEvent::Correct { player_id }
        } else {
            FeedbackEvent::Incorrect { player_id }
        });
        self.show_feedback(answer.clone());

        if self.mode == GameMode::Multi && player_id == self.local_id {
            self.send(WireMessage::Answer {
                question_index: index,
                option_index,
                is_correct,
                elapsed_secs: answer.elapsed_secs,
                score: total,
            });
        }

        // Single-player resolves on the human's answer alone; the
        // computer's own answer never ends a round.
        let round_resolved = match self.mode {
            GameMode::Single => player_id == self.local_id,
            GameMode::Multi => self.everyone_answered(index),
        };
        if self.mode == GameMode::Single && player_id == self.local_id {
            self.cancel_reaction();
        }
        if round_resolved {
            self.resolve_round(self.settings.feedback_delay);
        }

        Ok(AnswerOutcome {
            answer,
            points,
            round_resolved,
        })
    }

    fn on_time_up(&mut self) {
        let index = self.index;
        log::debug!("time up on question {index}");
        self.feedback.emit(FeedbackEvent::TimeUp {
            question_index: index,
        });
        self.send(WireMessage::TimeUp {
            question_index: index,
            player_id: self.local_id,
        });

        let unanswered: Vec<PlayerId> = self
            .room
            .roster
            .iter()
            .map(|p| p.id)
            .filter(|&id| !self.has_answered(id, index))
            .collect();
        for player_id in unanswered {
            if let Some(slot) = slot_of(player_id) {
                let answer = PlayerAnswer {
                    player_id,
                    player_name: self.player_display_name(player_id),
                    is_correct: false,
                    elapsed_secs: self.clock.start_value(),
                    chosen_option: NO_ANSWER.to_string(),
                };
                self.record(slot, index, answer, 0);
            }
        }

        self.cancel_reaction();
        let delay = match self.mode {
            GameMode::Single => self.settings.time_up_delay,
            GameMode::Multi => self.settings.feedback_delay,
        };
        self.resolve_round(delay);
    }

    fn on_computer_reaction(&mut self) {
        let Some(question) = self.current.as_ref() else {
            return;
        };
        match self.settings.computer.choose_option(question, &mut self.rng) {
            Some(option_index) => {
                let _ = self.submit_answer(GUEST_ID, option_index);
            }
            None => self
                .diagnostics
                .record(Diagnostic::InvalidQuestion { index: self.index }),
        }
    }

    fn on_peer_poll(&mut self) {
        if self.mode != GameMode::Multi {
            return;
        }

        if matches!(self.phase, Phase::Waiting | Phase::Playing) {
            let ctx = self.peer_context();
            let event = self.transport.as_mut().and_then(|t| t.poll(&ctx));
            if let Some(event) = event {
                log::debug!("peer event {event:?}");
                let _ = self.receive_peer(event);
            }
        }

        if matches!(
            self.phase,
            Phase::Waiting | Phase::Countdown | Phase::Playing
        ) {
            self.scheduler
                .schedule(self.settings.peer_poll_interval, Alarm::PeerPoll);
        }
    }

    fn peer_context(&self) -> PeerContext {
        let peer = self.peer_id();
        let open = self.current.as_ref().filter(|_| !self.round.resolved);
        PeerContext {
            phase: self.phase,
            is_host: self.local_id == HOST_ID,
            roster_len: self.room.roster.len(),
            question_index: self.index,
            option_count: open.map_or(0, |q| q.options.len()),
            correct_option: open.and_then(Question::correct_index),
            peer_answered: self.has_answered(peer, self.index),
        }
    }

    fn resolve_round(&mut self, delay: Duration) {
        self.round.resolved = true;
        self.clock.freeze();
        let ticks = std::mem::take(&mut self.round.ticks);
        self.scheduler.cancel_all(ticks);
        self.cancel_reaction();
        self.scheduler
            .schedule(delay, Alarm::Advance { round: self.index });
    }

    fn cancel_reaction(&mut self) {
        if let Some(id) = self.round.reaction.take() {
            self.scheduler.cancel(id);
        }
    }

    fn finish(&mut self) {
        self.clock.freeze();
        self.current = None;
        self.round.resolved = true;

        let [host, guest] = self.scores();
        let standing = match host.cmp(&guest) {
            std::cmp::Ordering::Greater => Standing::Winner(HOST_ID),
            std::cmp::Ordering::Less => Standing::Winner(GUEST_ID),
            std::cmp::Ordering::Equal => Standing::Tie,
        };
        self.standing = Some(standing);
        log::info!("game over {host}:{guest} ({standing:?})");

        self.send(WireMessage::GameOver {
            scores: [host, guest],
        });
        self.set_phase(Phase::Result);
    }

    /// Store an answer and add its points. Returns the player's new total.
    fn record(&mut self, slot: usize, index: usize, answer: PlayerAnswer, points: u32) -> u32 {
        let player_id = answer.player_id;
        self.answers[slot].insert(index, answer);
        match self.room.roster.iter_mut().find(|p| p.id == player_id) {
            Some(player) => {
                player.score += points;
                player.score
            }
            None => 0,
        }
    }

    fn show_feedback(&mut self, answer: PlayerAnswer) {
        self.clear_feedback();
        self.last_answer = Some(answer);
        self.feedback_task = Some(
            self.scheduler
                .schedule(self.settings.feedback_delay, Alarm::ClearFeedback),
        );
    }

    fn clear_feedback(&mut self) {
        if let Some(id) = self.feedback_task.take() {
            self.scheduler.cancel(id);
        }
        self.last_answer = None;
    }

    fn everyone_answered(&self, index: usize) -> bool {
        !self.room.roster.is_empty()
            && self
                .room
                .roster
                .iter()
                .all(|p| self.has_answered(p.id, index))
    }

    fn player_display_name(&self, player_id: PlayerId) -> String {
        self.room
            .player(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn send(&mut self, message: WireMessage) {
        if self.mode != GameMode::Multi {
            return;
        }
        if let Some(transport) = self.transport.as_mut() {
            transport.send(&message);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            log::debug!("phase {} -> {}", self.phase, phase);
        }
        self.phase = phase;
    }

    fn ensure_phase(&self, allowed: &[Phase]) -> Result<(), Rejection> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Rejection::WrongPhase(self.phase))
        }
    }

    fn ensure_selecting(&self) -> Result<(), Rejection> {
        self.ensure_phase(&[Phase::Menu, Phase::Setup, Phase::Waiting])
    }

    fn note<T>(
        &mut self,
        player_id: Option<PlayerId>,
        result: Result<T, Rejection>,
    ) -> Result<T, Rejection> {
        if let Err(reason) = &result {
            self.diagnostics.record(Diagnostic::Rejected {
                player_id,
                reason: reason.clone(),
            });
        }
        result
    }
}

fn empty_room() -> Room {
    Room {
        code: String::new(),
        roster: Vec::new(),
    }
}

fn slot_of(player_id: PlayerId) -> Option<usize> {
    match player_id {
        HOST_ID => Some(0),
        GUEST_ID => Some(1),
        _ => None,
    }
}
