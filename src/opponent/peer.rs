use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::session::Phase;
use crate::wire::WireMessage;

pub const PEER_NAME: &str = "Player 2";

/// Something the other participant did, as received over the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A guest took the second seat (seen by the host).
    Joined { name: String },
    /// The host started the game (seen by a guest). An empty list keeps the
    /// guest's own date selection.
    GameStarted { selected_dates: Vec<String> },
    Answered {
        question_index: usize,
        option_index: usize,
    },
    Left,
}

/// What the session lets the transport know when it polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerContext {
    pub phase: Phase,
    pub is_host: bool,
    pub roster_len: usize,
    pub question_index: usize,
    pub option_count: usize,
    pub correct_option: Option<usize>,
    pub peer_answered: bool,
}

/// Seam between the session and whatever stands on the other end.
///
/// Transports never touch session state. `poll` may hand back one event,
/// which the session feeds through the same path as any other peer input.
pub trait PeerTransport {
    fn send(&mut self, message: &WireMessage);
    fn poll(&mut self, ctx: &PeerContext) -> Option<PeerEvent>;
    fn close(&mut self) {}
}

/// In-process stand-in for a remote player.
///
/// Each poll rolls `act_chance`; on success the peer does whatever makes
/// sense for the phase: join a host's room, start a guest's game, or answer
/// the current question with a coin-flip outcome.
#[derive(Debug)]
pub struct MockPeer {
    rng: StdRng,
    act_chance: f64,
    name: String,
    sent: Vec<WireMessage>,
    open: bool,
}

impl MockPeer {
    pub fn new(seed: u64, act_chance: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            act_chance: act_chance.clamp(0.0, 1.0),
            name: PEER_NAME.to_string(),
            sent: Vec::new(),
            open: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Everything the session has sent so far.
    pub fn sent(&self) -> &[WireMessage] {
        &self.sent
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn pick_answer(&mut self, ctx: &PeerContext) -> Option<usize> {
        let correct = ctx.correct_option?;
        if self.rng.gen_bool(0.5) {
            return Some(correct);
        }
        let wrong: Vec<usize> = (0..ctx.option_count).filter(|&i| i != correct).collect();
        Some(wrong.choose(&mut self.rng).copied().unwrap_or(correct))
    }
}

impl PeerTransport for MockPeer {
    fn send(&mut self, message: &WireMessage) {
        match message.to_json() {
            Ok(json) => log::debug!("mock peer <- {json}"),
            Err(e) => log::debug!("mock peer <- {message:?} ({e})"),
        }
        self.sent.push(message.clone());
    }

    fn poll(&mut self, ctx: &PeerContext) -> Option<PeerEvent> {
        if !self.open {
            return None;
        }

        let can_act = match ctx.phase {
            Phase::Waiting => !ctx.is_host || ctx.roster_len < 2,
            Phase::Playing => !ctx.peer_answered && ctx.correct_option.is_some(),
            _ => false,
        };
        if !can_act || !self.rng.gen_bool(self.act_chance) {
            return None;
        }

        match ctx.phase {
            Phase::Waiting if ctx.is_host => Some(PeerEvent::Joined {
                name: self.name.clone(),
            }),
            Phase::Waiting => Some(PeerEvent::GameStarted {
                selected_dates: Vec::new(),
            }),
            Phase::Playing => self
                .pick_answer(ctx)
                .map(|option_index| PeerEvent::Answered {
                    question_index: ctx.question_index,
                    option_index,
                }),
            _ => None,
        }
    }

    fn close(&mut self) {
        log::debug!("mock peer connection closed");
        self.open = false;
    }
}

/// Replays a fixed list of events, one per poll, and keeps what was sent in
/// a shared outbox the caller can inspect after handing the transport over.
#[derive(Debug, Default)]
pub struct ScriptedPeer {
    events: VecDeque<PeerEvent>,
    outbox: Rc<RefCell<Vec<WireMessage>>>,
    closed: Rc<RefCell<bool>>,
}

impl ScriptedPeer {
    pub fn new<I: IntoIterator<Item = PeerEvent>>(events: I) -> Self {
        Self {
            events: events.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn outbox(&self) -> Rc<RefCell<Vec<WireMessage>>> {
        Rc::clone(&self.outbox)
    }

    pub fn closed_flag(&self) -> Rc<RefCell<bool>> {
        Rc::clone(&self.closed)
    }
}

impl PeerTransport for ScriptedPeer {
    fn send(&mut self, message: &WireMessage) {
        self.outbox.borrow_mut().push(message.clone());
    }

    fn poll(&mut self, _ctx: &PeerContext) -> Option<PeerEvent> {
        self.events.pop_front()
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}
