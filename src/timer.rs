use serde::{Deserialize, Serialize};

/// Seconds on the clock at the start of every round.
pub const ROUND_SECS: u32 = 10;

/// Seconds shown by the lobby countdown before the first round.
pub const LOBBY_COUNTDOWN_SECS: u32 = 3;

/// What a single one-second step did to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The clock moved and still has this many seconds left.
    Running(u32),
    /// The clock just reached zero.
    Expired,
    /// The clock is frozen; nothing changed.
    Idle,
}

/// Integer countdown driven by externally delivered one-second ticks.
///
/// The clock has no notion of wall time. Whoever owns it decides when a second
/// has passed, so the value read at any moment is exactly what scoring sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    start: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            remaining: start,
            running: false,
        }
    }

    /// Refill the clock and start it.
    pub fn restart(&mut self) {
        self.remaining = self.start;
        self.running = self.start > 0;
    }

    pub fn freeze(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn start_value(&self) -> u32 {
        self.start
    }

    pub fn elapsed(&self) -> u32 {
        self.start - self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// Points awarded for a correct answer by seconds remaining at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBands {
    pub fast_secs: u32,
    pub fast_points: u32,
    pub steady_secs: u32,
    pub steady_points: u32,
    pub late_points: u32,
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            fast_secs: 7,
            fast_points: 20,
            steady_secs: 4,
            steady_points: 10,
            late_points: 5,
        }
    }
}

impl ScoreBands {
    pub fn points(&self, remaining: u32, is_correct: bool) -> u32 {
        if !is_correct {
            0
        } else if remaining >= self.fast_secs {
            self.fast_points
        } else if remaining >= self.steady_secs {
            self.steady_points
        } else {
            self.late_points
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_countdown_is_frozen_and_full() {
        let mut clock = Countdown::new(ROUND_SECS);

        assert_eq!(clock.remaining(), 10);
        assert!(!clock.is_running());
        assert_eq!(clock.tick(), Tick::Idle);
        assert_eq!(clock.remaining(), 10);
    }

    #[test]
    fn ticks_down_to_expiry() {
        let mut clock = Countdown::new(3);
        clock.restart();

        assert_eq!(clock.tick(), Tick::Running(2));
        assert_eq!(clock.tick(), Tick::Running(1));
        assert_eq!(clock.tick(), Tick::Expired);
        assert!(clock.has_expired());
        assert!(!clock.is_running());
        assert_eq!(clock.tick(), Tick::Idle);
        assert_eq!(clock.elapsed(), 3);
    }

    #[test]
    fn freeze_holds_the_value() {
        let mut clock = Countdown::new(ROUND_SECS);
        clock.restart();
        clock.tick();
        clock.freeze();

        assert_eq!(clock.tick(), Tick::Idle);
        assert_eq!(clock.remaining(), 9);
    }

    #[test]
    fn restart_refills() {
        let mut clock = Countdown::new(LOBBY_COUNTDOWN_SECS);
        clock.restart();
        clock.tick();
        clock.tick();
        clock.restart();

        assert_eq!(clock.remaining(), 3);
        assert!(clock.is_running());
    }

    #[test]
    fn zero_length_clock_never_runs() {
        let mut clock = Countdown::new(0);
        clock.restart();
        assert!(!clock.is_running());
        assert_eq!(clock.tick(), Tick::Idle);
    }

    #[test]
    fn score_band_boundaries() {
        let bands = ScoreBands::default();

        assert_eq!(bands.points(10, true), 20);
        assert_eq!(bands.points(7, true), 20);
        assert_eq!(bands.points(6, true), 10);
        assert_eq!(bands.points(4, true), 10);
        assert_eq!(bands.points(3, true), 5);
        assert_eq!(bands.points(1, true), 5);
        assert_eq!(bands.points(0, true), 5);
    }

    #[test]
    fn incorrect_answers_never_score() {
        let bands = ScoreBands::default();
        for remaining in 0..=ROUND_SECS {
            assert_eq!(bands.points(remaining, false), 0);
        }
    }
}
