use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::vocabulary::Question;

pub const COMPUTER_NAME: &str = "Computer";

/// Scripted single-player opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerOpponent {
    /// Chance of picking the correct option, 0.0..=1.0.
    pub accuracy: f64,
    pub min_reaction_secs: u32,
    pub max_reaction_secs: u32,
}

impl Default for ComputerOpponent {
    fn default() -> Self {
        Self {
            accuracy: 0.8,
            min_reaction_secs: 2,
            max_reaction_secs: 7,
        }
    }
}

impl ComputerOpponent {
    pub fn new(accuracy: f64, min_reaction_secs: u32, max_reaction_secs: u32) -> Self {
        Self {
            accuracy,
            min_reaction_secs,
            max_reaction_secs,
        }
    }

    /// Whole seconds after round start at which the computer answers.
    pub fn plan_reaction<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let lo = self.min_reaction_secs.min(self.max_reaction_secs);
        let hi = self.min_reaction_secs.max(self.max_reaction_secs);
        rng.gen_range(lo..=hi)
    }

    /// Option the computer picks: the correct one with probability
    /// `accuracy`, otherwise any wrong one uniformly.
    pub fn choose_option<R: Rng + ?Sized>(
        &self,
        question: &Question,
        rng: &mut R,
    ) -> Option<usize> {
        let correct = question.correct_index()?;
        if rng.gen_bool(self.accuracy.clamp(0.0, 1.0)) {
            return Some(correct);
        }

        let wrong = question.wrong_indices();
        Some(wrong.choose(rng).copied().unwrap_or(correct))
    }
}
