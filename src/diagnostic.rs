use std::fmt;

use crate::session::{PlayerId, Rejection};

/// A condition the game corrected on its own instead of failing.
///
/// Every diagnostic is logged at `warn` level when recorded and kept on the
/// session so front-ends and tests can inspect what was smoothed over.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Nothing was selected; the first date-set was used.
    NoDatesSelected { fallback: String },
    /// A selected label does not exist in the store and was skipped.
    UnknownDateSet { label: String },
    /// The selected labels produced no entries; the first date-set was used.
    EmptyPool { fallback: String },
    /// The question at `index` had no usable definition and was skipped.
    InvalidQuestion { index: usize },
    /// A timing setting that would stall the session was replaced.
    SettingAdjusted { setting: &'static str, used: u64 },
    /// A peer answer arrived for a round that is no longer current.
    StalePeerAnswer { question_index: usize, current: usize },
    /// A session operation was a no-op.
    Rejected {
        player_id: Option<PlayerId>,
        reason: Rejection,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoDatesSelected { fallback } => {
                write!(f, "no date-sets selected, defaulting to {fallback}")
            }
            Diagnostic::UnknownDateSet { label } => {
                write!(f, "no vocabulary found for date-set {label:?}")
            }
            Diagnostic::EmptyPool { fallback } => {
                write!(f, "selection produced no vocabulary, using {fallback}")
            }
            Diagnostic::InvalidQuestion { index } => {
                write!(f, "question {index} is missing its definition, skipping")
            }
            Diagnostic::SettingAdjusted { setting, used } => {
                write!(f, "{setting} out of range, using {used}")
            }
            Diagnostic::StalePeerAnswer {
                question_index,
                current,
            } => write!(
                f,
                "peer answered question {question_index} while question {current} is current"
            ),
            Diagnostic::Rejected {
                player_id: Some(id),
                reason,
            } => write!(f, "player {id}: {reason}"),
            Diagnostic::Rejected {
                player_id: None,
                reason,
            } => write!(f, "{reason}"),
        }
    }
}

/// Collected diagnostics, oldest first.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        for d in diagnostics {
            self.record(d);
        }
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Take everything recorded so far, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
