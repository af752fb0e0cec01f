use serde::{Deserialize, Serialize};

use crate::room::PlayerId;

/// Messages a session announces to its peer.
///
/// The JSON shape (`{"type": "new_question", ...}`) is what a real duplex
/// channel would carry; the in-process transports only log it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    QuestionsReady {
        question_count: usize,
    },
    NewQuestion {
        question_index: usize,
        options: Vec<String>,
    },
    Answer {
        question_index: usize,
        option_index: usize,
        is_correct: bool,
        elapsed_secs: u32,
        score: u32,
    },
    TimeUp {
        question_index: usize,
        player_id: PlayerId,
    },
    GameStart {
        selected_dates: Vec<String>,
    },
    GameOver {
        scores: [u32; 2],
    },
}

impl WireMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
