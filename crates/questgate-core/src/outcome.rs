use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// One event outcome row, keyed by (event, instance, player, channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub event: String,
    pub instance: String,
    pub player: PlayerId,
    pub channel: u16,
}

/// Durable storage for event outcomes.
pub trait OutcomeStore: Send + Sync {
    fn record_winner(&self, record: &WinnerRecord) -> Result<(), OutcomeError>;
}

#[derive(Debug)]
pub enum OutcomeError {
    Unavailable(String),
    WriteFailed(String),
}

impl std::fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(m) => write!(f, "outcome store unavailable: {m}"),
            Self::WriteFailed(m) => write!(f, "outcome write failed: {m}"),
        }
    }
}

impl std::error::Error for OutcomeError {}
