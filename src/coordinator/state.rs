use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of a single `get_or_generate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// First store lookup, before any lock traffic
    CheckCache,
    /// Competing for the per-key lock
    AcquireLock,
    /// Lock held; second lookup to catch a winner that finished while we waited
    DoubleCheck,
    /// Lock held and nothing stored; the generator is running
    Generate,
    /// Lock held; writing the generated record
    Persist,
    /// Lock lost or unavailable; sleeping between lookups
    WaitAndPoll,
    /// A record is being returned
    Done,
    /// The call ended in an error
    Failed,
}

impl CoordinatorState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether the per-key lock is held in this state
    pub fn holds_lock(&self) -> bool {
        matches!(self, Self::DoubleCheck | Self::Generate | Self::Persist)
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckCache => write!(f, "check_cache"),
            Self::AcquireLock => write!(f, "acquire_lock"),
            Self::DoubleCheck => write!(f, "double_check"),
            Self::Generate => write!(f, "generate"),
            Self::Persist => write!(f, "persist"),
            Self::WaitAndPoll => write!(f, "wait_and_poll"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// How the returned record was obtained.
///
/// Purely informational: the record content is the same whichever outcome a
/// caller sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Present on the first lookup, or found on the double-check after winning the lock
    FoundExisting,
    /// This caller generated and persisted the record
    GeneratedNew,
    /// Another caller generated it while this one was polling
    FoundExistingAfterWait,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoundExisting => "FOUND_EXISTING",
            Self::GeneratedNew => "GENERATED_NEW",
            Self::FoundExistingAfterWait => "FOUND_EXISTING_AFTER_WAIT",
        }
    }

    /// Whether this caller ran the generator
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::GeneratedNew)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
