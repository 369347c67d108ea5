//! Runtime configuration used by the sequencer and runner.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub confirm_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            confirm_delay: Duration::from_secs(30),
        }
    }
}

/// Whether a confirmed transition is persisted when some steps failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    #[default]
    Always,
    OnSuccess,
}

/// One entry of an on/off sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    pub pause_after: Duration,
    pub first_on_only: bool,
}

impl Step {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            pause_after: Duration::ZERO,
            first_on_only: false,
        }
    }

    #[must_use]
    pub fn pause_after(mut self, d: Duration) -> Self {
        self.pause_after = d;
        self
    }

    #[must_use]
    pub fn first_on_only(mut self) -> Self {
        self.first_on_only = true;
        self
    }
}
