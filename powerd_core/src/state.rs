//! Logical power state and the persisted record of the last confirmed transition.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Believed power state of the monitored equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalState {
    On,
    Off,
}

impl LogicalState {
    /// A high level (drive present, sensor `1`) means ON.
    #[inline]
    pub const fn from_level(level: bool) -> Self {
        if level { Self::On } else { Self::Off }
    }

    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "ON",
            Self::Off => "OFF",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid power state {0:?} (expected on/off/1/0)")]
pub struct ParseStateError(String);

impl FromStr for LogicalState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" => Ok(Self::On),
            "off" | "0" => Ok(Self::Off),
            _ => Err(ParseStateError(s.to_string())),
        }
    }
}

/// Last confirmed state and when it was confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: LogicalState,
    pub changed_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(state: LogicalState, changed_at: DateTime<Utc>) -> Self {
        Self { state, changed_at }
    }

    pub fn at(state: LogicalState, when: SystemTime) -> Self {
        Self::new(state, DateTime::<Utc>::from(when))
    }

    /// Record a transition to `state`, never moving `changed_at` backwards.
    pub fn successor(&self, state: LogicalState, when: DateTime<Utc>) -> Self {
        Self {
            state,
            changed_at: when.max(self.changed_at),
        }
    }
}
