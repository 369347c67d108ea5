#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core power-state logic (transport-agnostic).
//!
//! All I/O goes through `powerd_traits::{SignalSource, Transport, Broadcaster}`
//! and the `StateStore` trait defined here.
//!
//! ## Architecture
//!
//! - **State**: `LogicalState` and the persisted `StateRecord` (`state` module)
//! - **Store**: atomic JSON file store (`store`, `atomic` modules)
//! - **Actuators**: IR, relay pulse, Wake-on-LAN (`actuator` module)
//! - **Sequencer**: debounce/confirm state machine driving actuation (`sequencer` module)
//! - **Runner**: poll loop with channel-driven shutdown (`runner` module)

pub mod actuator;
pub mod atomic;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod sequencer;
pub mod state;
pub mod store;

pub use actuator::{
    ActuationResult, Actuator, CommandSpec, IrActuator, RelayPulseActuator, WakeOnLanActuator,
    magic_packet,
};
pub use config::{PersistPolicy, Step, Timing};
pub use error::{BuildError, PowerdError, Result};
pub use runner::{RunSummary, run};
pub use sequencer::{
    PendingTransition, Phase, SequenceReport, Sequencer, SequencerBuilder, TickOutcome,
};
pub use state::{LogicalState, StateRecord};
pub use store::{JsonFileStore, StateStore};
