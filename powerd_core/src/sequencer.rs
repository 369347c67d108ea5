//! Transition-driven actuation sequencer.
//!
//! Each `tick` takes one sample and moves a two-state machine:
//!
//! - `Idle`: the believed state is stable; a differing sample arms a pending
//!   transition.
//! - `AwaitingConfirm`: the candidate must hold for `confirm_delay`. Once it
//!   has, the source is sampled again and, if it still agrees, the direction's
//!   step list runs and the new record is persisted per `PersistPolicy`.
//!
//! Failed samples never advance or cancel anything. Failed saves leave the
//! record dirty; the next tick retries the save before sampling.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use powerd_traits::{Clock, MonotonicClock, SignalSource};
use tracing::{debug, error, info, warn};

use crate::actuator::{ActuationResult, Actuator};
use crate::config::{PersistPolicy, Step, Timing};
use crate::error::{BuildError, PowerdError};
use crate::hw_error::map_source_error;
use crate::state::{LogicalState, StateRecord};
use crate::store::StateStore;

/// Candidate transition waiting out its confirm delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub target: LogicalState,
    pub armed_at: Instant,
    pub confirm_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingConfirm(PendingTransition),
}

/// Outcome of one confirmed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub from: LogicalState,
    pub to: LogicalState,
    pub results: Vec<ActuationResult>,
    /// The in-memory belief moved to `to`.
    pub advanced: bool,
    /// The new record reached the store.
    pub persisted: bool,
}

impl SequenceReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActuationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// What a single `tick` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No prior record; belief seeded from the first sample, nothing fired.
    Seeded(LogicalState),
    Steady(LogicalState),
    Armed {
        target: LogicalState,
    },
    Waiting {
        target: LogicalState,
        remaining: Duration,
    },
    /// A regular sample went back to the believed state.
    Reverted {
        target: LogicalState,
    },
    /// The confirmation re-sample disagreed with the target.
    Cancelled {
        target: LogicalState,
    },
    Confirmed(SequenceReport),
    SourceUnavailable(PowerdError),
}

pub struct Sequencer {
    source: Box<dyn SignalSource>,
    store: Box<dyn StateStore>,
    clock: Arc<dyn Clock + Send + Sync>,
    actuators: BTreeMap<String, Box<dyn Actuator>>,
    on_steps: Vec<Step>,
    off_steps: Vec<Step>,
    confirm_delay: Duration,
    policy: PersistPolicy,
    record: Option<StateRecord>,
    phase: Phase,
    dirty: bool,
    first_on_done: bool,
}

impl core::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sequencer")
            .field("record", &self.record)
            .field("phase", &self.phase)
            .field("dirty", &self.dirty)
            .field("actuators", &self.actuators.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Sequencer {
    pub fn builder() -> SequencerBuilder {
        SequencerBuilder::default()
    }

    /// Current belief, `None` until the first sample seeds it.
    pub fn state(&self) -> Option<LogicalState> {
        self.record.as_ref().map(|r| r.state)
    }

    pub fn record(&self) -> Option<&StateRecord> {
        self.record.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        match &self.phase {
            Phase::AwaitingConfirm(p) => Some(p),
            Phase::Idle => None,
        }
    }

    /// The current record has not reached the store yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.flush_dirty();

        let observed = match self.sample() {
            Ok(s) => s,
            Err(e) => return TickOutcome::SourceUnavailable(e),
        };

        let Some(believed) = self.state() else {
            let rec = StateRecord::new(observed, self.wall_now());
            info!(state = %observed, "seeded state from first sample");
            self.record = Some(rec);
            self.persist();
            return TickOutcome::Seeded(observed);
        };

        match self.phase {
            Phase::Idle if observed == believed => TickOutcome::Steady(believed),
            Phase::Idle => {
                self.arm(observed);
                info!(from = %believed, to = %observed, delay_ms = self.confirm_delay.as_millis() as u64, "transition armed");
                TickOutcome::Armed { target: observed }
            }
            Phase::AwaitingConfirm(p) if observed != p.target => {
                self.phase = Phase::Idle;
                info!(target = %p.target, "signal reverted; pending transition discarded");
                TickOutcome::Reverted { target: p.target }
            }
            Phase::AwaitingConfirm(p) => {
                let elapsed = self.clock.now().saturating_duration_since(p.armed_at);
                if elapsed < p.confirm_delay {
                    let remaining = p.confirm_delay - elapsed;
                    debug!(target = %p.target, remaining_ms = remaining.as_millis() as u64, "awaiting confirmation");
                    return TickOutcome::Waiting {
                        target: p.target,
                        remaining,
                    };
                }
                self.confirm(believed, p.target)
            }
        }
    }

    fn confirm(&mut self, from: LogicalState, to: LogicalState) -> TickOutcome {
        match self.sample() {
            // Keep the pending transition; the next tick re-checks.
            Err(e) => TickOutcome::SourceUnavailable(e),
            Ok(s) if s != to => {
                self.phase = Phase::Idle;
                info!(target = %to, "confirmation re-check disagreed; pending transition discarded");
                TickOutcome::Cancelled { target: to }
            }
            Ok(_) => {
                self.phase = Phase::Idle;
                let at = self.wall_now();
                info!(from = %from, to = %to, "transition confirmed");
                TickOutcome::Confirmed(self.fire(from, to, at))
            }
        }
    }

    fn fire(&mut self, from: LogicalState, to: LogicalState, at: DateTime<Utc>) -> SequenceReport {
        let steps = if to.is_on() {
            &self.on_steps
        } else {
            &self.off_steps
        };
        let include_first_on = to.is_on() && !self.first_on_done;

        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            if step.first_on_only && !include_first_on {
                debug!(step = %step.command, "skipping first-on-only step");
                continue;
            }
            let result = match self.actuators.get_mut(&step.command) {
                Some(a) => a.trigger(),
                None => ActuationResult::failed(
                    &step.command,
                    PowerdError::Config(format!("no actuator named {:?}", step.command)),
                ),
            };
            match &result.error {
                None => info!(actuator = %result.actuator, "actuation ok"),
                Some(e) => warn!(actuator = %result.actuator, error = %e, "actuation failed"),
            }
            results.push(result);
            if !step.pause_after.is_zero() {
                self.clock.sleep(step.pause_after);
            }
        }

        let all_ok = results.iter().all(|r| r.success);
        let advance = all_ok || self.policy == PersistPolicy::Always;
        let mut persisted = false;
        if advance {
            let next = match &self.record {
                Some(prev) => prev.successor(to, at),
                None => StateRecord::new(to, at),
            };
            self.record = Some(next);
            if to.is_on() {
                self.first_on_done = true;
            }
            persisted = self.persist();
        } else {
            warn!(from = %from, to = %to, "sequence incomplete; state kept and transition re-armed");
            self.arm(to);
        }

        SequenceReport {
            from,
            to,
            results,
            advanced: advance,
            persisted,
        }
    }

    fn arm(&mut self, target: LogicalState) {
        self.phase = Phase::AwaitingConfirm(PendingTransition {
            target,
            armed_at: self.clock.now(),
            confirm_delay: self.confirm_delay,
        });
    }

    fn sample(&mut self) -> Result<LogicalState, PowerdError> {
        match self.source.sample() {
            Ok(level) => Ok(LogicalState::from_level(level)),
            Err(e) => {
                let err = map_source_error(&*e);
                warn!(error = %err, "sample failed; no new information");
                Err(err)
            }
        }
    }

    /// Write the current record; on failure mark it dirty.
    fn persist(&mut self) -> bool {
        let Some(rec) = &self.record else {
            return false;
        };
        match self.store.save(rec) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                error!(state = %rec.state, error = %e, "state save failed; will retry");
                self.dirty = true;
                false
            }
        }
    }

    fn flush_dirty(&mut self) {
        if self.dirty && self.persist() {
            info!("deferred state save succeeded");
        }
    }

    fn wall_now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.wall_now())
    }
}

#[derive(Default)]
pub struct SequencerBuilder {
    source: Option<Box<dyn SignalSource>>,
    store: Option<Box<dyn StateStore>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    actuators: BTreeMap<String, Box<dyn Actuator>>,
    on_steps: Vec<Step>,
    off_steps: Vec<Step>,
    timing: Timing,
    policy: PersistPolicy,
}

impl SequencerBuilder {
    #[must_use]
    pub fn with_source(mut self, source: impl SignalSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register an actuator under its own name.
    #[must_use]
    pub fn with_actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        let name = actuator.name().to_string();
        self.actuators.insert(name, Box::new(actuator));
        self
    }

    #[must_use]
    pub fn with_boxed_actuator(mut self, actuator: Box<dyn Actuator>) -> Self {
        let name = actuator.name().to_string();
        self.actuators.insert(name, actuator);
        self
    }

    #[must_use]
    pub fn with_on_sequence(mut self, steps: Vec<Step>) -> Self {
        self.on_steps = steps;
        self
    }

    #[must_use]
    pub fn with_off_sequence(mut self, steps: Vec<Step>) -> Self {
        self.off_steps = steps;
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.timing.confirm_delay = delay;
        self
    }

    #[must_use]
    pub fn with_persist_policy(mut self, policy: PersistPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate the wiring and load any persisted record.
    pub fn build(self) -> Result<Sequencer, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let store = self.store.ok_or(BuildError::MissingStore)?;
        if self.timing.poll_interval.is_zero() {
            return Err(BuildError::InvalidConfig("poll interval must be > 0"));
        }
        for step in self.on_steps.iter().chain(&self.off_steps) {
            if !self.actuators.contains_key(&step.command) {
                return Err(BuildError::UnknownCommand(step.command.clone()));
            }
        }
        if self.off_steps.iter().any(|s| s.first_on_only) {
            return Err(BuildError::InvalidConfig(
                "first_on_only steps are only valid in the on sequence",
            ));
        }

        let record = store.load();
        match &record {
            Some(r) => info!(state = %r.state, changed_at = %r.changed_at, "loaded persisted state"),
            None => info!("no persisted state; will seed from first sample"),
        }

        Ok(Sequencer {
            source,
            store,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            actuators: self.actuators,
            on_steps: self.on_steps,
            off_steps: self.off_steps,
            confirm_delay: self.timing.confirm_delay,
            policy: self.policy,
            record,
            phase: Phase::Idle,
            dirty: false,
            first_on_done: false,
        })
    }
}
