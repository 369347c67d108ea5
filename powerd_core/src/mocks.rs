//! Test and helper mocks for powerd_core

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use powerd_traits::{BoxError, Broadcaster, Clock, SignalSource, Transport};

use crate::actuator::{ActuationResult, Actuator};
use crate::error::PowerdError;
use crate::state::StateRecord;
use crate::store::StateStore;

/// Replays a fixed script of samples; `None` entries fail.
/// Once exhausted, the last entry repeats.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: VecDeque<Option<bool>>,
    last: Option<Option<bool>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<bool>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script of plain levels that never fail.
    pub fn levels(levels: &[bool]) -> Self {
        Self::new(levels.iter().copied().map(Some))
    }

    /// Shared counter of `sample` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SignalSource for ScriptedSource {
    fn sample(&mut self) -> Result<bool, BoxError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let next = match self.script.pop_front() {
            Some(v) => {
                self.last = Some(v);
                v
            }
            None => self.last.flatten(),
        };
        next.ok_or_else(|| Box::new(io::Error::other("scripted source failure")) as BoxError)
    }
}

/// Level is a function of clock time: `levels[elapsed / step]`, clamped to the last entry.
/// Re-sampling at the same instant returns the same level.
pub struct TimedSource<C: Clock> {
    clock: C,
    start: std::time::Instant,
    step: Duration,
    levels: Vec<bool>,
}

impl<C: Clock> TimedSource<C> {
    pub fn new(clock: C, step: Duration, levels: Vec<bool>) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            step,
            levels,
        }
    }
}

impl<C: Clock> SignalSource for TimedSource<C> {
    fn sample(&mut self) -> Result<bool, BoxError> {
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        let idx = (elapsed.as_nanos() / self.step.as_nanos().max(1)) as usize;
        let idx = idx.min(self.levels.len().saturating_sub(1));
        self.levels
            .get(idx)
            .copied()
            .ok_or_else(|| Box::new(io::Error::other("empty level script")) as BoxError)
    }
}

/// Kind of failure a `RecordingTransport` injects for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    ConnectTimeout,
    ConnectionRefused,
    ReadTimeout,
}

impl InjectedFailure {
    fn to_error(self, address: &str) -> io::Error {
        match self {
            Self::ConnectTimeout => io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {address} timed out"),
            ),
            Self::ConnectionRefused => io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection refused by {address}"),
            ),
            Self::ReadTimeout => io::Error::new(
                io::ErrorKind::TimedOut,
                format!("read from {address} timed out"),
            ),
        }
    }
}

/// Records every send; optionally fails per address.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    failures: Arc<Mutex<HashMap<String, InjectedFailure>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_address(&self, address: &str, failure: InjectedFailure) {
        if let Ok(mut f) = self.failures.lock() {
            f.insert(address.to_string(), failure);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut f) = self.failures.lock() {
            f.clear();
        }
    }

    /// Payloads delivered so far (failed sends are not recorded).
    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn sent_payloads(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|(_, p)| String::from_utf8_lossy(&p).into_owned())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(
        &self,
        address: &str,
        payload: &[u8],
        _timeout: Duration,
        expect_reply: bool,
    ) -> Result<Option<Vec<u8>>, BoxError> {
        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|f| f.get(address).copied());
        if let Some(kind) = failure {
            return Err(Box::new(kind.to_error(address)));
        }
        if let Ok(mut s) = self.sent.lock() {
            s.push((address.to_string(), payload.to_vec()));
        }
        Ok(expect_reply.then(|| b"completeir\r".to_vec()))
    }
}

/// Collects broadcast datagrams.
#[derive(Debug, Clone, Default)]
pub struct RecordingBroadcaster {
    sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, address: &str, payload: &[u8]) -> Result<(), BoxError> {
        if let Ok(mut s) = self.sent.lock() {
            s.push((address.to_string(), payload.to_vec()));
        }
        Ok(())
    }
}

/// In-memory store with injectable save failures. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<StateRecord>>>,
    fail_saves: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: StateRecord) -> Self {
        let s = Self::default();
        if let Ok(mut r) = s.record.lock() {
            *r = Some(record);
        }
        s
    }

    /// Fail the next `n` saves.
    pub fn fail_next_saves(&self, n: usize) {
        self.fail_saves.store(n, Ordering::Relaxed);
    }

    pub fn current(&self) -> Option<StateRecord> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Option<StateRecord> {
        self.current()
    }

    fn save(&mut self, record: &StateRecord) -> Result<(), PowerdError> {
        let pending = self.fail_saves.load(Ordering::Relaxed);
        if pending > 0 {
            self.fail_saves.store(pending - 1, Ordering::Relaxed);
            return Err(PowerdError::Persistence("injected save failure".into()));
        }
        let mut r = self
            .record
            .lock()
            .map_err(|_| PowerdError::Persistence("store lock poisoned".into()))?;
        *r = Some(record.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Actuator that counts triggers and replays scripted outcomes
/// (success once the script is exhausted).
#[derive(Debug, Clone)]
pub struct ScriptedActuator {
    name: String,
    outcomes: Arc<Mutex<VecDeque<Result<(), PowerdError>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedActuator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next trigger with `err`.
    pub fn fail_next(&self, err: PowerdError) {
        if let Ok(mut o) = self.outcomes.lock() {
            o.push_back(Err(err));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Actuator for ScriptedActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger(&mut self) -> ActuationResult {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let next = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut o| o.pop_front())
            .unwrap_or(Ok(()));
        match next {
            Ok(()) => ActuationResult::ok(&self.name),
            Err(e) => ActuationResult::failed(&self.name, e),
        }
    }
}
