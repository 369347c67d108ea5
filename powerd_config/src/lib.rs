#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the power daemon.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Commands are named once under `[commands.<name>]` and referenced by name
//!   from the `[sequence]` on/off step lists.
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;
use serde::de::Deserializer;

/// Default command port of the bridge when an address carries none.
pub const DEFAULT_BRIDGE_PORT: u16 = 4998;

/// Discard port used for Wake-on-LAN when `broadcast` carries none.
pub const DEFAULT_WOL_PORT: u16 = 9;

const MAX_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Where the power signal comes from.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceCfg {
    /// Monitored drive: either an explicit mount `path` or a Windows drive `letter`.
    Drive {
        path: Option<String>,
        letter: Option<String>,
    },
    /// Bridge sensor port queried with `getstate,<connector>`.
    Sensor {
        address: String,
        #[serde(default = "default_connector")]
        connector: String,
    },
}

fn default_connector() -> String {
    "1:2".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeCfg {
    /// Port appended to addresses given without one.
    pub port: u16,
    /// Connect and read timeout per bridge call (ms).
    pub timeout_ms: u64,
}

impl Default for BridgeCfg {
    fn default() -> Self {
        Self {
            port: DEFAULT_BRIDGE_PORT,
            timeout_ms: 5_000,
        }
    }
}

impl BridgeCfg {
    /// Return `address` with the default port appended when it has none.
    pub fn qualify(&self, address: &str) -> String {
        with_default_port(address, self.port)
    }
}

/// Append `:port` to `address` unless it already names one.
pub fn with_default_port(address: &str, port: u16) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address.to_string();
    }
    if let Some((host, p)) = address.rsplit_once(':')
        && !host.contains(':')
        && p.parse::<u16>().is_ok()
    {
        return address.to_string();
    }
    format!("{address}:{port}")
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Delay between source samples (ms).
    pub poll_interval_ms: u64,
    /// How long a candidate transition must hold before actuation (ms).
    pub confirm_delay_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            confirm_delay_ms: 30_000,
        }
    }
}

/// When a confirmed transition is written to the state file.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Persist the decided state even if some actuators failed.
    #[default]
    Always,
    /// Persist only when every actuation step succeeded.
    OnSuccess,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateCfg {
    pub file: String,
    pub persist: PersistPolicy,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            file: "power_status.json".to_string(),
            persist: PersistPolicy::Always,
        }
    }
}

/// A named actuation command.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandCfg {
    /// One IR code sent as an opaque command string.
    Ir {
        address: String,
        payload: String,
        #[serde(default = "default_true")]
        expect_reply: bool,
    },
    /// Close, hold, then optionally release a relay.
    RelayPulse {
        address: String,
        close: String,
        release: Option<String>,
        #[serde(default = "default_hold_ms")]
        hold_ms: u64,
        #[serde(default = "default_true")]
        expect_reply: bool,
    },
    /// Wake-on-LAN magic packet. A `broadcast` without a port goes to port 9.
    WakeOnLan {
        mac: String,
        #[serde(default = "default_broadcast")]
        broadcast: String,
    },
}

fn default_true() -> bool {
    true
}

fn default_hold_ms() -> u64 {
    350
}

fn default_broadcast() -> String {
    "255.255.255.255:9".to_string()
}

/// One entry in an on/off sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    /// Sleep after this step before the next one (ms).
    pub pause_after_ms: u64,
    /// Run only on the first OFF->ON transition since process start.
    pub first_on_only: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SequenceCfg {
    /// Steps fired on a confirmed OFF->ON transition. Accepts either
    /// - plain names: ["relay", "ir_1"]
    /// - tables: [{ command = "wol", pause_after_ms = 12000, first_on_only = true }]
    #[serde(deserialize_with = "de_steps")]
    pub on: Vec<Step>,
    /// Steps fired on a confirmed ON->OFF transition.
    #[serde(deserialize_with = "de_steps")]
    pub off: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepToml {
    Name(String),
    Table {
        command: String,
        #[serde(default)]
        pause_after_ms: u64,
        #[serde(default)]
        first_on_only: bool,
    },
}

fn de_steps<'de, D>(deserializer: D) -> Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<StepToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for s in items {
            match s {
                StepToml::Name(command) => out.push(Step {
                    command,
                    pause_after_ms: 0,
                    first_on_only: false,
                }),
                StepToml::Table {
                    command,
                    pause_after_ms,
                    first_on_only,
                } => out.push(Step {
                    command,
                    pause_after_ms,
                    first_on_only,
                }),
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub source: SourceCfg,
    #[serde(default)]
    pub bridge: BridgeCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub state: StateCfg,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandCfg>,
    #[serde(default)]
    pub sequence: SequenceCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

/// Parse a MAC address written as `AA-BB-CC-DD-EE-FF`, `AA:BB:...` or `AABBCCDDEEFF`.
pub fn parse_mac(s: &str) -> eyre::Result<[u8; 6]> {
    let hex: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        eyre::bail!("invalid MAC address {s:?}");
    }
    let mut out = [0u8; 6];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|e| eyre::eyre!("invalid MAC address {s:?}: {e}"))?;
    }
    Ok(out)
}

fn check_command_text(field: &str, text: &str) -> eyre::Result<()> {
    if text.trim().is_empty() {
        eyre::bail!("{field} must not be empty");
    }
    if !text.is_ascii() {
        eyre::bail!("{field} must be ASCII");
    }
    if text.trim_end_matches("\r\n").contains(['\r', '\n']) {
        eyre::bail!("{field} must be a single line");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Source
        match &self.source {
            SourceCfg::Drive { path, letter } => match (path, letter) {
                (None, None) => eyre::bail!("source.path or source.letter is required for kind = \"drive\""),
                (Some(_), Some(_)) => eyre::bail!("set only one of source.path and source.letter"),
                (Some(p), None) if p.trim().is_empty() => eyre::bail!("source.path must not be empty"),
                (None, Some(l)) => {
                    let mut chars = l.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.is_ascii_alphabetic() => {}
                        _ => eyre::bail!("source.letter must be a single drive letter, got {l:?}"),
                    }
                }
                _ => {}
            },
            SourceCfg::Sensor { address, connector } => {
                if address.trim().is_empty() {
                    eyre::bail!("source.address must not be empty");
                }
                if connector.trim().is_empty() {
                    eyre::bail!("source.connector must not be empty");
                }
            }
        }

        // Bridge
        if self.bridge.port == 0 {
            eyre::bail!("bridge.port must be > 0");
        }
        if self.bridge.timeout_ms == 0 {
            eyre::bail!("bridge.timeout_ms must be >= 1");
        }
        if self.bridge.timeout_ms > 10 * 60 * 1000 {
            eyre::bail!("bridge.timeout_ms is unreasonably large (>10min)");
        }

        // Timing
        if self.timing.poll_interval_ms == 0 {
            eyre::bail!("timing.poll_interval_ms must be >= 1");
        }
        if self.timing.poll_interval_ms > MAX_INTERVAL_MS {
            eyre::bail!("timing.poll_interval_ms is unreasonably large (>24h)");
        }
        if self.timing.confirm_delay_ms > MAX_INTERVAL_MS {
            eyre::bail!("timing.confirm_delay_ms is unreasonably large (>24h)");
        }

        // State
        if self.state.file.trim().is_empty() {
            eyre::bail!("state.file must not be empty");
        }

        // Commands
        for (name, cmd) in &self.commands {
            match cmd {
                CommandCfg::Ir {
                    address, payload, ..
                } => {
                    if address.trim().is_empty() {
                        eyre::bail!("commands.{name}.address must not be empty");
                    }
                    check_command_text(&format!("commands.{name}.payload"), payload)?;
                }
                CommandCfg::RelayPulse {
                    address,
                    close,
                    release,
                    hold_ms,
                    ..
                } => {
                    if address.trim().is_empty() {
                        eyre::bail!("commands.{name}.address must not be empty");
                    }
                    check_command_text(&format!("commands.{name}.close"), close)?;
                    if let Some(r) = release {
                        check_command_text(&format!("commands.{name}.release"), r)?;
                    }
                    if *hold_ms > 60_000 {
                        eyre::bail!("commands.{name}.hold_ms is unreasonably large (>60s)");
                    }
                }
                CommandCfg::WakeOnLan { mac, broadcast } => {
                    parse_mac(mac).wrap_err_with(|| format!("commands.{name}.mac"))?;
                    if broadcast.trim().is_empty() {
                        eyre::bail!("commands.{name}.broadcast must not be empty");
                    }
                }
            }
        }

        // Sequence
        for (dir, steps) in [("on", &self.sequence.on), ("off", &self.sequence.off)] {
            for step in steps {
                if !self.commands.contains_key(&step.command) {
                    eyre::bail!(
                        "sequence.{dir} references unknown command {:?}",
                        step.command
                    );
                }
                if step.pause_after_ms > 5 * 60 * 1000 {
                    eyre::bail!("sequence.{dir} pause_after_ms is unreasonably large (>5min)");
                }
                if dir == "off" && step.first_on_only {
                    eyre::bail!("sequence.off step {:?} cannot be first_on_only", step.command);
                }
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}
