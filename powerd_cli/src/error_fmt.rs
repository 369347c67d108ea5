//! Human-readable error descriptions and structured JSON error formatting.

use powerd_core::error::{BuildError, PowerdError};

/// Full cause chain joined with ": ".
fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource | BuildError::MissingStore => format!(
                "What happened: The sequencer could not be assembled ({be}).\nLikely causes: Internal wiring error.\nHow to fix: Re-run with --log-level=debug and report the output."
            ),
            BuildError::UnknownCommand(name) => format!(
                "What happened: A sequence step names command {name:?}, which is not defined.\nLikely causes: Typo in [sequence] or a missing [commands.{name}] table.\nHow to fix: Define the command or remove the step, then rerun."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PowerdError>() {
        return match pe {
            PowerdError::SourceUnavailable(msg) => format!(
                "What happened: The signal source could not be read ({msg}).\nLikely causes: Drive not mounted or inaccessible, or the sensor bridge is offline.\nHow to fix: Check [source] in the config and that the path or bridge is reachable."
            ),
            PowerdError::ConnectTimeout(addr) => format!(
                "What happened: Connecting to the bridge at {addr} timed out.\nLikely causes: Wrong address, bridge powered off, or network unreachable.\nHow to fix: Verify the address and port, or raise bridge.timeout_ms."
            ),
            PowerdError::ConnectionRefused(addr) => format!(
                "What happened: The bridge at {addr} refused the connection.\nLikely causes: Wrong port or the bridge's command service is down.\nHow to fix: Check the port (default 4998) and power-cycle the bridge."
            ),
            PowerdError::ReadTimeout(addr) => format!(
                "What happened: The bridge at {addr} accepted the command but did not reply in time.\nLikely causes: Busy bridge or a command that produces no reply.\nHow to fix: Set expect_reply = false for that command or raise bridge.timeout_ms."
            ),
            PowerdError::Transport(msg) => format!(
                "What happened: Talking to the bridge failed ({msg}).\nLikely causes: Unresolvable host name or a dropped connection.\nHow to fix: Check the address in the config and network connectivity."
            ),
            PowerdError::Persistence(msg) => format!(
                "What happened: The state file could not be written ({msg}).\nLikely causes: Missing permissions or a read-only filesystem.\nHow to fix: Point state.file at a writable location."
            ),
            PowerdError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Malformed value in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = chain_text(err);
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: Syntax error, unknown kind, or a missing [source] table.\nHow to fix: Compare against etc/powerd.toml. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Out-of-range timing values, unknown command references, or malformed addresses.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    if lower.contains("unknown command") {
        return format!(
            "What happened: No such command is configured.\nLikely causes: Typo in the command name.\nHow to fix: Use one of the [commands.<name>] entries from the config. Original: {msg}"
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name for the error kind (JSON `reason`).
pub fn error_kind(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<PowerdError>() {
        Some(PowerdError::SourceUnavailable(_)) => "SourceUnavailable",
        Some(PowerdError::ConnectTimeout(_)) => "ConnectTimeout",
        Some(PowerdError::ConnectionRefused(_)) => "ConnectionRefused",
        Some(PowerdError::ReadTimeout(_)) => "ReadTimeout",
        Some(PowerdError::Transport(_)) => "Transport",
        Some(PowerdError::Persistence(_)) => "Persistence",
        Some(PowerdError::Config(_)) => "Config",
        None if is_config_load_error(err) => "Config",
        None => "Error",
    }
}

/// Errors raised by `powerd_config::load_file` are untyped; recognize them by context.
fn is_config_load_error(err: &eyre::Report) -> bool {
    let lower = chain_text(err).to_ascii_lowercase();
    ["read config", "parse config", "invalid configuration"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Map typed errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match error_kind(err) {
        "SourceUnavailable" => 3,
        "ConnectTimeout" => 4,
        "ConnectionRefused" => 5,
        "ReadTimeout" => 6,
        "Transport" => 7,
        "Persistence" => 8,
        "Config" | "Build" => 9,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": error_kind(err),
        "message": humanize(err),
    })
    .to_string()
}
