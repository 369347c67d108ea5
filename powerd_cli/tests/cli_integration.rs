use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use tempfile::tempdir;

/// Config with a drive source rooted in `dir` and commands aimed at `bridge`.
fn write_config(dir: &Path, bridge: &str, extra: &str) -> PathBuf {
    let mount = dir.join("mnt_f");
    let state = dir.join("state/power_status.json");
    let toml = format!(
        r#"
[source]
kind = "drive"
path = {mount:?}

[bridge]
timeout_ms = 2000

[timing]
poll_interval_ms = 10
confirm_delay_ms = 0

[state]
file = {state:?}

[commands.ir_1]
kind = "ir"
address = "{bridge}"
payload = "sendir,1:1,1,36000,1,1,32,32"

[sequence]
on = ["ir_1"]
off = ["ir_1"]
{extra}
"#,
        mount = mount.display().to_string(),
        state = state.display().to_string(),
    );
    let path = dir.join("powerd.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn state_file(dir: &Path) -> PathBuf {
    dir.join("state/power_status.json")
}

fn cmd(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("powerd_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

/// Port with nothing listening.
fn closed_port() -> String {
    let l = TcpListener::bind("127.0.0.1:0").unwrap();
    l.local_addr().unwrap().to_string()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["status"], 0, "unknown", "stdout")]
#[case(&["send", "nope"], 1, "unknown command", "stderr")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");

    let mut cmd = cmd(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn status_reads_existing_record() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    fs::create_dir_all(state_file(dir.path()).parent().unwrap()).unwrap();
    fs::write(
        state_file(dir.path()),
        r#"{"state":"on","changed_at":"2026-10-18T12:00:00Z"}"#,
    )
    .unwrap();

    cmd(&cfg)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("ON since 2026-10-18T12:00:00"));

    let out = cmd(&cfg).arg("--json").arg("status").output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["state"], "on");
}

#[test]
fn status_never_creates_state_directory() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    // A regular file where the state directory would go.
    fs::write(dir.path().join("state"), b"").unwrap();

    cmd(&cfg)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown"));
    assert!(dir.path().join("state").is_file());
}

#[test]
fn invalid_config_is_humanized() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    let text = fs::read_to_string(&cfg)
        .unwrap()
        .replace("poll_interval_ms = 10", "poll_interval_ms = 0");
    fs::write(&cfg, text).unwrap();

    cmd(&cfg)
        .arg("status")
        .assert()
        .code(9)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    cmd(&dir.path().join("absent.toml"))
        .arg("status")
        .assert()
        .code(9)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    let out = cmd(&cfg).args(["--json", "send", "ir_1"]).output().unwrap();
    assert_eq!(out.status.code(), Some(5));
    let line = String::from_utf8_lossy(&out.stderr)
        .lines()
        .find(|l| l.contains("\"reason\""))
        .map(str::to_owned)
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["reason"], "ConnectionRefused");
}

#[test]
fn send_delivers_crlf_command_to_bridge() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let bridge = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let mut w = stream;
        w.write_all(b"completeir,1:1,1\r").unwrap();
        line
    });

    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &addr, "");
    cmd(&cfg)
        .args(["send", "ir_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sent ir_1"));

    assert_eq!(bridge.join().unwrap(), "sendir,1:1,1,36000,1,1,32,32\r\n");
}

#[test]
fn send_to_closed_port_exits_with_refused_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    cmd(&cfg)
        .args(["send", "ir_1"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("refused"));
}

#[test]
fn run_seeds_state_file_without_actuation() {
    let dir = tempdir().unwrap();
    // Unreachable bridge: any actuation attempt would be logged as a failure.
    let cfg = write_config(dir.path(), &closed_port(), "");

    cmd(&cfg)
        .args(["run", "--max-ticks", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 transitions"));

    let saved = fs::read_to_string(state_file(dir.path())).unwrap();
    let v: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(v["state"], "off");
    assert!(v["changed_at"].is_string());
}

#[test]
fn run_fires_on_confirmed_transition() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    fs::create_dir_all(state_file(dir.path()).parent().unwrap()).unwrap();
    fs::write(
        state_file(dir.path()),
        r#"{"state":"off","changed_at":"2026-10-18T12:00:00Z"}"#,
    )
    .unwrap();
    // Drive appears: arm on tick 1, confirm on tick 2.
    fs::create_dir(dir.path().join("mnt_f")).unwrap();

    let out = cmd(&cfg)
        .args(["--json", "run", "--max-ticks", "2"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["transitions"], 1);
    // Bridge is down, but the default policy persists the decided state anyway.
    assert_eq!(v["failed_actuations"], 1);
    assert_eq!(v["state"], "ON");

    let saved = fs::read_to_string(state_file(dir.path())).unwrap();
    assert!(saved.contains(r#""state":"on""#), "{saved}");
}

#[test]
fn self_check_reports_source_level() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), &closed_port(), "");
    fs::create_dir(dir.path().join("mnt_f")).unwrap();
    cmd(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("source ok: ON"));
}
