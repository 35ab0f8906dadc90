//! The `launcher-swap` binary driven directly, as the launcher would.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

fn swap_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_launcher-swap"))
}

/// Pid of a process that has already exited.
fn exited_pid() -> u32 {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

/// Executable destination that records its own start in `relaunched`.
fn install_destination(dir: &Path, marker: &str) -> PathBuf {
    let destination = dir.join("DailyGameLauncher");
    fs::write(&destination, format!("#!/bin/sh\necho {marker} > relaunched\n")).unwrap();
    fs::set_permissions(&destination, fs::Permissions::from_mode(0o755)).unwrap();
    destination
}

fn run(pid: u32, src: &Path, dst: &Path, ready: &Path, wait_secs: u64) -> Output {
    let log = src.with_extension("log");
    swap_binary()
        .arg("--pid")
        .arg(pid.to_string())
        .arg("--src")
        .arg(src)
        .arg("--dst")
        .arg(dst)
        .arg("--ready-file")
        .arg(ready)
        .arg("--wait-timeout-secs")
        .arg(wait_secs.to_string())
        .arg("--log-file")
        .arg(log)
        .output()
        .unwrap()
}

fn wait_for_file(path: &Path, limit: Duration) -> Option<String> {
    let started = Instant::now();
    while started.elapsed() < limit {
        if let Ok(content) = fs::read_to_string(path) {
            if !content.is_empty() {
                return Some(content);
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

#[test]
fn test_swap_and_relaunch() {
    let dir = tempfile::tempdir().unwrap();
    install_destination(dir.path(), "old");
    let staged = dir.path().join("DailyGameLauncher_update");
    fs::write(&staged, "#!/bin/sh\necho new > relaunched\n").unwrap();
    let destination = dir.path().join("DailyGameLauncher");
    let ready = dir.path().join("DailyGameLauncher_update.ready");

    let output = run(exited_pid(), &staged, &destination, &ready, 10);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(!staged.exists());
    assert!(!ready.exists());
    assert!(fs::read_to_string(&destination).unwrap().contains("echo new"));
    let mode = fs::metadata(&destination).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o755);

    let relaunched = wait_for_file(&dir.path().join("relaunched"), Duration::from_secs(10));
    assert_eq!(relaunched.as_deref().map(str::trim), Some("new"));
}

#[test]
fn test_live_caller_times_out_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let destination = install_destination(dir.path(), "old");
    let staged = dir.path().join("DailyGameLauncher_update");
    fs::write(&staged, "new").unwrap();
    let ready = dir.path().join("DailyGameLauncher_update.ready");

    // This test process stays alive for the whole wait.
    let output = run(std::process::id(), &staged, &destination, &ready, 1);

    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert_eq!(fs::read_to_string(&staged).unwrap(), "new");
    assert!(fs::read_to_string(&destination).unwrap().contains("echo old"));
    assert!(!dir.path().join("relaunched").exists());

    let marker = fs::read_to_string(&ready).unwrap();
    let pid: u32 = marker.split_whitespace().next().unwrap().parse().unwrap();
    assert_ne!(pid, std::process::id());
}

#[test]
fn test_missing_staged_is_swap_failure() {
    let dir = tempfile::tempdir().unwrap();
    let destination = install_destination(dir.path(), "old");
    let staged = dir.path().join("DailyGameLauncher_update");
    let ready = dir.path().join("DailyGameLauncher_update.ready");

    let output = run(exited_pid(), &staged, &destination, &ready, 5);

    assert_eq!(output.status.code(), Some(3), "{output:?}");
    assert!(fs::read_to_string(&destination).unwrap().contains("echo old"));
}

#[test]
fn test_missing_arguments_is_usage_error() {
    let output = swap_binary().output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let output = swap_binary().args(["--pid", "not-a-pid"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}
