// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup, socket/lock creation, and signal-driven shutdown.

use std::time::Duration;

use nix::sys::signal::Signal;

use crate::prelude::*;

#[test]
fn empty_job_dir_starts_cleanly_and_lists_nothing() {
    let job_dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(job_dir.path());
    daemon.initctl().args(&["list"]).passes();
}

#[test]
fn creates_pid_and_log_files() {
    let job_dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(job_dir.path());

    let has_pid = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.state_path().join("upstartd.pid").exists()
    });
    assert!(has_pid, "pid file should exist");

    let has_log = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.state_path().join("upstartd.log").exists()
    });
    assert!(has_log, "log file should exist");
}

#[test]
fn sigint_stops_the_daemon_immediately() {
    let job_dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::start(job_dir.path());

    daemon.signal(Signal::SIGINT);

    let stopped = wait_for(SPEC_WAIT_MAX_MS, || daemon.has_exited());
    assert!(stopped, "daemon should exit on SIGINT\n{}", daemon.log());
}

#[test]
fn sigterm_on_a_system_instance_goes_straight_to_the_kill_phase() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "sleeper",
        "[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let mut daemon = Daemon::start(job_dir.path());
    daemon.initctl().args(&["start", "sleeper"]).passes();

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "sleeper"]).passes().stdout().contains("Running")
    });
    assert!(running, "sleeper should be running\n{}", daemon.log());

    daemon.signal(Signal::SIGTERM);
    let stopped = wait_for(SPEC_WAIT_MAX_MS * 3, || daemon.has_exited());
    assert!(stopped, "daemon should exit after quiescing\n{}", daemon.log());
}

#[test]
fn a_second_daemon_on_the_same_state_dir_refuses_to_start() {
    let job_dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(job_dir.path());

    // Directly probe the lock by reusing the same state dir; the helper
    // always allocates a fresh one, so start a raw process by hand.
    let output = std::process::Command::new(upstartd_binary())
        .env("UPSTART_STATE_DIR", daemon.state_path())
        .env("UPSTART_JOB_DIR", job_dir.path())
        .env("UPSTART_SOCKET_NAME", "upstart-spec-contended")
        .output()
        .expect("upstartd should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "stderr: {stderr}");

    std::thread::sleep(Duration::from_millis(20));
}
