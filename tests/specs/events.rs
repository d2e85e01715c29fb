// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `start on`/`stop on` condition matching driven through `initctl emit`.

use crate::prelude::*;

#[test]
fn a_job_with_start_on_reacts_to_a_matching_event_without_ever_being_started_by_hand() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "reactor",
        "start_on = \"net-up\"\n\n[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let daemon = Daemon::start(job_dir.path());

    // Loaded but never started: must report Waiting up front.
    daemon
        .initctl()
        .args(&["status", "reactor"])
        .passes()
        .stdout_has("Waiting");

    daemon.initctl().args(&["emit", "net-up"]).passes().stdout_has("net-up emitted");

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "reactor"]).passes().stdout().contains("Running")
    });
    assert!(running, "reactor should auto-start on net-up\n{}", daemon.log());
}

#[test]
fn an_unrelated_event_leaves_a_reactive_job_waiting() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "reactor",
        "start_on = \"net-up\"\n\n[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let daemon = Daemon::start(job_dir.path());

    daemon.initctl().args(&["emit", "net-down"]).passes();
    std::thread::sleep(std::time::Duration::from_millis(50));

    daemon
        .initctl()
        .args(&["status", "reactor"])
        .passes()
        .stdout_has("Waiting")
        .stdout_lacks("Running");
}

#[test]
fn and_condition_only_fires_once_both_sides_have_matched() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "reactor",
        "start_on = \"net-up and filesystem\"\n\n[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let daemon = Daemon::start(job_dir.path());

    daemon.initctl().args(&["emit", "net-up"]).passes();
    std::thread::sleep(std::time::Duration::from_millis(50));
    daemon
        .initctl()
        .args(&["status", "reactor"])
        .passes()
        .stdout_has("Waiting");

    daemon.initctl().args(&["emit", "filesystem"]).passes();
    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "reactor"]).passes().stdout().contains("Running")
    });
    assert!(running, "reactor should start once both sides matched\n{}", daemon.log());
}

#[test]
fn emitting_an_event_with_args_passes_them_as_positional_environment() {
    let job_dir = tempfile::tempdir().unwrap();
    let marker = tempfile::NamedTempFile::new().unwrap();
    let marker_path = marker.path().to_path_buf();
    std::fs::remove_file(&marker_path).unwrap();

    write_job(
        job_dir.path(),
        "reactor",
        &format!(
            "start_on = \"device-added\"\n\n[processes.main]\ncommand = \"env > {}\"\n",
            marker_path.display()
        ),
    );
    let daemon = Daemon::start(job_dir.path());

    daemon.initctl().args(&["emit", "device-added", "ttyS0"]).passes();

    let wrote = wait_for(SPEC_WAIT_MAX_MS, || marker_path.exists());
    assert!(wrote, "reactor should have started and written its marker\n{}", daemon.log());
    let contents = std::fs::read_to_string(&marker_path).unwrap();
    assert!(contents.contains("0=ttyS0"), "env dump did not carry the event arg:\n{contents}");
}
