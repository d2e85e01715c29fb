// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `initctl start`/`stop`/`status`/`list` against job definition files.

use crate::prelude::*;

#[test]
fn start_runs_the_main_process_and_status_reports_it_running() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "web",
        "[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let daemon = Daemon::start(job_dir.path());

    daemon.initctl().args(&["start", "web"]).passes().stdout_has("web start/running");

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "web"]).passes().stdout().contains("Running")
    });
    assert!(running, "web should reach Running\n{}", daemon.log());
}

#[test]
fn stop_drives_a_running_job_back_to_waiting() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "web",
        "[processes.main]\ncommand = \"/bin/sleep 30\"\n",
    );
    let daemon = Daemon::start(job_dir.path());
    daemon.initctl().args(&["start", "web"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "web"]).passes().stdout().contains("Running")
    });

    daemon.initctl().args(&["stop", "web"]).passes().stdout_has("web stop/waiting");

    let waiting = wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.initctl().args(&["status", "web"]).passes().stdout().contains("Waiting")
    });
    assert!(waiting, "web should settle back to Waiting\n{}", daemon.log());
}

#[test]
fn list_reports_every_loaded_job_even_before_it_is_started() {
    let job_dir = tempfile::tempdir().unwrap();
    write_job(
        job_dir.path(),
        "web",
        "[processes.main]\ncommand = \"/bin/true\"\n",
    );
    write_job(
        job_dir.path(),
        "worker",
        "[processes.main]\ncommand = \"/bin/true\"\n",
    );
    let daemon = Daemon::start(job_dir.path());

    daemon
        .initctl()
        .args(&["list"])
        .passes()
        .stdout_has("web")
        .stdout_has("worker");
}

#[test]
fn status_of_an_unknown_job_fails() {
    let job_dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(job_dir.path());

    daemon.initctl().args(&["status", "nope"]).fails();
}

#[test]
fn extra_env_passed_to_start_reaches_the_process() {
    let job_dir = tempfile::tempdir().unwrap();
    let marker = tempfile::NamedTempFile::new().unwrap();
    let marker_path = marker.path().to_path_buf();
    std::fs::remove_file(&marker_path).unwrap();

    write_job(
        job_dir.path(),
        "writer",
        &format!(
            "[processes.main]\ncommand = \"echo $GREETING > {}\"\n",
            marker_path.display()
        ),
    );
    let daemon = Daemon::start(job_dir.path());

    daemon
        .initctl()
        .args(&["start", "writer", "--env", "GREETING=hello"])
        .passes();

    let wrote = wait_for(SPEC_WAIT_MAX_MS, || marker_path.exists());
    assert!(wrote, "job should have written its marker file\n{}", daemon.log());
    let contents = std::fs::read_to_string(&marker_path).unwrap();
    assert_eq!(contents.trim(), "hello");
}
