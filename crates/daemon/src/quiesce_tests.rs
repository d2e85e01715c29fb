// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::{Duration, Instant};

use super::*;
use upstart_core::job::{JobConfig, JobExpect, ProcessSpec};
use upstart_core::{EventOperator, RespawnPolicy};

fn service(name: &str, command: &str) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        description: None,
        start_on: None,
        stop_on: None,
        processes: [(upstart_core::job::ProcessType::Main, ProcessSpec::new(command))]
            .into_iter()
            .collect(),
        expect: JobExpect::None,
        respawn: RespawnPolicy {
            respawn: false,
            limit: 10,
            interval: Duration::from_secs(5),
        },
        normal_exit: vec![],
        env: upstart_core::Environment::new(),
        kill_timeout: Duration::from_millis(50),
        single_instance: true,
    }
}

#[test]
fn a_system_instance_skips_the_wait_phase_and_stops_everything() {
    let mut state = DaemonState::new(vec![service("web", "/bin/sleep 5")]);
    state.drive_job("web", "", Trigger::GoalStart).unwrap();
    assert_eq!(state.registry.get("web", "").unwrap().state, JobState::Running);

    let mut quiesce = Quiesce::new();
    quiesce.begin(&mut state, false, Instant::now()).unwrap();
    assert!(quiesce.is_active());
    assert_eq!(state.registry.get("web", "").unwrap().state, JobState::Stopping);
}

#[test]
fn a_session_instance_with_no_session_end_reactor_also_skips_the_wait_phase() {
    let mut state = DaemonState::new(vec![service("web", "/bin/sleep 5")]);
    state.drive_job("web", "", Trigger::GoalStart).unwrap();

    let mut quiesce = Quiesce::new();
    quiesce.begin(&mut state, true, Instant::now()).unwrap();
    assert_eq!(state.registry.get("web", "").unwrap().state, JobState::Stopping);
}

#[test]
fn a_session_instance_with_a_session_end_reactor_enters_the_wait_phase() {
    let mut reactor = service("backup", "/bin/true");
    reactor.start_on = Some(EventOperator::match_on("session-end", vec![]));
    let running = service("web", "/bin/sleep 5");

    let mut state = DaemonState::new(vec![reactor, running]);
    state.drive_job("web", "", Trigger::GoalStart).unwrap();
    assert_eq!(state.registry.get("web", "").unwrap().state, JobState::Running);

    let mut quiesce = Quiesce::new();
    quiesce.begin(&mut state, true, Instant::now()).unwrap();

    // `web` was already running before quiesce began, so it is stopped
    // immediately even though we're in the wait phase.
    assert_eq!(state.registry.get("web", "").unwrap().state, JobState::Stopping);
    // `backup` reacted to `session-end` and was allowed to start.
    assert!(state.registry.get("backup", "").unwrap().state != JobState::Waiting);

    let done = quiesce.tick(&mut state, Instant::now()).unwrap();
    assert!(!done, "wait-phase deadline has not elapsed and web is still stopping");
}

#[test]
fn the_wait_phase_advances_to_the_kill_phase_once_its_deadline_passes() {
    let mut reactor = service("backup", "/bin/sleep 5");
    reactor.start_on = Some(EventOperator::match_on("session-end", vec![]));

    let mut state = DaemonState::new(vec![reactor]);
    let mut quiesce = Quiesce::new();
    let start = Instant::now();
    quiesce.begin(&mut state, true, start).unwrap();
    assert_eq!(state.registry.get("backup", "").unwrap().state, JobState::Running);

    // Long past the 5s wait-phase deadline: the kill phase should begin,
    // stopping the reactor that the wait phase let run.
    let done = quiesce.tick(&mut state, start + Duration::from_secs(10)).unwrap();
    assert!(!done);
    assert_eq!(state.registry.get("backup", "").unwrap().state, JobState::Stopping);
}

#[test]
fn quiesce_completes_once_every_job_reaches_waiting() {
    let mut state = DaemonState::new(vec![service("task", "/bin/true")]);
    state.drive_job("task", "", Trigger::GoalStart).unwrap();

    let mut quiesce = Quiesce::new();
    let start = Instant::now();
    quiesce.begin(&mut state, false, start).unwrap();

    std::thread::sleep(Duration::from_millis(30));
    state.reap_children().unwrap();

    let done = quiesce.tick(&mut state, start).unwrap();
    assert!(done);
}
