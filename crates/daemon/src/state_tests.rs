// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;
use upstart_core::environment::Environment;
use upstart_core::job::{JobExpect, ProcessSpec, RespawnPolicy};

fn task_config(name: &str, command: &str, kill_timeout: Duration) -> JobConfig {
    let mut processes = HashMap::new();
    processes.insert(ProcessType::Main, ProcessSpec::new(command));
    JobConfig {
        name: name.to_string(),
        description: None,
        start_on: None,
        stop_on: None,
        processes,
        expect: JobExpect::None,
        respawn: RespawnPolicy::default(),
        normal_exit: vec![0],
        env: Environment::new(),
        kill_timeout,
        single_instance: true,
    }
}

#[test]
fn a_task_that_exits_normally_returns_to_waiting() {
    let mut state = DaemonState::new(vec![task_config(
        "task",
        "/bin/true",
        Duration::from_secs(5),
    )]);

    state.drive_job("task", "", Trigger::GoalStart).unwrap();
    assert!(state.registry.get("task", "").unwrap().state.is_running());

    // Give /bin/true a moment to exit before reaping.
    sleep(Duration::from_millis(50));
    state.reap_children().unwrap();

    assert!(state.registry.get("task", "").unwrap().state.is_waiting());
    assert!(!state.registry.get("task", "").unwrap().failed);
}

#[test]
fn stopping_a_running_service_escalates_to_sigkill_on_timeout() {
    let mut state = DaemonState::new(vec![task_config(
        "server",
        "/bin/sleep 5",
        Duration::from_millis(1),
    )]);

    state.drive_job("server", "", Trigger::GoalStart).unwrap();
    assert!(state.registry.get("server", "").unwrap().state.is_running());

    state.drive_job("server", "", Trigger::GoalStop).unwrap();
    assert_eq!(
        format!("{:?}", state.registry.get("server", "").unwrap().state),
        "Stopping"
    );

    sleep(Duration::from_millis(20));
    state.check_kill_timers().unwrap();
    sleep(Duration::from_millis(50));
    state.reap_children().unwrap();

    assert!(state.registry.get("server", "").unwrap().state.is_waiting());
}
