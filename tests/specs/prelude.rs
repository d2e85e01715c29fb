// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    let poll_interval = Duration::from_millis(SPEC_POLL_INTERVAL_MS);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

pub fn upstartd_binary() -> PathBuf {
    binary_path("upstartd")
}

fn initctl_binary() -> PathBuf {
    binary_path("initctl")
}

/// A running `upstartd` instance under an isolated state directory and a
/// socket name unique to this test, plus the `initctl` builder that talks
/// to it.
pub struct Daemon {
    child: Child,
    state_dir: tempfile::TempDir,
    socket_name: String,
}

impl Daemon {
    /// Start `upstartd` against `job_dir` (create it yourself first if you
    /// want pre-loaded jobs) and wait for its control socket to come up.
    pub fn start(job_dir: &Path) -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        // Abstract-namespace sockets are global to the host, so the name
        // has to be unique across concurrently running tests; the tempdir
        // already got one from the OS, so borrow it.
        let socket_name = format!(
            "upstart-spec-{}",
            state_dir.path().file_name().unwrap().to_string_lossy()
        );

        let child = Command::new(upstartd_binary())
            .env("UPSTART_STATE_DIR", state_dir.path())
            .env("UPSTART_JOB_DIR", job_dir)
            .env("UPSTART_SOCKET_NAME", &socket_name)
            .env("UPSTART_TICK_MS", "20")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("upstartd should spawn");

        let daemon = Self {
            child,
            state_dir,
            socket_name,
        };

        let up = wait_for(SPEC_WAIT_MAX_MS, || {
            daemon.initctl().args(&["list"]).command().output().is_ok_and(|o| o.status.success())
        });
        assert!(up, "upstartd did not come up in time\n{}", daemon.log());
        daemon
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn signal(&self, signal: Signal) {
        let _ = signal::kill(Pid::from_raw(self.child.id() as i32), signal);
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.state_dir.path().join("upstartd.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Returns true once the process has actually exited.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    pub fn initctl(&self) -> CliBuilder {
        CliBuilder::new(&self.socket_name)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if !self.has_exited() {
            self.signal(Signal::SIGKILL);
            let _ = self.child.wait();
        }
    }
}

pub struct CliBuilder {
    args: Vec<String>,
    socket_name: String,
}

impl CliBuilder {
    fn new(socket_name: &str) -> Self {
        Self {
            args: Vec::new(),
            socket_name: socket_name.to_string(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(initctl_binary());
        cmd.args(&self.args);
        cmd.env("UPSTART_SOCKET_NAME", &self.socket_name);
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("initctl should run");
        assert!(
            output.status.success(),
            "expected initctl to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("initctl should run");
        assert!(
            !output.status.success(),
            "expected initctl to fail, but it passed\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }
}

/// Write a job definition file under `dir`, creating `dir` if needed.
pub fn write_job(dir: &Path, name: &str, toml: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(format!("{name}.toml")), toml).unwrap();
}
