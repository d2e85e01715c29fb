// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-threaded main loop: `poll()` over the control socket, every
//! accepted connection, and the signal self-pipe, dispatching whatever
//! wakes it and checking kill timers on every tick.

use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use upstart_wire::{ControlConnection, ControlListener, WireError};

use crate::dispatch;
use crate::jobconf;
use crate::quiesce::Quiesce;
use crate::signals::SignalPipe;
use crate::state::{DaemonError, DaemonState};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Daemon(#[from] DaemonError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

struct Conn {
    socket: ControlConnection,
}

pub struct MainLoop {
    listener: ControlListener,
    signals: SignalPipe,
    connections: Vec<Conn>,
    state: DaemonState,
    job_dir: PathBuf,
    session_init: bool,
    tick_limit: Duration,
    quiesce: Quiesce,
    shutting_down: bool,
}

impl MainLoop {
    pub fn new(
        listener: ControlListener,
        state: DaemonState,
        job_dir: PathBuf,
        session_init: bool,
        tick_limit: Duration,
    ) -> Result<Self, RunError> {
        let signals = SignalPipe::install().map_err(RunError::Io)?;
        Ok(Self {
            listener,
            signals,
            connections: Vec::new(),
            state,
            job_dir,
            session_init,
            tick_limit,
            quiesce: Quiesce::new(),
            shutting_down: false,
        })
    }

    /// Run until a terminating signal arrives.
    pub fn run(&mut self) -> Result<(), RunError> {
        while !self.shutting_down {
            self.tick()?;
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<(), RunError> {
        let timeout = self
            .state
            .executor
            .next_deadline(Instant::now())
            .unwrap_or(self.tick_limit)
            .min(self.tick_limit);

        let mut pollfds: Vec<libc::pollfd> = Vec::with_capacity(self.connections.len() + 2);
        pollfds.push(raw_pollfd(self.signals.as_raw_fd()));
        pollfds.push(raw_pollfd(self.listener.as_raw_fd()));
        for conn in &self.connections {
            pollfds.push(raw_pollfd(conn.socket.as_raw_fd()));
        }

        // timeout is bounded by MAX_TICK above, so this always fits i32.
        let timeout_ms = timeout.as_millis() as libc::c_int;
        // SAFETY: pollfds is a valid, uniquely-owned buffer sized for
        // `nfds`, and stays alive for the duration of the call.
        let rc = unsafe {
            libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(RunError::Io(err));
        }

        let signal_ready = ready(&pollfds[0]);
        let listener_ready = ready(&pollfds[1]);
        let conn_ready: Vec<bool> = pollfds[2..].iter().map(ready).collect();

        if signal_ready {
            self.handle_signals()?;
        }
        if listener_ready {
            self.accept_connections();
        }

        let mut dead = Vec::new();
        for (i, ready) in conn_ready.into_iter().enumerate() {
            if ready && !self.service_connection(i) {
                dead.push(i);
            }
        }
        for i in dead.into_iter().rev() {
            self.connections.remove(i);
        }

        self.state.check_kill_timers()?;

        if self.quiesce.is_active() {
            self.shutting_down = self.quiesce.tick(&mut self.state, Instant::now())?;
        }
        Ok(())
    }

    fn handle_signals(&mut self) -> Result<(), RunError> {
        for signo in self.signals.drain() {
            match signo {
                libc::SIGCHLD => self.state.reap_children()?,
                libc::SIGTERM => {
                    info!(signal = signo, "beginning graceful shutdown");
                    self.quiesce.begin(&mut self.state, self.session_init, Instant::now())?;
                }
                libc::SIGINT => {
                    info!(signal = signo, "shutting down immediately");
                    self.shutting_down = true;
                }
                libc::SIGHUP => self.reload_jobs()?,
                other => warn!(signal = other, "unhandled signal"),
            }
        }
        Ok(())
    }

    fn reload_jobs(&mut self) -> Result<(), RunError> {
        info!(dir = %self.job_dir.display(), "reloading job definitions");
        match jobconf::load_dir(&self.job_dir) {
            Ok(configs) => {
                for config in configs {
                    self.state.registry.set_config(config);
                }
            }
            Err(e) => warn!("failed to reload job definitions: {e}"),
        }
        Ok(())
    }

    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(socket) => self.connections.push(Conn { socket }),
                Err(WireError::Errno(nix::Error::EAGAIN)) => break,
                Err(e) => {
                    warn!("failed to accept control connection: {e}");
                    break;
                }
            }
        }
    }

    /// Service one ready connection. Returns `false` if it should be
    /// dropped (closed by the peer, or a malformed request).
    fn service_connection(&mut self, index: usize) -> bool {
        let conn = &self.connections[index].socket;
        let message = match conn.recv() {
            Ok(message) => message,
            Err(WireError::Errno(nix::Error::EAGAIN)) => return true,
            Err(e) => {
                warn!("control connection error: {e}");
                return false;
            }
        };

        let replies = dispatch::handle(&mut self.state, message);
        for reply in &replies {
            if let Err(e) = conn.send(reply) {
                warn!("failed to send reply: {e}");
                return false;
            }
        }
        true
    }
}

fn raw_pollfd(fd: i32) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

fn ready(pfd: &libc::pollfd) -> bool {
    pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
