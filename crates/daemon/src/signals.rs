// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal delivery via the self-pipe trick.
//!
//! The main loop is a single-threaded `poll()` over the control socket and
//! this pipe's read end. Signal handlers only do the one thing that is
//! safe inside a signal handler: write a byte to a pipe. Everything else
//! (reaping children, telling clients to shut down) happens back on the
//! main thread once `poll` wakes up.

use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

const WATCHED_SIGNALS: [libc::c_int; 5] = [
    libc::SIGTERM,
    libc::SIGINT,
    libc::SIGHUP,
    libc::SIGCHLD,
    libc::SIGPWR,
];

extern "C" fn handle(signo: libc::c_int) {
    let fd = WRITE_FD.load(Ordering::Relaxed);
    if fd < 0 {
        return;
    }
    let byte = signo as u8;
    // SAFETY: write(2) with a single-byte buffer on the stack is
    // async-signal-safe; the pipe is non-blocking so this never stalls
    // the handler.
    unsafe {
        libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
    }
}

/// The read end of the self-pipe, and the set of signals it now carries.
pub struct SignalPipe {
    read_fd: OwnedFd,
}

impl SignalPipe {
    /// Create the pipe and install handlers for every signal the daemon
    /// reacts to. Must be called once, before the main loop starts.
    pub fn install() -> std::io::Result<Self> {
        let mut fds: [RawFd; 2] = [-1, -1];
        // SAFETY: fds is a valid two-element buffer for pipe2 to fill in.
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC | libc::O_NONBLOCK) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        // SAFETY: pipe2 returned two freshly opened, uniquely owned fds.
        let read_fd = unsafe { OwnedFd::from_raw_fd(fds[0]) };
        let write_fd = fds[1];
        WRITE_FD.store(write_fd, Ordering::Relaxed);

        for &signal in &WATCHED_SIGNALS {
            // SAFETY: `handle` only performs an async-signal-safe write.
            unsafe {
                libc::signal(signal, handle as libc::sighandler_t);
            }
        }

        Ok(Self { read_fd })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        use std::os::fd::AsRawFd;
        self.read_fd.as_raw_fd()
    }

    /// Drain every signal byte currently buffered in the pipe.
    pub fn drain(&self) -> Vec<libc::c_int> {
        use std::os::fd::AsRawFd;
        let mut buf = [0u8; 64];
        let mut signals = Vec::new();
        loop {
            // SAFETY: buf is a valid 64-byte buffer; the fd is ours and
            // non-blocking, so this returns promptly once drained.
            let n = unsafe {
                libc::read(
                    self.read_fd.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            };
            if n <= 0 {
                break;
            }
            signals.extend(buf[..n as usize].iter().map(|&b| b as libc::c_int));
        }
        signals
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
