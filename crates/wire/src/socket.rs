// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control transport: a `SOCK_SEQPACKET` Unix socket in the abstract
//! namespace, authenticated per-datagram with `SO_PASSCRED` peer
//! credentials instead of filesystem permissions.

use crate::error::WireError;
use crate::message::Message;
use nix::sys::socket::{
    self, AddressFamily, MsgFlags, SockFlag, SockType, UnixAddr,
};
use nix::unistd::{Gid, Uid};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};

/// Authorization rule for an incoming control connection: only root, or
/// the uid the daemon itself runs as, may issue job control commands.
pub fn is_authorized(peer_uid: Uid, daemon_uid: Uid) -> bool {
    peer_uid == Uid::from_raw(0) || peer_uid == daemon_uid
}

/// A bound, listening abstract-namespace control socket.
pub struct ControlListener {
    fd: OwnedFd,
}

impl ControlListener {
    /// Bind an abstract-namespace socket named `\0name` (the leading NUL
    /// is what makes it abstract rather than a filesystem path).
    pub fn bind(name: &str) -> Result<Self, WireError> {
        let fd = socket::socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
            None,
        )?;
        let addr = UnixAddr::new_abstract(name.as_bytes())?;
        socket::bind(fd.as_raw_fd(), &addr)?;
        socket::setsockopt(&fd, socket::sockopt::PassCred, &true)?;
        socket::listen(&fd, socket::Backlog::new(16)?)?;
        Ok(Self { fd })
    }

    pub fn as_raw_fd(&self) -> i32 {
        self.fd.as_raw_fd()
    }

    pub fn accept(&self) -> Result<ControlConnection, WireError> {
        let fd = socket::accept4(
            self.fd.as_raw_fd(),
            SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
        )?;
        // SAFETY: accept4 returns a freshly opened, uniquely owned fd.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(ControlConnection { fd })
    }
}

/// One accepted client connection.
pub struct ControlConnection {
    fd: OwnedFd,
}

impl ControlConnection {
    /// `initctl`'s half of the transport: connect to an already-bound
    /// abstract-namespace control socket.
    pub fn connect(name: &str) -> Result<Self, WireError> {
        let fd = socket::socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_CLOEXEC,
            None,
        )?;
        let addr = UnixAddr::new_abstract(name.as_bytes())?;
        socket::connect(fd.as_raw_fd(), &addr)?;
        Ok(Self { fd })
    }

    pub fn as_raw_fd(&self) -> i32 {
        self.fd.as_raw_fd()
    }

    /// The credentials of the process that connected, as captured by the
    /// kernel at `connect()` time (cannot be spoofed by the peer).
    pub fn peer_credentials(&self) -> Result<(Uid, Gid, i32), WireError> {
        let cred = socket::getsockopt(&self.fd, socket::sockopt::PeerCredentials)?;
        Ok((
            Uid::from_raw(cred.uid()),
            Gid::from_raw(cred.gid()),
            cred.pid(),
        ))
    }

    pub fn send(&self, message: &Message) -> Result<(), WireError> {
        let bytes = message.encode();
        socket::send(self.fd.as_raw_fd(), &bytes, MsgFlags::empty())?;
        Ok(())
    }

    /// Receive one datagram and decode it. `SOCK_SEQPACKET` preserves
    /// message boundaries, so one `recv` is always exactly one [`Message`].
    pub fn recv(&self) -> Result<Message, WireError> {
        let mut buf = [0u8; 8192];
        let n = socket::recv(self.fd.as_raw_fd(), &mut buf, MsgFlags::empty())?;
        Message::decode(&buf[..n])
    }
}

impl AsFd for ControlConnection {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
