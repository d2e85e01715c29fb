// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: a thin wrapper over the control socket that sends one
//! [`Message`] and collects every reply up to (and including) a terminator.

use thiserror::Error;
use upstart_wire::{ControlConnection, Message, WireError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to upstartd: {0}")]
    Connect(#[source] WireError),
    #[error("lost connection to upstartd: {0}")]
    Io(#[source] WireError),
    #[error("upstartd reported an error: {0}")]
    Server(String),
    #[error("upstartd sent an unexpected reply")]
    UnexpectedReply,
}

/// Name of the abstract-namespace socket `upstartd` listens on, matching
/// its own resolution of `UPSTART_SOCKET_NAME`.
fn socket_name() -> String {
    std::env::var("UPSTART_SOCKET_NAME").unwrap_or_else(|_| "upstart-control".to_string())
}

pub struct DaemonClient {
    conn: ControlConnection,
}

impl DaemonClient {
    pub fn connect() -> Result<Self, ClientError> {
        let conn = ControlConnection::connect(&socket_name()).map_err(ClientError::Connect)?;
        Ok(Self { conn })
    }

    /// Send `message` and read back exactly one reply, turning
    /// `Message::Error` into `Err`.
    pub fn request(&self, message: Message) -> Result<Message, ClientError> {
        self.conn.send(&message).map_err(ClientError::Io)?;
        match self.conn.recv().map_err(ClientError::Io)? {
            Message::Error { message } => Err(ClientError::Server(message)),
            reply => Ok(reply),
        }
    }

    /// Send `message` and read replies until `is_terminator` matches one,
    /// collecting everything before it (the terminator itself is dropped).
    pub fn request_stream(
        &self,
        message: Message,
        is_terminator: impl Fn(&Message) -> bool,
    ) -> Result<Vec<Message>, ClientError> {
        self.conn.send(&message).map_err(ClientError::Io)?;
        let mut replies = Vec::new();
        loop {
            match self.conn.recv().map_err(ClientError::Io)? {
                Message::Error { message } => return Err(ClientError::Server(message)),
                reply if is_terminator(&reply) => break,
                reply => replies.push(reply),
            }
        }
        Ok(replies)
    }
}
