// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-socket message set: what `initctl` and the daemon send each
//! other over one `SOCK_SEQPACKET` datagram per [`Message`].

use crate::error::WireError;
use crate::frame::{Decoder, Encoder, MAGIC};

/// Message type codes. Job control lives in the low range, event traffic
/// in the 0x0100s, and replies/errors are reserved at the top of the
/// 16-bit space so a future addition to either range can't collide with
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MessageType {
    JobStart = 0x0010,
    JobStop = 0x0011,
    JobQuery = 0x0012,
    JobStatus = 0x0013,
    JobStatusEnd = 0x0014,
    JobListStart = 0x0020,
    JobListEnd = 0x0021,
    EventEmit = 0x0100,
    EventCaused = 0x0101,
    Reply = 0x1000,
    Error = 0x1001,
}

impl MessageType {
    fn from_u16(v: u16) -> Result<Self, WireError> {
        Ok(match v {
            0x0010 => Self::JobStart,
            0x0011 => Self::JobStop,
            0x0012 => Self::JobQuery,
            0x0013 => Self::JobStatus,
            0x0014 => Self::JobStatusEnd,
            0x0020 => Self::JobListStart,
            0x0021 => Self::JobListEnd,
            0x0100 => Self::EventEmit,
            0x0101 => Self::EventCaused,
            0x1000 => Self::Reply,
            0x1001 => Self::Error,
            other => return Err(WireError::UnknownMessageType(other)),
        })
    }
}

/// One request, reply or notification on the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    JobStart {
        name: String,
        instance: String,
        env: Vec<String>,
    },
    JobStop {
        name: String,
        instance: String,
    },
    JobQuery {
        name: String,
        instance: String,
    },
    /// One job's status; a query can produce several of these (for
    /// `instance $VAR` jobs) followed by `JobStatusEnd`.
    JobStatus {
        name: String,
        instance: String,
        goal: String,
        state: String,
    },
    JobStatusEnd,
    JobListStart,
    JobListEnd,
    EventEmit {
        name: String,
        args: Vec<String>,
        env: Vec<String>,
    },
    EventCaused {
        event_id: u32,
        job: String,
    },
    Reply,
    Error {
        message: String,
    },
}

impl Message {
    fn message_type(&self) -> MessageType {
        match self {
            Message::JobStart { .. } => MessageType::JobStart,
            Message::JobStop { .. } => MessageType::JobStop,
            Message::JobQuery { .. } => MessageType::JobQuery,
            Message::JobStatus { .. } => MessageType::JobStatus,
            Message::JobStatusEnd => MessageType::JobStatusEnd,
            Message::JobListStart => MessageType::JobListStart,
            Message::JobListEnd => MessageType::JobListEnd,
            Message::EventEmit { .. } => MessageType::EventEmit,
            Message::EventCaused { .. } => MessageType::EventCaused,
            Message::Reply => MessageType::Reply,
            Message::Error { .. } => MessageType::Error,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        match self {
            Message::JobStart { name, instance, env } => {
                enc.write_str(name).write_str(instance).write_str_array(env);
            }
            Message::JobStop { name, instance } => {
                enc.write_str(name).write_str(instance);
            }
            Message::JobQuery { name, instance } => {
                enc.write_str(name).write_str(instance);
            }
            Message::JobStatus {
                name,
                instance,
                goal,
                state,
            } => {
                enc.write_str(name)
                    .write_str(instance)
                    .write_str(goal)
                    .write_str(state);
            }
            Message::JobStatusEnd | Message::JobListStart | Message::JobListEnd | Message::Reply => {}
            Message::EventEmit { name, args, env } => {
                enc.write_str(name).write_str_array(args).write_str_array(env);
            }
            Message::EventCaused { event_id, job } => {
                enc.write_u32(*event_id).write_str(job);
            }
            Message::Error { message } => {
                enc.write_str(message);
            }
        }
        let body = enc.into_bytes();

        let mut out = Vec::with_capacity(MAGIC.len() + 2 + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.message_type() as u16).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < MAGIC.len() + 2 || &buf[..MAGIC.len()] != MAGIC {
            return Err(WireError::BadMagic);
        }
        let mut type_bytes = [0u8; 2];
        type_bytes.copy_from_slice(&buf[MAGIC.len()..MAGIC.len() + 2]);
        let msg_type = MessageType::from_u16(u16::from_be_bytes(type_bytes))?;
        let mut dec = Decoder::new(&buf[MAGIC.len() + 2..]);

        Ok(match msg_type {
            MessageType::JobStart => Message::JobStart {
                name: dec.read_str()?,
                instance: dec.read_str()?,
                env: dec.read_str_array()?,
            },
            MessageType::JobStop => Message::JobStop {
                name: dec.read_str()?,
                instance: dec.read_str()?,
            },
            MessageType::JobQuery => Message::JobQuery {
                name: dec.read_str()?,
                instance: dec.read_str()?,
            },
            MessageType::JobStatus => Message::JobStatus {
                name: dec.read_str()?,
                instance: dec.read_str()?,
                goal: dec.read_str()?,
                state: dec.read_str()?,
            },
            MessageType::JobStatusEnd => Message::JobStatusEnd,
            MessageType::JobListStart => Message::JobListStart,
            MessageType::JobListEnd => Message::JobListEnd,
            MessageType::EventEmit => Message::EventEmit {
                name: dec.read_str()?,
                args: dec.read_str_array()?,
                env: dec.read_str_array()?,
            },
            MessageType::EventCaused => Message::EventCaused {
                event_id: dec.read_u32()?,
                job: dec.read_str()?,
            },
            MessageType::Reply => Message::Reply,
            MessageType::Error => Message::Error {
                message: dec.read_str()?,
            },
        })
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
