// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! upstart-wire: the control-socket wire protocol. A length-tagged binary
//! message format over an abstract-namespace `SOCK_SEQPACKET` Unix socket,
//! authenticated with kernel-verified peer credentials instead of
//! filesystem permissions.

pub mod error;
pub mod frame;
pub mod message;
pub mod socket;

pub use error::WireError;
pub use message::{Message, MessageType};
pub use socket::{is_authorized, ControlConnection, ControlListener};
