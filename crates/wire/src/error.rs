// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame truncated before expected field")]
    Truncated,
    #[error("frame does not start with the upstart magic")]
    BadMagic,
    #[error("unknown message type 0x{0:04x}")]
    UnknownMessageType(u16),
    #[error("string field was not valid utf-8")]
    InvalidUtf8,
    #[error("peer credentials did not pass authorization")]
    Unauthorized,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Errno(#[from] nix::Error),
}
