// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scalar and string encodings shared by every wire message.
//!
//! Every frame starts with the literal `upstart\n` followed by a 16-bit
//! message type, then a sequence of tagged scalars. Integers are
//! network-order (big-endian) 32-bit values; strings are length-prefixed
//! UTF-8; string arrays are a run of length-prefixed strings terminated by
//! the `u32::MAX` sentinel length rather than a leading count, so a sender
//! streaming variable numbers of events doesn't need to know the total
//! up front.

use crate::error::WireError;

pub const MAGIC: &[u8; 8] = b"upstart\n";
const STRING_ARRAY_END: u32 = u32::MAX;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn write_str_array<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.write_str(item.as_ref());
        }
        self.write_u32(STRING_ARRAY_END);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(arr))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(arr))
    }

    pub fn read_str(&mut self) -> Result<String, WireError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn read_str_array(&mut self) -> Result<Vec<String>, WireError> {
        let mut out = Vec::new();
        loop {
            let mark = self.pos;
            let len = self.read_u32()?;
            if len == STRING_ARRAY_END {
                break;
            }
            self.pos = mark;
            out.push(self.read_str()?);
        }
        Ok(out)
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::Truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or(WireError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
