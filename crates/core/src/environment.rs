// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered `KEY=VALUE` tables and shell-like `$VAR` / `${VAR:-alt}` expansion.
//!
//! An [`Environment`] backs every place the model carries a process
//! environment: a job's `env`, `start_env` and `stop_env`, an event's
//! captured environment, and the environment handed to a spawned process.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while expanding a template against an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// `${NAME}` expanded to a string that is not a valid identifier.
    #[error("illegal parameter name '{0}'")]
    IllegalParam(String),
    /// A referenced variable has no value and no default was given.
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),
    /// `${NAME:x...}` where `x` is neither `-` nor `+`.
    #[error("expected ':-', ':+', '-' or '+' operator")]
    ExpectedOperator,
    /// A `${` was never closed by a matching `}`.
    #[error("mismatched braces")]
    MismatchedBraces,
}

/// An ordered list of `KEY=VALUE` strings with unique keys.
///
/// Order matters: it is preserved across `add`/`append` because a job's
/// spawned processes see environment variables in declaration order, and
/// [`Environment::collect`]-derived lists (in `upstart-engine`) rely on it
/// for deterministic `NAME=event1,event2` aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment(Vec<String>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build directly from already-validated `KEY=VALUE` strings.
    pub fn from_entries(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut env = Self::new();
        for entry in entries {
            env.add(&entry.into(), true);
        }
        env
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the raw `KEY=VALUE` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn key_of(entry: &str) -> &str {
        entry.split_once('=').map_or(entry, |(k, _)| k)
    }

    /// Add a `KEY=VALUE` string, or a bare `KEY` resolved from the process
    /// environment (dropped if the process has no such variable).
    ///
    /// In replace mode, a collision with a bare key whose source is absent
    /// removes the existing entry; in non-replace mode, any collision
    /// preserves whatever was already there.
    pub fn add(&mut self, entry: &str, replace: bool) {
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => match std::env::var(entry) {
                Ok(v) => (entry.to_string(), Some(v)),
                Err(_) => (entry.to_string(), None),
            },
        };

        let existing = self.0.iter().position(|e| Self::key_of(e) == key);
        match (existing, value) {
            (Some(idx), Some(v)) => {
                if replace {
                    self.0[idx] = format!("{key}={v}");
                }
            }
            (Some(idx), None) => {
                if replace {
                    self.0.remove(idx);
                }
            }
            (None, Some(v)) => self.0.push(format!("{key}={v}")),
            (None, None) => {}
        }
    }

    /// Add every entry of `other`, applying the same replace policy per entry.
    pub fn append(&mut self, other: &Environment, replace: bool) {
        for entry in &other.0 {
            self.add(entry, replace);
        }
    }

    /// Unconditionally set `key` to `value`, overwriting any existing entry.
    pub fn set(&mut self, key: &str, value: &str) {
        self.add(&format!("{key}={value}"), true);
    }

    /// Remove `key` if present. Returns the removed `KEY=VALUE` entry.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|e| Self::key_of(e) == key)?;
        Some(self.0.remove(idx))
    }

    /// Look up the value of `key`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|e| {
            let (k, v) = e.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Raw `KEY=VALUE` entry at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Look up a value whose key matches the first `len` bytes of `name`.
    ///
    /// Used by `expand` to resolve `$NAME` references embedded in a larger
    /// template without allocating a separate key string for the lookup.
    pub fn getn(&self, name: &str, len: usize) -> Option<&str> {
        let target = name.get(..len)?;
        self.0.iter().find_map(|e| {
            let (k, v) = e.split_once('=')?;
            (k == target).then_some(v)
        })
    }

    /// True if `key` starts with an ASCII letter or underscore and contains
    /// only ASCII alphanumerics and underscores thereafter.
    pub fn valid(key: &str) -> bool {
        let mut chars = key.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// True if every entry is `KEY=VALUE` with a [`valid`](Self::valid) key.
    pub fn all_valid(&self) -> bool {
        self.0
            .iter()
            .all(|e| matches!(e.split_once('='), Some((k, _)) if Self::valid(k)))
    }

    /// Expand `$NAME`, `${NAME}` and `${NAME<op>alt}` forms in `template`.
    ///
    /// See the module-level grammar: greedy `$NAME`, braced `${NAME}` (whose
    /// inner text is itself expanded and validated as an identifier), and
    /// the four default-value operators `-`, `:-`, `+`, `:+`. `${}` is a
    /// literal `$`.
    pub fn expand(&self, template: &str) -> Result<String, EnvError> {
        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'$' {
                // Copy one UTF-8 scalar at a time to stay char-boundary safe.
                let ch_len = utf8_char_len(bytes[i]);
                out.push_str(&template[i..i + ch_len]);
                i += ch_len;
                continue;
            }

            // bytes[i] == '$'
            if i + 1 >= bytes.len() {
                out.push('$');
                i += 1;
                continue;
            }

            if bytes[i + 1] == b'{' {
                if i + 2 < bytes.len() && bytes[i + 2] == b'}' {
                    out.push('$');
                    i += 3;
                    continue;
                }
                let group = scan_brace_group(&template[i + 2..])?;
                out.push_str(&self.expand_group(template, i + 2, &group)?);
                i += 2 + group.consumed;
                continue;
            }

            if is_ident_start(bytes[i + 1]) {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_cont(bytes[end]) {
                    end += 1;
                }
                let name = &template[start..end];
                match self.lookup(name) {
                    Some(v) => out.push_str(v),
                    None => return Err(EnvError::UnknownParam(name.to_string())),
                }
                i = end;
                continue;
            }

            // Lone '$' not followed by '{' or an identifier start: literal.
            out.push('$');
            i += 1;
        }
        Ok(out)
    }

    fn expand_group(
        &self,
        template: &str,
        group_start: usize,
        group: &BraceGroup,
    ) -> Result<String, EnvError> {
        let name_raw = &template[group_start..group_start + group.name_len];
        match &group.op {
            None => {
                let name = self.expand(name_raw)?;
                if !Self::valid(&name) {
                    return Err(EnvError::IllegalParam(name));
                }
                self.lookup(&name)
                    .map(str::to_string)
                    .ok_or(EnvError::UnknownParam(name))
            }
            Some(op) => {
                let alt_start = group_start + op.alt_offset;
                let alt_raw = &template[alt_start..alt_start + op.alt_len];
                let value = self.lookup(name_raw);
                let use_alt = match op.kind {
                    OpKind::Dash => value.is_none(),
                    OpKind::ColonDash => value.map(str::is_empty).unwrap_or(true),
                    OpKind::Plus => value.is_some(),
                    OpKind::ColonPlus => value.map(|v| !v.is_empty()).unwrap_or(false),
                };
                match (use_alt, op.kind) {
                    (true, _) => self.expand(alt_raw),
                    (false, OpKind::Dash) | (false, OpKind::ColonDash) => {
                        Ok(value.unwrap_or_default().to_string())
                    }
                    (false, OpKind::Plus) | (false, OpKind::ColonPlus) => Ok(String::new()),
                }
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(String::as_str)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn utf8_char_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

#[derive(Debug, Clone, Copy)]
enum OpKind {
    Dash,
    ColonDash,
    Plus,
    ColonPlus,
}

#[derive(Debug)]
struct Op {
    kind: OpKind,
    alt_offset: usize,
    alt_len: usize,
}

#[derive(Debug)]
struct BraceGroup {
    /// Length, relative to the scan start, of the name portion.
    name_len: usize,
    op: Option<Op>,
    /// Total bytes consumed from `${` onward, including the closing `}`.
    consumed: usize,
}

/// Scan the contents of a `${...}` group, starting just after `${`.
///
/// `s` is everything after `${` up to the end of the template. Returns the
/// name length, the optional operator + alt-text span, and how many bytes
/// (from just after `${`) the whole group (including the closing `}`) took.
fn scan_brace_group(s: &str) -> Result<BraceGroup, EnvError> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut depth = 1i32;
    let mut name_len = None;
    let mut op: Option<(OpKind, usize)> = None; // (kind, alt start offset)

    while i < bytes.len() {
        let c = bytes[i];
        if name_len.is_none() {
            match c {
                b'}' => {
                    name_len = Some(i);
                    return Ok(BraceGroup {
                        name_len: i,
                        op: None,
                        consumed: i + 1,
                    });
                }
                b':' => {
                    let next = bytes.get(i + 1).copied();
                    match next {
                        Some(b'-') => {
                            op = Some((OpKind::ColonDash, i + 2));
                            name_len = Some(i);
                            i += 2;
                            continue;
                        }
                        Some(b'+') => {
                            op = Some((OpKind::ColonPlus, i + 2));
                            name_len = Some(i);
                            i += 2;
                            continue;
                        }
                        _ => return Err(EnvError::ExpectedOperator),
                    }
                }
                b'-' => {
                    op = Some((OpKind::Dash, i + 1));
                    name_len = Some(i);
                    i += 1;
                    continue;
                }
                b'+' => {
                    op = Some((OpKind::Plus, i + 1));
                    name_len = Some(i);
                    i += 1;
                    continue;
                }
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                _ => i += 1,
            }
        } else {
            match c {
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let name_len = name_len.expect("set above");
                        let op = op.map(|(kind, alt_offset)| Op {
                            kind,
                            alt_offset,
                            alt_len: i - alt_offset,
                        });
                        return Ok(BraceGroup {
                            name_len,
                            op,
                            consumed: i + 1,
                        });
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }

    Err(EnvError::MismatchedBraces)
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
