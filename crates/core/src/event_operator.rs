// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boolean trees of event conditions (`start on` / `stop on`).
//!
//! A job's start/stop condition is a tree of [`EventOperator`] nodes: leaves
//! are `Match` patterns against an event's name and positional arguments,
//! and interior nodes combine their children with `And`/`Or`. Offering an
//! event to the tree may flip some leaves to matched; [`EventOperator::eval`]
//! folds the tree down to a single boolean the same way the job state
//! machine reads "is my start condition satisfied right now".

use crate::environment::Environment;
use crate::event::{Event, EventId};
use serde::{Deserialize, Serialize};

/// A single `name arg1 arg2 ...` pattern, its glob arguments matched
/// positionally against an incoming event's args.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchNode {
    name: String,
    arg_patterns: Vec<String>,
    matched: bool,
    /// The event this leaf last matched, held so the caller can block on it
    /// and release it once the owning job consumes the match.
    matched_event: Option<EventId>,
}

impl MatchNode {
    pub fn new(name: impl Into<String>, arg_patterns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arg_patterns,
            matched: false,
            matched_event: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub fn matched_event(&self) -> Option<EventId> {
        self.matched_event
    }

    fn matches(&self, event: &Event) -> bool {
        if self.matched {
            return false; // already holding a match; don't double-consume
        }
        if !glob_match(&self.name, event.name()) {
            return false;
        }
        self.arg_patterns
            .iter()
            .zip(event.args())
            .all(|(pattern, arg)| glob_match(pattern, arg))
    }
}

/// A tree of `Match` leaves combined with `And`/`Or`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventOperator {
    And(Box<EventOperator>, Box<EventOperator>),
    Or(Box<EventOperator>, Box<EventOperator>),
    Match(MatchNode),
}

impl EventOperator {
    pub fn match_on(name: impl Into<String>, arg_patterns: Vec<String>) -> Self {
        Self::Match(MatchNode::new(name, arg_patterns))
    }

    pub fn and(lhs: EventOperator, rhs: EventOperator) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: EventOperator, rhs: EventOperator) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Offer `event` to every unmatched leaf whose pattern fits it.
    ///
    /// Returns `true` if the tree evaluates to true afterward — i.e. this
    /// event was the one that completed the condition. A leaf only ever
    /// consumes an event once; subsequent matching leaves in the same tree
    /// may also pick it up in the same call, since `start on a and a` is
    /// legitimate (both sides share the single incoming occurrence).
    pub fn handle(&mut self, event: &Event) -> bool {
        self.offer(event);
        self.eval()
    }

    fn offer(&mut self, event: &Event) {
        match self {
            EventOperator::And(lhs, rhs) | EventOperator::Or(lhs, rhs) => {
                lhs.offer(event);
                rhs.offer(event);
            }
            EventOperator::Match(node) => {
                if node.matches(event) {
                    node.matched = true;
                    node.matched_event = Some(event.id());
                }
            }
        }
    }

    /// Fold the tree to a single boolean.
    pub fn eval(&self) -> bool {
        match self {
            EventOperator::And(lhs, rhs) => lhs.eval() && rhs.eval(),
            EventOperator::Or(lhs, rhs) => lhs.eval() || rhs.eval(),
            EventOperator::Match(node) => node.matched,
        }
    }

    /// Clear every leaf's matched state, returning the event ids that were
    /// held so the caller can release their blockers.
    pub fn reset(&mut self) -> Vec<EventId> {
        let mut released = Vec::new();
        self.reset_into(&mut released);
        released
    }

    fn reset_into(&mut self, released: &mut Vec<EventId>) {
        match self {
            EventOperator::And(lhs, rhs) | EventOperator::Or(lhs, rhs) => {
                lhs.reset_into(released);
                rhs.reset_into(released);
            }
            EventOperator::Match(node) => {
                if let Some(id) = node.matched_event.take() {
                    released.push(id);
                }
                node.matched = false;
            }
        }
    }

    /// Whether any leaf in this tree names `event_name` literally (used to
    /// decide up front whether a condition is even reachable by a given
    /// event, without offering a real [`Event`] to find out).
    pub fn references(&self, event_name: &str) -> bool {
        match self {
            EventOperator::And(lhs, rhs) | EventOperator::Or(lhs, rhs) => {
                lhs.references(event_name) || rhs.references(event_name)
            }
            EventOperator::Match(node) => node.name == event_name,
        }
    }

    /// Every event id currently held by a matched leaf.
    pub fn matched_events(&self) -> Vec<EventId> {
        let mut out = Vec::new();
        self.collect_matched_events(&mut out);
        out
    }

    fn collect_matched_events(&self, out: &mut Vec<EventId>) {
        match self {
            EventOperator::And(lhs, rhs) | EventOperator::Or(lhs, rhs) => {
                lhs.collect_matched_events(out);
                rhs.collect_matched_events(out);
            }
            EventOperator::Match(node) => {
                if let Some(id) = node.matched_event {
                    out.push(id);
                }
            }
        }
    }

    /// Fold every matched leaf's originating event into `env`, so a job
    /// started by this condition sees the triggering event's environment.
    ///
    /// When the same leaf name matches more than once (only possible in an
    /// `or` of repeated names reused across evaluations), later values are
    /// appended to the earlier ones with a comma, mirroring how the queue
    /// aggregates repeated event names into one variable.
    pub fn collect(&self, events: &[&Event], env: &mut Environment) {
        for event in events {
            for (i, arg) in event.args().iter().enumerate() {
                env.add(&format!("{}={arg}", i), false);
            }
            env.append(event.env(), true);
        }
    }
}

/// Minimal shell-style glob match: `*` (any run of characters), `?` (any
/// single character), everything else literal. No character classes.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                inner(&pattern[1..], text) || (!text.is_empty() && inner(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => inner(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if p == t => inner(&pattern[1..], &text[1..]),
            _ => false,
        }
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    inner(&pattern, &text)
}

#[cfg(test)]
#[path = "event_operator_tests.rs"]
mod tests;
