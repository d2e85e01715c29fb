// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specifications for upstartd/initctl.
//!
//! These tests are black-box: they spawn the real `upstartd` binary and
//! drive it through `initctl`, verifying stdout and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/lifecycle.rs"]
mod lifecycle;
#[path = "specs/jobs.rs"]
mod jobs;
#[path = "specs/events.rs"]
mod events;
