/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for schedule synthesis.
//!
//! Two error enums model the two failure layers:
//!
//! * [`ConsistencyError`]: a backend returned a model that does not satisfy
//!   the program it was given.  Always an internal fault, never
//!   infeasibility.
//! * [`ScheduleError`]: top-level failure of
//!   [`synthesize()`](super::synthesize) and the builder.
//!
//! Infeasibility and interrupted solves are *not* errors; they are reported
//! through [`SynthesisOutcome`](super::SynthesisOutcome).

use thiserror::Error;

use crate::backend::SlotKey;
use crate::flow::FlowError;
use crate::hyperperiod::HyperperiodError;
use crate::schedule::FlowInstance;
use crate::topology::{Link, TopologyError};

// ── Model re-validation ───────────────────────────────────────────────────────

/// A solved model violates a property the constraint program guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("backend left {key} unassigned")]
    MissingValue { key: SlotKey },

    /// The slot lies outside the instance's period window.
    #[error("{key} = {slot} is outside its window [{lo}, {hi})")]
    OutOfRange {
        key: SlotKey,
        slot: u64,
        lo: u64,
        hi: u64,
    },

    #[error("link {link} slot {slot} is used by both {first} and {second}")]
    SlotCollision {
        link: Link,
        slot: u64,
        first: FlowInstance,
        second: FlowInstance,
    },

    #[error(
        "flow '{flow}' instance {instance}: {to} (slot {to_slot}) must follow {from} (slot {from_slot}) by {gap} slot(s)"
    )]
    HopOrder {
        flow: String,
        instance: u64,
        from: Link,
        from_slot: u64,
        to: Link,
        to_slot: u64,
        gap: u64,
    },

    #[error("flow '{flow}' instance {instance} on {link}: expected slot {expected}, got {actual}")]
    Recurrence {
        flow: String,
        instance: u64,
        link: Link,
        expected: u64,
        actual: u64,
    },

    #[error("flow '{flow}' instance {instance} starts before '{dependency}' instance {instance} is delivered")]
    Dependency {
        flow: String,
        dependency: String,
        instance: u64,
    },
}

// ── Top-level synthesis errors ────────────────────────────────────────────────

/// Top-level error type of the scheduler.
///
/// | Variant | Raised by |
/// |---|---|
/// | `Topology` | route resolution in `add_apps` |
/// | `Flow` | flow-set assembly in `add_apps` |
/// | `Hyperperiod` | hyperperiod calculation in `add_apps` |
/// | `Consistency` | model extraction |
/// | `AttemptsExhausted` | the bounded retry loop |
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),

    /// The backend's model failed re-validation.
    #[error("inconsistent model: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Every retry attempt ended without a schedule.
    #[error("no feasible schedule after {attempts} attempt(s)")]
    AttemptsExhausted { attempts: u32 },
}
