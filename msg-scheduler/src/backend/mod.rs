/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Solver seam: the constraint sink the builder writes to, and the backend
//! contract that solves what was written.
//!
//! The scheduler only ever talks to these traits.  A backend is an adapter
//! that records the declared variables and constraints in whatever form its
//! engine needs and answers [`SolverBackend::solve`].
//!
//! | Sink call | Meaning |
//! |---|---|
//! | `declare_variable(key, lo..hi)` | integer `v` with `lo <= v < hi` |
//! | `assert_equal(a, b, c)` | `a == b + c` |
//! | `assert_less(a, b, gap)` | `a + gap <= b` |
//! | `assert_distinct([v..])` | pairwise different values |

pub mod search;

pub use search::SearchBackend;

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::topology::Link;

// ── Variables ─────────────────────────────────────────────────────────────────

/// Opaque handle to a declared variable.  Only meaningful for the sink that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarHandle(pub(crate) usize);

impl VarHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a slot variable stands for: the slot in which `flow`'s instance
/// `instance` occupies `link`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub flow: String,
    pub instance: u64,
    pub link: Link,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.flow, self.instance, self.link)
    }
}

// ── ConstraintSink ────────────────────────────────────────────────────────────

/// Write-only view of a constraint program.
pub trait ConstraintSink {
    /// Drop every variable and constraint recorded so far.  Handles issued
    /// before the call are invalid afterwards.
    fn clear(&mut self);

    /// Declare an integer variable bounded to `domain` (half-open).
    fn declare_variable(&mut self, key: SlotKey, domain: Range<u64>) -> VarHandle;

    /// `lhs == rhs + offset`.
    fn assert_equal(&mut self, lhs: VarHandle, rhs: VarHandle, offset: i64);

    /// `before + gap <= after`.  With `gap >= 1` this is a strict ordering.
    fn assert_less(&mut self, before: VarHandle, after: VarHandle, gap: u64);

    /// All `vars` take pairwise different values.
    fn assert_distinct(&mut self, vars: &[VarHandle]);
}

// ── SolverBackend ─────────────────────────────────────────────────────────────

/// Budget and cancellation for one `solve` call.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Wall-clock budget.
    pub timeout: Option<Duration>,

    /// Search-step budget (backend-defined unit).
    pub max_steps: Option<u64>,

    /// Checked periodically; when cancelled the backend stops and reports
    /// [`SolveOutcome::Interrupted`].
    pub cancel: Option<CancellationToken>,
}

impl SolveOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Why a solve stopped without an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    Timeout,
    StepLimit,
    Cancelled,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptReason::Timeout => write!(f, "time budget exhausted"),
            InterruptReason::StepLimit => write!(f, "step budget exhausted"),
            InterruptReason::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

/// Result of [`SolverBackend::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A satisfying assignment.
    Sat(Model),

    /// The constraints have no solution.
    Unsat,

    /// Stopped before an answer was found.
    Interrupted(InterruptReason),
}

/// A constraint sink that can also search for a satisfying assignment.
pub trait SolverBackend: ConstraintSink {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Search for an assignment of every declared variable.
    fn solve(&mut self, options: &SolveOptions) -> SolveOutcome;
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// Variable assignment returned by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: HashMap<VarHandle, u64>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, var: VarHandle, value: u64) {
        self.values.insert(var, value);
    }

    /// `None` if the backend did not assign `var`.
    pub fn value_of(&self, var: VarHandle) -> Option<u64> {
        self.values.get(&var).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(VarHandle, u64)> for Model {
    fn from_iter<I: IntoIterator<Item = (VarHandle, u64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
