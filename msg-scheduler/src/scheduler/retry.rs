/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Bounded retry driver for randomised scenarios.
//!
//! Each attempt is a closure call that builds and solves a fresh problem (for
//! example a new random topology).  The loop stops at the first schedule, at
//! a caller cancellation, or after `max_attempts`.

use tracing::{info, warn};

use crate::backend::InterruptReason;
use crate::schedule::Schedule;

use super::{ScheduleError, SynthesisOutcome};

/// How a retry loop ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Attempt number `attempt` (1-based) produced `schedule`.
    Found { attempt: u32, schedule: Schedule },

    /// The caller cancelled during attempt `attempt`.
    Cancelled { attempt: u32 },
}

/// Call `attempt(n)` for `n = 1..=max_attempts` until one yields a schedule.
///
/// An infeasible attempt, or one that ran out of its time / step budget, is
/// followed by the next attempt.  A cancelled attempt ends the loop.
///
/// # Errors
/// * Any error returned by `attempt`, immediately.
/// * [`ScheduleError::AttemptsExhausted`] when no attempt succeeded.
pub fn synthesize_with_retries<F>(
    max_attempts: u32,
    mut attempt: F,
) -> Result<RetryOutcome, ScheduleError>
where
    F: FnMut(u32) -> Result<SynthesisOutcome, ScheduleError>,
{
    for n in 1..=max_attempts {
        match attempt(n)? {
            SynthesisOutcome::Feasible(schedule) => {
                info!(attempt = n, max_attempts, "Feasible schedule found");
                return Ok(RetryOutcome::Found {
                    attempt: n,
                    schedule,
                });
            }
            SynthesisOutcome::Interrupted(InterruptReason::Cancelled) => {
                warn!(attempt = n, "Retry loop cancelled");
                return Ok(RetryOutcome::Cancelled { attempt: n });
            }
            SynthesisOutcome::Interrupted(reason) => {
                warn!(attempt = n, max_attempts, %reason, "Attempt interrupted, retrying");
            }
            SynthesisOutcome::Infeasible => {
                warn!(attempt = n, max_attempts, "Attempt infeasible, retrying");
            }
        }
    }

    Err(ScheduleError::AttemptsExhausted {
        attempts: max_attempts,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
