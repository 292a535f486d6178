/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod calculation.
//!
//! The hyperperiod of a flow set is the Least Common Multiple (LCM) of all
//! flow periods, in time slots.  It is the length of the cycle after which the
//! whole schedule repeats; a flow with period `P` recurs `hyperperiod / P`
//! times inside it.
//!
//! | Situation | Result |
//! |-----------|--------|
//! | no periods (empty flow set) | `Ok(1)`, a one-slot cycle |
//! | `(a / gcd) * b` does not fit `u64` | `Err(Overflow)` |
//! | LCM above the configured limit | `Err(TooLarge)`; every slot of the cycle becomes solver variables |

pub mod math;

use tracing::{debug, info, warn};

use math::lcm_of_slice;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on the hyperperiod, in time slots.
pub const DEFAULT_HYPERPERIOD_LIMIT: u64 = 65_536;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// LCM calculation overflowed `u64`.
    ///
    /// Contains the two operands that caused the overflow.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => write!(
                f,
                "hyperperiod of {value} slots exceeds the limit of {limit} slots"
            ),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod for one flow set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    /// Hyperperiod in time slots.
    pub hyperperiod: u64,

    /// Unique periods present in the flow set (sorted, deduplicated).
    pub unique_periods: Vec<u64>,

    /// Number of periods that contributed to the hyperperiod.
    pub flow_count: usize,
}

impl Default for HyperperiodInfo {
    /// The hyperperiod of an empty flow set.
    fn default() -> Self {
        Self {
            hyperperiod: 1,
            unique_periods: Vec::new(),
            flow_count: 0,
        }
    }
}

impl HyperperiodInfo {
    /// Compute the hyperperiod of `periods`, rejecting results above `limit`.
    ///
    /// Zero periods are ignored; they never reach this point because
    /// `set_frame` rejects them.
    ///
    /// # Errors
    /// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
    /// * [`HyperperiodError::TooLarge`] – result exceeds `limit`.
    pub fn calculate(periods: &[u64], limit: u64) -> Result<Self, HyperperiodError> {
        let unique_periods: Vec<u64> = {
            let mut v: Vec<u64> = periods.iter().copied().filter(|&p| p > 0).collect();
            v.sort_unstable();
            v.dedup();
            v
        };

        let hyperperiod = lcm_of_slice(&unique_periods)?;

        if hyperperiod > limit {
            warn!(hyperperiod, limit, "Hyperperiod exceeds configured limit");
            return Err(HyperperiodError::TooLarge {
                value: hyperperiod,
                limit,
            });
        }

        info!(
            flow_count = periods.len(),
            unique_count = unique_periods.len(),
            hyperperiod,
            "Calculated hyperperiod"
        );
        for p in &unique_periods {
            debug!(period = p, instances = hyperperiod / p, "  unique period");
        }

        Ok(Self {
            hyperperiod,
            unique_periods,
            flow_count: periods.len(),
        })
    }

    /// Number of instances a flow of `period` has inside the hyperperiod.
    pub fn instances_of(&self, period: u64) -> u64 {
        if period == 0 {
            0
        } else {
            self.hyperperiod / period
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
