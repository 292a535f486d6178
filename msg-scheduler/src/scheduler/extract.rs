/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Model → [`Schedule`] conversion with full re-validation.
//!
//! A backend is trusted to return a model, not to return a *correct* one.
//! Every property the builder encoded is checked again here against the
//! concrete slot values:
//!
//! 1. every variable is assigned and lies in its instance window
//! 2. no two instances share a `(link, slot)`
//! 3. hop ordering along every path
//! 4. periodic recurrence
//! 5. dependency ordering
//!
//! The first violation found is returned as a [`ConsistencyError`].

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::backend::{Model, SlotKey};
use crate::schedule::{FlowInstance, Schedule};
use crate::topology::Link;

use super::{ConsistencyError, PlannedFlow, SchedulePlan};

/// Per flow, per instance: link → slot.
type SlotTable = Vec<Vec<BTreeMap<Link, u64>>>;

/// Reads a model back through the plan that produced it.
pub struct ScheduleExtractor<'p> {
    plan: &'p SchedulePlan,
}

impl<'p> ScheduleExtractor<'p> {
    pub fn new(plan: &'p SchedulePlan) -> Self {
        Self { plan }
    }

    /// Rebuild the schedule described by `model`.
    ///
    /// # Errors
    /// The first [`ConsistencyError`] found.
    pub fn extract(&self, model: &Model) -> Result<Schedule, ConsistencyError> {
        let result = self.rebuild(model).and_then(|(schedule, slots)| {
            self.check_hops(&slots)?;
            self.check_recurrence(&slots)?;
            self.check_dependencies(&slots)?;
            Ok(schedule)
        });
        match &result {
            Ok(schedule) => debug!(transmissions = schedule.len(), "Model validated"),
            Err(e) => error!(error = %e, "Model failed validation"),
        }
        result
    }

    // ── Checks ────────────────────────────────────────────────────────────────

    /// Read every variable, check its window, and fill the schedule.
    fn rebuild(&self, model: &Model) -> Result<(Schedule, SlotTable), ConsistencyError> {
        let mut schedule = Schedule::new(self.plan.hyperperiod());
        let mut slots: SlotTable = Vec::with_capacity(self.plan.flows().len());

        for flow in self.plan.flows() {
            let mut per_instance = Vec::with_capacity(flow.instances.len());
            for (k, vars) in (0u64..).zip(&flow.instances) {
                let window = flow.window(k);
                let mut table = BTreeMap::new();
                for (link, &var) in vars {
                    let key = || SlotKey {
                        flow: flow.name.clone(),
                        instance: k,
                        link: link.clone(),
                    };
                    let slot = model
                        .value_of(var)
                        .ok_or_else(|| ConsistencyError::MissingValue { key: key() })?;
                    if !window.contains(&slot) || slot >= self.plan.hyperperiod() {
                        return Err(ConsistencyError::OutOfRange {
                            key: key(),
                            slot,
                            lo: window.start,
                            hi: window.end,
                        });
                    }

                    let who = FlowInstance::new(flow.name.as_str(), k);
                    schedule
                        .occupy(link.clone(), slot, who.clone())
                        .map_err(|first| ConsistencyError::SlotCollision {
                            link: link.clone(),
                            slot,
                            first,
                            second: who,
                        })?;
                    table.insert(link.clone(), slot);
                }
                per_instance.push(table);
            }
            slots.push(per_instance);
        }
        Ok((schedule, slots))
    }

    fn check_hops(&self, slots: &SlotTable) -> Result<(), ConsistencyError> {
        for (flow, table) in self.plan.flows().iter().zip(slots) {
            for (k, inst) in (0u64..).zip(table) {
                for hop in &flow.hops {
                    let (from_slot, to_slot) = (inst[&hop.from], inst[&hop.to]);
                    if to_slot < from_slot + hop.gap {
                        return Err(ConsistencyError::HopOrder {
                            flow: flow.name.clone(),
                            instance: k,
                            from: hop.from.clone(),
                            from_slot,
                            to: hop.to.clone(),
                            to_slot,
                            gap: hop.gap,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_recurrence(&self, slots: &SlotTable) -> Result<(), ConsistencyError> {
        for (flow, table) in self.plan.flows().iter().zip(slots) {
            let Some(first) = table.first() else { continue };
            for (k, inst) in (0u64..).zip(table).skip(1) {
                for (link, &actual) in inst {
                    let expected = first[link] + k * flow.period;
                    if actual != expected {
                        return Err(ConsistencyError::Recurrence {
                            flow: flow.name.clone(),
                            instance: k,
                            link: link.clone(),
                            expected,
                            actual,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_dependencies(&self, slots: &SlotTable) -> Result<(), ConsistencyError> {
        let gap = self.plan.dependency_gap();
        let flows = self.plan.flows();
        for (i, flow) in flows.iter().enumerate() {
            for dep in &flow.dependencies {
                let Some(j) = flows.iter().position(|f| &f.name == dep) else {
                    continue;
                };
                let before: &PlannedFlow = &flows[j];
                for (k, (after_inst, before_inst)) in
                    (0u64..).zip(slots[i].iter().zip(&slots[j]))
                {
                    let delivered = before
                        .terminal_links
                        .iter()
                        .map(|l| before_inst[l])
                        .max()
                        .unwrap_or(0);
                    let starts = flow
                        .first_links
                        .iter()
                        .map(|l| after_inst[l])
                        .min()
                        .unwrap_or(u64::MAX);
                    if starts < delivered + gap {
                        return Err(ConsistencyError::Dependency {
                            flow: flow.name.clone(),
                            dependency: dep.clone(),
                            instance: k,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
