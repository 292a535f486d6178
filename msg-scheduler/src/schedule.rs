/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The synthesized schedule: which flow instance owns each `(link, slot)`.
//!
//! A [`Schedule`] is produced by the extractor after a model has been
//! re-validated, so every instance in it already satisfies exclusivity,
//! ordering and recurrence.  It can be queried per slot (one animation frame),
//! per link, or flattened into sorted [`ScheduleRecord`]s for export.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::topology::Link;

// ── FlowInstance ──────────────────────────────────────────────────────────────

/// One periodic repetition of a flow inside the hyperperiod.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowInstance {
    pub flow: String,
    pub instance: u64,
}

impl FlowInstance {
    pub fn new(flow: impl Into<String>, instance: u64) -> Self {
        Self {
            flow: flow.into(),
            instance,
        }
    }
}

impl fmt::Display for FlowInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.flow, self.instance)
    }
}

// ── Export types ──────────────────────────────────────────────────────────────

/// Ordering of [`Schedule::records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Slot, then link, then flow.
    #[default]
    BySlot,

    /// Flow name, then instance, then slot.
    ByFlow,
}

/// One transmission: `flow`'s instance `instance` uses `link` in `slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub flow: String,
    pub instance: u64,
    pub link: Link,
    pub slot: u64,
}

/// Serialisable form of a whole schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleExport {
    pub hyperperiod: u64,
    pub records: Vec<ScheduleRecord>,
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Conflict-free mapping `(link, slot) → flow instance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    hyperperiod: u64,
    occupancy: BTreeMap<(Link, u64), FlowInstance>,
}

impl Schedule {
    /// An empty schedule over `hyperperiod` slots.
    pub fn new(hyperperiod: u64) -> Self {
        Self {
            hyperperiod,
            occupancy: BTreeMap::new(),
        }
    }

    /// Give `(link, slot)` to `occupant`.
    ///
    /// On conflict the schedule is left unchanged and the current occupant is
    /// returned as the error.
    pub(crate) fn occupy(
        &mut self,
        link: Link,
        slot: u64,
        occupant: FlowInstance,
    ) -> Result<(), FlowInstance> {
        match self.occupancy.get(&(link.clone(), slot)) {
            Some(existing) => Err(existing.clone()),
            None => {
                self.occupancy.insert((link, slot), occupant);
                Ok(())
            }
        }
    }

    pub fn hyperperiod(&self) -> u64 {
        self.hyperperiod
    }

    /// Number of occupied `(link, slot)` cells.
    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    /// Slot in which `flow`'s `instance` uses `link`.
    pub fn slot_of(&self, flow: &str, instance: u64, link: &Link) -> Option<u64> {
        self.occupancy
            .range((link.clone(), 0)..=(link.clone(), u64::MAX))
            .find(|(_, who)| who.flow == flow && who.instance == instance)
            .map(|((_, slot), _)| *slot)
    }

    /// Every link in use during `slot`, with its occupant, in link order.
    ///
    /// This is one frame of a time-lapse view of the schedule.
    pub fn frame(&self, slot: u64) -> Vec<(&Link, &FlowInstance)> {
        self.occupancy
            .iter()
            .filter(|((_, s), _)| *s == slot)
            .map(|((link, _), who)| (link, who))
            .collect()
    }

    /// All transmissions, flattened and sorted.
    pub fn records(&self, order: SortOrder) -> Vec<ScheduleRecord> {
        let mut records: Vec<ScheduleRecord> = self
            .occupancy
            .iter()
            .map(|((link, slot), who)| ScheduleRecord {
                flow: who.flow.clone(),
                instance: who.instance,
                link: link.clone(),
                slot: *slot,
            })
            .collect();

        match order {
            SortOrder::BySlot => records.sort_by(|x, y| {
                (x.slot, &x.link, &x.flow, x.instance).cmp(&(y.slot, &y.link, &y.flow, y.instance))
            }),
            SortOrder::ByFlow => records.sort_by(|x, y| {
                (&x.flow, x.instance, x.slot, &x.link).cmp(&(&y.flow, y.instance, y.slot, &y.link))
            }),
        }
        records
    }

    pub fn export(&self, order: SortOrder) -> ScheduleExport {
        ScheduleExport {
            hyperperiod: self.hyperperiod,
            records: self.records(order),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_schedule() -> Schedule {
        let mut s = Schedule::new(4);
        s.occupy(Link::new("a", "s"), 0, FlowInstance::new("app1", 0))
            .unwrap();
        s.occupy(Link::new("b", "s"), 1, FlowInstance::new("app1", 0))
            .unwrap();
        s.occupy(Link::new("b", "s"), 2, FlowInstance::new("app2", 0))
            .unwrap();
        s.occupy(Link::new("a", "s"), 1, FlowInstance::new("app0", 0))
            .unwrap();
        s
    }

    #[test]
    fn occupy_rejects_second_owner() {
        let mut s = make_schedule();
        let err = s
            .occupy(Link::new("s", "a"), 0, FlowInstance::new("app2", 0))
            .unwrap_err();
        assert_eq!(err, FlowInstance::new("app1", 0));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn frame_lists_links_active_in_slot() {
        let s = make_schedule();
        let frame = s.frame(1);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[0].0, &Link::new("a", "s"));
        assert_eq!(frame[0].1.flow, "app0");
        assert_eq!(frame[1].1.flow, "app1");
        assert!(s.frame(3).is_empty());
    }

    #[test]
    fn slot_lookup() {
        let s = make_schedule();
        assert_eq!(s.slot_of("app1", 0, &Link::new("b", "s")), Some(1));
        assert_eq!(s.slot_of("app1", 1, &Link::new("b", "s")), None);
        assert_eq!(s.slot_of("app2", 0, &Link::new("b", "s")), Some(2));
    }

    #[test]
    fn records_sorted_by_slot() {
        let slots: Vec<u64> = make_schedule()
            .records(SortOrder::BySlot)
            .iter()
            .map(|r| r.slot)
            .collect();
        assert_eq!(slots, vec![0, 1, 1, 2]);
    }

    #[test]
    fn records_sorted_by_flow() {
        let flows: Vec<String> = make_schedule()
            .records(SortOrder::ByFlow)
            .into_iter()
            .map(|r| r.flow)
            .collect();
        assert_eq!(flows, vec!["app0", "app1", "app1", "app2"]);
    }

    #[test]
    fn export_serialises_to_yaml() {
        let export = make_schedule().export(SortOrder::BySlot);
        let yaml = serde_yaml::to_string(&export).unwrap();
        assert!(yaml.contains("hyperperiod: 4"));
        let back: ScheduleExport = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, export);
    }

    #[test]
    fn empty_schedule() {
        let s = Schedule::new(1);
        assert!(s.is_empty());
        assert!(s.records(SortOrder::ByFlow).is_empty());
        assert_eq!(s.export(SortOrder::BySlot).hyperperiod, 1);
    }
}
