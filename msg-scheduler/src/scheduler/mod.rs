/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Constraint generation and end-to-end synthesis.
//!
//! [`ScheduleBuilder`] turns a [`Topology`] plus a set of [`Application`]s
//! into a constraint program written to any [`ConstraintSink`].  It never
//! names a backend and never decides feasibility itself; the returned
//! [`SchedulePlan`] remembers every declared variable so the
//! [`ScheduleExtractor`] can rebuild and re-check a [`Schedule`] from a model.
//!
//! ```text
//! add_apps(apps) ──► FlowSet::assemble ──► hyperperiod ──► routes
//!                                                             │
//! add_constraints(sink) ◄─────────────────────────────────────┘
//!   per flow, per instance k:
//!     one slot variable per occupied link, domain [k·P + phase, (k+1)·P)
//!     hop ordering along every path     (gap = 1 + relay processing delay)
//!     recurrence  slot_k = slot_0 + k·P
//!   per dependency A → B, per k < min(n_A, n_B):
//!     B's last links + dependency_gap <= A's first links
//!   per link: all variables pairwise distinct
//! ```
//!
//! Every instance lives entirely inside its own period window, so the
//! recurrence never wraps around the end of the hyperperiod.

pub mod error;
pub mod extract;
pub mod retry;

pub use error::{ConsistencyError, ScheduleError};
pub use extract::ScheduleExtractor;
pub use retry::{synthesize_with_retries, RetryOutcome};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use tracing::{debug, info, warn};

use crate::backend::{
    ConstraintSink, InterruptReason, SlotKey, SolveOptions, SolveOutcome, SolverBackend,
    VarHandle,
};
use crate::config::{RoutingPolicy, SchedulerConfig};
use crate::flow::{Application, FlowSet};
use crate::hyperperiod::HyperperiodInfo;
use crate::schedule::Schedule;
use crate::topology::{Link, Node, Path, Topology, TopologyError};

// ── Routes ────────────────────────────────────────────────────────────────────

/// Ordering requirement between two consecutive links of a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hop {
    pub from: Link,
    pub to: Link,

    /// `slot(to) >= slot(from) + gap`.
    pub gap: u64,
}

/// Where one flow transmits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRoute {
    /// One path per remote destination node, in destination order.
    pub paths: Vec<Path>,

    /// Union of the links of all paths.  The egress link when there is no
    /// remote destination.
    pub occupied: BTreeSet<Link>,

    /// Consecutive-link orderings over all paths, deduplicated.
    pub hops: BTreeSet<Hop>,

    /// The link(s) on which transmission starts.
    pub first_links: BTreeSet<Link>,

    /// The link(s) on which delivery completes.
    pub terminal_links: BTreeSet<Link>,
}

// ── SchedulePlan ──────────────────────────────────────────────────────────────

/// Everything the builder declared for one flow.
#[derive(Debug, Clone)]
pub struct PlannedFlow {
    pub name: String,
    pub period: u64,

    /// Offset of every instance inside its period window.
    pub phase: u64,

    /// Per instance: link → slot variable.
    pub instances: Vec<BTreeMap<Link, VarHandle>>,

    pub hops: Vec<Hop>,
    pub first_links: BTreeSet<Link>,
    pub terminal_links: BTreeSet<Link>,

    /// Names of the flows this one must follow.
    pub dependencies: Vec<String>,
}

impl PlannedFlow {
    /// Slot window of `instance`.
    pub fn window(&self, instance: u64) -> Range<u64> {
        instance * self.period + self.phase..(instance + 1) * self.period
    }

    pub fn instance_count(&self) -> u64 {
        self.instances.len() as u64
    }
}

/// Record of a constraint program, handed to the extractor.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    hyperperiod: u64,
    dependency_gap: u64,
    flows: Vec<PlannedFlow>,
}

impl SchedulePlan {
    pub fn hyperperiod(&self) -> u64 {
        self.hyperperiod
    }

    pub fn dependency_gap(&self) -> u64 {
        self.dependency_gap
    }

    /// Planned flows in dependency order.
    pub fn flows(&self) -> &[PlannedFlow] {
        &self.flows
    }

    pub fn flow(&self, name: &str) -> Option<&PlannedFlow> {
        self.flows.iter().find(|f| f.name == name)
    }

    /// Total number of declared slot variables.
    pub fn variable_count(&self) -> usize {
        self.flows
            .iter()
            .flat_map(|f| f.instances.iter())
            .map(BTreeMap::len)
            .sum()
    }
}

// ── ScheduleBuilder ───────────────────────────────────────────────────────────

/// Translates topology + flows into a constraint program.
///
/// Borrows the topology immutably for its whole lifetime.  All per-run state
/// lives in the builder, so one builder describes one synthesis problem.
pub struct ScheduleBuilder<'a> {
    topology: &'a Topology,
    config: SchedulerConfig,
    flows: FlowSet,
    routes: HashMap<String, FlowRoute>,
    periods: HyperperiodInfo,
}

impl<'a> ScheduleBuilder<'a> {
    pub fn new(topology: &'a Topology, config: SchedulerConfig) -> Self {
        Self {
            topology,
            config,
            flows: FlowSet::new(),
            routes: HashMap::new(),
            periods: HyperperiodInfo::default(),
        }
    }

    /// Add `apps` to the flow set and return the resulting hyperperiod.
    ///
    /// The combined set is re-validated and re-routed as a whole.  On error
    /// the builder is left as it was before the call.
    ///
    /// # Errors
    /// * [`ScheduleError::Flow`] – duplicate names, unknown references or a
    ///   dependency cycle.
    /// * [`ScheduleError::Hyperperiod`] – the LCM overflows or exceeds
    ///   `max_hyperperiod`.
    /// * [`ScheduleError::Topology`] – a destination is unreachable or a
    ///   source has no link.
    pub fn add_apps(&mut self, apps: Vec<Application>) -> Result<u64, ScheduleError> {
        let mut all: Vec<Application> = self.flows.iter().cloned().collect();
        all.extend(apps);
        let flows = FlowSet::assemble(all)?;

        let periods: Vec<u64> = flows
            .iter()
            .filter_map(|app| app.frame().map(|f| f.period))
            .collect();
        let info = HyperperiodInfo::calculate(&periods, self.config.max_hyperperiod)?;
        if info.flow_count == 0 && !flows.is_empty() {
            warn!(
                flow_count = flows.len(),
                "No flow has a frame, every flow sends once per 1-slot cycle"
            );
        }

        let mut routes = HashMap::with_capacity(flows.len());
        for app in flows.iter() {
            let route = self.route(&flows, app)?;
            debug!(
                flow = %app.name(),
                paths = route.paths.len(),
                links = route.occupied.len(),
                "  route"
            );
            routes.insert(app.name().to_string(), route);
        }

        info!(
            flow_count = flows.len(),
            hyperperiod = info.hyperperiod,
            periods = ?info.unique_periods,
            "Flows added"
        );

        self.flows = flows;
        self.routes = routes;
        self.periods = info;
        Ok(self.periods.hyperperiod)
    }

    /// Cycle length in slots.  `1` until flows are added.
    pub fn hyperperiod(&self) -> u64 {
        self.periods.hyperperiod
    }

    pub fn flows(&self) -> &FlowSet {
        &self.flows
    }

    pub fn route_of(&self, flow: &str) -> Option<&FlowRoute> {
        self.routes.get(flow)
    }

    /// Write the constraint program for the current flow set to `sink`.
    ///
    /// `sink` is cleared first, so a backend can be reused across problems.
    pub fn add_constraints<S>(&self, sink: &mut S) -> SchedulePlan
    where
        S: ConstraintSink + ?Sized,
    {
        sink.clear();
        let mut planned: Vec<PlannedFlow> = Vec::with_capacity(self.flows.len());
        let mut per_link: BTreeMap<Link, Vec<VarHandle>> = BTreeMap::new();
        let mut orderings = 0usize;
        let mut equalities = 0usize;

        // ── Slot variables, hop ordering, recurrence ──────────────────────────
        for app in self.flows.iter() {
            let route = &self.routes[app.name()];
            let (period, phase) = self.timing(app);
            let instance_count = self.periods.instances_of(period);

            let mut instances: Vec<BTreeMap<Link, VarHandle>> =
                Vec::with_capacity(instance_count as usize);
            for k in 0..instance_count {
                let window = k * period + phase..(k + 1) * period;
                let vars: BTreeMap<Link, VarHandle> = route
                    .occupied
                    .iter()
                    .map(|link| {
                        let key = SlotKey {
                            flow: app.name().to_string(),
                            instance: k,
                            link: link.clone(),
                        };
                        (link.clone(), sink.declare_variable(key, window.clone()))
                    })
                    .collect();

                for hop in &route.hops {
                    sink.assert_less(vars[&hop.from], vars[&hop.to], hop.gap);
                    orderings += 1;
                }

                if let Some(first) = instances.first() {
                    let shift = (k * period) as i64;
                    for (link, &var) in &vars {
                        sink.assert_equal(var, first[link], shift);
                        equalities += 1;
                    }
                }

                for (link, &var) in &vars {
                    per_link.entry(link.clone()).or_default().push(var);
                }
                instances.push(vars);
            }

            planned.push(PlannedFlow {
                name: app.name().to_string(),
                period,
                phase,
                instances,
                hops: route.hops.iter().cloned().collect(),
                first_links: route.first_links.clone(),
                terminal_links: route.terminal_links.clone(),
                dependencies: app.dependencies().iter().cloned().collect(),
            });
        }

        // ── Dependency ordering ───────────────────────────────────────────────
        let index: HashMap<&str, usize> = planned
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect();
        for flow in &planned {
            for dep in &flow.dependencies {
                let before = &planned[index[dep.as_str()]];
                let shared = flow.instances.len().min(before.instances.len());
                for k in 0..shared {
                    for last in &before.terminal_links {
                        for first in &flow.first_links {
                            sink.assert_less(
                                before.instances[k][last],
                                flow.instances[k][first],
                                self.config.dependency_gap,
                            );
                            orderings += 1;
                        }
                    }
                }
            }
        }

        // ── Link exclusivity ──────────────────────────────────────────────────
        let mut distinct = 0usize;
        for vars in per_link.values() {
            if vars.len() > 1 {
                sink.assert_distinct(vars);
                distinct += 1;
            }
        }

        let plan = SchedulePlan {
            hyperperiod: self.periods.hyperperiod,
            dependency_gap: self.config.dependency_gap,
            flows: planned,
        };
        info!(
            variables = plan.variable_count(),
            orderings,
            equalities,
            distinct_groups = distinct,
            "Constraints generated"
        );
        plan
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// `(period, phase)` of `app`.  Unframed flows send once per hyperperiod.
    fn timing(&self, app: &Application) -> (u64, u64) {
        match app.frame() {
            Some(frame) => (frame.period, frame.phase()),
            None => (self.periods.hyperperiod, 0),
        }
    }

    fn route(&self, flows: &FlowSet, app: &Application) -> Result<FlowRoute, TopologyError> {
        // Destination nodes; a target hosted on the source node is a local
        // delivery and uses no link
        let destinations: BTreeSet<&str> = app
            .virtual_link()
            .iter()
            .filter_map(|target| flows.get(target).map(Application::source))
            .filter(|&node| node != app.source())
            .collect();

        let paths = match self.config.routing {
            RoutingPolicy::ShortestPathPerDestination => destinations
                .iter()
                .map(|dst| self.topology.path(app.source(), dst))
                .collect::<Result<Vec<Path>, TopologyError>>()?,
        };

        if paths.is_empty() {
            let egress = self.topology.egress_link(app.source())?;
            return Ok(FlowRoute {
                paths,
                occupied: BTreeSet::from([egress.clone()]),
                hops: BTreeSet::new(),
                first_links: BTreeSet::from([egress.clone()]),
                terminal_links: BTreeSet::from([egress]),
            });
        }

        let mut occupied = BTreeSet::new();
        let mut hops = BTreeSet::new();
        let mut first_links = BTreeSet::new();
        let mut terminal_links = BTreeSet::new();
        for path in &paths {
            debug!(
                flow = %app.name(),
                from = path.source(),
                to = path.destination(),
                hops = path.hop_count(),
                "  path"
            );
            let links = path.links();
            for (pair, relay) in links.windows(2).zip(path.relays()) {
                let delay = self.topology.node(relay).map_or(0, Node::processing_delay);
                hops.insert(Hop {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                    gap: 1 + delay,
                });
            }
            if let (Some(first), Some(last)) = (links.first(), links.last()) {
                first_links.insert(first.clone());
                terminal_links.insert(last.clone());
            }
            occupied.extend(links);
        }

        Ok(FlowRoute {
            paths,
            occupied,
            hops,
            first_links,
            terminal_links,
        })
    }
}

// ── One-shot synthesis ────────────────────────────────────────────────────────

/// Result of one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// A validated schedule.
    Feasible(Schedule),

    /// The backend proved that no schedule exists.
    Infeasible,

    /// The backend stopped before reaching an answer.
    Interrupted(InterruptReason),
}

/// Build, solve and extract in one call.
///
/// # Errors
/// Any [`ScheduleError`] from [`ScheduleBuilder::add_apps`], or
/// [`ScheduleError::Consistency`] if the backend's model fails
/// re-validation.
pub fn synthesize<B>(
    topology: &Topology,
    apps: Vec<Application>,
    config: &SchedulerConfig,
    backend: &mut B,
    options: &SolveOptions,
) -> Result<SynthesisOutcome, ScheduleError>
where
    B: SolverBackend + ?Sized,
{
    let mut builder = ScheduleBuilder::new(topology, config.clone());
    builder.add_apps(apps)?;
    let plan = builder.add_constraints(&mut *backend);

    match backend.solve(options) {
        SolveOutcome::Sat(model) => {
            let schedule = ScheduleExtractor::new(&plan).extract(&model)?;
            info!(
                backend = backend.name(),
                transmissions = schedule.len(),
                hyperperiod = schedule.hyperperiod(),
                "Schedule synthesized"
            );
            Ok(SynthesisOutcome::Feasible(schedule))
        }
        SolveOutcome::Unsat => {
            warn!(backend = backend.name(), "No feasible schedule");
            Ok(SynthesisOutcome::Infeasible)
        }
        SolveOutcome::Interrupted(reason) => {
            warn!(backend = backend.name(), %reason, "Synthesis interrupted");
            Ok(SynthesisOutcome::Interrupted(reason))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchBackend;
    use crate::flow::FlowError;
    use crate::hyperperiod::HyperperiodError;

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Records every call so tests can count constraints.
    #[derive(Default)]
    struct CountingSink {
        domains: Vec<Range<u64>>,
        equal: usize,
        less: Vec<(VarHandle, VarHandle, u64)>,
        distinct: Vec<usize>,
    }

    impl ConstraintSink for CountingSink {
        fn clear(&mut self) {
            *self = Self::default();
        }
        fn declare_variable(&mut self, _key: SlotKey, domain: Range<u64>) -> VarHandle {
            self.domains.push(domain);
            VarHandle(self.domains.len() - 1)
        }
        fn assert_equal(&mut self, _lhs: VarHandle, _rhs: VarHandle, _offset: i64) {
            self.equal += 1;
        }
        fn assert_less(&mut self, before: VarHandle, after: VarHandle, gap: u64) {
            self.less.push((before, after, gap));
        }
        fn assert_distinct(&mut self, vars: &[VarHandle]) {
            self.distinct.push(vars.len());
        }
    }

    /// node_a, node_b, node_c around switch_a.
    fn make_star() -> Topology {
        let mut t = Topology::new();
        for name in ["node_a", "node_b", "node_c"] {
            t.add_node(Node::end(name)).unwrap();
        }
        t.add_node(Node::switch("switch_a")).unwrap();
        t.link_hub("switch_a", ["node_a", "node_b", "node_c"])
            .unwrap();
        t
    }

    /// app_core1 ─ msg_core1 ─ msg_core2 ─ app_core2
    fn make_chain() -> Topology {
        let mut t = Topology::new();
        t.add_node(Node::switch("msg_core1")).unwrap();
        t.add_node(Node::switch("msg_core2")).unwrap();
        t.add_node(Node::end("app_core1")).unwrap();
        t.add_node(Node::end("app_core2")).unwrap();
        t.add_link("app_core1", "msg_core1").unwrap();
        t.add_link("app_core2", "msg_core2").unwrap();
        t.add_link("msg_core1", "msg_core2").unwrap();
        t
    }

    /// Three 3-core processors joined by `msg_switch` (processing delay 1).
    fn make_multicore() -> Topology {
        let mut t = Topology::new();
        for p in 1..=3 {
            let msg = format!("msg_core_{p}");
            t.add_node(Node::switch(msg.as_str())).unwrap();
            for c in 1..=3 {
                let core = format!("app_core_{p}_{c}");
                t.add_node(Node::end(core.as_str())).unwrap();
                t.add_link(&msg, &core).unwrap();
            }
        }
        t.add_node(Node::switch_with_delay("msg_switch", 1)).unwrap();
        t.link_hub("msg_switch", ["msg_core_1", "msg_core_2", "msg_core_3"])
            .unwrap();
        t
    }

    fn scenario_a(t: &Topology) -> Vec<Application> {
        let mut app1 = Application::new(t, "app1", "node_a").unwrap();
        let mut app2 = Application::new(t, "app2", "node_b").unwrap();
        let app3 = Application::new(t, "app3", "node_c").unwrap();
        app1.set_virtual_link(["app2", "app3"]).set_frame(4, 4).unwrap();
        app2.set_virtual_link(["app3"])
            .set_frame(4, 2)
            .unwrap()
            .depend_on("app1");
        vec![app1, app2, app3]
    }

    fn scenario_b(t: &Topology) -> Vec<Application> {
        let mut app1 = Application::new(t, "app1", "app_core1").unwrap();
        let mut app2 = Application::new(t, "app2", "app_core2").unwrap();
        app1.set_virtual_link(["app2"]).set_frame(6, 0).unwrap();
        app2.set_virtual_link(["app1"])
            .set_frame(6, 0)
            .unwrap()
            .depend_on("app1");
        vec![app1, app2]
    }

    fn multicore_apps(t: &Topology) -> Vec<Application> {
        let table: [(&str, &[&str], u64, &[&str]); 9] = [
            ("app1_1", &["app3_2"], 4, &[]),
            ("app1_2", &["app2_2", "app3_1"], 8, &[]),
            ("app1_3", &["app2_3"], 8, &[]),
            ("app2_1", &["app1_1"], 8, &[]),
            ("app2_2", &["app2_1"], 8, &["app1_2"]),
            ("app2_3", &["app3_3", "app3_2"], 8, &[]),
            ("app3_1", &["app3_2"], 8, &["app1_2"]),
            ("app3_2", &["app3_3"], 4, &[]),
            ("app3_3", &["app1_1"], 8, &[]),
        ];
        table.iter()
            .map(|(name, targets, period, deps)| {
                let core = format!("app_core_{}", &name[3..]);
                let mut app = Application::new(t, *name, &core).unwrap();
                app.set_virtual_link(targets.iter()).set_frame(*period, 0).unwrap();
                for d in deps.iter() {
                    app.depend_on(d);
                }
                app
            })
            .collect()
    }

    /// `slow` (period 4, egress only) depends on `fast` (period 2).
    fn mixed_period_apps(t: &Topology) -> Vec<Application> {
        let mut fast = Application::new(t, "fast", "node_a").unwrap();
        fast.set_virtual_link(["slow"]).set_frame(2, 0).unwrap();
        let mut slow = Application::new(t, "slow", "node_b").unwrap();
        slow.set_frame(4, 0).unwrap().depend_on("fast");
        vec![fast, slow]
    }

    fn solve(t: &Topology, apps: Vec<Application>) -> SynthesisOutcome {
        let mut backend = SearchBackend::new();
        synthesize(
            t,
            apps,
            &SchedulerConfig::default(),
            &mut backend,
            &SolveOptions::default(),
        )
        .unwrap()
    }

    fn feasible(outcome: SynthesisOutcome) -> Schedule {
        match outcome {
            SynthesisOutcome::Feasible(s) => s,
            other => panic!("expected a schedule, got {other:?}"),
        }
    }

    // ── add_apps ──────────────────────────────────────────────────────────────

    #[test]
    fn hyperperiod_of_star_is_four() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        assert_eq!(b.add_apps(scenario_a(&t)).unwrap(), 4);
        assert_eq!(b.hyperperiod(), 4);
    }

    #[test]
    fn empty_flow_set_has_unit_hyperperiod() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        assert_eq!(b.add_apps(Vec::new()).unwrap(), 1);
        let mut sink = CountingSink::default();
        let plan = b.add_constraints(&mut sink);
        assert_eq!(plan.variable_count(), 0);
        assert!(sink.domains.is_empty());
    }

    #[test]
    fn add_apps_accumulates() {
        let t = make_star();
        let mut apps = scenario_a(&t);
        let app3 = apps.pop().unwrap();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(apps).unwrap_err(); // app3 is still missing
        assert!(b.flows().is_empty());

        let mut apps = scenario_a(&t);
        let app3_again = apps.pop().unwrap();
        b.add_apps(vec![app3]).unwrap();
        b.add_apps(apps).unwrap();
        assert_eq!(b.flows().len(), 3);

        let err = b.add_apps(vec![app3_again]).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Flow(FlowError::DuplicateFlow { .. })
        ));
        assert_eq!(b.flows().len(), 3);
    }

    #[test]
    fn hyperperiod_limit_is_enforced() {
        let t = make_star();
        let mut a = Application::new(&t, "a", "node_a").unwrap();
        a.set_frame(7, 0).unwrap();
        let mut c = Application::new(&t, "c", "node_c").unwrap();
        c.set_frame(11, 0).unwrap();

        let config = SchedulerConfig {
            max_hyperperiod: 64,
            ..SchedulerConfig::default()
        };
        let mut b = ScheduleBuilder::new(&t, config);
        let err = b.add_apps(vec![a, c]).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Hyperperiod(HyperperiodError::TooLarge { value: 77, limit: 64 })
        ));
    }

    #[test]
    fn unreachable_destination_fails_before_constraints() {
        let mut t = make_star();
        t.add_node(Node::end("island")).unwrap();
        t.add_node(Node::switch("switch_b")).unwrap();
        t.add_link("island", "switch_b").unwrap();

        let mut a = Application::new(&t, "a", "node_a").unwrap();
        a.set_virtual_link(["far"]);
        let far = Application::new(&t, "far", "island").unwrap();

        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        let err = b.add_apps(vec![a, far]).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Topology(TopologyError::Unreachable { .. })
        ));
        assert!(b.flows().is_empty());
    }

    // ── Routing ───────────────────────────────────────────────────────────────

    #[test]
    fn multicast_shares_first_link() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(scenario_a(&t)).unwrap();

        let r = b.route_of("app1").unwrap();
        assert_eq!(r.paths.len(), 2);
        assert_eq!(r.occupied.len(), 3);
        assert_eq!(
            r.first_links,
            BTreeSet::from([Link::new("node_a", "switch_a")])
        );
        assert_eq!(r.terminal_links.len(), 2);
        assert_eq!(r.hops.len(), 2);
    }

    #[test]
    fn flow_without_targets_uses_egress_link() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(scenario_a(&t)).unwrap();

        let r = b.route_of("app3").unwrap();
        let egress = Link::new("node_c", "switch_a");
        assert!(r.paths.is_empty());
        assert_eq!(r.occupied, BTreeSet::from([egress.clone()]));
        assert_eq!(r.first_links, r.terminal_links);
    }

    #[test]
    fn local_target_is_not_routed() {
        let t = make_star();
        let mut a = Application::new(&t, "a", "node_a").unwrap();
        a.set_virtual_link(["peer"]);
        let peer = Application::new(&t, "peer", "node_a").unwrap();

        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(vec![a, peer]).unwrap();
        let r = b.route_of("a").unwrap();
        assert!(r.paths.is_empty());
        assert_eq!(r.occupied.len(), 1);
    }

    #[test]
    fn switch_delay_widens_hop_gap() {
        let t = make_multicore();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        assert_eq!(b.add_apps(multicore_apps(&t)).unwrap(), 8);

        let r = b.route_of("app1_1").unwrap();
        let gaps: Vec<u64> = r.hops.iter().map(|h| h.gap).collect();
        assert_eq!(r.paths[0].hop_count(), 4);
        assert!(r.paths[0].relays().contains(&"msg_switch".to_string()));
        assert_eq!(gaps.iter().sum::<u64>(), 4);
        assert!(gaps.contains(&2));
    }

    // ── add_constraints ───────────────────────────────────────────────────────

    #[test]
    fn constraint_counts_for_star() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(scenario_a(&t)).unwrap();
        let mut sink = CountingSink::default();
        let plan = b.add_constraints(&mut sink);

        // app1: 3 links, app2: 2 links, app3: 1 link; one instance each
        assert_eq!(plan.variable_count(), 6);
        assert_eq!(sink.domains.len(), 6);
        assert_eq!(sink.equal, 0);
        // hops: app1 2, app2 1; dependency: 2 terminal × 1 first
        assert_eq!(sink.less.len(), 5);
        // node_b<->switch_a (app1, app2), node_c<->switch_a (app1, app2, app3)
        let mut groups = sink.distinct.clone();
        groups.sort();
        assert_eq!(groups, vec![2, 3]);
    }

    #[test]
    fn instances_get_disjoint_windows() {
        let t = make_multicore();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(multicore_apps(&t)).unwrap();
        let mut sink = CountingSink::default();
        let plan = b.add_constraints(&mut sink);

        let f = plan.flow("app3_2").unwrap();
        assert_eq!(f.instance_count(), 2);
        assert_eq!(f.window(0), 0..4);
        assert_eq!(f.window(1), 4..8);
        let v1 = *f.instances[1].values().next().unwrap();
        assert_eq!(sink.domains[v1.index()], 4..8);
        assert!(sink.equal > 0);
    }

    #[test]
    fn phase_offset_is_folded_into_period() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(scenario_a(&t)).unwrap();
        let mut sink = CountingSink::default();
        let plan = b.add_constraints(&mut sink);

        assert_eq!(plan.flow("app1").unwrap().phase, 0);
        assert_eq!(plan.flow("app2").unwrap().window(0), 2..4);
        // Unframed flow takes the hyperperiod
        assert_eq!(plan.flow("app3").unwrap().period, 4);
    }

    #[test]
    fn repeated_add_constraints_starts_from_scratch() {
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(scenario_a(&t)).unwrap();
        let mut sink = CountingSink::default();
        b.add_constraints(&mut sink);
        let plan = b.add_constraints(&mut sink);

        assert_eq!(sink.domains.len(), 6);
        assert_eq!(sink.less.len(), 5);
        assert_eq!(sink.distinct.len(), 2);
        let max_handle = plan
            .flows()
            .iter()
            .flat_map(|f| f.instances.iter().flat_map(|i| i.values()))
            .map(|v| v.index())
            .max();
        assert_eq!(max_handle, Some(5));
    }

    #[test]
    fn dependency_across_periods_binds_common_instances() {
        // fast: 2 instances, slow: 1, so only instance 0 is ordered
        let t = make_star();
        let mut b = ScheduleBuilder::new(&t, SchedulerConfig::default());
        b.add_apps(mixed_period_apps(&t)).unwrap();
        let mut sink = CountingSink::default();
        b.add_constraints(&mut sink);

        // 2 hop orderings (one per fast instance) + 1 dependency
        assert_eq!(sink.less.len(), 3);
        assert_eq!(sink.less.iter().filter(|&&(_, _, gap)| gap == 1).count(), 3);
    }

    #[test]
    fn dependency_gap_comes_from_config() {
        let t = make_chain();
        let config = SchedulerConfig {
            dependency_gap: 2,
            ..SchedulerConfig::default()
        };
        let mut b = ScheduleBuilder::new(&t, config);
        b.add_apps(scenario_b(&t)).unwrap();
        let mut sink = CountingSink::default();
        b.add_constraints(&mut sink);
        assert!(sink.less.iter().any(|&(_, _, gap)| gap == 2));
    }

    // ── End-to-end ────────────────────────────────────────────────────────────

    #[test]
    fn star_is_schedulable() {
        let t = make_star();
        let s = feasible(solve(&t, scenario_a(&t)));
        assert_eq!(s.hyperperiod(), 4);
        assert_eq!(s.len(), 6);

        let shared = Link::new("node_b", "switch_a");
        let app1_in = s.slot_of("app1", 0, &shared).unwrap();
        let app2_out = s.slot_of("app2", 0, &shared).unwrap();
        assert!(app2_out > app1_in);
        assert!(app2_out >= 2);
        for r in s.records(crate::schedule::SortOrder::BySlot) {
            assert!(r.slot < 4);
        }
    }

    #[test]
    fn chain_slots_increase_along_path() {
        let t = make_chain();
        let s = feasible(solve(&t, scenario_b(&t)));
        let path = [
            Link::new("app_core1", "msg_core1"),
            Link::new("msg_core1", "msg_core2"),
            Link::new("msg_core2", "app_core2"),
        ];
        let slots: Vec<u64> = path
            .iter()
            .map(|l| s.slot_of("app1", 0, l).unwrap())
            .collect();
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
        assert!(slots.iter().all(|&x| x < 6));

        // app2 starts after app1 is delivered
        let app2_first = s.slot_of("app2", 0, &path[2]).unwrap();
        assert!(app2_first > slots[2]);
    }

    #[test]
    fn empty_flow_set_gives_empty_schedule() {
        let t = make_star();
        let s = feasible(solve(&t, Vec::new()));
        assert_eq!(s.hyperperiod(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn too_short_period_for_path_is_infeasible() {
        // app1_1 needs 5 slots (4 hops, one through the delayed switch)
        // but has a period of 4
        let t = make_multicore();
        assert_eq!(solve(&t, multicore_apps(&t)), SynthesisOutcome::Infeasible);
    }

    #[test]
    fn delayed_switch_holds_message_for_extra_slot() {
        // app_core_1_1 -> app_core_2_1 crosses msg_switch (delay 1); with a
        // period of 5 every slot of the window is needed
        let t = make_multicore();
        let mut sender = Application::new(&t, "sender", "app_core_1_1").unwrap();
        sender.set_virtual_link(["receiver"]).set_frame(5, 0).unwrap();
        let receiver = Application::new(&t, "receiver", "app_core_2_1").unwrap();

        let s = feasible(solve(&t, vec![sender, receiver]));
        let path = [
            Link::new("app_core_1_1", "msg_core_1"),
            Link::new("msg_core_1", "msg_switch"),
            Link::new("msg_switch", "msg_core_2"),
            Link::new("msg_core_2", "app_core_2_1"),
        ];
        let slots: Vec<u64> = path
            .iter()
            .map(|l| s.slot_of("sender", 0, l).unwrap())
            .collect();
        assert_eq!(slots, vec![0, 1, 3, 4]);
        assert_ne!(s.slot_of("receiver", 0, &path[3]), Some(4));
    }

    #[test]
    fn dependency_across_periods_is_scheduled() {
        let t = make_star();
        let s = feasible(solve(&t, mixed_period_apps(&t)));
        assert_eq!(s.hyperperiod(), 4);

        let a = Link::new("node_a", "switch_a");
        let b = Link::new("node_b", "switch_a");
        let fast0 = s.slot_of("fast", 0, &b).unwrap();
        let fast1 = s.slot_of("fast", 1, &b).unwrap();
        assert_eq!(fast1, fast0 + 2);
        assert_eq!(
            s.slot_of("fast", 1, &a).unwrap(),
            s.slot_of("fast", 0, &a).unwrap() + 2
        );
        let slow = s.slot_of("slow", 0, &b).unwrap();
        assert!(slow > fast0);
        assert_ne!(slow, fast1);
    }

    #[test]
    fn backend_is_reusable_after_infeasible_problem() {
        let mut backend = SearchBackend::new();
        let config = SchedulerConfig::default();

        let multicore = make_multicore();
        let first = synthesize(
            &multicore,
            multicore_apps(&multicore),
            &config,
            &mut backend,
            &SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(first, SynthesisOutcome::Infeasible);

        let star = make_star();
        let second = synthesize(
            &star,
            scenario_a(&star),
            &config,
            &mut backend,
            &SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(feasible(second).len(), 6);
        assert_eq!(backend.variable_count(), 6);
    }

    #[test]
    fn periodic_instances_repeat() {
        let t = make_star();
        let mut fast = Application::new(&t, "fast", "node_a").unwrap();
        fast.set_virtual_link(["slow"]).set_frame(3, 1).unwrap();
        let mut slow = Application::new(&t, "slow", "node_b").unwrap();
        slow.set_virtual_link(["fast"]).set_frame(6, 0).unwrap();

        let s = feasible(solve(&t, vec![fast, slow]));
        assert_eq!(s.hyperperiod(), 6);
        let link = Link::new("node_a", "switch_a");
        let first = s.slot_of("fast", 0, &link).unwrap();
        let second = s.slot_of("fast", 1, &link).unwrap();
        assert_eq!(second, first + 3);
        assert!(first >= 1);
    }

    #[test]
    fn interrupted_solve_is_reported() {
        let t = make_star();
        let mut backend = SearchBackend::new();
        let outcome = synthesize(
            &t,
            scenario_a(&t),
            &SchedulerConfig::default(),
            &mut backend,
            &SolveOptions::default().with_max_steps(0),
        )
        .unwrap();
        assert_eq!(
            outcome,
            SynthesisOutcome::Interrupted(InterruptReason::StepLimit)
        );
    }
}
