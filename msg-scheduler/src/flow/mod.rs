/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Flow model: periodic applications and the flow set they form.
//!
//! ```text
//! Application::new ──► set_virtual_link / set_frame / depend_on ──► FlowSet::assemble
//!   source checked        configuration (set_frame is fallible)        names unique, refs resolved,
//!   against topology                                                    dependency graph acyclic
//! ```
//!
//! Applications reference each other by name.  Whether those names resolve is
//! only known once the whole set is assembled, so reference and cycle checks
//! happen in [`FlowSet::assemble`], never at configuration time.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::{debug, info};

use crate::topology::Topology;

// ── Error type ────────────────────────────────────────────────────────────────

/// Flow configuration and flow-set assembly errors.
///
/// Every variant names the offending flow(s).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flow '{flow}': period must be a positive number of slots, got {period}")]
    InvalidPeriod { flow: String, period: u64 },

    #[error("flow '{flow}': source node '{node}' does not exist")]
    UnknownSource { flow: String, node: String },

    #[error("flow '{flow}': source node '{node}' is a switch and cannot originate traffic")]
    SourceNotEndNode { flow: String, node: String },

    #[error("flow '{name}' is defined more than once")]
    DuplicateFlow { name: String },

    #[error("flow '{flow}' depends on '{target}', which is not part of the flow set")]
    UnknownDependencyTarget { flow: String, target: String },

    #[error("flow '{flow}' targets '{target}', which is not part of the flow set")]
    UnknownVirtualLinkTarget { flow: String, target: String },

    #[error("dependency cycle among flows: {}", .flows.join(", "))]
    CyclicDependency { flows: Vec<String> },
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// Timing of a framed application, in time slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Recurrence interval.  Always `> 0`.
    pub period: u64,

    /// Requested phase shift inside each period.
    pub offset: u64,
}

impl Frame {
    /// Offset folded into `[0, period)`.
    pub fn phase(&self) -> u64 {
        self.offset % self.period
    }
}

// ── Application ───────────────────────────────────────────────────────────────

/// A periodic message flow originating at one end node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    name: String,
    source: String,
    frame: Option<Frame>,
    virtual_link: BTreeSet<String>,
    dependencies: BTreeSet<String>,
}

impl Application {
    /// Create an application sourced at `source`.
    ///
    /// # Errors
    /// * [`FlowError::UnknownSource`] – `source` is not in `topology`.
    /// * [`FlowError::SourceNotEndNode`] – `source` is a switch.
    pub fn new(
        topology: &Topology,
        name: impl Into<String>,
        source: &str,
    ) -> Result<Self, FlowError> {
        let name = name.into();
        let node = topology
            .node(source)
            .ok_or_else(|| FlowError::UnknownSource {
                flow: name.clone(),
                node: source.to_string(),
            })?;
        if !node.can_originate_traffic() {
            return Err(FlowError::SourceNotEndNode {
                flow: name,
                node: source.to_string(),
            });
        }

        Ok(Self {
            name,
            source: source.to_string(),
            frame: None,
            virtual_link: BTreeSet::new(),
            dependencies: BTreeSet::new(),
        })
    }

    /// Replace the destination set with `targets` (application names).
    ///
    /// Each target's source node receives this flow.  An empty set is valid.
    pub fn set_virtual_link<I, S>(&mut self, targets: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.virtual_link = targets
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        self
    }

    /// Set the period and phase offset, in slots.
    ///
    /// # Errors
    /// [`FlowError::InvalidPeriod`] if `period == 0`.
    pub fn set_frame(&mut self, period: u64, offset: u64) -> Result<&mut Self, FlowError> {
        if period == 0 {
            return Err(FlowError::InvalidPeriod {
                flow: self.name.clone(),
                period,
            });
        }
        self.frame = Some(Frame { period, offset });
        Ok(self)
    }

    /// Require this flow to transmit only after `other` has been delivered.
    pub fn depend_on(&mut self, other: &str) -> &mut Self {
        self.dependencies.insert(other.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `None` until [`set_frame`](Self::set_frame) succeeds.
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    pub fn virtual_link(&self) -> &BTreeSet<String> {
        &self.virtual_link
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }
}

// ── FlowSet ───────────────────────────────────────────────────────────────────

/// A validated collection of applications, stored in dependency order.
///
/// Every flow appears after all flows it depends on.
#[derive(Debug, Clone, Default)]
pub struct FlowSet {
    flows: Vec<Application>,
    index: HashMap<String, usize>,
}

impl FlowSet {
    /// The empty flow set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `apps` and seal them into a flow set.
    ///
    /// Checks (in order):
    /// 1. Names are unique.
    /// 2. Every dependency target is a member.
    /// 3. Every virtual-link target is a member.
    /// 4. The dependency graph has a topological order.
    pub fn assemble(mut apps: Vec<Application>) -> Result<Self, FlowError> {
        // Name order first so the topological order does not depend on the
        // caller's ordering
        apps.sort_by(|a, b| a.name.cmp(&b.name));

        let ranks = dependency_ranks(&apps)?;
        let mut ranked: Vec<(usize, Application)> = ranks.into_iter().zip(apps).collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        let flows: Vec<Application> = ranked.into_iter().map(|(_, app)| app).collect();

        let index = flows
            .iter()
            .enumerate()
            .map(|(i, app)| (app.name.clone(), i))
            .collect();

        info!(flow_count = flows.len(), "Flow set assembled");
        for app in &flows {
            debug!(
                flow = %app.name,
                source = %app.source,
                period = ?app.frame.map(|f| f.period),
                targets = app.virtual_link.len(),
                dependencies = app.dependencies.len(),
                "  flow"
            );
        }

        Ok(Self { flows, index })
    }

    pub fn get(&self, name: &str) -> Option<&Application> {
        self.index.get(name).map(|&i| &self.flows[i])
    }

    /// Flows in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

// ── Dependency graph ──────────────────────────────────────────────────────────

/// Position of every app (by index in `apps`) in a topological order of the
/// dependency graph.  Also resolves every name reference.
fn dependency_ranks(apps: &[Application]) -> Result<Vec<usize>, FlowError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for app in apps {
        if nodes.contains_key(app.name.as_str()) {
            return Err(FlowError::DuplicateFlow {
                name: app.name.clone(),
            });
        }
        nodes.insert(&app.name, graph.add_node(&app.name));
    }

    for app in apps {
        for dep in &app.dependencies {
            let Some(&before) = nodes.get(dep.as_str()) else {
                return Err(FlowError::UnknownDependencyTarget {
                    flow: app.name.clone(),
                    target: dep.clone(),
                });
            };
            // Edge direction: dependency → dependant
            graph.add_edge(before, nodes[app.name.as_str()], ());
        }
        if let Some(target) = app
            .virtual_link
            .iter()
            .find(|t| !nodes.contains_key(t.as_str()))
        {
            return Err(FlowError::UnknownVirtualLinkTarget {
                flow: app.name.clone(),
                target: target.clone(),
            });
        }
    }

    let order = match toposort(&graph, None) {
        Ok(order) => order,
        Err(cycle) => {
            let culprit = cycle.node_id();
            let members = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&culprit))
                .unwrap_or_else(|| vec![culprit]);
            let mut flows: Vec<String> = members.iter().map(|&ix| graph[ix].to_string()).collect();
            flows.sort();
            return Err(FlowError::CyclicDependency { flows });
        }
    };

    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(pos, &ix)| (graph[ix], pos))
        .collect();
    Ok(apps.iter().map(|a| position[a.name.as_str()]).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
