/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler settings and YAML scenario loading.
//!
//! A scenario file describes one synthesis problem: the network, the
//! applications, and optionally the scheduler and solver settings.
//!
//! ```yaml
//! scheduler:
//!   max_hyperperiod: 65536
//!   routing: shortest_path_per_destination
//!   dependency_gap: 1
//! solver:
//!   timeout_ms: 5000
//!   max_steps: 1000000
//! nodes:
//!   node_a: { kind: end }
//!   node_b: { kind: end }
//!   switch_a: { kind: switch, processing_delay: 0 }
//! hubs:
//!   switch_a: [node_a, node_b]
//! links:
//!   - [switch_a, switch_b]
//! applications:
//!   app1:
//!     source: node_a
//!     period: 4
//!     offset: 0
//!     virtual_link: [app2]
//!   app2:
//!     source: node_b
//!     period: 4
//!     depends_on: [app1]
//! ```
//!
//! Everything except `nodes` is optional.  An application without `period`
//! is unframed.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::SolveOptions;
use crate::flow::Application;
use crate::hyperperiod::DEFAULT_HYPERPERIOD_LIMIT;
use crate::topology::{Node, Topology};

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// How a multicast flow is routed to its destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Independent shortest path to every destination; links shared by
    /// several paths are occupied once.
    #[default]
    ShortestPathPerDestination,
}

/// Tunables of the schedule builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Largest accepted hyperperiod, in slots.
    pub max_hyperperiod: u64,

    pub routing: RoutingPolicy,

    /// Slots between the end of a dependency's delivery and the start of
    /// the dependant's transmission.
    pub dependency_gap: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_hyperperiod: DEFAULT_HYPERPERIOD_LIMIT,
            routing: RoutingPolicy::default(),
            dependency_gap: 1,
        }
    }
}

/// Solver budget as written in a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub timeout_ms: Option<u64>,
    pub max_steps: Option<u64>,
}

impl SolverSettings {
    pub fn to_options(&self) -> SolveOptions {
        SolveOptions {
            timeout: self.timeout_ms.map(Duration::from_millis),
            max_steps: self.max_steps,
            cancel: None,
        }
    }
}

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeKind {
    End,
    Switch,
}

#[derive(Debug, Clone, Deserialize)]
struct NodeEntry {
    kind: NodeKind,
    #[serde(default)]
    processing_delay: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApplicationEntry {
    source: String,
    period: Option<u64>,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    virtual_link: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

// ── ScenarioConfig ────────────────────────────────────────────────────────────

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub solver: SolverSettings,

    nodes: BTreeMap<String, NodeEntry>,

    #[serde(default)]
    hubs: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    links: Vec<(String, String)>,

    #[serde(default)]
    applications: BTreeMap<String, ApplicationEntry>,
}

impl ScenarioConfig {
    /// Parse the scenario at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or the scheduler settings are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scenario from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;
        let scenario = Self::from_yaml(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))?;

        info!(
            nodes = scenario.nodes.len(),
            applications = scenario.applications.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }

    /// Parse a scenario from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        ensure!(
            scenario.scheduler.max_hyperperiod > 0,
            "scheduler.max_hyperperiod must be positive"
        );
        Ok(scenario)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    /// Build the network: nodes first, then hub links, then plain links.
    pub fn build_topology(&self) -> Result<Topology> {
        let mut topology = Topology::new();
        for (name, entry) in &self.nodes {
            let node = match entry.kind {
                NodeKind::End => Node::end(name.as_str()),
                NodeKind::Switch => Node::switch_with_delay(name.as_str(), entry.processing_delay),
            };
            topology
                .add_node(node)
                .with_context(|| format!("node '{name}'"))?;
        }
        for (hub, spokes) in &self.hubs {
            topology
                .link_hub(hub, spokes)
                .with_context(|| format!("hub '{hub}'"))?;
        }
        for (a, b) in &self.links {
            topology
                .add_link(a, b)
                .with_context(|| format!("link {a} - {b}"))?;
        }

        debug!(
            nodes = topology.node_count(),
            links = topology.link_count(),
            "Topology built"
        );
        Ok(topology)
    }

    /// Build the applications against `topology`, in name order.
    pub fn build_applications(&self, topology: &Topology) -> Result<Vec<Application>> {
        self.applications
            .iter()
            .map(|(name, entry)| -> Result<Application> {
                let mut app = Application::new(topology, name.as_str(), &entry.source)
                    .with_context(|| format!("application '{name}'"))?;
                app.set_virtual_link(&entry.virtual_link);
                if let Some(period) = entry.period {
                    app.set_frame(period, entry.offset)
                        .with_context(|| format!("application '{name}'"))?;
                }
                for dep in &entry.depends_on {
                    app.depend_on(dep);
                }
                Ok(app)
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
