/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Network topology: nodes, undirected links and relay paths.
//!
//! All maps are `BTreeMap` / `BTreeSet` so that iteration order, and
//! therefore path selection, is identical on every run.
//!
//! # Path selection
//! [`Topology::path`] returns a minimum-hop path whose intermediate nodes are
//! all switches.  Among equal-length candidates the path is built hop by hop,
//! always stepping to the lexicographically smallest node that still lies on
//! a shortest path.

pub mod node;

pub use node::{Link, Node};

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use thiserror::Error;
use tracing::{debug, info};

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors raised while building a topology or resolving a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("node '{name}' already exists in the topology")]
    DuplicateNode { name: String },

    #[error("node '{name}' does not exist in the topology")]
    UnknownNode { name: String },

    #[error("link {link} already exists")]
    DuplicateLink { link: Link },

    #[error("node '{node}' cannot be linked to itself")]
    SelfLoop { node: String },

    /// No relay path connects the two nodes.
    #[error("no path from '{from}' to '{to}'")]
    Unreachable { from: String, to: String },

    /// The node has no link at all, so it cannot transmit.
    #[error("node '{node}' has no link")]
    IsolatedNode { node: String },
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// An ordered relay path from a source node to a destination node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    nodes: Vec<String>,
}

impl Path {
    pub fn source(&self) -> &str {
        &self.nodes[0]
    }

    pub fn destination(&self) -> &str {
        &self.nodes[self.nodes.len() - 1]
    }

    /// The intermediate (switch) nodes, in traversal order.
    pub fn relays(&self) -> &[String] {
        if self.nodes.len() <= 2 {
            &[]
        } else {
            &self.nodes[1..self.nodes.len() - 1]
        }
    }

    /// The links traversed, in order.  Empty for a source == destination path.
    pub fn links(&self) -> Vec<Link> {
        self.nodes
            .windows(2)
            .map(|w| Link::new(w[0].as_str(), w[1].as_str()))
            .collect()
    }

    pub fn hop_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Typed graph of end nodes, switches and links.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<String, Node>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
    links: BTreeSet<Link>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node`.
    ///
    /// # Errors
    /// [`TopologyError::DuplicateNode`] if a node with the same name exists.
    pub fn add_node(&mut self, node: Node) -> Result<(), TopologyError> {
        let name = node.name().to_string();
        if self.nodes.contains_key(&name) {
            return Err(TopologyError::DuplicateNode { name });
        }
        debug!(node = %name, relay = node.can_relay(), "node added");
        self.adjacency.insert(name.clone(), BTreeSet::new());
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Add an undirected link between two existing nodes.
    ///
    /// # Errors
    /// * [`TopologyError::UnknownNode`] – either name is absent.
    /// * [`TopologyError::SelfLoop`] – `a == b`.
    /// * [`TopologyError::DuplicateLink`] – the link exists in either
    ///   orientation.
    pub fn add_link(&mut self, a: &str, b: &str) -> Result<Link, TopologyError> {
        let link = self.check_link(a, b)?;
        self.insert_link(&link);
        Ok(link)
    }

    /// Link every spoke to `hub`.
    ///
    /// All links are validated before any is inserted, so a failing call
    /// leaves the topology unchanged.
    pub fn link_hub<I, S>(&mut self, hub: &str, spokes: I) -> Result<Vec<Link>, TopologyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending: Vec<Link> = Vec::new();
        for spoke in spokes {
            let link = self.check_link(hub, spoke.as_ref())?;
            if pending.contains(&link) {
                return Err(TopologyError::DuplicateLink { link });
            }
            pending.push(link);
        }

        for link in &pending {
            self.insert_link(link);
        }
        info!(hub, spokes = pending.len(), "hub linked");
        Ok(pending)
    }

    /// Shortest relay path from `source` to `destination`.
    ///
    /// Only switches are used as intermediate hops.  `path(x, x)` is the
    /// zero-hop path `[x]`.
    ///
    /// # Errors
    /// * [`TopologyError::UnknownNode`] – either name is absent.
    /// * [`TopologyError::Unreachable`] – no relay path exists.
    pub fn path(&self, source: &str, destination: &str) -> Result<Path, TopologyError> {
        self.require(source)?;
        self.require(destination)?;

        if source == destination {
            return Ok(Path {
                nodes: vec![source.to_string()],
            });
        }

        let unreachable = || TopologyError::Unreachable {
            from: source.to_string(),
            to: destination.to_string(),
        };

        let dist = self.distances_to(destination);
        let mut remaining = *dist.get(source).ok_or_else(unreachable)?;

        let mut nodes = vec![source.to_string()];
        let mut current = source;
        while remaining > 0 {
            // Smallest neighbour that is one hop closer and allowed on the path
            let next = self.adjacency[current]
                .iter()
                .find(|n| {
                    dist.get(n.as_str()) == Some(&(remaining - 1))
                        && (n.as_str() == destination || self.nodes[n.as_str()].can_relay())
                })
                .ok_or_else(unreachable)?;
            nodes.push(next.clone());
            current = next.as_str();
            remaining -= 1;
        }

        debug!(from = source, to = destination, hops = nodes.len() - 1, "path resolved");
        Ok(Path { nodes })
    }

    /// The first link (in link order) attached to `node`.
    ///
    /// Used as the transmission link of a flow that has no remote
    /// destination.
    pub fn egress_link(&self, node: &str) -> Result<Link, TopologyError> {
        self.require(node)?;
        self.adjacency[node]
            .iter()
            .map(|n| Link::new(node, n.as_str()))
            .min()
            .ok_or_else(|| TopologyError::IsolatedNode {
                node: node.to_string(),
            })
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// End nodes in name order.
    pub fn end_nodes(&self) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.can_originate_traffic())
            .collect()
    }

    /// Switch nodes in name order.
    pub fn switch_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.can_relay()).collect()
    }

    /// All links in link order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Neighbour names of `node`, sorted.  Empty for unknown nodes.
    pub fn neighbours(&self, node: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn require(&self, name: &str) -> Result<&Node, TopologyError> {
        self.nodes.get(name).ok_or_else(|| TopologyError::UnknownNode {
            name: name.to_string(),
        })
    }

    fn check_link(&self, a: &str, b: &str) -> Result<Link, TopologyError> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Err(TopologyError::SelfLoop {
                node: a.to_string(),
            });
        }
        let link = Link::new(a, b);
        if self.links.contains(&link) {
            return Err(TopologyError::DuplicateLink { link });
        }
        Ok(link)
    }

    fn insert_link(&mut self, link: &Link) {
        let (a, b) = link.endpoints();
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        debug!(link = %link, "link added");
        self.links.insert(link.clone());
    }

    /// Hop distance from every node to `destination`, following only paths
    /// whose intermediate nodes can relay.
    fn distances_to<'t>(&'t self, destination: &'t str) -> HashMap<&'t str, usize> {
        let mut dist: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        dist.insert(destination, 0);
        queue.push_back(destination);

        while let Some(u) = queue.pop_front() {
            // A non-relay node is a path endpoint only; do not expand it
            if u != destination && !self.nodes[u].can_relay() {
                continue;
            }
            let d = dist[u];
            for w in &self.adjacency[u] {
                if !dist.contains_key(w.as_str()) {
                    dist.insert(w.as_str(), d + 1);
                    queue.push_back(w.as_str());
                }
            }
        }
        dist
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
