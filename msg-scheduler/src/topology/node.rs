/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Node and link value types.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Node ──────────────────────────────────────────────────────────────────────

/// A network node.
///
/// The two kinds have disjoint capabilities: an end node hosts applications
/// but never forwards traffic, a switch forwards traffic but never hosts an
/// application.  Keeping them as a flat enum lets path and constraint code
/// match exhaustively on the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Processing core / host that originates and terminates messages.
    End { name: String },

    /// Message relay.  `processing_delay` is the number of extra time slots a
    /// frame spends inside the switch before it can leave on the next link.
    Switch { name: String, processing_delay: u64 },
}

impl Node {
    /// An end node.
    pub fn end(name: impl Into<String>) -> Self {
        Node::End { name: name.into() }
    }

    /// A switch that forwards in the next slot.
    pub fn switch(name: impl Into<String>) -> Self {
        Self::switch_with_delay(name, 0)
    }

    /// A switch that holds each frame for `processing_delay` extra slots.
    pub fn switch_with_delay(name: impl Into<String>, processing_delay: u64) -> Self {
        Node::Switch {
            name: name.into(),
            processing_delay,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::End { name } | Node::Switch { name, .. } => name,
        }
    }

    /// `true` for nodes that may be the source or destination of a flow.
    pub fn can_originate_traffic(&self) -> bool {
        matches!(self, Node::End { .. })
    }

    /// `true` for nodes that may appear as an intermediate hop.
    pub fn can_relay(&self) -> bool {
        matches!(self, Node::Switch { .. })
    }

    /// Extra slots between receiving and forwarding a frame.  Always `0` for
    /// end nodes.
    pub fn processing_delay(&self) -> u64 {
        match self {
            Node::End { .. } => 0,
            Node::Switch {
                processing_delay, ..
            } => *processing_delay,
        }
    }
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// Undirected link between two nodes.
///
/// Endpoints are stored in lexicographic order, so `Link::new("a", "b")` and
/// `Link::new("b", "a")` are the same link.  The derived `Ord` gives a stable
/// ordering for schedule tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    a: String,
    b: String,
}

impl Link {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y {
            Link { a: x, b: y }
        } else {
            Link { a: y, b: x }
        }
    }

    /// Both endpoints, lexicographically ordered.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.a, self.b)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
