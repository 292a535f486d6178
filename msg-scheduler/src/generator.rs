/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Random scenario generator.
//!
//! Builds a random tree network and one application per end node:
//!
//! * tree leaves become end nodes `app_<i>`, inner nodes become switches
//!   `msg_<i>`, so every pair of end nodes is connected through switches only;
//! * each application targets a random sample of the others and sends with
//!   period `⌊1.5 · #applications⌋`.
//!
//! Random scenarios are frequently infeasible; pair the generator with
//! [`synthesize_with_retries`](crate::scheduler::synthesize_with_retries).

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::flow::Application;
use crate::scheduler::ScheduleError;
use crate::topology::{Node, Topology};

/// Smallest network the generator builds.
pub const MIN_NODES: usize = 2;

/// A generated network with its applications.
#[derive(Debug, Clone)]
pub struct RandomScenario {
    pub topology: Topology,
    pub applications: Vec<Application>,
}

/// Generate a scenario with `node_count` nodes (at least [`MIN_NODES`]).
///
/// # Errors
/// Only if the generated names collide, which the naming scheme rules out.
pub fn random_scenario<R>(rng: &mut R, node_count: usize) -> Result<RandomScenario, ScheduleError>
where
    R: Rng + ?Sized,
{
    let n = node_count.max(MIN_NODES);

    // Random recursive tree: node i hangs off a uniformly chosen earlier node
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(n - 1);
    let mut degree = vec![0usize; n];
    for i in 1..n {
        let parent = rng.random_range(0..i);
        edges.push((parent, i));
        degree[parent] += 1;
        degree[i] += 1;
    }

    let names: Vec<String> = degree
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if d == 1 {
                format!("app_{i}")
            } else {
                format!("msg_{i}")
            }
        })
        .collect();

    let mut topology = Topology::new();
    for (name, &d) in names.iter().zip(&degree) {
        let node = if d == 1 {
            Node::end(name.as_str())
        } else {
            Node::switch(name.as_str())
        };
        topology.add_node(node)?;
    }
    for &(a, b) in &edges {
        topology.add_link(&names[a], &names[b])?;
    }

    let app_names: Vec<String> = topology
        .end_nodes()
        .iter()
        .map(|node| node.name().to_string())
        .collect();
    let period = (app_names.len() as u64 * 3 / 2).max(1);
    let max_targets = (app_names.len() / 2).max(2);

    let mut applications = Vec::with_capacity(app_names.len());
    for name in &app_names {
        let mut app = Application::new(&topology, name.as_str(), name)?;
        let wanted = rng.random_range(1..=max_targets);
        let targets: Vec<&String> = app_names
            .choose_multiple(rng, wanted)
            .filter(|t| *t != name)
            .collect();
        app.set_virtual_link(targets).set_frame(period, 0)?;
        applications.push(app);
    }

    debug!(
        nodes = n,
        applications = applications.len(),
        period,
        "Random scenario generated"
    );
    Ok(RandomScenario {
        topology,
        applications,
    })
}

/// [`random_scenario`] driven by a seeded [`StdRng`].
pub fn seeded_scenario(seed: u64, node_count: usize) -> Result<RandomScenario, ScheduleError> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_scenario(&mut rng, node_count)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::scheduler::ScheduleBuilder;

    #[test]
    fn tree_shape() {
        for seed in 0..20 {
            let s = seeded_scenario(seed, 9).unwrap();
            assert_eq!(s.topology.node_count(), 9);
            assert_eq!(s.topology.link_count(), 8);
            for end in s.topology.end_nodes() {
                assert_eq!(s.topology.neighbours(end.name()).count(), 1);
                assert!(end.name().starts_with("app_"));
            }
            for switch in s.topology.switch_nodes() {
                assert!(s.topology.neighbours(switch.name()).count() >= 2);
            }
        }
    }

    #[test]
    fn one_application_per_end_node() {
        let s = seeded_scenario(7, 12).unwrap();
        let ends = s.topology.end_nodes().len();
        assert_eq!(s.applications.len(), ends);
        let period = (ends as u64 * 3 / 2).max(1);
        for app in &s.applications {
            assert_eq!(app.name(), app.source());
            assert_eq!(app.frame().unwrap().period, period);
            assert!(!app.virtual_link().contains(app.name()));
        }
    }

    #[test]
    fn same_seed_same_scenario() {
        let a = seeded_scenario(42, 10).unwrap();
        let b = seeded_scenario(42, 10).unwrap();
        assert_eq!(a.applications, b.applications);
        let la: Vec<_> = a.topology.links().collect();
        let lb: Vec<_> = b.topology.links().collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn tiny_request_is_clamped() {
        let s = seeded_scenario(1, 0).unwrap();
        assert_eq!(s.topology.node_count(), MIN_NODES);
        assert_eq!(s.applications.len(), 2);
    }

    #[test]
    fn generated_scenarios_are_routable() {
        for seed in 0..10 {
            let s = seeded_scenario(seed, 8).unwrap();
            let mut b = ScheduleBuilder::new(&s.topology, SchedulerConfig::default());
            b.add_apps(s.applications).unwrap();
        }
    }
}
