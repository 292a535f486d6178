/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Built-in finite-domain backend.
//!
//! Solving runs in three stages:
//!
//! 1. **Equality collapse**: `a == b + c` constraints are merged with a
//!    weighted union-find, so each equivalence class becomes one search
//!    variable (its *root*) and every member is `root + offset`.  Inconsistent
//!    offsets inside a class are `Unsat` without any search.
//! 2. **Rewrite**: orderings become difference constraints between roots
//!    (`y - x >= c`); distinct groups become pairwise `y != x + d` exclusions.
//! 3. **Search**: depth-first, smallest domain first, values ascending.
//!    After every choice, bounds are propagated along difference constraints
//!    and assigned values are removed from the domains of excluded partners
//!    until a fixpoint.
//!
//! The search is deterministic: the same program always yields the same
//! model.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    ConstraintSink, InterruptReason, Model, SlotKey, SolveOptions, SolveOutcome, SolverBackend,
    VarHandle,
};

// ── SearchBackend ─────────────────────────────────────────────────────────────

/// Backtracking search backend.  Records the program as it is declared and
/// solves it on [`solve`](SolverBackend::solve).
#[derive(Debug, Clone, Default)]
pub struct SearchBackend {
    keys: Vec<SlotKey>,
    domains: Vec<Range<u64>>,
    equalities: Vec<(usize, usize, i64)>,
    orderings: Vec<(usize, usize, u64)>,
    distinct: Vec<Vec<usize>>,
}

impl SearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable_count(&self) -> usize {
        self.keys.len()
    }

    /// Equalities + orderings + distinct groups.
    pub fn constraint_count(&self) -> usize {
        self.equalities.len() + self.orderings.len() + self.distinct.len()
    }

    /// The key `var` was declared with.
    pub fn key_of(&self, var: VarHandle) -> Option<&SlotKey> {
        self.keys.get(var.0)
    }

    /// Collapse and rewrite the recorded program.  `None` means it is
    /// unsatisfiable without search.
    fn compile(&self) -> Option<Problem> {
        let n = self.keys.len();
        let mut aliases = Aliases::new(n);
        for &(lhs, rhs, offset) in &self.equalities {
            if !aliases.union(lhs, rhs, offset) {
                debug!(lhs = %self.keys[lhs], rhs = %self.keys[rhs], "inconsistent equality");
                return None;
            }
        }

        // Dense ids for class roots, in declaration order
        let mut dense: HashMap<usize, usize> = HashMap::new();
        let mut alias: Vec<(usize, i64)> = Vec::with_capacity(n);
        let mut bounds: Vec<(i64, i64)> = Vec::new();
        for var in 0..n {
            let (root, offset) = aliases.find(var);
            let next_id = dense.len();
            let id = *dense.entry(root).or_insert(next_id);
            if id == bounds.len() {
                bounds.push((i64::MIN, i64::MAX));
            }
            // value(root) = value(var) - offset
            let lo = self.domains[var].start as i64 - offset;
            let hi = self.domains[var].end as i64 - offset;
            let b = &mut bounds[id];
            b.0 = b.0.max(lo);
            b.1 = b.1.min(hi);
            alias.push((id, offset));
        }

        let roots = bounds.len();
        let mut domains: Vec<BTreeSet<i64>> = Vec::with_capacity(roots);
        for &(lo, hi) in &bounds {
            if lo >= hi {
                return None;
            }
            domains.push((lo..hi).collect());
        }

        let mut succ: Vec<Vec<(usize, i64)>> = vec![Vec::new(); roots];
        let mut pred: Vec<Vec<(usize, i64)>> = vec![Vec::new(); roots];
        for &(before, after, gap) in &self.orderings {
            let (x, ox) = alias[before];
            let (y, oy) = alias[after];
            // x + ox + gap <= y + oy   →   y - x >= ox + gap - oy
            let c = ox + gap as i64 - oy;
            if x == y {
                if c > 0 {
                    return None;
                }
                continue;
            }
            succ[x].push((y, c));
            pred[y].push((x, c));
        }

        let mut neq: Vec<Vec<(usize, i64)>> = vec![Vec::new(); roots];
        for group in &self.distinct {
            let terms: Vec<(usize, i64)> = group.iter().map(|&v| alias[v]).collect();
            for i in 0..terms.len() {
                for j in (i + 1)..terms.len() {
                    let (ri, oi) = terms[i];
                    let (rj, oj) = terms[j];
                    if ri == rj {
                        if oi == oj {
                            return None;
                        }
                        continue;
                    }
                    // ri + oi != rj + oj
                    neq[ri].push((rj, oi - oj));
                    neq[rj].push((ri, oj - oi));
                }
            }
        }

        Some(Problem {
            alias,
            domains,
            succ,
            pred,
            neq,
        })
    }
}

impl ConstraintSink for SearchBackend {
    fn clear(&mut self) {
        self.keys.clear();
        self.domains.clear();
        self.equalities.clear();
        self.orderings.clear();
        self.distinct.clear();
    }

    fn declare_variable(&mut self, key: SlotKey, domain: Range<u64>) -> VarHandle {
        self.keys.push(key);
        self.domains.push(domain);
        VarHandle(self.keys.len() - 1)
    }

    fn assert_equal(&mut self, lhs: VarHandle, rhs: VarHandle, offset: i64) {
        self.equalities.push((lhs.0, rhs.0, offset));
    }

    fn assert_less(&mut self, before: VarHandle, after: VarHandle, gap: u64) {
        self.orderings.push((before.0, after.0, gap));
    }

    fn assert_distinct(&mut self, vars: &[VarHandle]) {
        if vars.len() > 1 {
            self.distinct.push(vars.iter().map(|v| v.0).collect());
        }
    }
}

impl SolverBackend for SearchBackend {
    fn name(&self) -> &'static str {
        "search"
    }

    fn solve(&mut self, options: &SolveOptions) -> SolveOutcome {
        info!(
            backend = self.name(),
            variables = self.variable_count(),
            constraints = self.constraint_count(),
            "Solving"
        );

        let Some(problem) = self.compile() else {
            info!(backend = self.name(), "Unsat (detected while compiling)");
            return SolveOutcome::Unsat;
        };
        debug!(roots = problem.domains.len(), "equalities collapsed");

        let mut budget = Budget::new(options);
        let mut domains = problem.domains.clone();
        let all: Vec<usize> = (0..domains.len()).collect();
        if !problem.propagate(&mut domains, all) {
            info!(backend = self.name(), "Unsat (initial propagation)");
            return SolveOutcome::Unsat;
        }

        match problem.search(domains, &mut budget) {
            Ok(Some(roots)) => {
                let model: Model = problem
                    .alias
                    .iter()
                    .enumerate()
                    .filter_map(|(var, &(root, offset))| {
                        u64::try_from(roots[root] + offset)
                            .ok()
                            .map(|value| (VarHandle(var), value))
                    })
                    .collect();
                info!(backend = self.name(), steps = budget.steps, "Sat");
                SolveOutcome::Sat(model)
            }
            Ok(None) => {
                info!(backend = self.name(), steps = budget.steps, "Unsat");
                SolveOutcome::Unsat
            }
            Err(reason) => {
                warn!(backend = self.name(), steps = budget.steps, %reason, "Search interrupted");
                SolveOutcome::Interrupted(reason)
            }
        }
    }
}

// ── Equality classes ──────────────────────────────────────────────────────────

/// Weighted union-find: `value(v) == value(parent[v]) + offset[v]`.
struct Aliases {
    parent: Vec<usize>,
    offset: Vec<i64>,
}

impl Aliases {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            offset: vec![0; n],
        }
    }

    /// `(root, o)` with `value(v) == value(root) + o`.
    fn find(&mut self, v: usize) -> (usize, i64) {
        let mut path = Vec::new();
        let mut root = v;
        while self.parent[root] != root {
            path.push(root);
            root = self.parent[root];
        }
        // Compress, nearest-to-root first so parents are already flattened
        for &node in path.iter().rev() {
            let p = self.parent[node];
            if p != root {
                self.offset[node] += self.offset[p];
            }
            self.parent[node] = root;
        }
        if v == root {
            (root, 0)
        } else {
            (root, self.offset[v])
        }
    }

    /// Record `value(a) == value(b) + off`.  `false` if it contradicts an
    /// earlier equality.
    fn union(&mut self, a: usize, b: usize, off: i64) -> bool {
        let (ra, oa) = self.find(a);
        let (rb, ob) = self.find(b);
        if ra == rb {
            return oa == ob + off;
        }
        self.parent[ra] = rb;
        self.offset[ra] = ob + off - oa;
        true
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Compiled program over root variables.
struct Problem {
    /// Per declared variable: `(root, offset)`.
    alias: Vec<(usize, i64)>,
    /// Per root: candidate values.
    domains: Vec<BTreeSet<i64>>,
    /// Per root `x`: `(y, c)` with `y - x >= c`.
    succ: Vec<Vec<(usize, i64)>>,
    /// Per root `y`: `(x, c)` with `y - x >= c`.
    pred: Vec<Vec<(usize, i64)>>,
    /// Per root `x`: `(y, d)` with `y != x + d`.
    neq: Vec<Vec<(usize, i64)>>,
}

impl Problem {
    /// Prune `doms` to a fixpoint starting from the roots in `queue`.
    /// `false` as soon as a domain empties.
    fn propagate(&self, doms: &mut [BTreeSet<i64>], mut queue: Vec<usize>) -> bool {
        while let Some(x) = queue.pop() {
            let (Some(&min_x), Some(&max_x)) = (doms[x].first(), doms[x].last()) else {
                return false;
            };

            if min_x == max_x {
                for &(y, d) in &self.neq[x] {
                    if doms[y].remove(&(min_x + d)) {
                        if doms[y].is_empty() {
                            return false;
                        }
                        queue.push(y);
                    }
                }
            }

            for &(y, c) in &self.succ[x] {
                let floor = min_x + c;
                if doms[y].first().is_some_and(|&m| m < floor) {
                    doms[y].retain(|&v| v >= floor);
                    if doms[y].is_empty() {
                        return false;
                    }
                    queue.push(y);
                }
            }

            for &(w, c) in &self.pred[x] {
                let ceiling = max_x - c;
                if doms[w].last().is_some_and(|&m| m > ceiling) {
                    doms[w].retain(|&v| v <= ceiling);
                    if doms[w].is_empty() {
                        return false;
                    }
                    queue.push(w);
                }
            }
        }
        true
    }

    fn search(
        &self,
        doms: Vec<BTreeSet<i64>>,
        budget: &mut Budget<'_>,
    ) -> Result<Option<Vec<i64>>, InterruptReason> {
        budget.tick()?;

        let branch = (0..doms.len())
            .filter(|&r| doms[r].len() > 1)
            .min_by_key(|&r| (doms[r].len(), r));
        let Some(root) = branch else {
            // Every domain is a singleton and consistent
            return Ok(doms.iter().map(|d| d.first().copied()).collect());
        };

        let candidates: Vec<i64> = doms[root].iter().copied().collect();
        for value in candidates {
            let mut child = doms.clone();
            child[root] = BTreeSet::from([value]);
            if self.propagate(&mut child, vec![root]) {
                if let Some(solution) = self.search(child, budget)? {
                    return Ok(Some(solution));
                }
            }
        }
        Ok(None)
    }
}

/// Time / step / cancellation limits for one solve.
struct Budget<'a> {
    deadline: Option<Instant>,
    max_steps: Option<u64>,
    cancel: Option<&'a CancellationToken>,
    steps: u64,
}

impl<'a> Budget<'a> {
    fn new(options: &'a SolveOptions) -> Self {
        Self {
            deadline: options.timeout.map(|t| Instant::now() + t),
            max_steps: options.max_steps,
            cancel: options.cancel.as_ref(),
            steps: 0,
        }
    }

    fn tick(&mut self) -> Result<(), InterruptReason> {
        self.steps += 1;
        if self.max_steps.is_some_and(|max| self.steps > max) {
            return Err(InterruptReason::StepLimit);
        }
        if self.cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(InterruptReason::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(InterruptReason::Timeout);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
