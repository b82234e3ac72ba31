//! Depth-first branch-and-bound search over a [`CpModel`].
//!
//! # Algorithm
//!
//! 1. Branch on a variable (true first, then false).
//! 2. Propagate every touched cardinality constraint to a fixpoint:
//!    - `true_count > max` or `true_count + free < min` is a conflict,
//!    - `true_count == max` forces the free variables false,
//!    - `true_count + free == min` forces them true.
//! 3. Prune when the objective lower bound reaches the shared incumbent.
//! 4. Backtrack chronologically through the trail.
//!
//! Restarting workers shuffle their group and value order with a seeded
//! RNG and restart after a growing number of conflicts. A worker that
//! exhausts its tree has proven the incumbent optimal (or the model
//! infeasible when there is none).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::model::{BoolVar, CpModel};

/// Conflicts before the first restart.
const INITIAL_RESTART_LIMIT: u64 = 64;
/// Nodes between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// State shared by all workers of one solve.
#[derive(Debug)]
pub(crate) struct Shared {
    best_objective: AtomicI64,
    incumbent: Mutex<Option<(i64, Vec<bool>)>>,
    stop: AtomicBool,
    proven: AtomicBool,
}

/// Per-model lookup tables, built once and read by every worker.
#[derive(Debug)]
pub(crate) struct SearchIndex {
    /// var → constraints containing it (with multiplicity).
    watches: Vec<Vec<u32>>,
    /// var → penalty paid when false.
    penalty: Vec<i64>,
    /// var → balance group.
    balance: Vec<Option<u32>>,
    /// Variables outside every decision group.
    ungrouped: Vec<BoolVar>,
}

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerOutcome {
    /// The whole tree was explored.
    Exhausted,
    /// Deadline reached or another worker finished the job.
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct Decision {
    var: BoolVar,
    trail_len: usize,
    cursor: usize,
    flipped: bool,
}

/// One search thread.
pub(crate) struct Worker<'a> {
    model: &'a CpModel,
    index: &'a SearchIndex,
    shared: &'a Shared,
    values: Vec<Option<bool>>,
    ctr_true: Vec<u32>,
    ctr_free: Vec<u32>,
    group_true: Vec<u32>,
    group_free: Vec<u32>,
    balance_true_total: u32,
    penalty_cost: i64,
    trail: Vec<BoolVar>,
    pending: Vec<u32>,
    decisions: Vec<Decision>,
    /// Decision-group indices in branching order.
    order: Vec<usize>,
    /// Per decision group, variables in value order.
    var_orders: Vec<Vec<BoolVar>>,
    cursor: usize,
    rng: StdRng,
    restarts: bool,
    nodes: u64,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            best_objective: AtomicI64::new(i64::MAX),
            incumbent: Mutex::new(None),
            stop: AtomicBool::new(false),
            proven: AtomicBool::new(false),
        }
    }

    /// Marks the incumbent as proven (or the model infeasible) and stops everyone.
    pub(crate) fn finish(&self) {
        self.proven.store(true, Ordering::SeqCst);
        self.stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_proven(&self) -> bool {
        self.proven.load(Ordering::SeqCst)
    }

    /// Takes the best solution found, if any.
    pub(crate) fn take_incumbent(&self) -> Option<(i64, Vec<bool>)> {
        match self.incumbent.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn best(&self) -> i64 {
        self.best_objective.load(Ordering::Relaxed)
    }

    fn offer(&self, objective: i64, values: Vec<bool>) {
        let mut guard = match self.incumbent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let better = guard.as_ref().map_or(true, |(best, _)| objective < *best);
        if better {
            *guard = Some((objective, values));
            self.best_objective.store(objective, Ordering::SeqCst);
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

impl SearchIndex {
    pub(crate) fn build(model: &CpModel) -> Self {
        let n = model.var_count();
        let mut watches = vec![Vec::new(); n];
        for (c, constraint) in model.constraints().iter().enumerate() {
            for var in &constraint.vars {
                watches[var.index()].push(c as u32);
            }
        }

        let mut penalty = vec![0i64; n];
        for (var, weight) in &model.objective().penalties {
            penalty[var.index()] += weight;
        }

        let mut balance = vec![None; n];
        for (g, group) in model.objective().balance_groups.iter().enumerate() {
            for var in group {
                balance[var.index()] = Some(g as u32);
            }
        }

        let mut grouped = vec![false; n];
        for group in model.decision_groups() {
            for var in &group.vars {
                grouped[var.index()] = true;
            }
            if let Some(hint) = group.hint {
                grouped[hint.index()] = true;
            }
        }
        let ungrouped = (0..n)
            .filter(|&i| !grouped[i])
            .map(|i| BoolVar(i as u32))
            .collect();

        Self {
            watches,
            penalty,
            balance,
            ungrouped,
        }
    }
}

impl<'a> Worker<'a> {
    /// Creates a worker. Only restarting workers randomize their order.
    pub(crate) fn new(
        model: &'a CpModel,
        index: &'a SearchIndex,
        shared: &'a Shared,
        seed: u64,
        restarts: bool,
    ) -> Self {
        let groups = &model.objective().balance_groups;
        let mut worker = Self {
            model,
            index,
            shared,
            values: vec![None; model.var_count()],
            ctr_true: vec![0; model.constraint_count()],
            ctr_free: model
                .constraints()
                .iter()
                .map(|c| c.vars.len() as u32)
                .collect(),
            group_true: vec![0; groups.len()],
            group_free: groups.iter().map(|g| g.len() as u32).collect(),
            balance_true_total: 0,
            penalty_cost: 0,
            trail: Vec::with_capacity(model.var_count()),
            pending: Vec::new(),
            decisions: Vec::new(),
            order: Vec::new(),
            var_orders: model
                .decision_groups()
                .iter()
                .map(|g| g.vars.clone())
                .collect(),
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
            restarts,
            nodes: 0,
        };
        worker.reset_order();
        worker
    }

    /// Nodes visited so far.
    pub(crate) fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Searches until the tree is exhausted, the deadline passes, or
    /// another worker stops the solve.
    pub(crate) fn run(&mut self, deadline: Instant) -> WorkerOutcome {
        self.pending.extend(0..self.model.constraint_count() as u32);
        if !self.propagate() {
            return WorkerOutcome::Exhausted;
        }
        let root_len = self.trail.len();
        let mut restart_limit = INITIAL_RESTART_LIMIT;
        let mut conflicts = 0u64;

        loop {
            self.nodes += 1;
            if self.shared.should_stop() {
                return WorkerOutcome::Stopped;
            }
            if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return WorkerOutcome::Stopped;
            }

            if !self.propagate() || self.bound_reached() {
                conflicts += 1;
                if self.restarts && conflicts >= restart_limit {
                    self.restart(root_len);
                    restart_limit += restart_limit / 2;
                    conflicts = 0;
                    continue;
                }
                if !self.backtrack() {
                    return WorkerOutcome::Exhausted;
                }
                continue;
            }

            match self.next_branch() {
                Some(var) => {
                    self.decisions.push(Decision {
                        var,
                        trail_len: self.trail.len(),
                        cursor: self.cursor,
                        flipped: false,
                    });
                    self.assign(var, true);
                }
                None => {
                    self.record_solution();
                    if self.shared.should_stop() {
                        return WorkerOutcome::Stopped;
                    }
                    if !self.backtrack() {
                        return WorkerOutcome::Exhausted;
                    }
                }
            }
        }
    }

    fn assign(&mut self, var: BoolVar, value: bool) {
        let v = var.index();
        self.values[v] = Some(value);
        self.trail.push(var);
        for &c in &self.index.watches[v] {
            let c = c as usize;
            self.ctr_free[c] -= 1;
            if value {
                self.ctr_true[c] += 1;
            }
            self.pending.push(c as u32);
        }
        if !value {
            self.penalty_cost += self.index.penalty[v];
        }
        if let Some(g) = self.index.balance[v] {
            let g = g as usize;
            self.group_free[g] -= 1;
            if value {
                self.group_true[g] += 1;
                self.balance_true_total += 1;
            }
        }
    }

    fn undo(&mut self, trail_len: usize) {
        self.pending.clear();
        while self.trail.len() > trail_len {
            let Some(var) = self.trail.pop() else { break };
            let v = var.index();
            let value = self.values[v].take().unwrap_or(false);
            for &c in &self.index.watches[v] {
                let c = c as usize;
                self.ctr_free[c] += 1;
                if value {
                    self.ctr_true[c] -= 1;
                }
            }
            if !value {
                self.penalty_cost -= self.index.penalty[v];
            }
            if let Some(g) = self.index.balance[v] {
                let g = g as usize;
                self.group_free[g] += 1;
                if value {
                    self.group_true[g] -= 1;
                    self.balance_true_total -= 1;
                }
            }
        }
    }

    /// Propagates pending constraints; `false` on conflict.
    fn propagate(&mut self) -> bool {
        let model = self.model;
        while let Some(c) = self.pending.pop() {
            let c = c as usize;
            let constraint = &model.constraints()[c];
            let t = self.ctr_true[c];
            let f = self.ctr_free[c];
            if t > constraint.max || t + f < constraint.min {
                self.pending.clear();
                return false;
            }
            if f == 0 {
                continue;
            }
            let forced = if t == constraint.max {
                false
            } else if t + f == constraint.min {
                true
            } else {
                continue;
            };
            for &var in &constraint.vars {
                if self.values[var.index()].is_none() {
                    self.assign(var, forced);
                }
            }
        }
        true
    }

    /// Whether the subtree cannot beat the incumbent.
    fn bound_reached(&self) -> bool {
        let best = self.shared.best();
        best != i64::MAX && self.lower_bound() >= best
    }

    fn lower_bound(&self) -> i64 {
        let objective = self.model.objective();
        let max_true = self.group_true.iter().max().copied();
        let min_reachable = self
            .group_true
            .iter()
            .zip(&self.group_free)
            .map(|(t, f)| t + f)
            .min();
        let spread = match (max_true, min_reachable) {
            (Some(hi), Some(lo)) if hi > lo => i64::from(hi - lo),
            _ => 0,
        };
        (self.penalty_cost + objective.balance_weight * spread).max(objective.floor)
    }

    fn record_solution(&mut self) {
        let objective = self.model.objective();
        let spread = match (self.group_true.iter().max(), self.group_true.iter().min()) {
            (Some(hi), Some(lo)) => i64::from(hi - lo),
            _ => 0,
        };
        let value = self.penalty_cost + objective.balance_weight * spread;
        if value >= self.shared.best() {
            return;
        }
        let values = self.values.iter().map(|v| v.unwrap_or(false)).collect();
        self.shared.offer(value, values);
        if value <= objective.floor {
            self.shared.finish();
        }
    }

    /// Flips the deepest unflipped decision; `false` when none is left.
    fn backtrack(&mut self) -> bool {
        while let Some(decision) = self.decisions.pop() {
            self.undo(decision.trail_len);
            self.cursor = decision.cursor;
            if !decision.flipped {
                self.decisions.push(Decision {
                    flipped: true,
                    ..decision
                });
                self.assign(decision.var, false);
                return true;
            }
        }
        false
    }

    fn restart(&mut self, root_len: usize) {
        self.undo(root_len);
        self.decisions.clear();
        self.cursor = 0;
        self.reset_order();
    }

    fn reset_order(&mut self) {
        let groups = self.model.decision_groups();
        self.order = (0..groups.len()).collect();
        if self.restarts {
            let keys: Vec<u32> = (0..groups.len()).map(|_| self.rng.random()).collect();
            self.order.sort_by_key(|&g| (groups[g].stage, keys[g]));
            for vars in &mut self.var_orders {
                vars.shuffle(&mut self.rng);
            }
        } else {
            self.order.sort_by_key(|&g| groups[g].stage);
        }
    }

    fn next_branch(&mut self) -> Option<BoolVar> {
        while self.cursor < self.order.len() {
            let g = self.order[self.cursor];
            if let Some(var) = self.pick_in_group(g) {
                return Some(var);
            }
            self.cursor += 1;
        }
        self.index
            .ungrouped
            .iter()
            .copied()
            .find(|v| self.values[v.index()].is_none())
    }

    /// Picks the hint first, then prefers balance-group variables for
    /// groups whose load is at or below the mean, other variables otherwise.
    fn pick_in_group(&self, g: usize) -> Option<BoolVar> {
        let group = &self.model.decision_groups()[g];
        if let Some(hint) = group.hint {
            if self.values[hint.index()].is_none() {
                return Some(hint);
            }
        }

        let vars = &self.var_orders[g];
        let load_group = vars.iter().find_map(|v| self.index.balance[v.index()]);
        let favour_balanced = match load_group {
            Some(bg) => {
                let groups = self.group_true.len() as u64;
                u64::from(self.group_true[bg as usize]) * groups
                    <= u64::from(self.balance_true_total)
            }
            None => true,
        };

        let mut other = None;
        for &var in vars {
            if self.values[var.index()].is_some() {
                continue;
            }
            if self.index.balance[var.index()].is_some() == favour_balanced {
                return Some(var);
            }
            other.get_or_insert(var);
        }
        other
    }
}
