//! Boolean CP model.
//!
//! Every constraint is a cardinality constraint over boolean variables:
//! `min <= |{v in vars : v = true}| <= max`. This covers exactly-one,
//! equality and bound counts, clauses (`a or b` is `a + b >= 1`) and
//! mutual exclusion (`not (a and b)` is `a + b <= 1`).
//!
//! The objective is a weighted sum of
//! - penalties paid when a *preferred* variable ends up false, and
//! - the spread `max - min` of the true-counts of a family of groups.

/// Handle to a boolean decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(pub(crate) u32);

impl BoolVar {
    /// Position of the variable in value vectors.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `min <= sum(vars) <= max`.
#[derive(Debug, Clone)]
pub struct Cardinality {
    /// Constrained variables.
    pub vars: Vec<BoolVar>,
    /// Minimum number of true variables.
    pub min: u32,
    /// Maximum number of true variables.
    pub max: u32,
}

/// A set of variables branched on together, in order.
///
/// Groups are searched by ascending `stage`; `hint` is tried first.
#[derive(Debug, Clone)]
pub struct DecisionGroup {
    /// Search stage (smaller first).
    pub stage: u32,
    /// Variables of the group, in default value order.
    pub vars: Vec<BoolVar>,
    /// Variable to set true first, if any.
    pub hint: Option<BoolVar>,
}

/// Minimization objective.
#[derive(Debug, Clone, Default)]
pub struct Objective {
    /// `(var, weight)`: `weight` is paid when `var` is false.
    pub penalties: Vec<(BoolVar, i64)>,
    /// Groups whose true-count spread is minimized.
    pub balance_groups: Vec<Vec<BoolVar>>,
    /// Weight of the spread term.
    pub balance_weight: i64,
    /// A proven lower bound on the objective.
    pub floor: i64,
}

/// A boolean constraint model.
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    num_vars: u32,
    constraints: Vec<Cardinality>,
    groups: Vec<DecisionGroup>,
    objective: Objective,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_vars: 0,
            constraints: Vec::new(),
            groups: Vec::new(),
            objective: Objective::default(),
        }
    }

    /// Declares a new boolean variable.
    pub fn new_bool_var(&mut self) -> BoolVar {
        let var = BoolVar(self.num_vars);
        self.num_vars += 1;
        var
    }

    /// Adds `min <= sum(vars) <= max`.
    ///
    /// `max` is clamped to the number of variables.
    pub fn add_cardinality(&mut self, vars: Vec<BoolVar>, min: u32, max: u32) {
        let max = max.min(vars.len() as u32);
        self.constraints.push(Cardinality { vars, min, max });
    }

    /// Exactly one of `vars` is true.
    pub fn add_exactly_one(&mut self, vars: Vec<BoolVar>) {
        self.add_cardinality(vars, 1, 1);
    }

    /// `sum(vars) == count`.
    pub fn add_sum_eq(&mut self, vars: Vec<BoolVar>, count: u32) {
        self.add_cardinality(vars, count, count);
    }

    /// `sum(vars) >= min`.
    pub fn add_sum_ge(&mut self, vars: Vec<BoolVar>, min: u32) {
        self.add_cardinality(vars, min, u32::MAX);
    }

    /// `sum(vars) <= max`.
    pub fn add_sum_le(&mut self, vars: Vec<BoolVar>, max: u32) {
        self.add_cardinality(vars, 0, max);
    }

    /// At least one of `vars` is true.
    pub fn add_bool_or(&mut self, vars: Vec<BoolVar>) {
        self.add_sum_ge(vars, 1);
    }

    /// `a` and `b` are not both true.
    pub fn add_not_both(&mut self, a: BoolVar, b: BoolVar) {
        self.add_sum_le(vec![a, b], 1);
    }

    /// Registers a branching group.
    pub fn add_decision_group(&mut self, stage: u32, vars: Vec<BoolVar>, hint: Option<BoolVar>) {
        self.groups.push(DecisionGroup { stage, vars, hint });
    }

    /// Pays `weight` when `var` is false.
    pub fn penalize_unless(&mut self, var: BoolVar, weight: i64) {
        self.objective.penalties.push((var, weight));
    }

    /// Minimizes `weight * (max_g sum(g) - min_g sum(g))`.
    ///
    /// A variable may belong to at most one group.
    pub fn minimize_spread(&mut self, groups: Vec<Vec<BoolVar>>, weight: i64) {
        self.objective.balance_groups = groups;
        self.objective.balance_weight = weight;
    }

    /// Declares a lower bound the objective can never go below.
    ///
    /// A solution reaching it is optimal and stops the search.
    pub fn set_objective_floor(&mut self, floor: i64) {
        self.objective.floor = floor;
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.num_vars as usize
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// All constraints.
    pub fn constraints(&self) -> &[Cardinality] {
        &self.constraints
    }

    /// Branching groups.
    pub fn decision_groups(&self) -> &[DecisionGroup] {
        &self.groups
    }

    /// The objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Whether a complete assignment satisfies every constraint.
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        values.len() == self.var_count()
            && self.constraints.iter().all(|c| {
                let t = c.vars.iter().filter(|v| values[v.index()]).count() as u32;
                c.min <= t && t <= c.max
            })
    }

    /// Objective value of a complete assignment.
    pub fn evaluate(&self, values: &[bool]) -> i64 {
        let obj = &self.objective;
        let penalty: i64 = obj
            .penalties
            .iter()
            .filter(|(v, _)| !values[v.index()])
            .map(|(_, w)| w)
            .sum();

        let sums: Vec<i64> = obj
            .balance_groups
            .iter()
            .map(|g| g.iter().filter(|v| values[v.index()]).count() as i64)
            .collect();
        let spread = match (sums.iter().max(), sums.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };

        penalty + obj.balance_weight * spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model() {
        let mut m = CpModel::new("t");
        let a = m.new_bool_var();
        let b = m.new_bool_var();
        let c = m.new_bool_var();
        m.add_exactly_one(vec![a, b, c]);
        m.add_not_both(a, b);
        m.add_sum_ge(vec![b, c], 5);

        assert_eq!(m.name(), "t");
        assert_eq!(m.var_count(), 3);
        assert_eq!(m.constraint_count(), 3);
        // max clamped to the variable count
        assert_eq!(m.constraints()[2].max, 2);
        assert_eq!(m.constraints()[2].min, 5);
    }

    #[test]
    fn test_is_satisfied() {
        let mut m = CpModel::new("t");
        let a = m.new_bool_var();
        let b = m.new_bool_var();
        m.add_bool_or(vec![a, b]);
        m.add_not_both(a, b);

        assert!(m.is_satisfied(&[true, false]));
        assert!(m.is_satisfied(&[false, true]));
        assert!(!m.is_satisfied(&[true, true]));
        assert!(!m.is_satisfied(&[false, false]));
        assert!(!m.is_satisfied(&[true]));
    }

    #[test]
    fn test_evaluate() {
        let mut m = CpModel::new("t");
        let vars: Vec<BoolVar> = (0..4).map(|_| m.new_bool_var()).collect();
        m.penalize_unless(vars[0], 100);
        m.minimize_spread(vec![vec![vars[0], vars[1]], vec![vars[2], vars[3]]], 10);

        // group sums 1 and 2 → spread 1; vars[0] false → penalty 100
        assert_eq!(m.evaluate(&[false, true, true, true]), 110);
        // group sums 2 and 0 → spread 2
        assert_eq!(m.evaluate(&[true, true, false, false]), 20);
        assert_eq!(m.evaluate(&[true, false, true, false]), 0);
    }
}
