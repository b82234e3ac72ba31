//! Rota solving, greedy fallback and KPI evaluation.
//!
//! # Algorithm
//!
//! `RotaSolver` runs the CP formulation from [`crate::cp`] under a time
//! limit. When the search returns nothing, `GreedyAllocator` builds a
//! best-effort schedule instead.
//!
//! # KPI
//!
//! `RotaKpi` reports preference violations, workload spread, coverage
//! shortfalls and hours per nurse.

mod fallback;
mod kpi;
mod solver;

pub use fallback::GreedyAllocator;
pub use kpi::RotaKpi;
pub use solver::{check_resources, solve, RotaSolver, Solution, SolutionOrigin};
