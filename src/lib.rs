//! Nurse rota engine.
//!
//! Assigns nurses to day and night shifts over a date range, honoring
//! staffing, certification, rest and weekend rules while trading shift
//! requests off against a balanced workload.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Nurse`, `ShiftType`, `ShiftRequirements`,
//!   `Preferences`, `ConstraintModel`, `Schedule`, `Violation`
//! - **`validation`**: Input integrity checks (empty range or roster,
//!   duplicate names, code sets, preference lengths)
//! - **`cp`**: Boolean constraint model, parallel branch-and-bound solver
//!   and the rota formulation
//! - **`scheduler`**: Solve pipeline with resource checks, greedy fallback
//!   and KPIs
//! - **`compliance`**: Independent re-verification of finished schedules
//! - **`config`**, **`logging`**, **`error`**: Solver settings, tracing
//!   setup and error types
//!
//! # Example
//!
//! ```no_run
//! use nurse_rota::models::{ConstraintModel, Preferences};
//! use nurse_rota::scheduler::RotaSolver;
//!
//! # fn demo(json: &str) -> nurse_rota::error::RotaResult<()> {
//! let model = ConstraintModel::from_json(json, Preferences::new())?;
//! let solution = RotaSolver::default().solve(&model)?;
//! println!("{}", serde_json::to_string_pretty(&solution.schedule)?);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod compliance;
pub mod config;
pub mod cp;
pub mod error;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod validation;
