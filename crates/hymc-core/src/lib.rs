//! Model checking for hybrid discrete/continuous transition systems
//!
//! A hybrid system is given as linear (in)equalities over integer- and
//! real-valued variables: an initial condition, a transition relation, and
//! a safety predicate. The pipeline decides whether every reachable state
//! satisfies the predicate by transforming the problem in stages:
//!
//! 1. output variables are projected out of the transition relation by
//!    Fourier–Motzkin elimination ([`fm`]);
//! 2. every real variable is quantized into an integer index plus a bounded
//!    real residual;
//! 3. the residuals are projected out and the system is rescaled to integer
//!    coefficients;
//! 4. every bounded integer is expanded into 0/1 bit variables;
//! 5. each constraint group is encoded to CNF by an external pseudo-Boolean
//!    encoder ([`pb`]) and assembled into a Boolean transition system
//!    ([`model`]) for the downstream symbolic checker.
//!
//! The quantization step is an over-approximation; a refuted Boolean model
//! therefore needs the (stubbed) refinement loop before the verdict carries
//! back to the hybrid system.
//!
//! [`Solver::verify`] runs the whole chain over a problem file.

pub mod constraint;
pub mod counterexample;
pub mod error;
pub mod fm;
pub mod model;
pub mod num;
pub mod parser;
pub mod pb;
pub mod problem;
pub mod solver;
pub mod variable;

pub use constraint::{Constraint, ConstraintKind};
pub use counterexample::Counterexample;
pub use error::{McError, McResult};
pub use model::{BoolModel, CheckOutcome, ModelChecker, NoopChecker, NusmvChecker};
pub use num::{Int, Rational};
pub use pb::{MinisatPlusEncoder, PbEncoder};
pub use problem::{ConstrGroup, Problem, VarGroup};
pub use solver::{Solver, DEFAULT_Q_PARAM};
pub use variable::{VarKind, Variable};
