//! Hypothesis-refinement loop for a 2D rotating advection-diffusion equation.

pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod orchestrator;
pub mod params;
pub mod proposer;
pub mod refutator;
pub mod solver;

pub use config::{LabConfig, Pacing};
pub use error::{VortexError, VortexResult};
pub use field::ScalarField;
pub use grid::GridConfig;
pub use orchestrator::{
    HallOfFame, HallOfFameEntry, IterationLog, Orchestrator, PauseHandle, Phase, PhaseReport,
    StopCause,
};
pub use params::{EquationParams, EquationSpec};
pub use proposer::{FallbackProposer, Oracle, OracleError, OracleProposer, ParamProposer};
pub use refutator::{Decision, Evaluation, Refutator, Thresholds};
pub use solver::{FieldSolver, SimMetrics, SimOutcome};
