//! Propose → Simulate → Refute → Decide, one phase per [`Orchestrator::step`].
//!
//! The orchestrator is a plain state machine: it never sleeps or renders on
//! its own. [`Orchestrator::run_blocking`] is the explicit driver loop used by
//! the CLI; other hosts (the wasm surface) call `step` from their own
//! scheduler and ask [`Orchestrator::next_delay`] how long to wait.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::LabConfig;
use crate::error::{VortexError, VortexResult};
use crate::field::ScalarField;
use crate::params::{EquationParams, EquationSpec};
use crate::proposer::ParamProposer;
use crate::refutator::{Decision, Evaluation, Refutator};
use crate::solver::{FieldSolver, SimMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Propose,
    Simulate,
    Refute,
    Decide,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Propose => "propose",
            Phase::Simulate => "simulate",
            Phase::Refute => "refute",
            Phase::Decide => "decide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    Accepted,
    Rejected,
    IterationCap,
    Aborted,
}

impl StopCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopCause::Accepted => "accepted",
            StopCause::Rejected => "rejected",
            StopCause::IterationCap => "iteration_cap",
            StopCause::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationLog {
    pub iteration: u32,
    pub spec: EquationSpec,
    pub metrics: SimMetrics,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallOfFameEntry {
    pub name: String,
    pub score: f64,
    pub params: EquationParams,
}

/// Accepted hypotheses, best score first. Ties keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HallOfFame {
    entries: Vec<HallOfFameEntry>,
}

impl HallOfFame {
    pub fn insert(&mut self, entry: HallOfFameEntry) {
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    pub fn entries(&self) -> &[HallOfFameEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&HallOfFameEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<HallOfFameEntry> for HallOfFame {
    fn extend<I: IntoIterator<Item = HallOfFameEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}

/// Cooperative pause request, honored at the next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct PauseHandle(Arc<AtomicBool>);

impl PauseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub iteration: u32,
    pub phase: Phase,
    pub stopped: Option<StopCause>,
}

// Work carried from one phase to the next.
enum Stage {
    Propose,
    Simulate(EquationSpec),
    Refute(EquationSpec, SimMetrics),
    Decide(EquationSpec, SimMetrics, Evaluation),
}

impl Stage {
    fn phase(&self) -> Phase {
        match self {
            Stage::Propose => Phase::Propose,
            Stage::Simulate(..) => Phase::Simulate,
            Stage::Refute(..) => Phase::Refute,
            Stage::Decide(..) => Phase::Decide,
        }
    }
}

pub struct Orchestrator<P> {
    config: LabConfig,
    refutator: Refutator,
    proposer: P,

    iteration: u32,
    active: bool,
    stage: Stage,
    stop_cause: Option<StopCause>,
    revision_seed: Option<(EquationParams, Evaluation)>,

    spec: Option<EquationSpec>,
    field: Option<ScalarField>,
    metrics: Option<SimMetrics>,
    evaluation: Option<Evaluation>,
    logs: VecDeque<IterationLog>,

    hall_of_fame: HallOfFame,
}

impl<P: ParamProposer> Orchestrator<P> {
    pub fn new(config: LabConfig, proposer: P) -> VortexResult<Self> {
        config.validate()?;
        Ok(Self {
            refutator: Refutator::new(config.thresholds),
            config,
            proposer,
            iteration: 0,
            active: false,
            stage: Stage::Propose,
            stop_cause: None,
            revision_seed: None,
            spec: None,
            field: None,
            metrics: None,
            evaluation: None,
            logs: VecDeque::new(),
            hall_of_fame: HallOfFame::default(),
        })
    }

    // ---- Read-only view ----
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn proposer(&self) -> &P {
        &self.proposer
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The phase that the next `step` will execute.
    pub fn phase(&self) -> Phase {
        self.stage.phase()
    }

    pub fn stop_cause(&self) -> Option<StopCause> {
        self.stop_cause
    }

    pub fn current_spec(&self) -> Option<&EquationSpec> {
        self.spec.as_ref()
    }

    pub fn current_field(&self) -> Option<&ScalarField> {
        self.field.as_ref()
    }

    pub fn current_metrics(&self) -> Option<&SimMetrics> {
        self.metrics.as_ref()
    }

    pub fn current_evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    /// Completed iterations, newest first.
    pub fn logs(&self) -> &VecDeque<IterationLog> {
        &self.logs
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    // ---- Commands ----

    /// Resumes a paused run, or begins a new one at iteration 1 when nothing
    /// is in flight. Returns false if a run is already active.
    pub fn start(&mut self) -> bool {
        if self.active {
            return false;
        }
        if self.iteration == 0 || self.stop_cause.is_some() {
            self.clear_run();
            self.iteration = 1;
            log::info!(
                "run started (cap {} iterations, {}x{} grid, {} steps)",
                self.config.max_iterations,
                self.config.grid.nx,
                self.config.grid.ny,
                self.config.grid.n_steps
            );
        } else {
            log::info!(
                "run resumed at iteration {} ({})",
                self.iteration,
                self.phase().as_str()
            );
        }
        self.active = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        log::info!(
            "run paused at iteration {} before {}",
            self.iteration,
            self.phase().as_str()
        );
        true
    }

    /// Clears all run state. The hall of fame is kept.
    pub fn reset(&mut self) {
        self.clear_run();
        log::info!("run reset");
    }

    fn clear_run(&mut self) {
        self.iteration = 0;
        self.active = false;
        self.stage = Stage::Propose;
        self.stop_cause = None;
        self.revision_seed = None;
        self.spec = None;
        self.field = None;
        self.metrics = None;
        self.evaluation = None;
        self.logs.clear();
    }

    fn stop(&mut self, cause: StopCause) {
        self.active = false;
        self.stop_cause = Some(cause);
        self.stage = Stage::Propose;
    }

    // ---- Phases ----

    /// Executes the pending phase. Returns `None` when no run is active.
    pub fn step(&mut self) -> VortexResult<Option<PhaseReport>> {
        if !self.active {
            return Ok(None);
        }

        let iteration = self.iteration;
        let stage = std::mem::replace(&mut self.stage, Stage::Propose);
        let phase = stage.phase();
        log::debug!("iteration {iteration}: {}", phase.as_str());

        let stopped = match stage {
            Stage::Propose => {
                let spec = self.propose()?;
                self.spec = Some(spec.clone());
                self.stage = Stage::Simulate(spec);
                None
            }
            Stage::Simulate(spec) => {
                let metrics = self.simulate(&spec)?;
                self.stage = Stage::Refute(spec, metrics);
                None
            }
            Stage::Refute(spec, metrics) => {
                let evaluation = self.refutator.evaluate(&spec, &metrics);
                log::debug!(
                    "{}: score {:.3} -> {}",
                    spec.name,
                    evaluation.score,
                    evaluation.decision.as_str()
                );
                self.evaluation = Some(evaluation.clone());
                self.stage = Stage::Decide(spec, metrics, evaluation);
                None
            }
            Stage::Decide(spec, metrics, evaluation) => self.decide(spec, metrics, evaluation),
        };

        Ok(Some(PhaseReport {
            iteration,
            phase,
            stopped,
        }))
    }

    fn propose(&mut self) -> VortexResult<EquationSpec> {
        if self.iteration <= 1 {
            return Ok(EquationSpec::initial(self.config.initial_params));
        }

        let Some((previous, evaluation)) = &self.revision_seed else {
            let iteration = self.iteration;
            log::error!("iteration {iteration}: nothing to revise from, aborting run");
            self.stop(StopCause::Aborted);
            return Err(VortexError::MissingRevisionContext { iteration });
        };
        let params = self.proposer.propose(previous, evaluation);
        Ok(EquationSpec::revision(self.iteration, params))
    }

    fn simulate(&mut self, spec: &EquationSpec) -> VortexResult<SimMetrics> {
        let solver = match FieldSolver::new(self.config.grid, spec.params) {
            Ok(solver) => solver,
            Err(e) => {
                self.stop(StopCause::Aborted);
                return Err(e);
            }
        };
        let outcome = solver.run();
        self.field = Some(outcome.field);
        self.metrics = Some(outcome.metrics);
        Ok(outcome.metrics)
    }

    fn decide(
        &mut self,
        spec: EquationSpec,
        metrics: SimMetrics,
        evaluation: Evaluation,
    ) -> Option<StopCause> {
        let decision = evaluation.decision;
        let score = evaluation.score;

        self.logs.push_front(IterationLog {
            iteration: self.iteration,
            spec: spec.clone(),
            metrics,
            evaluation: evaluation.clone(),
        });

        let cause = match decision {
            Decision::Accept => {
                self.hall_of_fame.insert(HallOfFameEntry {
                    name: spec.name.clone(),
                    score,
                    params: spec.params,
                });
                Some(StopCause::Accepted)
            }
            Decision::Reject => Some(StopCause::Rejected),
            Decision::Revise if self.iteration >= self.config.max_iterations => {
                Some(StopCause::IterationCap)
            }
            Decision::Revise => None,
        };

        match cause {
            Some(cause) => {
                log::info!(
                    "run stopped at iteration {}: {} (score {:.3}, {})",
                    self.iteration,
                    cause.as_str(),
                    score,
                    spec.name
                );
                self.stop(cause);
            }
            None => {
                log::info!(
                    "iteration {}: {} scored {:.3}, revising",
                    self.iteration,
                    spec.name,
                    score
                );
                self.revision_seed = Some((spec.params, evaluation));
                self.iteration += 1;
                self.stage = Stage::Propose;
            }
        }
        cause
    }

    // ---- Driver ----

    /// Wait before the pending phase: the iteration delay at the start of a
    /// revision, the phase delay otherwise.
    pub fn next_delay(&self) -> Duration {
        match self.stage {
            Stage::Propose if self.iteration > 1 => self.config.pacing.iteration_delay(),
            _ => self.config.pacing.phase_delay(),
        }
    }

    /// Starts (or resumes) and drives the run until it stops, fails or is
    /// paused through `pause`. `observe` sees the state after every phase.
    ///
    /// Returns the stop cause, or `None` if the run was paused.
    pub fn run_blocking(
        &mut self,
        pause: &PauseHandle,
        mut observe: impl FnMut(&Self, &PhaseReport),
    ) -> VortexResult<Option<StopCause>> {
        pause.clear();
        self.start();

        while self.active {
            if pause.take() {
                self.pause();
                return Ok(None);
            }
            let Some(report) = self.step()? else {
                break;
            };
            observe(self, &report);

            if self.active {
                let delay = self.next_delay();
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
        Ok(self.stop_cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Pacing;
    use crate::grid::GridConfig;
    use crate::proposer::FallbackProposer;

    fn quick_config() -> LabConfig {
        LabConfig {
            grid: GridConfig::new(9, 9, 1.0, 1.0, 0.0005, 5).unwrap(),
            pacing: Pacing::none(),
            ..LabConfig::default()
        }
    }

    #[test]
    fn phases_run_in_order() {
        let mut o = Orchestrator::new(quick_config(), FallbackProposer).unwrap();
        assert!(o.step().unwrap().is_none());
        assert!(o.start());
        assert!(!o.start());

        let mut seen = Vec::new();
        while let Some(r) = o.step().unwrap() {
            seen.push(r.phase);
        }
        assert_eq!(
            seen,
            vec![Phase::Propose, Phase::Simulate, Phase::Refute, Phase::Decide]
        );
        assert!(!o.is_active());
    }

    #[test]
    fn revising_without_seed_aborts_cleanly() {
        let mut o = Orchestrator::new(quick_config(), FallbackProposer).unwrap();
        o.start();
        o.iteration = 2;

        let err = o.step().unwrap_err();
        assert!(matches!(err, VortexError::MissingRevisionContext { iteration: 2 }));
        assert!(!o.is_active());
        assert_eq!(o.stop_cause(), Some(StopCause::Aborted));
        assert!(o.current_spec().is_none());
        assert!(o.logs().is_empty());
        assert!(o.hall_of_fame().is_empty());
    }

    #[test]
    fn pause_keeps_pending_phase() {
        let mut o = Orchestrator::new(quick_config(), FallbackProposer).unwrap();
        o.start();
        o.step().unwrap();
        o.step().unwrap();
        assert!(o.pause());
        assert!(!o.pause());
        assert_eq!(o.phase(), Phase::Refute);
        assert!(o.step().unwrap().is_none());

        assert!(o.start());
        assert_eq!(o.iteration(), 1);
        let r = o.step().unwrap().unwrap();
        assert_eq!(r.phase, Phase::Refute);
    }

    #[test]
    fn delays_follow_pacing() {
        let config = LabConfig {
            pacing: Pacing {
                phase_delay_ms: 5,
                iteration_delay_ms: 7,
            },
            ..quick_config()
        };
        let mut o = Orchestrator::new(config, FallbackProposer).unwrap();
        o.start();
        assert_eq!(o.next_delay(), Duration::from_millis(5));
        o.iteration = 2;
        assert_eq!(o.next_delay(), Duration::from_millis(7));
    }

    #[test]
    fn hall_of_fame_sorts_descending() {
        let mut hof = HallOfFame::default();
        let params = EquationParams::default();
        for (name, score) in [("a", 0.8), ("b", 0.95), ("c", 0.8), ("d", 0.9)] {
            hof.insert(HallOfFameEntry {
                name: name.into(),
                score,
                params,
            });
        }
        let names: Vec<&str> = hof.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
        assert_eq!(hof.best().map(|e| e.score), Some(0.95));
    }
}
