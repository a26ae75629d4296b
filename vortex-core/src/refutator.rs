//! Rule-based scoring of a simulated hypothesis.
//!
//! Each rule is checked independently and subtracts a fixed penalty from a
//! perfect score of 1. The decision depends only on the clamped score and on
//! whether the run stayed stable.

use serde::{Deserialize, Serialize};

use crate::params::EquationSpec;
use crate::solver::SimMetrics;

pub const INSTABILITY_PENALTY: f64 = 0.70;
pub const MASS_DRIFT_PENALTY: f64 = 0.15;
pub const ENERGY_DRIFT_PENALTY: f64 = 0.10;
pub const MASS_VARIANCE_PENALTY: f64 = 0.05;
pub const CFL_PENALTY: f64 = 0.20;
pub const LOW_DIFFUSION_PENALTY: f64 = 0.05;
pub const ROTATION_PENALTY: f64 = 0.10;

pub const GENERIC_SUGGESTION: &str = "Attempt minor parameter adjustment to improve score.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Thresholds {
    pub max_mass_drift: f64,
    pub max_energy_drift: f64,
    pub max_mass_variance: f64,
    pub max_cfl: f64,
    pub max_rotation_speed: f64,
    pub min_diffusion: f64,
    pub min_score_accept: f64,
    pub min_score_reject: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_mass_drift: 0.05,
            max_energy_drift: 0.10,
            max_mass_variance: 0.02,
            max_cfl: 0.25,
            max_rotation_speed: 100.0,
            min_diffusion: 1e-6,
            min_score_accept: 0.75,
            min_score_reject: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Revise,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Revise => "revise",
            Decision::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub decision: Decision,
    pub critiques: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Accumulates triggered rules in trigger order.
#[derive(Default)]
struct Findings {
    penalty: f64,
    critiques: Vec<String>,
    suggestions: Vec<String>,
}

impl Findings {
    fn flag(&mut self, penalty: f64, critique: String, suggestion: Option<&str>) {
        self.penalty += penalty;
        self.critiques.push(critique);
        if let Some(s) = suggestion {
            if !self.suggestions.iter().any(|existing| existing == s) {
                self.suggestions.push(s.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Refutator {
    thresholds: Thresholds,
}

impl Refutator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, spec: &EquationSpec, metrics: &SimMetrics) -> Evaluation {
        let t = &self.thresholds;
        let params = &spec.params;
        let mut found = Findings::default();

        // Stability
        if !metrics.stable {
            found.flag(
                INSTABILITY_PENALTY,
                "Instability detected (NaN/Inf/explosion).".to_string(),
                Some("Reduce dt, increase damping, or reduce omega."),
            );
        }

        // Conservation
        if metrics.mass_drift > t.max_mass_drift {
            found.flag(
                MASS_DRIFT_PENALTY,
                format!("Mass drift exceeds threshold ({:.1}%).", metrics.mass_drift * 100.0),
                Some("Check source/damping terms or boundary conditions."),
            );
        }
        if metrics.energy_drift > t.max_energy_drift {
            found.flag(
                ENERGY_DRIFT_PENALTY,
                format!("Energy drift exceeds threshold ({:.1}%).", metrics.energy_drift * 100.0),
                Some("Increase damping or reduce source term."),
            );
        }
        if metrics.mass_variance > t.max_mass_variance {
            found.flag(
                MASS_VARIANCE_PENALTY,
                format!("Temporal regularity is low (variance: {:.3}).", metrics.mass_variance),
                None,
            );
        }

        // Numerical coherence
        if metrics.cfl_number > t.max_cfl {
            found.flag(
                CFL_PENALTY,
                format!(
                    "CFL condition violated (is {:.3}, max {}).",
                    metrics.cfl_number, t.max_cfl
                ),
                Some("Reduce diffusion 'D' or timestep 'dt'."),
            );
        }

        // Physical plausibility
        if params.diffusion < t.min_diffusion {
            found.flag(
                LOW_DIFFUSION_PENALTY,
                "Diffusion coefficient is too low or negative.".to_string(),
                None,
            );
        }
        if params.omega.abs() > t.max_rotation_speed {
            found.flag(
                ROTATION_PENALTY,
                "Rotation speed is non-physically high.".to_string(),
                Some("Reduce 'omega' significantly."),
            );
        }

        let score = (1.0 - found.penalty).max(0.0);
        let decision = if !metrics.stable || score < t.min_score_reject {
            Decision::Reject
        } else if score >= t.min_score_accept {
            Decision::Accept
        } else {
            Decision::Revise
        };

        let mut suggestions = found.suggestions;
        if decision == Decision::Revise && suggestions.is_empty() {
            suggestions.push(GENERIC_SUGGESTION.to_string());
        }

        Evaluation {
            score,
            decision,
            critiques: found.critiques,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EquationParams;

    fn clean_metrics() -> SimMetrics {
        SimMetrics {
            stable: true,
            mass_drift: 0.0,
            energy_drift: 0.0,
            mass_variance: 0.0,
            max_value: 1.0,
            cfl_number: 0.02,
            n_steps_completed: 300,
        }
    }

    fn spec(params: EquationParams) -> EquationSpec {
        EquationSpec::initial(params)
    }

    #[test]
    fn clean_run_scores_one_and_accepts() {
        let e = Refutator::default().evaluate(&spec(EquationParams::default()), &clean_metrics());
        assert_eq!(e.score, 1.0);
        assert_eq!(e.decision, Decision::Accept);
        assert!(e.critiques.is_empty());
        assert!(e.suggestions.is_empty());
    }

    #[test]
    fn instability_always_rejects() {
        let m = SimMetrics {
            stable: false,
            ..clean_metrics()
        };
        let lenient = Refutator::new(Thresholds {
            min_score_reject: 0.0,
            min_score_accept: 0.0,
            ..Thresholds::default()
        });
        let e = lenient.evaluate(&spec(EquationParams::default()), &m);
        assert_eq!(e.decision, Decision::Reject);
        assert!((e.score - 0.3).abs() < 1e-12);
        assert!(e.critiques[0].to_lowercase().contains("instability"));
        assert!(e.suggestions[0].contains("omega"));
    }

    #[test]
    fn penalties_accumulate_and_clamp_at_zero() {
        let m = SimMetrics {
            stable: false,
            mass_drift: 1.0,
            energy_drift: 1.0,
            mass_variance: 1.0,
            cfl_number: 1.0,
            ..clean_metrics()
        };
        let p = EquationParams::new(-1.0, 1e4, 0.0, 0.0);
        let e = Refutator::default().evaluate(&spec(p), &m);
        assert_eq!(e.score, 0.0);
        assert_eq!(e.critiques.len(), 7);
        assert_eq!(e.decision, Decision::Reject);
    }

    #[test]
    fn critiques_keep_rule_order() {
        let m = SimMetrics {
            energy_drift: 0.5,
            cfl_number: 0.5,
            ..clean_metrics()
        };
        let e = Refutator::default().evaluate(&spec(EquationParams::default()), &m);
        assert!(e.critiques[0].starts_with("Energy drift"));
        assert!(e.critiques[1].starts_with("CFL"));
        assert!((e.score - 0.7).abs() < 1e-12);
        assert_eq!(e.decision, Decision::Revise);
        assert_eq!(e.suggestions.len(), 2);
    }

    #[test]
    fn revise_without_rule_suggestion_gets_generic_one() {
        // mass variance and low diffusion carry no suggestion of their own
        let m = SimMetrics {
            mass_variance: 0.5,
            ..clean_metrics()
        };
        let r = Refutator::new(Thresholds {
            min_score_accept: 0.95,
            ..Thresholds::default()
        });
        let e = r.evaluate(&spec(EquationParams::new(0.0, 0.0, 0.0, 0.0)), &m);
        assert_eq!(e.decision, Decision::Revise);
        assert_eq!(e.suggestions, vec![GENERIC_SUGGESTION.to_string()]);
    }

    #[test]
    fn accept_or_reject_never_gets_generic_suggestion() {
        let m = SimMetrics {
            mass_variance: 0.5,
            ..clean_metrics()
        };
        let e = Refutator::default().evaluate(&spec(EquationParams::default()), &m);
        assert_eq!(e.decision, Decision::Accept);
        assert!(e.suggestions.is_empty());
    }

    #[test]
    fn accept_boundary_is_inclusive() {
        let m = SimMetrics {
            energy_drift: 0.5,
            ..clean_metrics()
        };
        let p = spec(EquationParams::default());
        let score = Refutator::default().evaluate(&p, &m).score;

        let at_boundary = Refutator::new(Thresholds {
            min_score_accept: score,
            ..Thresholds::default()
        });
        assert_eq!(at_boundary.evaluate(&p, &m).decision, Decision::Accept);
    }

    #[test]
    fn reject_boundary_alone_does_not_reject() {
        let m = SimMetrics {
            energy_drift: 0.5,
            ..clean_metrics()
        };
        let p = spec(EquationParams::default());
        let score = Refutator::default().evaluate(&p, &m).score;

        let r = Refutator::new(Thresholds {
            min_score_reject: score,
            min_score_accept: 1.0,
            ..Thresholds::default()
        });
        assert_eq!(r.evaluate(&p, &m).decision, Decision::Revise);

        let unstable = SimMetrics { stable: false, ..m };
        assert_eq!(r.evaluate(&p, &unstable).decision, Decision::Reject);
    }

    #[test]
    fn decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Revise).unwrap(), "\"revise\"");
        assert_eq!(Decision::Accept.as_str(), "accept");
    }
}
