use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{VortexError, VortexResult};
use crate::grid::GridConfig;
use crate::params::EquationParams;
use crate::refutator::Thresholds;

/// Delays inserted by the blocking driver so progress stays observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Pacing {
    pub phase_delay_ms: u64,
    pub iteration_delay_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            phase_delay_ms: 500,
            iteration_delay_ms: 1000,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            phase_delay_ms: 0,
            iteration_delay_ms: 0,
        }
    }

    pub fn phase_delay(&self) -> Duration {
        Duration::from_millis(self.phase_delay_ms)
    }

    pub fn iteration_delay(&self) -> Duration {
        Duration::from_millis(self.iteration_delay_ms)
    }
}

/// Everything a run needs, fixed at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LabConfig {
    pub grid: GridConfig,
    pub initial_params: EquationParams,
    pub thresholds: Thresholds,
    pub max_iterations: u32,
    pub pacing: Pacing,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            initial_params: EquationParams::default(),
            thresholds: Thresholds::default(),
            max_iterations: 10,
            pacing: Pacing::default(),
        }
    }
}

impl LabConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> VortexResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> VortexResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VortexResult<()> {
        self.grid.validate()?;

        if self.max_iterations == 0 {
            return Err(VortexError::config("max_iterations must be >= 1"));
        }
        if !self.initial_params.is_finite() {
            return Err(VortexError::config("initial_params must be finite"));
        }

        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.min_score_accept)
            || !(0.0..=1.0).contains(&t.min_score_reject)
        {
            return Err(VortexError::config("score thresholds must lie in [0, 1]"));
        }
        if t.min_score_reject > t.min_score_accept {
            return Err(VortexError::config(format!(
                "min_score_reject ({}) exceeds min_score_accept ({})",
                t.min_score_reject, t.min_score_accept
            )));
        }
        Ok(())
    }
}
