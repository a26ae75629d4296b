use serde::{Deserialize, Serialize};

/// Coefficients of `du/dt = D*lap(u) - v.grad(u) + S - damping*u`.
///
/// Nothing is enforced here: a negative diffusion or an absurd rotation rate
/// is a legitimate hypothesis that the refutator is expected to punish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquationParams {
    #[serde(rename = "D")]
    pub diffusion: f64,
    pub omega: f64,
    pub source_amp: f64,
    pub damping: f64,
}

impl Default for EquationParams {
    fn default() -> Self {
        Self {
            diffusion: 0.01,
            omega: 2.0,
            source_amp: 0.0,
            damping: 0.01,
        }
    }
}

impl EquationParams {
    pub fn new(diffusion: f64, omega: f64, source_amp: f64, damping: f64) -> Self {
        Self { diffusion, omega, source_amp, damping }
    }

    pub fn is_finite(&self) -> bool {
        self.diffusion.is_finite()
            && self.omega.is_finite()
            && self.source_amp.is_finite()
            && self.damping.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationSpec {
    pub name: String,
    pub params: EquationParams,
}

impl EquationSpec {
    pub fn initial(params: EquationParams) -> Self {
        Self {
            name: "initial_hypothesis".to_string(),
            params,
        }
    }

    pub fn revision(iteration: u32, params: EquationParams) -> Self {
        Self {
            name: format!("hypothesis_v{iteration}"),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_diffusion_as_capital_d() {
        let p = EquationParams::new(0.02, -1.5, 0.25, 0.0);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["D"], 0.02);
        assert_eq!(json["omega"], -1.5);

        let back: EquationParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn spec_names_follow_iteration() {
        let p = EquationParams::default();
        assert_eq!(EquationSpec::initial(p).name, "initial_hypothesis");
        assert_eq!(EquationSpec::revision(4, p).name, "hypothesis_v4");
    }
}
