//! Revision of a hypothesis from the previous evaluation.
//!
//! [`FallbackProposer`] is a fixed heuristic driven by keywords in the
//! suggestions. [`OracleProposer`] asks an external [`Oracle`] for a reply
//! containing a JSON parameter object and drops back to the heuristic on any
//! failure, so proposing never fails from the loop's point of view.

use serde::Deserialize;
use thiserror::Error;

use crate::params::EquationParams;
use crate::refutator::Evaluation;

pub trait ParamProposer {
    fn propose(&mut self, previous: &EquationParams, evaluation: &Evaluation) -> EquationParams;
}

// ---- Deterministic fallback ----

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProposer;

impl FallbackProposer {
    pub fn revise(previous: &EquationParams, evaluation: &Evaluation) -> EquationParams {
        let mentions = |needle: &str| {
            evaluation
                .suggestions
                .iter()
                .any(|s| s.to_lowercase().contains(needle))
        };

        let mut next = *previous;
        if mentions("omega") {
            next.omega = (next.omega * 0.5 - 1.0).max(0.0);
        }
        if mentions("dissipation") {
            next.damping = (next.damping + 0.01).min(0.1);
        }
        if mentions("cfl") {
            next.diffusion *= 0.8;
        }
        next.diffusion = next.diffusion.max(1e-4);
        next
    }
}

impl ParamProposer for FallbackProposer {
    fn propose(&mut self, previous: &EquationParams, evaluation: &Evaluation) -> EquationParams {
        Self::revise(previous, evaluation)
    }
}

// ---- Oracle-backed ----

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle reply is not a valid parameter object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("oracle reply contains no JSON object")]
    MissingObject,

    #[error("oracle proposed a non-finite value for '{0}'")]
    NonFinite(&'static str),
}

/// Text-in, text-out reasoning backend.
pub trait Oracle {
    fn query(&mut self, prompt: &str) -> Result<String, OracleError>;
}

pub struct OracleProposer<O> {
    oracle: O,
    fallbacks: usize,
}

impl<O: Oracle> OracleProposer<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle, fallbacks: 0 }
    }

    /// How many proposals were answered by the heuristic instead of the oracle.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    fn ask(
        &mut self,
        previous: &EquationParams,
        evaluation: &Evaluation,
    ) -> Result<EquationParams, OracleError> {
        let prompt = render_prompt(previous, evaluation);
        let reply = self.oracle.query(&prompt)?;
        parse_reply(&reply)
    }
}

impl<O: Oracle> ParamProposer for OracleProposer<O> {
    fn propose(&mut self, previous: &EquationParams, evaluation: &Evaluation) -> EquationParams {
        match self.ask(previous, evaluation) {
            Ok(params) => params,
            Err(e) => {
                log::warn!("oracle proposal failed, using deterministic fallback: {e}");
                self.fallbacks += 1;
                FallbackProposer::revise(previous, evaluation)
            }
        }
    }
}

#[derive(Deserialize)]
struct OracleReply {
    #[serde(rename = "D")]
    diffusion: f64,
    omega: f64,
    source_amp: f64,
    damping: f64,
}

pub fn render_prompt(previous: &EquationParams, evaluation: &Evaluation) -> String {
    let params_json =
        serde_json::to_string_pretty(previous).unwrap_or_else(|_| format!("{previous:?}"));
    let join = |items: &[String]| {
        if items.is_empty() {
            "None".to_string()
        } else {
            items.join(", ")
        }
    };

    format!(
        "You are a theoretical physicist exploring a partial differential equation.\n\
         Propose revised parameters based on feedback from a simulation.\n\
         The equation is du/dt = D*lap(u) - v.grad(u) + S - gamma*u, where D is diffusion, \
         omega sets the rotational velocity v, S is the source amplitude (source_amp) and \
         gamma (damping) is dissipation.\n\n\
         PREVIOUS PARAMETERS:\n{params_json}\n\n\
         EVALUATION FEEDBACK:\n\
         - Decision: {decision}\n\
         - Score: {score:.2}\n\
         - Critiques: {critiques}\n\
         - Suggestions: {suggestions}\n\n\
         If instability or high rotation speed was an issue, reduce 'omega' significantly. \
         If energy drift was high, consider increasing 'damping'.\n\
         Reply with a single JSON object with numeric fields \"D\", \"omega\", \
         \"source_amp\" and \"damping\".",
        decision = evaluation.decision.as_str(),
        score = evaluation.score,
        critiques = join(&evaluation.critiques),
        suggestions = join(&evaluation.suggestions),
    )
}

/// Reads the first JSON object in the reply, tolerating prose or code
/// fences around it.
pub fn parse_reply(reply: &str) -> Result<EquationParams, OracleError> {
    let start = reply.find('{').ok_or(OracleError::MissingObject)?;
    let r: OracleReply = serde_json::Deserializer::from_str(&reply[start..])
        .into_iter::<OracleReply>()
        .next()
        .ok_or(OracleError::MissingObject)??;
    for (name, value) in [
        ("D", r.diffusion),
        ("omega", r.omega),
        ("source_amp", r.source_amp),
        ("damping", r.damping),
    ] {
        if !value.is_finite() {
            return Err(OracleError::NonFinite(name));
        }
    }
    Ok(EquationParams::new(r.diffusion, r.omega, r.source_amp, r.damping))
}
