use wasm_bindgen::prelude::*;
use vortex_core::{FallbackProposer, LabConfig, Orchestrator};

/// Browser handle on one orchestrator. The page schedules `tick()` calls with
/// `setTimeout(next_delay_ms())` while `is_active()` holds.
#[wasm_bindgen]
pub struct Lab {
    inner: Orchestrator<FallbackProposer>,
}

#[wasm_bindgen]
impl Lab {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Lab, JsValue> {
        let config = match config_json {
            Some(json) => LabConfig::from_json(&json).map_err(to_js)?,
            None => LabConfig::default(),
        };
        let inner = Orchestrator::new(config, FallbackProposer).map_err(to_js)?;
        Ok(Lab { inner })
    }

    // Commands
    pub fn start(&mut self) -> bool { self.inner.start() }
    pub fn pause(&mut self) -> bool { self.inner.pause() }
    pub fn reset(&mut self) { self.inner.reset(); }

    // Run one phase + timing (WASM-only)
    pub fn tick(&mut self) -> Result<Option<TickInfo>, JsValue> {
        let t0 = now_ms();
        let report = self.inner.step().map_err(to_js)?;
        let t1 = now_ms();
        Ok(report.map(|r| TickInfo {
            iteration: r.iteration,
            phase: r.phase.as_str().to_string(),
            stopped: r.stopped.map(|c| c.as_str().to_string()),
            compute_ms: t1 - t0,
        }))
    }

    pub fn next_delay_ms(&self) -> f64 {
        self.inner.next_delay().as_secs_f64() * 1000.0
    }

    pub fn is_active(&self) -> bool { self.inner.is_active() }
    pub fn iteration(&self) -> u32 { self.inner.iteration() }
    pub fn phase(&self) -> String { self.inner.phase().as_str().to_string() }
    pub fn stop_cause(&self) -> Option<String> {
        self.inner.stop_cause().map(|c| c.as_str().to_string())
    }

    pub fn nx(&self) -> usize { self.inner.config().grid.nx }
    pub fn ny(&self) -> usize { self.inner.config().grid.ny }

    // Copy-based JS access (reliable); empty before the first simulation
    pub fn get_field(&self) -> Vec<f32> {
        self.inner.current_field().map(|f| f.to_f32()).unwrap_or_default()
    }

    pub fn spec_json(&self) -> Result<String, JsValue> { json(&self.inner.current_spec()) }
    pub fn metrics_json(&self) -> Result<String, JsValue> { json(&self.inner.current_metrics()) }
    pub fn evaluation_json(&self) -> Result<String, JsValue> {
        json(&self.inner.current_evaluation())
    }
    pub fn logs_json(&self) -> Result<String, JsValue> { json(self.inner.logs()) }
    pub fn hall_of_fame_json(&self) -> Result<String, JsValue> { json(self.inner.hall_of_fame()) }
}

#[wasm_bindgen]
pub struct TickInfo {
    iteration: u32,
    phase: String,
    stopped: Option<String>,
    compute_ms: f64,
}

#[wasm_bindgen]
impl TickInfo {
    pub fn iteration(&self) -> u32 { self.iteration }
    pub fn phase(&self) -> String { self.phase.clone() }
    pub fn stopped(&self) -> Option<String> { self.stopped.clone() }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(to_js)
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
