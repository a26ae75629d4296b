use serde::{Deserialize, Serialize};

use crate::error::VortexResult;
use crate::field::ScalarField;
use crate::grid::GridConfig;
use crate::params::EquationParams;

const INITIAL_SIGMA: f64 = 0.1;
const SOURCE_SIGMA: f64 = 0.05;
const DIVERGENCE_LIMIT: f64 = 1e10;
const EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub stable: bool,
    pub mass_drift: f64,
    pub energy_drift: f64,
    pub mass_variance: f64,
    pub max_value: f64,
    pub cfl_number: f64,
    pub n_steps_completed: usize,
}

#[derive(Debug, Clone)]
pub struct SimOutcome {
    pub field: ScalarField,
    pub metrics: SimMetrics,
}

/// Explicit forward-Euler integrator for one hypothesis on one grid.
///
/// Boundary nodes only see the source and damping terms; diffusion and
/// advection are evaluated on interior nodes.
pub struct FieldSolver {
    grid: GridConfig,
    params: EquationParams,
    time: f64,
    field: ScalarField,
    next: ScalarField,
    source: Option<ScalarField>,
    mass: Vec<f64>,
    energy: Vec<f64>,
}

impl FieldSolver {
    pub fn new(grid: GridConfig, params: EquationParams) -> VortexResult<FieldSolver> {
        grid.validate()?;

        let (x0, y0) = grid.center();
        let field = ScalarField::from_fn(grid.nx, grid.ny, |row, col| {
            let (x, y) = grid.coord(row, col);
            gaussian(x - x0, y - y0, INITIAL_SIGMA)
        });

        let source = (params.source_amp != 0.0).then(|| {
            ScalarField::from_fn(grid.nx, grid.ny, |row, col| {
                let (x, y) = grid.coord(row, col);
                params.source_amp * gaussian(x - x0, y - y0, SOURCE_SIGMA)
            })
        });

        let mut solver = FieldSolver {
            grid,
            params,
            time: 0.0,
            next: ScalarField::zeros(grid.nx, grid.ny),
            field,
            source,
            mass: Vec::with_capacity(grid.n_steps + 1),
            energy: Vec::with_capacity(grid.n_steps + 1),
        };
        solver.record_diagnostics();
        Ok(solver)
    }

    // ---- Accessors ----
    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn mass_history(&self) -> &[f64] {
        &self.mass
    }

    pub fn energy_history(&self) -> &[f64] {
        &self.energy
    }

    pub fn cfl_number(&self) -> f64 {
        let dx = self.grid.dx();
        (self.grid.dt / (dx * dx)) * self.params.diffusion
    }

    // ---- Core: run to completion or divergence ----

    pub fn run(mut self) -> SimOutcome {
        for step in 0..self.grid.n_steps {
            self.explicit_step();

            if self.field.has_non_finite() || self.field.max_abs_finite() > DIVERGENCE_LIMIT {
                log::warn!(
                    "divergence after step {} of {} (t={:.4})",
                    step + 1,
                    self.grid.n_steps,
                    self.time
                );
                return self.finish(step + 1, false);
            }
        }
        let n_steps = self.grid.n_steps;
        self.finish(n_steps, true)
    }

    fn finish(self, steps_completed: usize, stable: bool) -> SimOutcome {
        let metrics = self.metrics(steps_completed, stable);
        log::debug!(
            "solver finished: stable={} steps={} mass_drift={:.3e} energy_drift={:.3e} cfl={:.4}",
            metrics.stable,
            metrics.n_steps_completed,
            metrics.mass_drift,
            metrics.energy_drift,
            metrics.cfl_number
        );
        SimOutcome {
            field: self.field,
            metrics,
        }
    }

    fn metrics(&self, steps_completed: usize, stable: bool) -> SimMetrics {
        SimMetrics {
            stable,
            mass_drift: relative_drift(&self.mass),
            energy_drift: relative_drift(&self.energy),
            mass_variance: normalized_std(&self.mass),
            max_value: self.field.max_abs_finite(),
            cfl_number: self.cfl_number(),
            n_steps_completed: steps_completed,
        }
    }

    // ---- Internal numeric routines ----

    fn explicit_step(&mut self) {
        let nx = self.grid.nx;
        let ny = self.grid.ny;
        let dt = self.grid.dt;
        let dx = self.grid.dx();
        let dy = self.grid.dy();
        let dx2 = dx * dx;
        let dy2 = dy * dy;
        let (x0, y0) = self.grid.center();
        let EquationParams {
            diffusion,
            omega,
            damping,
            ..
        } = self.params;

        let u = self.field.as_slice();
        let next = self.next.as_mut_slice();

        for row in 0..ny {
            let base = row * nx;
            let interior_row = row > 0 && row < ny - 1;
            for col in 0..nx {
                let i = base + col;
                let c = u[i];

                let mut rhs = -damping * c;
                if let Some(source) = &self.source {
                    rhs += source.as_slice()[i];
                }

                if interior_row && col > 0 && col < nx - 1 {
                    let left = u[i - 1];
                    let right = u[i + 1];
                    let up = u[i - nx];
                    let down = u[i + nx];

                    let lap = (right - 2.0 * c + left) / dx2 + (down - 2.0 * c + up) / dy2;

                    let (x, y) = (col as f64 * dx, row as f64 * dy);
                    let vx = -omega * (y - y0);
                    let vy = omega * (x - x0);
                    let grad_x = (right - left) / (2.0 * dx);
                    let grad_y = (down - up) / (2.0 * dy);

                    rhs += diffusion * lap - (vx * grad_x + vy * grad_y);
                }

                next[i] = c + dt * rhs;
            }
        }

        self.swap_buffers();
        self.time += dt;
        self.record_diagnostics();
    }

    fn record_diagnostics(&mut self) {
        let area = self.grid.cell_area();
        self.mass.push(self.field.sum() * area);
        self.energy.push(self.field.sum_sq() * area);
    }

    fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.field, &mut self.next);
    }
}

fn gaussian(dx: f64, dy: f64, sigma: f64) -> f64 {
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

fn relative_drift(series: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (series.first(), series.last()) else {
        return 0.0;
    };
    let first = if first == 0.0 { EPS } else { first };
    (last - first).abs() / first.abs()
}

fn normalized_std(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let var = series.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() / (mean.abs() + EPS)
}
