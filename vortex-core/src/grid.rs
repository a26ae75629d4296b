use serde::{Deserialize, Serialize};

use crate::error::{VortexError, VortexResult};

/// Uniform rectangular discretization of `[0, lx] x [0, ly]`.
///
/// Spacing is always derived from the node counts and extents; it is never
/// stored, so a deserialized config cannot carry a stale `dx`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
    pub dt: f64,
    pub n_steps: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: 64,
            ny: 64,
            lx: 1.0,
            ly: 1.0,
            dt: 0.0005,
            n_steps: 300,
        }
    }
}

impl GridConfig {
    pub fn new(
        nx: usize,
        ny: usize,
        lx: f64,
        ly: f64,
        dt: f64,
        n_steps: usize,
    ) -> VortexResult<Self> {
        let grid = Self { nx, ny, lx, ly, dt, n_steps };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> VortexResult<()> {
        if self.nx < 3 || self.ny < 3 {
            return Err(VortexError::grid(format!(
                "nx and ny must be >= 3 (got {}x{})",
                self.nx, self.ny
            )));
        }
        if !(self.lx > 0.0 && self.lx.is_finite()) || !(self.ly > 0.0 && self.ly.is_finite()) {
            return Err(VortexError::grid(format!(
                "domain extents must be positive (got lx={}, ly={})",
                self.lx, self.ly
            )));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(VortexError::grid(format!("dt must be > 0 (got {})", self.dt)));
        }
        if self.n_steps == 0 {
            return Err(VortexError::grid("n_steps must be >= 1"));
        }
        Ok(())
    }

    pub fn dx(&self) -> f64 {
        self.lx / ((self.nx - 1) as f64)
    }

    pub fn dy(&self) -> f64 {
        self.ly / ((self.ny - 1) as f64)
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn center(&self) -> (f64, f64) {
        (self.lx / 2.0, self.ly / 2.0)
    }

    /// Physical coordinate of node (row, col).
    pub fn coord(&self, row: usize, col: usize) -> (f64, f64) {
        (col as f64 * self.dx(), row as f64 * self.dy())
    }

    pub fn cell_area(&self) -> f64 {
        self.dx() * self.dy()
    }
}
