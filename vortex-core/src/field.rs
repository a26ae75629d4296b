/// Scalar field on an `ny x nx` grid, stored row-major in one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl ScalarField {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![0.0; nx * ny],
        }
    }

    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(nx * ny);
        for row in 0..ny {
            for col in 0..nx {
                data.push(f(row, col));
            }
        }
        Self { nx, ny, data }
    }

    // ---- Accessors ----
    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn idx(&self, row: usize, col: usize) -> usize {
        row * self.nx + col
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.idx(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.idx(row, col);
        self.data[i] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32).collect()
    }

    // ---- Reductions ----

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn sum_sq(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    /// Largest |u| among finite entries; 0 for an all-non-finite field.
    pub fn max_abs_finite(&self) -> f64 {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(0.0, |acc, v| acc.max(v.abs()))
    }
}
