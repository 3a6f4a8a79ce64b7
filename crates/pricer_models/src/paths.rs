//! Correlated standard normal draws shared by the Monte Carlo backends.
//!
//! Draws are laid out step-major, then factor, then path, so one
//! `(step, factor)` slice holds the draws of every path and can be fed to a
//! vectorised value or a graph variate node directly. The eager diffusion
//! and the graph executor consume the same [`NormalDraws`] for a given seed,
//! which makes the two backends agree path by path.
//!
//! Correlation is applied through the lower triangular Cholesky factor `L`
//! of the correlation matrix `C = L Lᵀ`:
//!
//! ```text
//! W = L · Z,   Z ~ N(0, I)
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use pricer_core::graph::{VariateKey, VariateSource};

use crate::error::ModelError;
use crate::market::Market;

/// Correlation matrix with validation and Cholesky decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    /// Row-major elements
    data: Vec<f64>,
    dim: usize,
}

impl CorrelationMatrix {
    /// Creates a matrix from row-major elements.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless the matrix is `dim x dim`, has a unit
    /// diagonal, is symmetric and has entries in [-1, 1].
    pub fn new(data: &[f64], dim: usize) -> Result<Self, ModelError> {
        if data.len() != dim * dim {
            return Err(ModelError::invalid(
                "correlation",
                format!("expected {} elements, got {}", dim * dim, data.len()),
            ));
        }
        const EPS: f64 = 1e-10;
        for i in 0..dim {
            if (data[i * dim + i] - 1.0).abs() > EPS {
                return Err(ModelError::invalid(
                    "correlation",
                    format!("diagonal element {i} is {}", data[i * dim + i]),
                ));
            }
            for j in (i + 1)..dim {
                let (a, b) = (data[i * dim + j], data[j * dim + i]);
                if (a - b).abs() > EPS {
                    return Err(ModelError::invalid(
                        "correlation",
                        format!("not symmetric at ({i}, {j})"),
                    ));
                }
                if !(-1.0..=1.0).contains(&a) {
                    return Err(ModelError::invalid(
                        "correlation",
                        format!("element ({i}, {j}) is {a}"),
                    ));
                }
            }
        }
        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Identity matrix.
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Correlations of the named indices as recorded in the market.
    pub fn from_market(market: &Market, names: &[String]) -> Result<Self, ModelError> {
        let dim = names.len();
        let mut data = Vec::with_capacity(dim * dim);
        for a in names {
            for b in names {
                data.push(market.correlation(a, b));
            }
        }
        Self::new(&data, dim)
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Lower triangular `L` with `C = L Lᵀ`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the matrix is not positive definite.
    pub fn cholesky(&self) -> Result<CholeskyFactor, ModelError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                if i == j {
                    let diag = self.get(j, j) - sum;
                    if diag <= 0.0 {
                        return Err(ModelError::invalid(
                            "correlation",
                            "matrix is not positive definite",
                        ));
                    }
                    lower[j * n + j] = diag.sqrt();
                } else {
                    lower[i * n + j] = (self.get(i, j) - sum) / lower[j * n + j];
                }
            }
        }
        Ok(CholeskyFactor {
            data: lower,
            dim: n,
        })
    }
}

/// Lower triangular Cholesky factor.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    data: Vec<f64>,
    dim: usize,
}

impl CholeskyFactor {
    /// Factor dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Maps independent normals to correlated normals in place.
    pub fn transform_inplace(&self, z: &mut [f64]) {
        let n = self.dim;
        // Row i only reads z[..=i]; walking rows bottom up keeps them intact.
        for i in (0..n).rev() {
            z[i] = (0..=i).map(|j| self.data[i * n + j] * z[j]).sum();
        }
    }
}

/// Block of correlated standard normal draws.
///
/// # Examples
///
/// ```
/// use pricer_models::paths::{CorrelationMatrix, NormalDraws};
///
/// let factor = CorrelationMatrix::identity(2).cholesky().unwrap();
/// let draws = NormalDraws::generate(3, &factor, 1000, 42);
/// assert_eq!(draws.steps(), 3);
/// assert_eq!(draws.slice(2, 1).len(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct NormalDraws {
    steps: usize,
    factors: usize,
    paths: usize,
    seed: u64,
    data: Vec<f64>,
}

impl NormalDraws {
    /// Draws `steps x factor.dim()` correlated normals for each of `paths`
    /// paths from a `StdRng` seeded with `seed`.
    pub fn generate(steps: usize, factor: &CholeskyFactor, paths: usize, seed: u64) -> Self {
        let factors = factor.dim();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0.0; steps * factors * paths];
        let mut z = vec![0.0; factors];
        for p in 0..paths {
            for k in 0..steps {
                for zf in z.iter_mut() {
                    *zf = StandardNormal.sample(&mut rng);
                }
                factor.transform_inplace(&mut z);
                for (f, &w) in z.iter().enumerate() {
                    data[(k * factors + f) * paths + p] = w;
                }
            }
        }
        Self {
            steps,
            factors,
            paths,
            seed,
            data,
        }
    }

    /// Number of time steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of correlated factors per step.
    pub fn factors(&self) -> usize {
        self.factors
    }

    /// Seed the block was drawn with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws of every path for one step and factor.
    pub fn slice(&self, step: usize, factor: usize) -> &[f64] {
        let start = (step * self.factors + factor) * self.paths;
        &self.data[start..start + self.paths]
    }
}

impl VariateSource for NormalDraws {
    fn paths(&self) -> usize {
        self.paths
    }

    fn draws(&self, key: VariateKey) -> Option<&[f64]> {
        (key.step < self.steps && key.factor < self.factors).then(|| self.slice(key.step, key.factor))
    }
}
