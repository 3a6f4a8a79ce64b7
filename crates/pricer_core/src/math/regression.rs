//! Least-squares polynomial regression across Monte Carlo paths.
//!
//! Conditional expectations are estimated by projecting a regressand onto
//! all monomials of total degree `<= order` in the regressors. Regressors are
//! standardised with the mean and standard deviation of the fitting sample
//! before the basis is evaluated, which keeps the normal equations well
//! scaled for typical index levels. The normal equations are solved with an
//! SVD pseudo-inverse, so collinear basis functions (e.g. a regressor that is
//! constant on the fitting sample) do not fail the fit.
//!
//! # Examples
//!
//! ```
//! use pricer_core::math::regression::RegressionFit;
//!
//! let x: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
//! let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v - 0.5 * v * v).collect();
//!
//! let fit = RegressionFit::fit(&y, &[&x], None, 2).unwrap();
//! let fitted = fit.evaluate(&[&x]).unwrap();
//! for (a, b) in fitted.iter().zip(&y) {
//!     assert!((a - b).abs() < 1e-9);
//! }
//! ```

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Relative singular value cut-off for the pseudo-inverse.
const SINGULAR_CUTOFF: f64 = 1e-12;

/// Regression failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    /// Fewer fitting samples than basis functions.
    #[error("Insufficient samples for regression: {samples} samples, {required} basis functions")]
    InsufficientSamples {
        /// Samples available for the fit
        samples: usize,
        /// Number of basis functions
        required: usize,
    },

    /// Regressor or mask length differs from the regressand length.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length or count
        expected: usize,
        /// Actual length or count
        got: usize,
    },

    /// The normal equations could not be inverted.
    #[error("Regression system is singular: {0}")]
    Singular(String),
}

/// Monomials of total degree `<= order` in `dimension` variables.
///
/// Ordered by degree, then lexicographically; the first function is the
/// constant one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialBasis {
    dimension: usize,
    order: usize,
    exponents: Vec<Vec<u32>>,
}

impl PolynomialBasis {
    /// Builds the monomial basis.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::math::regression::PolynomialBasis;
    ///
    /// // 1, x, y, x^2, xy, y^2
    /// assert_eq!(PolynomialBasis::new(2, 2).len(), 6);
    /// assert_eq!(PolynomialBasis::new(0, 4).len(), 1);
    /// ```
    pub fn new(dimension: usize, order: usize) -> Self {
        let mut exponents = Vec::new();
        for degree in 0..=order {
            let mut current = vec![0u32; dimension];
            push_monomials(&mut exponents, &mut current, 0, degree as u32);
            if dimension == 0 {
                break;
            }
        }
        Self {
            dimension,
            order,
            exponents,
        }
    }

    /// Number of basis functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    /// Always false: the constant function is part of every basis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Number of regressors.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Maximum total degree.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    fn evaluate_into(&self, point: &[f64], out: &mut [f64]) {
        for (value, exps) in out.iter_mut().zip(&self.exponents) {
            *value = exps
                .iter()
                .zip(point)
                .fold(1.0, |acc, (&e, &x)| acc * x.powi(e as i32));
        }
    }
}

fn push_monomials(out: &mut Vec<Vec<u32>>, current: &mut [u32], position: usize, remaining: u32) {
    if position + 1 >= current.len() {
        if let Some(last) = current.last_mut() {
            *last = remaining;
        }
        out.push(current.to_vec());
        return;
    }
    for e in (0..=remaining).rev() {
        current[position] = e;
        push_monomials(out, current, position + 1, remaining - e);
    }
    current[position] = 0;
}

/// A fitted regression: basis, regressor standardisation and coefficients.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    basis: PolynomialBasis,
    means: Vec<f64>,
    scales: Vec<f64>,
    coefficients: Vec<f64>,
    gram_inverse: DMatrix<f64>,
    samples: usize,
}

impl RegressionFit {
    /// Fits `regressand` against `regressors` on the paths selected by `mask`.
    ///
    /// All slices must have the regressand's length. Without a mask every
    /// path enters the fit.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` for inconsistent lengths
    /// - `InsufficientSamples` when fewer paths than basis functions are selected
    pub fn fit(
        regressand: &[f64],
        regressors: &[&[f64]],
        mask: Option<&[bool]>,
        order: usize,
    ) -> Result<Self, RegressionError> {
        let n = regressand.len();
        for r in regressors {
            check_len(n, r.len())?;
        }
        if let Some(m) = mask {
            check_len(n, m.len())?;
        }

        let selected: Vec<usize> = match mask {
            Some(m) => (0..n).filter(|&i| m[i]).collect(),
            None => (0..n).collect(),
        };

        let basis = PolynomialBasis::new(regressors.len(), order);
        let k = basis.len();
        if selected.len() < k {
            return Err(RegressionError::InsufficientSamples {
                samples: selected.len(),
                required: k,
            });
        }

        let (means, scales) = standardisation(regressors, &selected);
        let design = design_matrix(&basis, regressors, &means, &scales, &selected);
        let gram = design.transpose() * &design;
        let gram_inverse = pseudo_inverse(gram)?;
        let y = DVector::from_iterator(selected.len(), selected.iter().map(|&i| regressand[i]));
        let coefficients = &gram_inverse * (design.transpose() * y);

        Ok(Self {
            basis,
            means,
            scales,
            coefficients: coefficients.iter().copied().collect(),
            gram_inverse,
            samples: selected.len(),
        })
    }

    /// Evaluates the fitted polynomial on every path of `regressors`.
    pub fn evaluate(&self, regressors: &[&[f64]]) -> Result<Vec<f64>, RegressionError> {
        let n = self.path_count(regressors)?;
        let mut point = vec![0.0; self.basis.dimension()];
        let mut row = vec![0.0; self.basis.len()];
        Ok((0..n)
            .map(|i| {
                self.standardised_point(regressors, i, &mut point);
                self.basis.evaluate_into(&point, &mut row);
                row.iter().zip(&self.coefficients).map(|(b, c)| b * c).sum()
            })
            .collect())
    }

    /// Pulls the adjoint of the evaluated conditional expectation back onto
    /// the regressand.
    ///
    /// With design matrices `B_fit` (masked paths) and `B_all`, the fitted
    /// value is `B_all (B_fitᵀ B_fit)⁺ B_fitᵀ y`; the adjoint with respect to
    /// `y` is `B_fit (B_fitᵀ B_fit)⁺ B_allᵀ ā`, zero off the mask. The
    /// regressors' own sensitivities are not propagated.
    pub fn regressand_adjoint(
        &self,
        regressors: &[&[f64]],
        mask: Option<&[bool]>,
        adjoint: &[f64],
    ) -> Result<Vec<f64>, RegressionError> {
        let n = adjoint.len();
        if !regressors.is_empty() {
            check_len(self.path_count(regressors)?, n)?;
        } else if self.basis.dimension() != 0 {
            return Err(RegressionError::DimensionMismatch {
                expected: self.basis.dimension(),
                got: 0,
            });
        }
        if let Some(m) = mask {
            check_len(n, m.len())?;
        }

        let k = self.basis.len();
        let mut point = vec![0.0; self.basis.dimension()];
        let mut row = vec![0.0; k];
        let mut projected = DVector::zeros(k);
        for (i, a) in adjoint.iter().enumerate() {
            self.standardised_point(regressors, i, &mut point);
            self.basis.evaluate_into(&point, &mut row);
            for (p, b) in projected.iter_mut().zip(&row) {
                *p += b * a;
            }
        }
        let h = &self.gram_inverse * projected;

        Ok((0..n)
            .map(|i| {
                if mask.is_some_and(|m| !m[i]) {
                    return 0.0;
                }
                self.standardised_point(regressors, i, &mut point);
                self.basis.evaluate_into(&point, &mut row);
                row.iter().zip(h.iter()).map(|(b, c)| b * c).sum()
            })
            .collect())
    }

    /// Basis used for the fit.
    #[inline]
    pub fn basis(&self) -> &PolynomialBasis {
        &self.basis
    }

    /// Coefficients in the standardised basis.
    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of paths that entered the fit.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    fn path_count(&self, regressors: &[&[f64]]) -> Result<usize, RegressionError> {
        if regressors.len() != self.basis.dimension() {
            return Err(RegressionError::DimensionMismatch {
                expected: self.basis.dimension(),
                got: regressors.len(),
            });
        }
        let n = regressors.first().map_or(0, |r| r.len());
        for r in regressors {
            check_len(n, r.len())?;
        }
        Ok(n)
    }

    fn standardised_point(&self, regressors: &[&[f64]], path: usize, out: &mut [f64]) {
        for (j, x) in out.iter_mut().enumerate() {
            *x = (regressors[j][path] - self.means[j]) / self.scales[j];
        }
    }
}

impl RegressionFit {
    /// Constant-only fit evaluated on `paths` paths: the sample mean.
    ///
    /// Convenience for regressions without state variables, where
    /// `evaluate` has no regressor to read the path count from.
    pub fn evaluate_constant(&self, paths: usize) -> Result<Vec<f64>, RegressionError> {
        if self.basis.dimension() != 0 {
            return Err(RegressionError::DimensionMismatch {
                expected: self.basis.dimension(),
                got: 0,
            });
        }
        Ok(vec![self.coefficients[0]; paths])
    }
}

fn check_len(expected: usize, got: usize) -> Result<(), RegressionError> {
    if expected != got {
        return Err(RegressionError::DimensionMismatch { expected, got });
    }
    Ok(())
}

fn standardisation(regressors: &[&[f64]], selected: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let n = selected.len() as f64;
    regressors
        .iter()
        .map(|r| {
            let mean = selected.iter().map(|&i| r[i]).sum::<f64>() / n;
            let var = selected
                .iter()
                .map(|&i| (r[i] - mean) * (r[i] - mean))
                .sum::<f64>()
                / n;
            let sd = var.sqrt();
            if sd > 1e-14 * mean.abs().max(1.0) {
                (mean, sd)
            } else {
                (mean, 1.0)
            }
        })
        .unzip()
}

fn design_matrix(
    basis: &PolynomialBasis,
    regressors: &[&[f64]],
    means: &[f64],
    scales: &[f64],
    selected: &[usize],
) -> DMatrix<f64> {
    let mut point = vec![0.0; basis.dimension()];
    let mut row = vec![0.0; basis.len()];
    let mut design = DMatrix::zeros(selected.len(), basis.len());
    for (r, &i) in selected.iter().enumerate() {
        for (j, x) in point.iter_mut().enumerate() {
            *x = (regressors[j][i] - means[j]) / scales[j];
        }
        basis.evaluate_into(&point, &mut row);
        for (c, b) in row.iter().enumerate() {
            design[(r, c)] = *b;
        }
    }
    design
}

fn pseudo_inverse(gram: DMatrix<f64>) -> Result<DMatrix<f64>, RegressionError> {
    let k = gram.nrows();
    let svd = gram.svd(true, true);
    let largest = svd.singular_values.max();
    if !largest.is_finite() {
        return Err(RegressionError::Singular(
            "non-finite values in the normal equations".to_string(),
        ));
    }
    let cutoff = (largest * SINGULAR_CUTOFF * k as f64).max(f64::MIN_POSITIVE);
    svd.pseudo_inverse(cutoff)
        .map_err(|e| RegressionError::Singular(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_sizes() {
        assert_eq!(PolynomialBasis::new(1, 4).len(), 5);
        assert_eq!(PolynomialBasis::new(2, 3).len(), 10);
        assert_eq!(PolynomialBasis::new(3, 2).len(), 10);
    }

    #[test]
    fn test_basis_starts_with_constant() {
        let basis = PolynomialBasis::new(2, 2);
        assert_eq!(basis.exponents[0], vec![0, 0]);
        assert!(basis.exponents.iter().all(|e| e.iter().sum::<u32>() <= 2));
    }

    #[test]
    fn test_constant_regression_is_mean() {
        let y = [1.0, 2.0, 3.0, 6.0];
        let fit = RegressionFit::fit(&y, &[], None, 3).unwrap();
        assert_eq!(fit.basis().len(), 1);
        let values = fit.evaluate_constant(4).unwrap();
        for v in values {
            assert_relative_eq!(v, 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_insufficient_samples() {
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        let err = RegressionFit::fit(&y, &[&x], None, 3).unwrap_err();
        assert_eq!(
            err,
            RegressionError::InsufficientSamples {
                samples: 3,
                required: 4
            }
        );
    }

    #[test]
    fn test_mask_restricts_fit_but_evaluates_everywhere() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        // linear on the masked half, garbage elsewhere
        let y: Vec<f64> = x
            .iter()
            .map(|&v| if v < 10.0 { 3.0 * v + 1.0 } else { -100.0 })
            .collect();
        let mask: Vec<bool> = x.iter().map(|&v| v < 10.0).collect();
        let fit = RegressionFit::fit(&y, &[&x], Some(&mask), 1).unwrap();
        assert_eq!(fit.samples(), 10);
        let fitted = fit.evaluate(&[&x]).unwrap();
        assert_relative_eq!(fitted[15], 46.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_regressor_does_not_fail() {
        let x = vec![5.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fit = RegressionFit::fit(&y, &[&x], None, 2).unwrap();
        let fitted = fit.evaluate(&[&x]).unwrap();
        assert_relative_eq!(fitted[0], 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = [1.0, 2.0];
        let y = [1.0, 2.0, 3.0];
        assert!(matches!(
            RegressionFit::fit(&y, &[&x], None, 1),
            Err(RegressionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_adjoint_matches_finite_difference() {
        let x: Vec<f64> = (0..12).map(|i| (i as f64 * 0.37).sin() * 2.0).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v + 0.3 * v).collect();
        let weights: Vec<f64> = (0..12).map(|i| 1.0 + i as f64 / 12.0).collect();
        let objective = |y: &[f64]| -> f64 {
            let fit = RegressionFit::fit(y, &[&x], None, 2).unwrap();
            fit.evaluate(&[&x])
                .unwrap()
                .iter()
                .zip(&weights)
                .map(|(v, w)| v * w)
                .sum()
        };

        let fit = RegressionFit::fit(&y, &[&x], None, 2).unwrap();
        let adjoint = fit.regressand_adjoint(&[&x], None, &weights).unwrap();

        let h = 1e-6;
        for i in [0, 5, 11] {
            let mut bumped = y.clone();
            bumped[i] += h;
            let fd = (objective(&bumped) - objective(&y)) / h;
            assert_relative_eq!(adjoint[i], fd, epsilon = 1e-5);
        }
    }
}
