//! Regression cache for conditional expectations on eager path sets.
//!
//! Fits are keyed by observation date and slot. A slot is either the call
//! site of an `NPV` expression or a memory slot chosen by the script. Every
//! record belongs to one path set generation; when the model resimulates,
//! the generation changes and the cache starts empty.
//!
//! With a training path set, the training pass fits and stores and the
//! pricing pass only evaluates stored fits on the pricing paths. Without
//! one, every call fits on the current paths and nothing is stored: a later
//! call at the same key may see a different amount, so a stored fit would
//! never be read.

use std::collections::HashMap;

use pricer_core::math::RegressionFit;
use pricer_core::types::Date;
use pricer_core::vectorized::{BoolVector, PathVector};
use tracing::debug;

use crate::error::ModelError;

/// Identity of a regression within one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegressionSlot {
    /// Expression id of an `NPV` call
    Site(usize),
    /// Memory slot of an `NPVMEM` call
    Memory(i64),
}

/// Cache key: observation date and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegressionKey {
    /// Observation date of the conditional expectation
    pub obs: Date,
    /// Regression slot
    pub slot: RegressionSlot,
}

/// Whether a call fits a new regression or reuses a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Fit on the current paths and store the result
    Fit,
    /// Fit on the current paths without storing
    Transient,
    /// Evaluate a stored fit; missing fits are an error
    Reuse,
}

/// Fitted regressions of one path set generation.
#[derive(Debug, Clone, Default)]
pub struct RegressionCache {
    generation: u64,
    fits: HashMap<RegressionKey, RegressionFit>,
}

impl RegressionCache {
    /// Empty cache for generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the stored fits.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops every fit if `generation` differs from the stored one.
    pub fn sync(&mut self, generation: u64) {
        if generation != self.generation {
            debug!(
                from = self.generation,
                to = generation,
                dropped = self.fits.len(),
                "path set generation changed, clearing regression cache"
            );
            self.fits.clear();
            self.generation = generation;
        }
    }

    /// Stored fit for a key.
    pub fn get(&self, key: &RegressionKey) -> Option<&RegressionFit> {
        self.fits.get(key)
    }

    /// Number of stored fits.
    pub fn len(&self) -> usize {
        self.fits.len()
    }

    /// Whether no fit is stored.
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    /// Regression estimate of `amount` on all paths.
    ///
    /// Deterministic regressors carry no information and are dropped. With
    /// `mask`, only the selected paths enter the fit.
    pub fn conditional_expectation(
        &mut self,
        key: RegressionKey,
        policy: FitPolicy,
        amount: &PathVector,
        regressors: &[PathVector],
        mask: Option<&BoolVector>,
        order: usize,
    ) -> Result<PathVector, ModelError> {
        let columns: Vec<_> = regressors
            .iter()
            .filter(|r| !r.is_deterministic())
            .map(|r| r.values())
            .collect();
        let x: Vec<&[f64]> = columns.iter().map(|c| c.as_ref()).collect();

        let fitted = match policy {
            FitPolicy::Reuse => {
                let fit = self.fits.get(&key).ok_or_else(|| {
                    ModelError::not_ready(
                        key.obs,
                        format!("no trained regression for {:?}", key.slot),
                    )
                })?;
                apply(fit, &x, amount.size())?
            }
            FitPolicy::Fit | FitPolicy::Transient => {
                let y = amount.values();
                let mask_values = mask.map(|m| m.values());
                let fit = RegressionFit::fit(&y, &x, mask_values.as_deref(), order)?;
                debug!(
                    obs = %key.obs,
                    slot = ?key.slot,
                    samples = fit.samples(),
                    basis = fit.basis().len(),
                    stored = policy == FitPolicy::Fit,
                    "fitted regression"
                );
                let fitted = apply(&fit, &x, amount.size())?;
                if policy == FitPolicy::Fit {
                    self.fits.insert(key, fit);
                }
                fitted
            }
        };
        Ok(PathVector::from_paths(fitted))
    }
}

fn apply(fit: &RegressionFit, x: &[&[f64]], size: usize) -> Result<Vec<f64>, ModelError> {
    Ok(if x.is_empty() {
        fit.evaluate_constant(size)?
    } else {
        fit.evaluate(x)?
    })
}
