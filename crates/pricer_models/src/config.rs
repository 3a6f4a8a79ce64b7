//! Monte Carlo configuration.
//!
//! [`McParams`] fixes the path count, seeds, regression order and the
//! simulation grid shared by the eager backends. Use [`McParamsBuilder`] to
//! construct validated instances, or deserialise [`McConfig`] from TOML.

use pricer_core::types::Date;

use crate::error::ModelError;

/// Maximum number of simulation paths allowed.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Maximum total degree of the regression basis.
pub const MAX_REGRESSION_ORDER: usize = 10;

/// Default seed of the pricing path set.
pub const DEFAULT_SEED: u64 = 42;

/// Default total degree of the regression basis.
pub const DEFAULT_REGRESSION_ORDER: usize = 4;

/// Monte Carlo parameters.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::Date;
/// use pricer_models::config::McParams;
///
/// let params = McParams::builder()
///     .samples(10_000)
///     .seed(7)
///     .training(5_000, 11)
///     .simulation_dates(vec![Date::from_ymd(2025, 1, 2).unwrap()])
///     .build()
///     .expect("valid parameters");
///
/// assert_eq!(params.samples(), 10_000);
/// assert_eq!(params.training_samples(), Some(5_000));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct McParams {
    samples: usize,
    seed: u64,
    training: Option<(usize, u64)>,
    regression_order: usize,
    simulation_dates: Vec<Date>,
}

impl McParams {
    /// Creates a new parameter builder.
    #[inline]
    pub fn builder() -> McParamsBuilder {
        McParamsBuilder::default()
    }

    /// Number of pricing paths.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Seed of the pricing path set.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of training paths, if a separate training set is configured.
    #[inline]
    pub fn training_samples(&self) -> Option<usize> {
        self.training.map(|(n, _)| n)
    }

    /// Seed of the training path set.
    #[inline]
    pub fn training_seed(&self) -> Option<u64> {
        self.training.map(|(_, s)| s)
    }

    /// Total degree of the regression basis.
    #[inline]
    pub fn regression_order(&self) -> usize {
        self.regression_order
    }

    /// Sorted, de-duplicated simulation dates.
    #[inline]
    pub fn simulation_dates(&self) -> &[Date] {
        &self.simulation_dates
    }

    /// Copy with a different simulation grid.
    pub fn with_simulation_dates(&self, dates: Vec<Date>) -> Self {
        let mut params = self.clone();
        params.simulation_dates = normalise_dates(dates);
        params
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if a sample count is 0 or above [`MAX_SAMPLES`], or
    /// the regression order exceeds [`MAX_REGRESSION_ORDER`].
    pub fn validate(&self) -> Result<(), ModelError> {
        check_samples("samples", self.samples)?;
        if let Some((n, _)) = self.training {
            check_samples("training_samples", n)?;
        }
        if self.regression_order > MAX_REGRESSION_ORDER {
            return Err(ModelError::invalid(
                "regression_order",
                format!(
                    "{} exceeds the maximum of {MAX_REGRESSION_ORDER}",
                    self.regression_order
                ),
            ));
        }
        Ok(())
    }
}

fn check_samples(name: &'static str, n: usize) -> Result<(), ModelError> {
    if n == 0 || n > MAX_SAMPLES {
        return Err(ModelError::invalid(
            name,
            format!("{n} must be in range [1, {MAX_SAMPLES}]"),
        ));
    }
    Ok(())
}

fn normalise_dates(mut dates: Vec<Date>) -> Vec<Date> {
    dates.sort();
    dates.dedup();
    dates
}

/// Builder for [`McParams`].
#[derive(Clone, Debug, Default)]
pub struct McParamsBuilder {
    samples: Option<usize>,
    seed: Option<u64>,
    training: Option<(usize, u64)>,
    regression_order: Option<usize>,
    simulation_dates: Vec<Date>,
}

impl McParamsBuilder {
    /// Sets the number of pricing paths.
    #[inline]
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Sets the pricing seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configures a separate training path set used to fit regressions.
    #[inline]
    pub fn training(mut self, samples: usize, seed: u64) -> Self {
        self.training = Some((samples, seed));
        self
    }

    /// Sets the total degree of the regression basis.
    #[inline]
    pub fn regression_order(mut self, order: usize) -> Self {
        self.regression_order = Some(order);
        self
    }

    /// Sets the simulation grid; dates are sorted and de-duplicated.
    pub fn simulation_dates(mut self, dates: Vec<Date>) -> Self {
        self.simulation_dates = dates;
        self
    }

    /// Builds the parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `samples` is not set or validation fails.
    pub fn build(self) -> Result<McParams, ModelError> {
        let samples = self
            .samples
            .ok_or_else(|| ModelError::invalid("samples", "must be specified"))?;
        let params = McParams {
            samples,
            seed: self.seed.unwrap_or(DEFAULT_SEED),
            training: self.training,
            regression_order: self.regression_order.unwrap_or(DEFAULT_REGRESSION_ORDER),
            simulation_dates: normalise_dates(self.simulation_dates),
        };
        params.validate()?;
        Ok(params)
    }
}

/// TOML form of [`McParams`].
///
/// ```toml
/// samples = 10000
/// seed = 42
/// training_samples = 5000
/// regression_order = 4
/// simulation_dates = ["2025-01-02", "2026-01-02"]
/// ```
#[cfg(feature = "serde")]
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// Number of pricing paths
    pub samples: usize,
    /// Pricing seed
    pub seed: u64,
    /// Number of training paths; no training set when absent
    pub training_samples: Option<usize>,
    /// Training seed; defaults to the pricing seed plus one
    pub training_seed: Option<u64>,
    /// Total degree of the regression basis
    pub regression_order: usize,
    /// Simulation grid; derived from the script when empty
    pub simulation_dates: Vec<Date>,
}

#[cfg(feature = "serde")]
impl Default for McConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            seed: DEFAULT_SEED,
            training_samples: None,
            training_seed: None,
            regression_order: DEFAULT_REGRESSION_ORDER,
            simulation_dates: Vec::new(),
        }
    }
}

#[cfg(feature = "serde")]
impl McConfig {
    /// Parses the configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ModelError> {
        toml::from_str(text).map_err(|e| ModelError::Config(e.to_string()))
    }

    /// Validated parameters.
    pub fn to_params(&self) -> Result<McParams, ModelError> {
        let mut builder = McParams::builder()
            .samples(self.samples)
            .seed(self.seed)
            .regression_order(self.regression_order)
            .simulation_dates(self.simulation_dates.clone());
        if let Some(n) = self.training_samples {
            builder = builder.training(n, self.training_seed.unwrap_or(self.seed + 1));
        }
        builder.build()
    }
}
