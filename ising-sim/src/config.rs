use std::time::Duration;

use validator::{Validate, ValidationError};

use crate::error::{IsingError, Result};
use crate::geometry::lattice::check_dimension;

pub const DEFAULT_DIMENSION: usize = 50;
pub const DEFAULT_TEMPERATURE: f64 = 2.5;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) fn check_temperature(temperature: f64) -> Result<()> {
    if !(temperature > 0.0 && temperature.is_finite()) {
        return Err(IsingError::NonPositiveTemperature(temperature));
    }
    Ok(())
}

pub(crate) fn check_field(field: f64) -> Result<()> {
    if !field.is_finite() {
        return Err(IsingError::NonFiniteField(field));
    }
    Ok(())
}

fn validate_simulation_parameters(
    cfg: &SimulationParameters,
) -> std::result::Result<(), ValidationError> {
    if cfg.interval.is_zero() {
        return Err(ValidationError::new("interval must be > 0"));
    }
    Ok(())
}

/// Parameters read by every sweep of a [`SimulationController`](crate::SimulationController).
///
/// Coupling is fixed at J = 1.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_simulation_parameters"))]
pub struct SimulationParameters {
    /// Side length `N` of the square lattice.
    pub dimension: usize,
    /// Temperature in units of J / k_B. Must stay strictly positive.
    pub temperature: f64,
    /// Uniform external field H.
    pub external_field: f64,
    /// Cadence of scheduled steps while running.
    pub interval: Duration,
    /// Seed for the controller's generator; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            temperature: DEFAULT_TEMPERATURE,
            external_field: 0.0,
            interval: DEFAULT_INTERVAL,
            seed: None,
        }
    }
}

impl SimulationParameters {
    /// Check every field, reporting the first violation as a typed error.
    pub fn check(&self) -> Result<()> {
        check_dimension(self.dimension)?;
        check_temperature(self.temperature)?;
        check_field(self.external_field)?;
        self.validate().map_err(|e| IsingError::InvalidConfig(format!("{e}")))
    }
}

fn validate_scan_config(cfg: &ScanConfig) -> std::result::Result<(), ValidationError> {
    if cfg.n_sweeps < 1 {
        return Err(ValidationError::new("n_sweeps must be >= 1"));
    }
    if cfg.warmup_sweeps >= cfg.n_sweeps {
        return Err(ValidationError::new("warmup_sweeps must be < n_sweeps"));
    }
    if cfg.temperatures.is_empty() {
        return Err(ValidationError::new("temperatures must not be empty"));
    }
    if cfg.temperatures.iter().any(|&t| !(t > 0.0 && t.is_finite())) {
        return Err(ValidationError::new("temperatures must be finite and > 0"));
    }
    if !cfg.external_field.is_finite() {
        return Err(ValidationError::new("external_field must be finite"));
    }
    if cfg.autocorrelation_max_lag == Some(0) {
        return Err(ValidationError::new("autocorrelation_max_lag must be >= 1"));
    }
    Ok(())
}

/// Equilibrium scan over a list of temperatures, one independent lattice each.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_scan_config"))]
pub struct ScanConfig {
    pub dimension: usize,
    pub temperatures: Vec<f64>,
    pub external_field: f64,
    pub n_sweeps: usize,
    /// Sweeps discarded before measuring.
    pub warmup_sweeps: usize,
    /// Record the autocorrelation of m² up to this lag.
    pub autocorrelation_max_lag: Option<usize>,
    /// Temperature slot `k` is seeded with `base_seed + k`.
    pub base_seed: u64,
    /// Process temperatures on the current thread instead of the rayon pool.
    pub sequential: bool,
}

impl ScanConfig {
    /// Warmup length for a fraction `ratio` of `n_sweeps`, rounded, and capped so
    /// at least one sweep is measured.
    pub fn warmup_for_ratio(n_sweeps: usize, ratio: f64) -> usize {
        let warmup = (n_sweeps as f64 * ratio).round() as usize;
        warmup.min(n_sweeps.saturating_sub(1))
    }

    pub fn check(&self) -> Result<()> {
        check_dimension(self.dimension)?;
        self.validate().map_err(|e| IsingError::InvalidConfig(format!("{e}")))
    }
}
