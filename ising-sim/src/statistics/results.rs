/// Equilibrium averages measured at one temperature.
///
/// Moments are taken over measurement sweeps (after warmup), one sample per sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperaturePoint {
    pub temperature: f64,
    /// ⟨m⟩, mean magnetization per spin.
    pub mag: f64,
    /// ⟨|m|⟩.
    pub abs_mag: f64,
    /// ⟨m²⟩.
    pub mag2: f64,
    /// ⟨m⁴⟩.
    pub mag4: f64,
    /// ⟨E⟩, mean energy per spin.
    pub energy: f64,
    /// ⟨E²⟩.
    pub energy2: f64,
    /// Fraction of accepted proposals over all sweeps, warmup included.
    pub acceptance_rate: f64,
    /// Normalized autocorrelation Γ(Δt) of m², length max_lag+1.
    /// Empty if autocorrelation_max_lag is None.
    pub mags2_autocorrelation: Vec<f64>,
    /// Integrated autocorrelation time of m²; `None` without autocorrelation data.
    pub mags2_tau: Option<f64>,
}

impl TemperaturePoint {
    /// χ = N (⟨m²⟩ − ⟨|m|⟩²) / T, with N the number of spins.
    pub fn susceptibility(&self, n_spins: usize) -> f64 {
        n_spins as f64 * (self.mag2 - self.abs_mag * self.abs_mag) / self.temperature
    }

    /// C = N (⟨E²⟩ − ⟨E⟩²) / T², with N the number of spins.
    pub fn specific_heat(&self, n_spins: usize) -> f64 {
        n_spins as f64 * (self.energy2 - self.energy * self.energy)
            / (self.temperature * self.temperature)
    }

    /// U = 1 − ⟨m⁴⟩ / (3 ⟨m²⟩²). Zero when ⟨m²⟩ vanishes.
    pub fn binder_cumulant(&self) -> f64 {
        if self.mag2 <= 0.0 {
            return 0.0;
        }
        1.0 - self.mag4 / (3.0 * self.mag2 * self.mag2)
    }
}

/// Output of a temperature scan, one point per requested temperature, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub dimension: usize,
    pub points: Vec<TemperaturePoint>,
}

impl ScanResult {
    pub fn n_spins(&self) -> usize {
        self.dimension * self.dimension
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.temperature).collect()
    }

    pub fn column(&self, f: impl Fn(&TemperaturePoint) -> f64) -> Vec<f64> {
        self.points.iter().map(f).collect()
    }

    pub fn susceptibility(&self) -> Vec<f64> {
        let n_spins = self.n_spins();
        self.column(|p| p.susceptibility(n_spins))
    }

    pub fn specific_heat(&self) -> Vec<f64> {
        let n_spins = self.n_spins();
        self.column(|p| p.specific_heat(n_spins))
    }

    pub fn binder_cumulant(&self) -> Vec<f64> {
        self.column(TemperaturePoint::binder_cumulant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(temperature: f64) -> TemperaturePoint {
        TemperaturePoint {
            temperature,
            mag: 0.0,
            abs_mag: 0.5,
            mag2: 0.5,
            mag4: 0.5,
            energy: -1.0,
            energy2: 1.5,
            acceptance_rate: 0.2,
            mags2_autocorrelation: vec![],
            mags2_tau: None,
        }
    }

    #[test]
    fn test_derived_quantities() {
        let p = point(2.0);
        assert_abs_diff_eq!(p.susceptibility(16), 16.0 * 0.25 / 2.0);
        assert_abs_diff_eq!(p.specific_heat(16), 16.0 * 0.5 / 4.0);
        assert_abs_diff_eq!(p.binder_cumulant(), 1.0 - 0.5 / 0.75);
    }

    #[test]
    fn test_ordered_binder_limit() {
        let mut p = point(1.0);
        p.mag2 = 1.0;
        p.mag4 = 1.0;
        assert_abs_diff_eq!(p.binder_cumulant(), 2.0 / 3.0);
        p.mag2 = 0.0;
        assert_eq!(p.binder_cumulant(), 0.0);
    }

    #[test]
    fn test_columns_keep_order() {
        let result = ScanResult {
            dimension: 4,
            points: vec![point(1.0), point(3.0), point(2.0)],
        };
        assert_eq!(result.temperatures(), vec![1.0, 3.0, 2.0]);
        assert_eq!(result.susceptibility().len(), 3);
        assert_eq!(result.column(|p| p.energy), vec![-1.0; 3]);
    }
}
