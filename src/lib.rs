use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use ising_sim::{
    checked_dimension, run_temperature_scan_polled, IsingError, Lattice, Observer, ScanConfig,
    SimulationController, SimulationParameters,
};
use numpy::ndarray::{Array1, Array2};
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyKeyboardInterrupt, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// How often a running scan checks for pending Python signals.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

fn to_py_err(e: IsingError) -> PyErr {
    match e {
        IsingError::Interrupted => PyKeyboardInterrupt::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn progress_bar(len: u64, msg: &'static str) -> PyResult<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .map_err(|e| PyValueError::new_err(e.to_string()))?
        .progress_chars("=> "),
    );
    pb.set_message(msg);
    Ok(pb)
}

fn spins_array<'py>(py: Python<'py>, lattice: &Lattice) -> PyResult<Bound<'py, PyArray2<i8>>> {
    let n = lattice.dimension();
    let arr = Array2::from_shape_vec((n, n), lattice.spins().to_vec())
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(arr.into_pyarray(py))
}

/// Forwards `(step, magnetization)` to a Python callable.
struct PyCallback {
    callback: Py<PyAny>,
}

impl Observer for PyCallback {
    fn on_observable(&mut self, step: u64, magnetization: f64) {
        Python::with_gil(|py| {
            if let Err(e) = self.callback.call1(py, (step, magnetization)) {
                log::warn!("observer callback raised at step {step}: {e}");
            }
        });
    }
}

#[pyclass]
struct IsingSimulation {
    controller: SimulationController,
}

#[pymethods]
impl IsingSimulation {
    /// Create a new 2D Ising simulation on an `N x N` torus with random spins.
    ///
    /// Arguments:
    ///   dimension: lattice side N (default 50)
    ///   temperature: T in units of J / k_B, must be > 0 (default 2.5)
    ///   external_field: uniform field H (default 0.0)
    ///   interval_ms: cadence of scheduled steps while running (default 50)
    ///   seed: generator seed; drawn from entropy when omitted
    #[new]
    #[pyo3(signature = (dimension=50, temperature=2.5, external_field=0.0, interval_ms=50, seed=None))]
    fn new(
        dimension: i64,
        temperature: f64,
        external_field: f64,
        interval_ms: u64,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let params = SimulationParameters {
            dimension: checked_dimension(dimension).map_err(to_py_err)?,
            temperature,
            external_field,
            interval: Duration::from_millis(interval_ms),
            seed,
        };
        let controller = SimulationController::new(params).map_err(to_py_err)?;
        Ok(Self { controller })
    }

    /// Run one sweep immediately. Returns the new magnetization.
    fn step(&mut self) -> PyResult<f64> {
        let report = self.controller.step().map_err(to_py_err)?;
        Ok(report.magnetization)
    }

    /// Step if running and the schedule is due. Returns the magnetization, or None.
    fn tick(&mut self) -> PyResult<Option<f64>> {
        let report = self.controller.tick(Instant::now()).map_err(to_py_err)?;
        Ok(report.map(|r| r.magnetization))
    }

    /// Run `n_sweeps` sweeps back to back, ignoring the schedule.
    ///
    /// Returns: numpy array of shape (n_sweeps,) with the magnetization after each sweep.
    fn run<'py>(
        &mut self,
        py: Python<'py>,
        n_sweeps: usize,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pb = progress_bar(n_sweeps as u64, "sweeps")?;
        let mut mags = Vec::with_capacity(n_sweeps);
        for _ in 0..n_sweeps {
            py.check_signals()?;
            let report = self.controller.step().map_err(to_py_err)?;
            mags.push(report.magnetization);
            pb.inc(1);
        }
        pb.finish();
        Ok(Array1::from(mags).into_pyarray(py))
    }

    fn start(&mut self) -> bool {
        self.controller.start()
    }

    fn pause(&mut self) -> bool {
        self.controller.pause()
    }

    /// Start if idle, pause if running. Returns True if now running.
    fn toggle(&mut self) -> bool {
        self.controller.toggle();
        self.controller.is_running()
    }

    /// Fresh random lattice at the current dimension, step count back to 0.
    fn reset(&mut self) -> PyResult<()> {
        self.controller.reset().map_err(to_py_err)
    }

    #[getter]
    fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    #[getter]
    fn step_count(&self) -> u64 {
        self.controller.step_count()
    }

    #[getter]
    fn magnetization(&self) -> f64 {
        self.controller.magnetization()
    }

    /// Energy per spin of the current configuration.
    #[getter]
    fn energy(&self) -> f64 {
        self.controller.energy()
    }

    #[getter]
    fn temperature(&self) -> f64 {
        self.controller.parameters().temperature
    }

    #[setter]
    fn set_temperature(&mut self, temperature: f64) -> PyResult<()> {
        self.controller.set_temperature(temperature).map_err(to_py_err)
    }

    #[getter]
    fn external_field(&self) -> f64 {
        self.controller.parameters().external_field
    }

    #[setter]
    fn set_external_field(&mut self, field: f64) -> PyResult<()> {
        self.controller.set_external_field(field).map_err(to_py_err)
    }

    #[getter]
    fn dimension(&self) -> usize {
        self.controller.lattice().dimension()
    }

    /// Pauses and reinitializes the lattice at the new size.
    #[setter]
    fn set_dimension(&mut self, dimension: i64) -> PyResult<()> {
        let n = checked_dimension(dimension).map_err(to_py_err)?;
        self.controller.set_dimension(n).map_err(to_py_err)
    }

    #[setter]
    fn set_interval_ms(&mut self, interval_ms: u64) -> PyResult<()> {
        self.controller.set_interval(Duration::from_millis(interval_ms)).map_err(to_py_err)
    }

    /// Return current spins as a numpy array of shape (N, N) with values in {-1, +1}.
    fn spins<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<i8>>> {
        spins_array(py, self.controller.lattice())
    }

    /// Register `callback(step, magnetization)`, called after every published
    /// step. It is invoked once right away with the current state.
    fn subscribe(&mut self, callback: Py<PyAny>) {
        self.controller.subscribe(PyCallback { callback });
    }
}

/// Equilibrium scan, one independent lattice per temperature.
///
/// Arguments:
///   temperatures: list of temperatures, each > 0
///   dimension: lattice side N
///   n_sweeps: total number of sweeps per temperature
///   warmup_ratio: fraction of sweeps to discard (default 0.25); at least one
///     sweep is always measured
///   external_field: uniform field H (default 0.0)
///   autocorrelation_max_lag: if set, estimate the autocorrelation time of m²
///   seed: base seed, temperature k uses seed + k (default 42)
///   sequential: disable the rayon thread pool (default False)
///
/// Returns: dict of numpy arrays of shape (n_temps,) with keys "temperatures",
///   "mags", "abs_mags", "mags2", "mags4", "energies", "energies2",
///   "acceptance_rate", "susceptibility", "specific_heat", "binder", and
///   "mags2_tau" when autocorrelation was requested.
#[pyfunction]
#[pyo3(signature = (temperatures, dimension, n_sweeps, warmup_ratio=0.25, external_field=0.0, autocorrelation_max_lag=None, seed=42, sequential=false))]
#[allow(clippy::too_many_arguments)]
fn temperature_scan<'py>(
    py: Python<'py>,
    temperatures: Vec<f64>,
    dimension: i64,
    n_sweeps: usize,
    warmup_ratio: f64,
    external_field: f64,
    autocorrelation_max_lag: Option<usize>,
    seed: u64,
    sequential: bool,
) -> PyResult<Bound<'py, PyDict>> {
    if !(0.0..1.0).contains(&warmup_ratio) {
        return Err(PyValueError::new_err("warmup_ratio must be in [0, 1)"));
    }
    let config = ScanConfig {
        dimension: checked_dimension(dimension).map_err(to_py_err)?,
        temperatures,
        external_field,
        n_sweeps,
        warmup_sweeps: ScanConfig::warmup_for_ratio(n_sweeps, warmup_ratio),
        autocorrelation_max_lag,
        base_seed: seed,
        sequential,
    };
    config.check().map_err(to_py_err)?;

    let pb = progress_bar((n_sweeps * config.temperatures.len()) as u64, "sweeps")?;
    // Signals are only delivered to the main thread, so it polls while a worker scans.
    let result = py.allow_threads(|| {
        run_temperature_scan_polled(&config, &|| pb.inc(1), SIGNAL_POLL, || {
            Python::with_gil(|py| py.check_signals()).is_err()
        })
    });
    pb.finish();
    let result = result.map_err(to_py_err)?;

    let dict = PyDict::new(py);
    dict.set_item("temperatures", Array1::from(result.temperatures()).into_pyarray(py))?;
    dict.set_item("mags", Array1::from(result.column(|p| p.mag)).into_pyarray(py))?;
    dict.set_item("abs_mags", Array1::from(result.column(|p| p.abs_mag)).into_pyarray(py))?;
    dict.set_item("mags2", Array1::from(result.column(|p| p.mag2)).into_pyarray(py))?;
    dict.set_item("mags4", Array1::from(result.column(|p| p.mag4)).into_pyarray(py))?;
    dict.set_item("energies", Array1::from(result.column(|p| p.energy)).into_pyarray(py))?;
    dict.set_item("energies2", Array1::from(result.column(|p| p.energy2)).into_pyarray(py))?;
    dict.set_item(
        "acceptance_rate",
        Array1::from(result.column(|p| p.acceptance_rate)).into_pyarray(py),
    )?;
    dict.set_item("susceptibility", Array1::from(result.susceptibility()).into_pyarray(py))?;
    dict.set_item("specific_heat", Array1::from(result.specific_heat()).into_pyarray(py))?;
    dict.set_item("binder", Array1::from(result.binder_cumulant()).into_pyarray(py))?;

    if autocorrelation_max_lag.is_some() {
        let taus = result.column(|p| p.mags2_tau.unwrap_or(f64::NAN));
        dict.set_item("mags2_tau", Array1::from(taus).into_pyarray(py))?;
    }

    Ok(dict)
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<IsingSimulation>()?;
    m.add_function(wrap_pyfunction!(temperature_scan, m)?)?;
    Ok(())
}
