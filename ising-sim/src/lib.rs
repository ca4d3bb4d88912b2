pub mod config;
pub mod error;
pub mod geometry;
pub mod mcmc;
pub mod observables;
pub mod simulation;
pub mod statistics;

pub use config::{ScanConfig, SimulationParameters};
pub use error::{IsingError, Result};
pub use geometry::{checked_dimension, Lattice};
pub use observables::{energy_per_spin, magnetization};
pub use simulation::{
    run_temperature_scan, run_temperature_scan_polled, Frame, MagnetizationSeries, Observer,
    RunState, SimulationController, StepReport,
};
pub use statistics::{ScanResult, TemperaturePoint};
