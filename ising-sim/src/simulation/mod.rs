pub mod controller;
pub mod observer;
pub mod scan;
pub mod scheduler;

pub use controller::{RunState, SimulationController, StepReport};
pub use observer::{Frame, MagnetizationSeries, Observer};
pub use scan::{run_temperature, run_temperature_scan, run_temperature_scan_polled};
pub use scheduler::Scheduler;
