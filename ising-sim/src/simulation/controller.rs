use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::observer::Observer;
use super::scheduler::Scheduler;
use crate::config::{check_field, check_temperature, SimulationParameters};
use crate::error::{IsingError, Result};
use crate::geometry::lattice::check_dimension;
use crate::geometry::Lattice;
use crate::mcmc::{entropy_seed, metropolis_sweep, seeded, DefaultRng, RandomSource, SweepStats};
use crate::observables::{energy_per_spin, magnetization};

/// Longest single sleep of [`SimulationController::run`], bounding how late an
/// interrupt is noticed.
const MAX_NAP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Paused with a valid lattice.
    Idle,
    /// Sweeps are scheduled at the configured interval.
    Running,
}

/// Outcome of one completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: u64,
    pub magnetization: f64,
    pub sweep: SweepStats,
}

/// Owns the lattice, step counter, parameters and generator of one simulation,
/// and publishes `(step, lattice, magnetization)` to registered observers.
///
/// State changes only go through this type. Every publication happens after the
/// lattice and step counter are both updated, so observers never see a step
/// that does not match the lattice they are handed.
pub struct SimulationController<R = DefaultRng> {
    params: SimulationParameters,
    lattice: Lattice,
    step_count: u64,
    rng: R,
    scheduler: Scheduler,
    observers: Vec<Box<dyn Observer + Send + Sync>>,
}

impl SimulationController<DefaultRng> {
    /// Controller seeded from `params.seed`, or from entropy when unset.
    pub fn new(params: SimulationParameters) -> Result<Self> {
        params.check()?;
        let seed = params.seed.unwrap_or_else(entropy_seed);
        log::debug!("seeding controller with {seed}");
        Self::with_rng(params, seeded(seed))
    }
}

impl<R: RandomSource> SimulationController<R> {
    /// Controller drawing from `rng`; `params.seed` is ignored.
    pub fn with_rng(params: SimulationParameters, mut rng: R) -> Result<Self> {
        params.check()?;
        let lattice = Lattice::random(params.dimension, &mut rng)?;
        let scheduler = Scheduler::new(params.interval);
        log::debug!(
            "initialized {n}x{n} lattice at T = {t}, H = {h}",
            n = params.dimension,
            t = params.temperature,
            h = params.external_field,
        );
        Ok(Self {
            params,
            lattice,
            step_count: 0,
            rng,
            scheduler,
            observers: Vec::new(),
        })
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn state(&self) -> RunState {
        if self.scheduler.is_active() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn magnetization(&self) -> f64 {
        magnetization(&self.lattice)
    }

    /// Energy per spin in the current external field.
    pub fn energy(&self) -> f64 {
        energy_per_spin(&self.lattice, self.params.external_field)
    }

    /// Register a collaborator. It immediately receives the current state.
    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: Observer + Send + Sync + 'static,
    {
        let mut observer: Box<dyn Observer + Send + Sync> = Box::new(observer);
        let m = magnetization(&self.lattice);
        observer.on_lattice_updated(self.step_count, &self.lattice);
        observer.on_observable(self.step_count, m);
        self.observers.push(observer);
    }

    fn publish(&mut self) -> f64 {
        let m = magnetization(&self.lattice);
        for observer in self.observers.iter_mut() {
            observer.on_lattice_updated(self.step_count, &self.lattice);
            observer.on_observable(self.step_count, m);
        }
        m
    }

    /// Replace the lattice with a fresh random `dimension x dimension` one,
    /// reset the step counter and stop scheduling. Publishes step 0.
    ///
    /// An invalid dimension is rejected before anything changes.
    pub fn initialize(&mut self, dimension: usize) -> Result<()> {
        check_dimension(dimension)?;
        self.pause();
        self.lattice = Lattice::random(dimension, &mut self.rng)?;
        self.params.dimension = dimension;
        self.step_count = 0;
        log::debug!("initialized {dimension}x{dimension} lattice");
        self.publish();
        Ok(())
    }

    /// [`initialize`](Self::initialize) with the configured dimension.
    pub fn reset(&mut self) -> Result<()> {
        self.initialize(self.params.dimension)
    }

    /// Idle → Running. Returns false if already running.
    pub fn start(&mut self) -> bool {
        self.start_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) -> bool {
        let started = self.scheduler.start(now);
        if started {
            log::debug!("started at step {}", self.step_count);
        }
        started
    }

    /// Running → Idle. A step in progress has already completed by the time
    /// this can be called. Returns false if already idle.
    pub fn pause(&mut self) -> bool {
        let paused = self.scheduler.cancel();
        if paused {
            log::debug!("paused at step {}", self.step_count);
        }
        paused
    }

    /// Idle ↔ Running. Returns the new state.
    pub fn toggle(&mut self) -> RunState {
        self.toggle_at(Instant::now())
    }

    pub fn toggle_at(&mut self, now: Instant) -> RunState {
        match self.state() {
            RunState::Idle => {
                self.start_at(now);
            }
            RunState::Running => {
                self.pause();
            }
        }
        self.state()
    }

    /// One sweep at the current parameters, then publish. Valid in either state.
    pub fn step(&mut self) -> Result<StepReport> {
        let sweep = metropolis_sweep(
            &mut self.lattice,
            self.params.temperature,
            self.params.external_field,
            &mut self.rng,
        )?;
        self.step_count += 1;
        let magnetization = self.publish();
        log::trace!(
            "step {}: m = {magnetization:.4}, accepted {}/{}",
            self.step_count,
            sweep.accepted,
            sweep.proposals,
        );
        Ok(StepReport {
            step: self.step_count,
            magnetization,
            sweep,
        })
    }

    /// Run one scheduled step if running and due at `now`.
    ///
    /// The next step is armed one interval after this one finishes.
    pub fn tick(&mut self, now: Instant) -> Result<Option<StepReport>> {
        if !self.scheduler.is_due(now) {
            return Ok(None);
        }
        let report = self.step();
        self.scheduler.complete(Instant::now().max(now));
        report.map(Some)
    }

    /// Drive scheduled steps on the current thread until paused, `interrupted`
    /// is set, or `max_steps` steps have run. Interruption pauses the controller.
    ///
    /// Returns the number of steps taken.
    pub fn run(&mut self, interrupted: &AtomicBool, max_steps: Option<usize>) -> Result<usize> {
        let mut n_steps = 0usize;
        while self.is_running() && max_steps.map_or(true, |max| n_steps < max) {
            if interrupted.load(Ordering::Relaxed) {
                self.pause();
                break;
            }
            let now = Instant::now();
            match self.scheduler.time_until_due(now) {
                Some(wait) if !wait.is_zero() => std::thread::sleep(wait.min(MAX_NAP)),
                _ => {
                    if self.tick(now)?.is_some() {
                        n_steps += 1;
                    }
                }
            }
        }
        Ok(n_steps)
    }

    /// Takes effect at the next sweep. Non-positive or non-finite values are
    /// rejected and the previous temperature is kept.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        if let Err(e) = check_temperature(temperature) {
            log::warn!("rejected temperature {temperature}, keeping {}", self.params.temperature);
            return Err(e);
        }
        self.params.temperature = temperature;
        Ok(())
    }

    /// Takes effect at the next sweep. Non-finite values are rejected.
    pub fn set_external_field(&mut self, field: f64) -> Result<()> {
        if let Err(e) = check_field(field) {
            log::warn!("rejected external field {field}, keeping {}", self.params.external_field);
            return Err(e);
        }
        self.params.external_field = field;
        Ok(())
    }

    /// Pause if running and reinitialize at the new size. The old lattice is discarded.
    pub fn set_dimension(&mut self, dimension: usize) -> Result<()> {
        if let Err(e) = check_dimension(dimension) {
            log::warn!("rejected dimension {dimension}, keeping {}", self.params.dimension);
            return Err(e);
        }
        self.initialize(dimension)
    }

    /// Cadence of scheduled steps; applies from the next re-arm.
    pub fn set_interval(&mut self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(IsingError::InvalidConfig("interval must be > 0".to_string()));
        }
        self.params.interval = interval;
        self.scheduler.set_interval(interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::observer::{Frame, MagnetizationSeries};
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Mutex};

    fn params(dimension: usize, seed: u64) -> SimulationParameters {
        SimulationParameters {
            dimension,
            temperature: 2.0,
            external_field: 0.0,
            interval: Duration::from_secs(1),
            seed: Some(seed),
        }
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        let mut p = params(0, 1);
        assert_eq!(
            SimulationController::new(p.clone()).err(),
            Some(IsingError::InvalidDimension(0))
        );
        p.dimension = 4;
        p.temperature = -1.0;
        assert_eq!(
            SimulationController::new(p).err(),
            Some(IsingError::NonPositiveTemperature(-1.0))
        );
    }

    #[test]
    fn test_step_publishes_matching_frames() {
        let mut sim = SimulationController::new(params(6, 3)).unwrap();
        let (tx, rx) = channel::<Frame>();
        sim.subscribe(tx);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(&first.lattice, sim.lattice());

        for expected_step in 1..=5u64 {
            let report = sim.step().unwrap();
            assert_eq!(report.step, expected_step);
            assert_eq!(report.sweep.proposals, 36);
            let frame = rx.try_recv().unwrap();
            assert_eq!(frame.step, expected_step);
            assert_eq!(&frame.lattice, sim.lattice());
            assert_eq!(frame.magnetization, report.magnetization);
            assert_eq!(frame.magnetization, magnetization(&frame.lattice));
        }
        assert_eq!(sim.step_count(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_deterministic_replay() {
        let run = |seed: u64| {
            let mut sim = SimulationController::new(params(10, seed)).unwrap();
            let series = Arc::new(Mutex::new(MagnetizationSeries::new()));
            sim.subscribe(Arc::clone(&series));
            for _ in 0..25 {
                sim.step().unwrap();
            }
            let points = series.lock().unwrap().points().to_vec();
            (sim.lattice().clone(), points)
        };

        let (lat_a, mags_a) = run(99);
        let (lat_b, mags_b) = run(99);
        assert_eq!(lat_a, lat_b);
        assert_eq!(mags_a.len(), 26);
        assert_eq!(mags_a.len(), mags_b.len());
        for ((sa, ma), (sb, mb)) in mags_a.iter().zip(mags_b.iter()) {
            assert_eq!(sa, sb);
            assert_eq!(ma.to_bits(), mb.to_bits());
        }

        let (lat_c, _) = run(100);
        assert_ne!(lat_a, lat_c);
    }

    #[test]
    fn test_reset_yields_fresh_lattices() {
        let mut sim = SimulationController::new(params(8, 5)).unwrap();
        for _ in 0..3 {
            sim.step().unwrap();
        }
        sim.reset().unwrap();
        let first = sim.lattice().clone();
        assert_eq!(sim.step_count(), 0);
        sim.reset().unwrap();
        assert_eq!(sim.step_count(), 0);
        assert_ne!(&first, sim.lattice());
        assert_eq!(sim.lattice().dimension(), 8);
    }

    #[test]
    fn test_reset_restarts_series() {
        let mut sim = SimulationController::new(params(4, 6)).unwrap();
        let series = Arc::new(Mutex::new(MagnetizationSeries::new()));
        sim.subscribe(Arc::clone(&series));
        for _ in 0..4 {
            sim.step().unwrap();
        }
        assert_eq!(series.lock().unwrap().len(), 5);

        sim.reset().unwrap();
        let series = series.lock().unwrap();
        assert_eq!(series.points(), &[(0, sim.magnetization())]);
    }

    #[test]
    fn test_state_transitions() {
        let t0 = Instant::now();
        let mut sim = SimulationController::new(params(4, 7)).unwrap();
        assert_eq!(sim.state(), RunState::Idle);

        assert!(sim.start_at(t0));
        assert!(!sim.start_at(t0));
        assert_eq!(sim.state(), RunState::Running);

        assert!(sim.pause());
        assert!(!sim.pause());
        assert_eq!(sim.state(), RunState::Idle);

        assert_eq!(sim.toggle_at(t0), RunState::Running);
        assert_eq!(sim.toggle_at(t0), RunState::Idle);

        // Manual steps are allowed while idle.
        sim.step().unwrap();
        assert_eq!(sim.step_count(), 1);

        sim.start_at(t0);
        sim.initialize(5).unwrap();
        assert_eq!(sim.state(), RunState::Idle);
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.lattice().dimension(), 5);
    }

    #[test]
    fn test_tick_follows_schedule() {
        let t0 = Instant::now();
        let second = Duration::from_secs(1);
        let mut sim = SimulationController::new(params(4, 8)).unwrap();

        // Idle: never due.
        assert_eq!(sim.tick(t0 + 5 * second).unwrap(), None);

        sim.start_at(t0);
        assert_eq!(sim.tick(t0 + second / 2).unwrap(), None);
        let report = sim.tick(t0 + second).unwrap().unwrap();
        assert_eq!(report.step, 1);

        // Re-armed one interval after completion.
        assert_eq!(sim.tick(t0 + second + second / 2).unwrap(), None);
        assert!(sim.tick(t0 + 2 * second).unwrap().is_some());
        assert_eq!(sim.step_count(), 2);

        sim.pause();
        assert_eq!(sim.tick(t0 + 10 * second).unwrap(), None);
        assert_eq!(sim.step_count(), 2);
    }

    #[test]
    fn test_run_drives_steps() {
        let mut p = params(4, 9);
        p.interval = Duration::from_millis(1);
        let mut sim = SimulationController::new(p).unwrap();
        let interrupted = AtomicBool::new(false);

        // Idle: nothing to drive.
        assert_eq!(sim.run(&interrupted, Some(3)).unwrap(), 0);

        sim.start();
        assert_eq!(sim.run(&interrupted, Some(3)).unwrap(), 3);
        assert_eq!(sim.step_count(), 3);
        assert!(sim.is_running());

        interrupted.store(true, Ordering::Relaxed);
        assert_eq!(sim.run(&interrupted, Some(3)).unwrap(), 0);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_rejected_setters_keep_previous_values() {
        let mut sim = SimulationController::new(params(4, 10)).unwrap();
        sim.set_temperature(1.5).unwrap();
        assert_eq!(
            sim.set_temperature(0.0),
            Err(IsingError::NonPositiveTemperature(0.0))
        );
        assert!(sim.set_temperature(-2.0).is_err());
        assert!(sim.set_temperature(f64::NAN).is_err());
        assert_eq!(sim.parameters().temperature, 1.5);

        sim.set_external_field(-0.4).unwrap();
        assert!(sim.set_external_field(f64::NAN).is_err());
        assert_eq!(sim.parameters().external_field, -0.4);

        assert!(sim.set_interval(Duration::ZERO).is_err());
        sim.set_interval(Duration::from_millis(20)).unwrap();
        assert_eq!(sim.parameters().interval, Duration::from_millis(20));

        // Still steps with the last valid parameters.
        sim.step().unwrap();
    }

    #[test]
    fn test_set_dimension() {
        let t0 = Instant::now();
        let mut sim = SimulationController::new(params(4, 11)).unwrap();
        sim.step().unwrap();
        sim.start_at(t0);

        let before = sim.lattice().clone();
        assert_eq!(sim.set_dimension(0), Err(IsingError::InvalidDimension(0)));
        assert_eq!(sim.lattice(), &before);
        assert_eq!(sim.step_count(), 1);
        assert!(sim.is_running());

        sim.set_dimension(7).unwrap();
        assert!(!sim.is_running());
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.lattice().dimension(), 7);
        assert_eq!(sim.parameters().dimension, 7);

        sim.reset().unwrap();
        assert_eq!(sim.lattice().dimension(), 7);
    }

    #[test]
    fn test_low_temperature_reaches_ground_state() {
        // Small lattices quenched well below T_c should end up fully ordered.
        let mut ordered = 0;
        for seed in 0..20 {
            let mut p = params(4, seed);
            p.temperature = 0.5;
            let mut sim = SimulationController::new(p).unwrap();
            for _ in 0..2000 {
                sim.step().unwrap();
            }
            if sim.magnetization().abs() == 1.0 {
                ordered += 1;
            }
        }
        assert!(ordered >= 17, "only {ordered}/20 runs ordered");
    }

    #[test]
    fn test_field_biases_magnetization_sign() {
        let mut p = params(12, 12);
        p.temperature = 1.5;
        let mut sim = SimulationController::new(p).unwrap();
        sim.set_external_field(1.0).unwrap();
        for _ in 0..300 {
            sim.step().unwrap();
        }
        assert!(sim.magnetization() > 0.9);
        assert!(sim.energy() < -2.5);
    }
}
