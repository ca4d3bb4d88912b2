use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::error::{IsingError, Result};
use crate::geometry::Lattice;
use crate::mcmc::{metropolis_sweep, seeded, SweepStats};
use crate::observables::{energy_per_spin, magnetization};
use crate::statistics::{sokal_tau, AutocorrAccum, ScanResult, Statistics, TemperaturePoint};

/// Run the Monte Carlo loop (warmup + measurement) for one temperature slot.
///
/// Each sweep consists of:
/// 1. A full Metropolis pass of `N²` proposals
/// 2. Measurement of m and E (after `warmup_sweeps`)
///
/// `on_sweep` is called once per sweep (useful for progress bars).
pub fn run_temperature(
    config: &ScanConfig,
    slot: usize,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<TemperaturePoint> {
    let temperature = *config
        .temperatures
        .get(slot)
        .ok_or_else(|| IsingError::InvalidConfig(format!("no temperature slot {slot}")))?;
    let field = config.external_field;

    let mut rng = seeded(config.base_seed.wrapping_add(slot as u64));
    let mut lattice = Lattice::random(config.dimension, &mut rng)?;

    let mut mags_stat = Statistics::new(1);
    let mut abs_mags_stat = Statistics::new(1);
    let mut mags2_stat = Statistics::new(2);
    let mut mags4_stat = Statistics::new(4);
    let mut energies_stat = Statistics::new(1);
    let mut energies2_stat = Statistics::new(2);

    let n_measurement_sweeps = config.n_sweeps - config.warmup_sweeps;
    let ac_max_lag = config
        .autocorrelation_max_lag
        .map(|k| k.min(n_measurement_sweeps / 4).max(1));
    let mut m2_accum = ac_max_lag.map(AutocorrAccum::new);

    let mut totals = SweepStats::default();

    for sweep_id in 0..config.n_sweeps {
        if interrupted.load(Ordering::Relaxed) {
            return Err(IsingError::Interrupted);
        }
        on_sweep();

        let stats = metropolis_sweep(&mut lattice, temperature, field, &mut rng)?;
        totals.proposals += stats.proposals;
        totals.accepted += stats.accepted;

        if sweep_id < config.warmup_sweeps {
            continue;
        }

        let mag = magnetization(&lattice);
        let energy = energy_per_spin(&lattice, field);
        mags_stat.update(mag);
        abs_mags_stat.update(mag.abs());
        mags2_stat.update(mag);
        mags4_stat.update(mag);
        energies_stat.update(energy);
        energies2_stat.update(energy);

        if let Some(ref mut acc) = m2_accum {
            acc.push(mag * mag);
        }
    }

    let mags2_autocorrelation = m2_accum.map(|acc| acc.finish()).unwrap_or_default();
    let mags2_tau = (!mags2_autocorrelation.is_empty()).then(|| sokal_tau(&mags2_autocorrelation));

    Ok(TemperaturePoint {
        temperature,
        mag: mags_stat.average(),
        abs_mag: abs_mags_stat.average(),
        mag2: mags2_stat.average(),
        mag4: mags4_stat.average(),
        energy: energies_stat.average(),
        energy2: energies2_stat.average(),
        acceptance_rate: totals.acceptance_rate(),
        mags2_autocorrelation,
        mags2_tau,
    })
}

/// Run every temperature of `config` on its own lattice, in parallel unless
/// `config.sequential` is set.
///
/// Each lattice is updated by exactly one thread; parallelism is only across
/// temperatures. Slot `k` is seeded with `base_seed + k`, so results do not
/// depend on scheduling.
pub fn run_temperature_scan(
    config: &ScanConfig,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<ScanResult> {
    config.check()?;
    log::info!(
        "scanning {} temperatures on a {n}x{n} lattice, {} sweeps ({} warmup)",
        config.temperatures.len(),
        config.n_sweeps,
        config.warmup_sweeps,
        n = config.dimension,
    );

    let slots = 0..config.temperatures.len();
    let points: Vec<Result<TemperaturePoint>> = if config.sequential {
        slots
            .map(|slot| run_temperature(config, slot, interrupted, on_sweep))
            .collect()
    } else {
        slots
            .into_par_iter()
            .map(|slot| run_temperature(config, slot, interrupted, on_sweep))
            .collect()
    };

    let points = points.into_iter().collect::<Result<Vec<_>>>()?;
    log::info!("scan finished");
    Ok(ScanResult {
        dimension: config.dimension,
        points,
    })
}

/// Run [`run_temperature_scan`] on a worker thread while the calling thread asks
/// `should_stop` every `poll`. Once it answers true the scan is interrupted and
/// returns [`IsingError::Interrupted`].
///
/// For hosts that can only observe cancellation from one thread, e.g. pending
/// signals of an embedding interpreter.
pub fn run_temperature_scan_polled(
    config: &ScanConfig,
    on_sweep: &(dyn Fn() + Sync),
    poll: Duration,
    mut should_stop: impl FnMut() -> bool,
) -> Result<ScanResult> {
    let interrupted = AtomicBool::new(false);
    thread::scope(|s| {
        let worker = s.spawn(|| run_temperature_scan(config, &interrupted, on_sweep));
        while !worker.is_finished() {
            if !interrupted.load(Ordering::Relaxed) && should_stop() {
                log::info!("scan interrupted");
                interrupted.store(true, Ordering::Relaxed);
            }
            thread::sleep(poll);
        }
        worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}
