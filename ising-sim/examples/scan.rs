use std::sync::atomic::AtomicBool;
use std::time::Instant;

use ising_sim::{run_temperature_scan, ScanConfig};

const L: usize = 32;
const N_TEMPS: usize = 16;
const N_SWEEPS: usize = 4000;
const WARMUP_SWEEPS: usize = 1000;
const T_MIN: f64 = 1.5;
const T_MAX: f64 = 3.5;

fn main() {
    let temps: Vec<f64> = (0..N_TEMPS)
        .map(|i| T_MIN + (T_MAX - T_MIN) * i as f64 / (N_TEMPS - 1) as f64)
        .collect();

    let config = ScanConfig {
        dimension: L,
        temperatures: temps,
        external_field: 0.0,
        n_sweeps: N_SWEEPS,
        warmup_sweeps: WARMUP_SWEEPS,
        autocorrelation_max_lag: Some(100),
        base_seed: 42,
        sequential: false,
    };

    println!(
        "Lattice: {}x{}  |  Temps: {}  |  Sweeps: {} ({} warmup)",
        L, L, N_TEMPS, N_SWEEPS, WARMUP_SWEEPS
    );
    println!("{}", "-".repeat(78));

    let interrupted = AtomicBool::new(false);
    let t0 = Instant::now();
    let result = match run_temperature_scan(&config, &interrupted, &|| {}) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("scan failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = t0.elapsed().as_secs_f64();

    println!(
        "{:>6}  {:>8}  {:>9}  {:>8}  {:>8}  {:>7}  {:>6}  {:>7}",
        "T", "<|m|>", "E/N", "chi", "C", "U4", "acc", "tau_m2"
    );
    let chi = result.susceptibility();
    let heat = result.specific_heat();
    let binder = result.binder_cumulant();
    for (k, p) in result.points.iter().enumerate() {
        println!(
            "{:>6.3}  {:>8.4}  {:>9.4}  {:>8.3}  {:>8.3}  {:>7.4}  {:>6.3}  {:>7.2}",
            p.temperature,
            p.abs_mag,
            p.energy,
            chi[k],
            heat[k],
            binder[k],
            p.acceptance_rate,
            p.mags2_tau.unwrap_or(f64::NAN),
        );
    }
    println!("{}", "-".repeat(78));

    let per_sweep = elapsed / N_SWEEPS as f64 * 1000.0;
    println!("Total: {:.3} s  |  {:.3} ms/sweep", elapsed, per_sweep);
}
