pub mod rng;
pub mod sweep;

pub use rng::{entropy_seed, seeded, DefaultRng, RandomSource};
pub use sweep::{accept, delta_energy, metropolis_sweep, SweepStats};
