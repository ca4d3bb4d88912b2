use super::rng::RandomSource;
use crate::config::{check_field, check_temperature};
use crate::error::Result;
use crate::geometry::Lattice;

/// Proposal and acceptance counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub proposals: usize,
    pub accepted: usize,
}

impl SweepStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposals == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposals as f64
    }
}

/// Energy change of flipping spin `spin` with neighbor sum `neighbor_sum` in field `field`.
///
/// `ΔE = 2 s (Σ + H)` with J = 1.
#[inline]
pub fn delta_energy(spin: i8, neighbor_sum: i32, field: f64) -> f64 {
    2.0 * spin as f64 * (neighbor_sum as f64 + field)
}

/// Metropolis acceptance: always for `ΔE <= 0`, else with probability `exp(-ΔE / T)`.
///
/// Draws from `rng` only when `ΔE > 0`.
#[inline]
pub fn accept<R: RandomSource + ?Sized>(delta_e: f64, temperature: f64, rng: &mut R) -> bool {
    delta_e <= 0.0 || rng.uniform() < (-delta_e / temperature).exp()
}

/// One Metropolis sweep: `N * N` single-spin-flip proposals at uniformly random sites.
///
/// Sites are drawn independently (row index, then column index), so a site can be
/// proposed several times or not at all. Each proposal sees the lattice as left by
/// the previous one. Parameters are checked before any spin is touched.
#[cfg_attr(feature = "profile", inline(never))]
pub fn metropolis_sweep<R: RandomSource + ?Sized>(
    lattice: &mut Lattice,
    temperature: f64,
    field: f64,
    rng: &mut R,
) -> Result<SweepStats> {
    check_temperature(temperature)?;
    check_field(field)?;

    let n = lattice.dimension();
    let n_proposals = lattice.n_spins();
    let mut accepted = 0usize;

    for _ in 0..n_proposals {
        let i = rng.index(n);
        let j = rng.index(n);
        let site = i * n + j;

        let spin = lattice.spin_at(site);
        let eng_change = delta_energy(spin, lattice.local_field(site), field);
        if accept(eng_change, temperature, rng) {
            lattice.flip(site);
            accepted += 1;
        }
    }

    Ok(SweepStats {
        proposals: n_proposals,
        accepted,
    })
}
