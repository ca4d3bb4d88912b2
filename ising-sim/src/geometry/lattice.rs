use super::offsets::{square, Direction, N_NEIGHBORS};
use crate::error::{IsingError, Result};
use crate::mcmc::RandomSource;

/// Largest supported side length; `n * n` site indices must fit in a `u32`.
pub const MAX_DIMENSION: usize = 65_535;

/// Validate a side length coming from an untyped source (CLI, Python).
pub fn checked_dimension(n: i64) -> Result<usize> {
    if n < 1 || n > MAX_DIMENSION as i64 {
        return Err(IsingError::InvalidDimension(n));
    }
    Ok(n as usize)
}

/// Square `n x n` lattice of ±1 spins on a torus, with a precomputed neighbor table.
///
/// Sites are indexed in row-major order, `site = i * n + j`. The neighbor table
/// has length `n * n * 4`; element `site * 4 + d` is the neighbor of `site` in
/// [`Direction`] `d`. Wraparound uses the literal modulo rule, so for `n = 2` the
/// north and south neighbors (and west and east) are the same site, and for
/// `n = 1` every neighbor is the site itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    n: usize,
    spins: Vec<i8>,
    neighbors: Vec<u32>,
}

impl Lattice {
    /// Lattice with each spin independently +1 or -1 with probability 1/2.
    ///
    /// Consumes exactly `n * n` uniform draws, in row-major order.
    pub fn random<R: RandomSource + ?Sized>(n: usize, rng: &mut R) -> Result<Self> {
        check_dimension(n)?;
        let spins = (0..n * n)
            .map(|_| if rng.uniform() < 0.5 { 1 } else { -1 })
            .collect();
        Ok(Self::with_spins(n, spins))
    }

    /// Lattice with every spin set to `spin`.
    pub fn uniform(n: usize, spin: i8) -> Result<Self> {
        check_dimension(n)?;
        check_spin(spin)?;
        Ok(Self::with_spins(n, vec![spin; n * n]))
    }

    /// Lattice from a row-major spin vector of length `n * n`.
    pub fn from_spins(n: usize, spins: Vec<i8>) -> Result<Self> {
        check_dimension(n)?;
        if spins.len() != n * n {
            return Err(IsingError::SpinCountMismatch {
                expected: n * n,
                actual: spins.len(),
            });
        }
        if let Some(&bad) = spins.iter().find(|&&s| s != 1 && s != -1) {
            return Err(IsingError::InvalidSpin(bad));
        }
        Ok(Self::with_spins(n, spins))
    }

    fn with_spins(n: usize, spins: Vec<i8>) -> Self {
        let offsets = square();
        let mut neighbors = vec![0u32; n * n * N_NEIGHBORS];

        for site in 0..n * n {
            let (i, j) = ((site / n) as isize, (site % n) as isize);
            for (d, &(di, dj)) in offsets.iter().enumerate() {
                let ni = (i + di).rem_euclid(n as isize) as usize;
                let nj = (j + dj).rem_euclid(n as isize) as usize;
                neighbors[site * N_NEIGHBORS + d] = (ni * n + nj) as u32;
            }
        }

        Self {
            n,
            spins,
            neighbors,
        }
    }

    /// Side length `N`.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Total number of sites, `N * N`.
    pub fn n_spins(&self) -> usize {
        self.spins.len()
    }

    /// Row-major view of all spins.
    pub fn spins(&self) -> &[i8] {
        &self.spins
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[i8]> + '_ {
        self.spins.chunks(self.n)
    }

    /// Flat index of `(i, j)`, rejecting out-of-range coordinates.
    pub fn site(&self, i: usize, j: usize) -> Result<usize> {
        if i >= self.n || j >= self.n {
            return Err(IsingError::IndexOutOfRange { i, j, n: self.n });
        }
        Ok(i * self.n + j)
    }

    pub fn get(&self, i: usize, j: usize) -> Result<i8> {
        Ok(self.spins[self.site(i, j)?])
    }

    pub fn set(&mut self, i: usize, j: usize, spin: i8) -> Result<()> {
        check_spin(spin)?;
        let site = self.site(i, j)?;
        self.spins[site] = spin;
        Ok(())
    }

    /// Neighbor of `site` in direction `dir`, with periodic wraparound.
    #[inline]
    pub fn neighbor(&self, site: usize, dir: Direction) -> usize {
        self.neighbors[site * N_NEIGHBORS + dir as usize] as usize
    }

    /// Sum of the four periodic nearest-neighbor spins of `(i, j)`.
    pub fn neighbor_sum(&self, i: usize, j: usize) -> Result<i32> {
        Ok(self.local_field(self.site(i, j)?))
    }

    #[inline]
    pub(crate) fn local_field(&self, site: usize) -> i32 {
        let base = site * N_NEIGHBORS;
        self.neighbors[base..base + N_NEIGHBORS]
            .iter()
            .map(|&nb| self.spins[nb as usize] as i32)
            .sum()
    }

    #[inline]
    pub(crate) fn spin_at(&self, site: usize) -> i8 {
        debug_assert!(site < self.spins.len(), "site {site} out of range");
        self.spins[site]
    }

    #[inline]
    pub(crate) fn flip(&mut self, site: usize) {
        debug_assert!(site < self.spins.len(), "site {site} out of range");
        self.spins[site] = -self.spins[site];
    }
}

pub(crate) fn check_dimension(n: usize) -> Result<()> {
    if n == 0 || n > MAX_DIMENSION {
        return Err(IsingError::InvalidDimension(
            i64::try_from(n).unwrap_or(i64::MAX),
        ));
    }
    Ok(())
}

fn check_spin(spin: i8) -> Result<()> {
    if spin != 1 && spin != -1 {
        return Err(IsingError::InvalidSpin(spin));
    }
    Ok(())
}
