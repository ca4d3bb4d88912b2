/// Number of nearest neighbors on the square lattice.
pub const N_NEIGHBORS: usize = 4;

/// Nearest-neighbor directions on the square torus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North = 0,
    South = 1,
    West = 2,
    East = 3,
}

impl Direction {
    pub const ALL: [Direction; N_NEIGHBORS] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Directions that enumerate every bond exactly once when walked from each site.
    pub const FORWARD: [Direction; 2] = [Direction::South, Direction::East];
}

/// Square-lattice neighbor offsets as `(row, column)` displacements.
///
/// Ordered like [`Direction::ALL`]: `[[-1,0], [1,0], [0,-1], [0,1]]`.
pub fn square() -> [(isize, isize); N_NEIGHBORS] {
    [(-1, 0), (1, 0), (0, -1), (0, 1)]
}
