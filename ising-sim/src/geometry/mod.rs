pub mod lattice;
pub mod offsets;

pub use lattice::{checked_dimension, Lattice, MAX_DIMENSION};
pub use offsets::{square, Direction, N_NEIGHBORS};
