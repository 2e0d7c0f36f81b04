//! Growable, re-centering 2D storage addressed by world position.

mod sparse_grid;

pub use sparse_grid::{DEFAULT_GROWTH_PADDING, SparseGrid};
