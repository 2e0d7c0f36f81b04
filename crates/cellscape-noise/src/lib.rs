//! Deterministic noise fields: lattice hashing, cellular (Worley) sampling,
//! fractal gradient noise, and coarse per-cell classification.

mod cellular;
mod classify;
mod error;
mod fractal;
mod hash;

pub use cellular::{
    BorderMode, CellRef, CellSampler, CellularParams, DistanceFunction, PointData, ReturnType,
    UNASSIGNED_DISTANCE,
};
pub use classify::{CellClassifier, Classification, ClassifierParams, discretize};
pub use error::ParamError;
pub use fractal::{FractalNoise, FractalParams, FractalType, fractal_bounding};
pub use hash::{cell_unit_vector, cell_value, hash2, jittered_lattice_point};
