//! Small-scale fields shared by the unit tests.
//!
//! Cells are four units across and groupings change almost every cell, so
//! regions stay a few hundred points large.

use std::sync::Arc;

use cellscape_noise::{
    CellClassifier, CellSampler, CellularParams, ClassifierParams, FractalParams, FractalType,
};

pub(crate) fn small_classifier_params() -> ClassifierParams {
    ClassifierParams {
        grouping: FractalParams {
            seed: 21,
            frequency: 0.9,
            octaves: 1,
            fractal_type: FractalType::None,
            ..Default::default()
        },
        grouping_count: 6,
        height: FractalParams {
            seed: 8,
            frequency: 0.4,
            octaves: 2,
            fractal_type: FractalType::Fbm,
            ..Default::default()
        },
        level_count: 4,
        memoize: true,
    }
}

pub(crate) fn small_cellular_params() -> CellularParams {
    CellularParams {
        frequency: 0.25,
        ..Default::default()
    }
}

pub(crate) fn small_sampler() -> CellSampler {
    CellSampler::new(
        small_cellular_params(),
        Arc::new(CellClassifier::new(small_classifier_params())),
    )
}
