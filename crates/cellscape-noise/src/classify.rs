//! Coarse per-cell classification: grouping (biome-like merge key) and
//! height group (discrete elevation level).
//!
//! Both come from low-frequency fractal noise evaluated over the integer cell
//! index, so many neighbouring cells share a classification.
//!
//! A grouping is the *dominant* one of `grouping_count` independent noise
//! fields: each grouping covers the same share of the plane, and no grouping
//! forms an unbounded connected area.

use dashmap::DashMap;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::ParamError;
use crate::fractal::{FractalNoise, FractalParams, FractalType};

/// Configuration for [`CellClassifier`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Noise used for the grouping, sampled at the raw cell index. Grouping
    /// `i` uses these parameters with the seed offset by `i`.
    pub grouping: FractalParams,
    /// Number of distinct groupings.
    pub grouping_count: i32,
    /// Noise used for the height group. Sampled at the raw cell index.
    pub height: FractalParams,
    /// Highest height group; groups range over `0..=level_count`.
    pub level_count: i32,
    /// Memoize classifications in a concurrent map.
    pub memoize: bool,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            grouping: FractalParams {
                seed: 1337,
                frequency: 0.17,
                octaves: 2,
                fractal_type: FractalType::Fbm,
                ..Default::default()
            },
            grouping_count: 4,
            height: FractalParams {
                seed: 9001,
                frequency: 0.23,
                octaves: 3,
                fractal_type: FractalType::Fbm,
                ..Default::default()
            },
            level_count: 6,
            memoize: true,
        }
    }
}

impl ClassifierParams {
    /// Check both noise fields and the level/grouping counts.
    pub fn validate(&self) -> Result<(), ParamError> {
        self.grouping.validate()?;
        self.height.validate()?;
        if self.grouping_count < 1 {
            return Err(ParamError::out_of_range(
                "grouping_count",
                format!("must be at least 1, got {}", self.grouping_count),
            ));
        }
        if self.level_count < 1 {
            return Err(ParamError::out_of_range(
                "level_count",
                format!("must be at least 1, got {}", self.level_count),
            ));
        }
        Ok(())
    }
}

/// Classification of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Classification {
    /// Coarse grouping in `0..grouping_count`.
    pub grouping: i32,
    /// Discrete height level in `0..=level_count`.
    pub height_group: i32,
}

/// Seed distance between successive grouping fields. Larger than any octave
/// count so no two fields share a Perlin generator.
const GROUPING_SEED_STRIDE: u32 = 0x9E37;

/// Round a `[0, 1]` noise value to one of `0..=level_count` levels.
#[inline]
pub fn discretize(n01: f64, level_count: i32) -> i32 {
    ((n01 * level_count as f64).round() as i32).clamp(0, level_count)
}

/// Classifies cell indices. Safe to share between threads.
///
/// With memoization on, every classified cell stays cached for the lifetime
/// of the classifier. Long-running callers that wander across the plane
/// should call [`CellClassifier::clear_cache`] between runs.
pub struct CellClassifier {
    grouping_noise: Vec<FractalNoise>,
    height_noise: FractalNoise,
    grouping_count: i32,
    level_count: i32,
    cache: Option<DashMap<IVec2, Classification>>,
}

impl CellClassifier {
    /// Create a classifier. The memo cache starts empty.
    pub fn new(params: ClassifierParams) -> Self {
        let grouping_count = params.grouping_count.max(1);
        let grouping_noise = (0..grouping_count as u32)
            .map(|i| {
                FractalNoise::new(FractalParams {
                    seed: params
                        .grouping
                        .seed
                        .wrapping_add(i.wrapping_mul(GROUPING_SEED_STRIDE)),
                    ..params.grouping.clone()
                })
            })
            .collect();
        Self {
            grouping_noise,
            height_noise: FractalNoise::new(params.height),
            grouping_count,
            level_count: params.level_count.max(1),
            cache: params.memoize.then(DashMap::new),
        }
    }

    /// Classify a cell, consulting the memo cache when enabled.
    pub fn classify(&self, index: IVec2) -> Classification {
        let Some(cache) = &self.cache else {
            return self.compute(index);
        };
        if let Some(hit) = cache.get(&index) {
            return *hit;
        }
        let classification = self.compute(index);
        cache.insert(index, classification);
        classification
    }

    /// Coarse grouping of a cell.
    #[inline]
    pub fn grouping(&self, index: IVec2) -> i32 {
        self.classify(index).grouping
    }

    /// Discrete height level of a cell.
    #[inline]
    pub fn height_group(&self, index: IVec2) -> i32 {
        self.classify(index).height_group
    }

    /// Number of distinct groupings.
    pub fn grouping_count(&self) -> i32 {
        self.grouping_count
    }

    /// Highest height group.
    pub fn level_count(&self) -> i32 {
        self.level_count
    }

    /// Number of memoized classifications (0 when memoization is off).
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, DashMap::len)
    }

    /// Drop every memoized classification.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Index of the strongest grouping field; ties go to the lowest index.
    fn dominant_grouping(&self, index: IVec2) -> i32 {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, noise) in self.grouping_noise.iter().enumerate() {
            let value = noise.sample_index01(index);
            if value > best_value {
                best = i as i32;
                best_value = value;
            }
        }
        best
    }

    fn compute(&self, index: IVec2) -> Classification {
        let grouping = self.dominant_grouping(index);
        let height_group = discretize(self.height_noise.sample_index01(index), self.level_count);
        Classification {
            grouping,
            height_group,
        }
    }
}
