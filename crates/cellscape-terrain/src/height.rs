//! Height synthesis: per-point elevation from discrete cell height groups,
//! with ramps on sloped boundaries and depressions in lakes.
//!
//! A point's height depends only on the point itself (its cell pair, its
//! distance to the edge, its grouping's kind), never on which region is
//! asking. Two regions that both record a border point therefore compute the
//! same height for it, which keeps the meshes seamless.

use cellscape_grid::SparseGrid;
use cellscape_noise::{CellClassifier, ParamError, PointData};
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::kind::{RegionKind, RegionKindTable};
use crate::region::Region;
use crate::slope::SlopeSelector;

/// Elevation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightParams {
    /// World height of one height group.
    pub height_multiplier: f32,
    /// Ramp length (in distance-to-edge units) for a one-level step.
    pub base_slope_length: f32,
    /// Distance to the shore before a lake starts to deepen.
    pub lake_margin: f32,
    /// Maximum lake depth below the cell's base height.
    pub lake_depth: f32,
    /// Seed of the pair noise choosing the second sloped side.
    pub slope_seed: u32,
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            height_multiplier: 4.0,
            base_slope_length: 0.35,
            lake_margin: 0.1,
            lake_depth: 3.0,
            slope_seed: 4242,
        }
    }
}

impl HeightParams {
    /// Check the parameters before building a [`HeightSynthesis`].
    pub fn validate(&self) -> Result<(), ParamError> {
        if !self.height_multiplier.is_finite() {
            return Err(ParamError::out_of_range("height_multiplier", "must be finite"));
        }
        if !(self.base_slope_length.is_finite() && self.base_slope_length > 0.0) {
            return Err(ParamError::out_of_range(
                "base_slope_length",
                format!("must be finite and positive, got {}", self.base_slope_length),
            ));
        }
        if !(self.lake_margin.is_finite() && self.lake_margin >= 0.0) {
            return Err(ParamError::out_of_range(
                "lake_margin",
                format!("must be non-negative, got {}", self.lake_margin),
            ));
        }
        if !(self.lake_depth.is_finite() && self.lake_depth >= 0.0) {
            return Err(ParamError::out_of_range(
                "lake_depth",
                format!("must be non-negative, got {}", self.lake_depth),
            ));
        }
        Ok(())
    }
}

/// Hermite interpolation of `x` between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Ramp parameter for a point `distance_to_edge` away from a sloped boundary.
///
/// Linear over the first half of the ramp, smoothstep over the second; both
/// halves meet at 0.5.
#[inline]
pub fn slope_factor(distance_to_edge: f32, slope_length: f32) -> f32 {
    let t = if distance_to_edge < slope_length * 0.5 {
        distance_to_edge / slope_length
    } else {
        smoothstep(0.0, slope_length, distance_to_edge)
    };
    t.clamp(0.0, 1.0)
}

/// Depth below the base height of a lake point.
#[inline]
pub fn lake_depression(distance_to_edge: f32, margin: f32, depth: f32) -> f32 {
    (distance_to_edge - margin).clamp(0.0, 1.0) * depth
}

/// Height of one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeightSample {
    /// World height.
    pub height: f32,
    /// The point lies on a ramp between two height groups.
    pub sloped: bool,
}

/// Computes point heights. Shareable across threads.
#[derive(Clone, Debug)]
pub struct HeightSynthesis {
    params: HeightParams,
    selector: SlopeSelector,
}

impl HeightSynthesis {
    /// Build a synthesizer; the slope selector is seeded from `params`.
    pub fn new(params: HeightParams) -> Self {
        let selector = SlopeSelector::new(params.slope_seed);
        Self { params, selector }
    }

    /// Parameters in use.
    pub fn params(&self) -> &HeightParams {
        &self.params
    }

    /// Sloped-side selector in use.
    pub fn selector(&self) -> &SlopeSelector {
        &self.selector
    }

    /// Flat height of a cell: its height group times the multiplier.
    pub fn base_height(&self, classifier: &CellClassifier, index: IVec2) -> f32 {
        classifier.height_group(index) as f32 * self.params.height_multiplier
    }

    /// Height of a single sampled point whose grouping has kind `kind`.
    pub fn point_height(
        &self,
        classifier: &CellClassifier,
        point: &PointData,
        kind: &RegionKind,
    ) -> HeightSample {
        let current = &point.current_cell;
        let own_group = classifier.height_group(current.index);
        let base = own_group as f32 * self.params.height_multiplier;
        let flat = HeightSample {
            height: base,
            sloped: false,
        };

        if kind.lake {
            let depth = lake_depression(
                point.distance_to_edge,
                self.params.lake_margin,
                self.params.lake_depth,
            );
            return HeightSample {
                height: base - depth,
                sloped: false,
            };
        }

        if !point.has_border() {
            return flat;
        }
        let adjacent = &point.adjacent_cell;
        let adjacent_group = classifier.height_group(adjacent.index);
        if adjacent_group == own_group || !self.selector.is_sloped(current, adjacent) {
            return flat;
        }

        let adjacent_base = adjacent_group as f32 * self.params.height_multiplier;
        let mid = (base + adjacent_base) * 0.5;
        let steps = ((own_group - adjacent_group).abs() as f32)
            .clamp(1.0, classifier.level_count() as f32);
        let slope_length = self.params.base_slope_length * steps;
        let t = slope_factor(point.distance_to_edge, slope_length);

        HeightSample {
            height: mid + (base - mid) * t,
            sloped: true,
        }
    }

    /// Heights for every recorded point of `region`.
    pub fn synthesize(
        &self,
        classifier: &CellClassifier,
        region: &Region,
        kinds: &RegionKindTable,
    ) -> HeightField {
        HeightField::from_points(&region.points, |point| {
            self.point_height(classifier, point, kinds.for_grouping(point.grouping))
        })
    }
}

/// Heights index-aligned 1:1 with a region's point grid.
#[derive(Clone, Debug)]
pub struct HeightField {
    heights: Vec<f32>,
    sloped: Vec<bool>,
    present: Vec<bool>,
    root: Vec2,
    width: usize,
    item_world_size: f32,
}

impl HeightField {
    /// Evaluate `sample` for every recorded point of a point grid.
    pub fn from_points(
        points: &SparseGrid<PointData>,
        mut sample: impl FnMut(&PointData) -> HeightSample,
    ) -> Self {
        let capacity = points.capacity();
        let mut heights = vec![0.0; capacity];
        let mut sloped = vec![false; capacity];
        let mut present = vec![false; capacity];

        for flat in 0..capacity {
            let Some(point) = points.get_flat(flat) else {
                continue;
            };
            let HeightSample {
                height,
                sloped: on_slope,
            } = sample(point);
            heights[flat] = height;
            sloped[flat] = on_slope;
            present[flat] = true;
        }

        Self {
            heights,
            sloped,
            present,
            root: points.root(),
            width: points.width(),
            item_world_size: points.item_world_size(),
        }
    }

    /// Grid width (same as the point grid's).
    pub fn width(&self) -> usize {
        self.width
    }

    /// World position of index `(0, 0)`.
    pub fn root(&self) -> Vec2 {
        self.root
    }

    /// Raw heights; entries for unset points are meaningless.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Height at a world position, or `None` where no point was recorded.
    pub fn height_at(&self, world: Vec2) -> Option<f32> {
        let index = ((world - self.root) / self.item_world_size)
            .round()
            .as_ivec2();
        self.get_index(index)
    }

    /// Height at a grid index.
    pub fn get_index(&self, index: IVec2) -> Option<f32> {
        self.flat(index).and_then(|flat| self.get_flat(flat))
    }

    /// Height at a flat index.
    pub fn get_flat(&self, flat: usize) -> Option<f32> {
        match self.present.get(flat) {
            Some(true) => Some(self.heights[flat]),
            _ => None,
        }
    }

    /// Whether the point at a grid index lies on a ramp.
    pub fn is_sloped_index(&self, index: IVec2) -> bool {
        self.flat(index).is_some_and(|flat| self.sloped[flat])
    }

    /// Lowest and highest recorded height.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.heights
            .iter()
            .zip(&self.present)
            .filter(|(_, set)| **set)
            .map(|(h, _)| *h)
            .fold(None, |acc, h| match acc {
                None => Some((h, h)),
                Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
            })
    }

    fn flat(&self, index: IVec2) -> Option<usize> {
        let width = self.width as i32;
        (index.x >= 0 && index.y >= 0 && index.x < width && index.y < width)
            .then(|| index.y as usize * self.width + index.x as usize)
    }
}
