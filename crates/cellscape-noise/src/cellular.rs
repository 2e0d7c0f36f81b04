//! Cellular (Worley) point sampling.
//!
//! A cell is the region of the plane closest to a jittered lattice centroid.
//! [`CellSampler::sample_point`] resolves which cell owns a world position and
//! how far the position is from the nearest cell with a *different* border
//! classification, which is the quantity slopes and lakes are shaped by.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::classify::CellClassifier;
use crate::error::ParamError;
use crate::hash::{cell_value, jittered_lattice_point};

/// Value a distance accumulator holds before any candidate was seen.
///
/// Never escapes [`CellSampler::sample_point`].
pub const UNASSIGNED_DISTANCE: f32 = f32::MAX;

/// Metric used to compare a sample against cell centroids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceFunction {
    /// `|dx| + |dy| + dx² + dy²`
    Natural,
    /// `|dx| + |dy|`
    Manhattan,
    /// `dx² + dy²` (squared, the root is never needed for ordering)
    #[default]
    Euclidean,
}

impl DistanceFunction {
    const NAMES: &'static str = "natural, manhattan, euclidean";

    /// Distance of the offset `d` under this metric.
    #[inline]
    pub fn distance(self, d: Vec2) -> f32 {
        match self {
            Self::Natural => d.x.abs() + d.y.abs() + d.length_squared(),
            Self::Manhattan => d.x.abs() + d.y.abs(),
            Self::Euclidean => d.length_squared(),
        }
    }
}

/// How the nearest-centroid distance and the distance to the nearest
/// differently classified cell are combined into `distance_to_edge`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    /// The edge-cell distance as is.
    Distance2,
    /// `d0 + d_edge`
    Distance2Add,
    /// `d_edge - d0`
    #[default]
    Distance2Sub,
    /// `d0 * d_edge`
    Distance2Mul,
    /// `d0 / d_edge`
    Distance2Div,
}

impl ReturnType {
    const NAMES: &'static str =
        "distance2, distance2_add, distance2_sub, distance2_mul, distance2_div";

    /// Combine the nearest distance `d0` with the edge-cell distance.
    #[inline]
    pub fn combine(self, d0: f32, d_edge: f32) -> f32 {
        match self {
            Self::Distance2 => d_edge,
            Self::Distance2Add => d0 + d_edge,
            Self::Distance2Sub => d_edge - d0,
            Self::Distance2Mul => d0 * d_edge,
            Self::Distance2Div => {
                if d_edge > 0.0 {
                    d0 / d_edge
                } else {
                    0.0
                }
            }
        }
    }
}

/// Which classification defines a border between two cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderMode {
    /// Cells border when their coarse groupings differ.
    Grouping,
    /// Cells border when their height groups differ.
    #[default]
    HeightGroup,
}

impl BorderMode {
    const NAMES: &'static str = "grouping, height_group";
}

macro_rules! named_enum {
    ($ty:ident, $kind:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(ParamError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: Self::NAMES,
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(Self::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

named_enum!(DistanceFunction, "distance function", {
    "natural" => Natural,
    "manhattan" => Manhattan,
    "euclidean" => Euclidean,
});

named_enum!(ReturnType, "return type", {
    "distance2" => Distance2,
    "distance2_add" => Distance2Add,
    "distance2_sub" => Distance2Sub,
    "distance2_mul" => Distance2Mul,
    "distance2_div" => Distance2Div,
});

named_enum!(BorderMode, "border mode", {
    "grouping" => Grouping,
    "height_group" => HeightGroup,
});

/// Parameters of the cellular field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellularParams {
    /// World seed for cell values and jitter.
    pub seed: i32,
    /// Cells per world unit. `1 / frequency` is the mean cell spacing.
    pub frequency: f32,
    /// Centroid displacement from its lattice point, in cell units.
    pub jitter: f32,
    /// Metric for nearest-centroid search.
    pub distance_function: DistanceFunction,
    /// Combination producing `distance_to_edge`.
    pub return_type: ReturnType,
    /// Classification that defines borders.
    pub border_mode: BorderMode,
}

impl Default for CellularParams {
    fn default() -> Self {
        Self {
            seed: 5678,
            frequency: 0.03,
            jitter: 0.3,
            distance_function: DistanceFunction::Euclidean,
            return_type: ReturnType::Distance2Sub,
            border_mode: BorderMode::HeightGroup,
        }
    }
}

impl CellularParams {
    /// Check frequency and jitter.
    ///
    /// Jitter is limited to half a cell so the owning centroid always lies in
    /// the 3×3 neighbourhood that [`CellSampler::sample_point`] scans.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(ParamError::out_of_range(
                "frequency",
                format!("must be finite and positive, got {}", self.frequency),
            ));
        }
        if !(0.0..=0.5).contains(&self.jitter) {
            return Err(ParamError::out_of_range(
                "jitter",
                format!("must be in [0, 0.5], got {}", self.jitter),
            ));
        }
        Ok(())
    }
}

/// A cell as seen from a sample point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellRef {
    /// Jittered centroid in world space.
    pub position: Vec2,
    /// Integer lattice index.
    pub index: IVec2,
    /// Deterministic value in `[0, 1)`.
    pub value: f32,
}

/// Result of sampling one world position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointData {
    /// `false` only for default-constructed placeholders.
    pub is_set: bool,
    /// The sampled position.
    pub world_position: Vec2,
    /// Proximity to the nearest differently classified cell, combined through
    /// the configured [`ReturnType`]. Zero when no neighbour differs.
    pub distance_to_edge: f32,
    /// Distance to the owning centroid under the configured metric.
    pub distance: f32,
    /// Distance to the second-nearest centroid.
    pub second_distance: f32,
    /// The owning (nearest) cell.
    pub current_cell: CellRef,
    /// Nearest cell with a different border classification, or the owning
    /// cell itself when there is none.
    pub adjacent_cell: CellRef,
    /// Coarse grouping of the owning cell.
    pub grouping: i32,
}

impl PointData {
    /// Whether a differently classified neighbour was found.
    pub fn has_border(&self) -> bool {
        self.adjacent_cell.index != self.current_cell.index
    }
}

const NEIGHBOURHOOD: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Samples the cellular field. Cheap to clone; the classifier is shared.
#[derive(Clone)]
pub struct CellSampler {
    params: CellularParams,
    classifier: Arc<CellClassifier>,
}

impl CellSampler {
    /// Create a sampler over `classifier`.
    pub fn new(params: CellularParams, classifier: Arc<CellClassifier>) -> Self {
        Self { params, classifier }
    }

    /// Parameters in use.
    pub fn params(&self) -> &CellularParams {
        &self.params
    }

    /// Shared classifier.
    pub fn classifier(&self) -> &CellClassifier {
        &self.classifier
    }

    /// Deterministic value of a cell.
    #[inline]
    pub fn cell_value(&self, index: IVec2) -> f32 {
        cell_value(self.params.seed, index)
    }

    /// Jittered world-space centroid of a cell.
    #[inline]
    pub fn cell_centroid(&self, index: IVec2) -> Vec2 {
        jittered_lattice_point(self.params.seed, self.params.jitter, index) / self.params.frequency
    }

    /// Centroid, index and value of a cell.
    pub fn cell_ref(&self, index: IVec2) -> CellRef {
        CellRef {
            position: self.cell_centroid(index),
            index,
            value: self.cell_value(index),
        }
    }

    /// Border classification of a cell under the configured [`BorderMode`].
    #[inline]
    pub fn border_class(&self, index: IVec2) -> i32 {
        match self.params.border_mode {
            BorderMode::Grouping => self.classifier.grouping(index),
            BorderMode::HeightGroup => self.classifier.height_group(index),
        }
    }

    /// Index of the cell owning a world position.
    pub fn cell_at(&self, world: Vec2) -> IVec2 {
        self.nearest(self.to_frequency_space(world)).0
    }

    /// Sample the field at world position `(x, y)`.
    pub fn sample_point(&self, x: f32, y: f32) -> PointData {
        let world = Vec2::new(x, y);
        let p = self.to_frequency_space(world);
        let center = p.round().as_ivec2();

        let mut distances = [UNASSIGNED_DISTANCE; 9];
        let mut d0 = UNASSIGNED_DISTANCE;
        let mut d1 = UNASSIGNED_DISTANCE;
        let mut closest = 0;
        for (slot, offset) in NEIGHBOURHOOD.iter().enumerate() {
            let index = center + *offset;
            let d = self.distance_to(index, p);
            distances[slot] = d;
            if d < d0 {
                d1 = d0;
                d0 = d;
                closest = slot;
            } else if d < d1 {
                d1 = d;
            }
        }

        let current = center + NEIGHBOURHOOD[closest];
        let own_class = self.border_class(current);

        let mut d_edge = UNASSIGNED_DISTANCE;
        let mut edge_cell = None;
        for (slot, offset) in NEIGHBOURHOOD.iter().enumerate() {
            if slot == closest {
                continue;
            }
            let index = center + *offset;
            if distances[slot] < d_edge && self.border_class(index) != own_class {
                d_edge = distances[slot];
                edge_cell = Some(index);
            }
        }

        let (distance_to_edge, adjacent) = match edge_cell {
            Some(index) => (self.params.return_type.combine(d0, d_edge), index),
            None => (0.0, current),
        };

        PointData {
            is_set: true,
            world_position: world,
            distance_to_edge,
            distance: d0,
            second_distance: d1,
            current_cell: self.cell_ref(current),
            adjacent_cell: self.cell_ref(adjacent),
            grouping: self.classifier.grouping(current),
        }
    }

    #[inline]
    fn to_frequency_space(&self, world: Vec2) -> Vec2 {
        world * self.params.frequency
    }

    #[inline]
    fn distance_to(&self, index: IVec2, p: Vec2) -> f32 {
        let lattice = jittered_lattice_point(self.params.seed, self.params.jitter, index);
        self.params.distance_function.distance(lattice - p)
    }

    fn nearest(&self, p: Vec2) -> (IVec2, f32) {
        let center = p.round().as_ivec2();
        NEIGHBOURHOOD
            .iter()
            .map(|offset| {
                let index = center + *offset;
                (index, self.distance_to(index, p))
            })
            .fold((center, UNASSIGNED_DISTANCE), |best, candidate| {
                if candidate.1 < best.1 { candidate } else { best }
            })
    }
}
