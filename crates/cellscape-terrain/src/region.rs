//! Region discovery: bounded breadth-first flood fill over unit-spaced points.
//!
//! Starting at the seed cell's centroid, the fill records every point whose
//! grouping matches the seed's, plus a single ring of foreign points around
//! them. The ring is what later lets height synthesis and meshing see across
//! the boundary without walking into neighbouring regions.

use std::collections::VecDeque;

use cellscape_grid::SparseGrid;
use cellscape_noise::{CellSampler, ParamError, PointData};
use glam::{IVec2, Vec2};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::kind::{RegionKind, RegionKindTable};

/// World distance between neighbouring sample points.
pub const SAMPLE_SPACING: f32 = 1.0;

const NEIGHBOURS: [Vec2; 8] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(0.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// Flood fill limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryParams {
    /// Width of the point grid before any growth.
    pub initial_grid_width: usize,
    /// Hard cap on recorded points per region.
    pub max_points: usize,
}

impl Default for DiscoveryParams {
    fn default() -> Self {
        Self {
            initial_grid_width: 65,
            max_points: 1 << 20,
        }
    }
}

impl DiscoveryParams {
    /// Check the limits before running a fill.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.initial_grid_width == 0 {
            return Err(ParamError::out_of_range("initial_grid_width", "must be at least 1"));
        }
        if self.max_points == 0 {
            return Err(ParamError::out_of_range("max_points", "must be at least 1"));
        }
        Ok(())
    }
}

/// A cell discovered by a flood fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellData {
    /// Lattice index.
    pub index: IVec2,
    /// Deterministic value in `[0, 1)`.
    pub value: f32,
    /// Jittered world-space centroid.
    pub position: Vec2,
    /// Whether a flood fill reached this cell.
    pub discovered: bool,
}

impl CellData {
    /// Describe a cell without marking it discovered.
    pub fn new(sampler: &CellSampler, index: IVec2) -> Self {
        Self {
            index,
            value: sampler.cell_value(index),
            position: sampler.cell_centroid(index),
            discovered: false,
        }
    }
}

/// Output of one discovery pass.
#[derive(Clone, Debug)]
pub struct Region {
    /// Cell the fill started from.
    pub seed: IVec2,
    /// Grouping shared by every sector cell.
    pub grouping: i32,
    /// Kind looked up for the grouping.
    pub kind: RegionKind,
    /// Sampled points, including the one-point foreign border ring.
    pub points: SparseGrid<PointData>,
    /// Cells of the seed's grouping, sorted by value, without duplicates.
    pub sector_cells: Vec<CellData>,
    /// Foreign cells touched by the border ring, sorted by value, without duplicates.
    pub adjacent_cells: Vec<CellData>,
    /// Set when the fill stopped at [`DiscoveryParams::max_points`].
    pub truncated: bool,
}

/// What the integration layer needs to know about a region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionMetadata {
    /// Cell the fill started from.
    pub seed: IVec2,
    /// Grouping of the region.
    pub grouping: i32,
    /// World position of point-grid index `(0, 0)`.
    pub root: Vec2,
    /// Point-grid width.
    pub width: usize,
    /// Cells of the region's grouping.
    pub sector_cells: Vec<CellData>,
    /// Bordering foreign cells.
    pub adjacent_cells: Vec<CellData>,
}

impl Region {
    /// Summarize the region for the integration layer.
    pub fn metadata(&self) -> RegionMetadata {
        RegionMetadata {
            seed: self.seed,
            grouping: self.grouping,
            root: self.points.root(),
            width: self.points.width(),
            sector_cells: self.sector_cells.clone(),
            adjacent_cells: self.adjacent_cells.clone(),
        }
    }

    /// Lowest-valued sector cell. Every seed inside an untruncated region
    /// yields the same cell, so it identifies the region.
    pub fn canonical_cell(&self) -> IVec2 {
        self.sector_cells.first().map_or(self.seed, |c| c.index)
    }

    /// Sampled point at a world position, if recorded.
    pub fn point(&self, world: Vec2) -> Option<&PointData> {
        self.points.get(world)
    }

    /// Whether a world position belongs to the region proper (not the border ring).
    pub fn owns(&self, world: Vec2) -> bool {
        self.point(world).is_some_and(|p| p.grouping == self.grouping)
    }
}

/// Sort by value and drop consecutive duplicates.
fn sort_dedup(cells: &mut Vec<CellData>) {
    cells.sort_by(|a, b| {
        a.value
            .total_cmp(&b.value)
            .then(a.index.x.cmp(&b.index.x))
            .then(a.index.y.cmp(&b.index.y))
    });
    cells.dedup_by_key(|c| c.index);
}

/// Flood-fill the region containing `seed`.
///
/// Iterative; memory is bounded by the region's area plus its perimeter.
pub fn discover_region(
    sampler: &CellSampler,
    seed: IVec2,
    params: &DiscoveryParams,
    kinds: &RegionKindTable,
) -> Region {
    let seed_grouping = sampler.classifier().grouping(seed);
    let start = sampler.cell_centroid(seed).round();

    let mut points = SparseGrid::new(start, params.initial_grid_width, SAMPLE_SPACING);
    // Foreign samples rejected from a foreign point; a later in-grouping
    // neighbour may still accept them.
    let mut rejected: FxHashMap<IVec2, PointData> = FxHashMap::default();
    let mut queue = VecDeque::new();
    let mut truncated = false;

    let first = sampler.sample_point(start.x, start.y);
    points.set(first, start);
    queue.push_back((start, first.grouping));

    'fill: while let Some((position, grouping)) = queue.pop_front() {
        let inside = grouping == seed_grouping;
        for offset in NEIGHBOURS {
            let next = position + offset * SAMPLE_SPACING;
            if points.is_set(next) {
                continue;
            }
            let key = next.as_ivec2();
            let sample = match rejected.get(&key) {
                Some(sample) => *sample,
                None => sampler.sample_point(next.x, next.y),
            };
            if !inside && sample.grouping != seed_grouping {
                rejected.insert(key, sample);
                continue;
            }
            if points.len() >= params.max_points {
                truncated = true;
                break 'fill;
            }
            rejected.remove(&key);
            points.set(sample, next);
            queue.push_back((next, sample.grouping));
        }
    }

    if truncated {
        tracing::warn!(
            seed = %seed,
            max_points = params.max_points,
            "region discovery hit the point cap"
        );
    }

    let mut sector_cells = Vec::new();
    let mut adjacent_cells = Vec::new();
    for (_, point) in points.iter() {
        let cell = CellData {
            discovered: true,
            ..CellData::new(sampler, point.current_cell.index)
        };
        if point.grouping == seed_grouping {
            sector_cells.push(cell);
        } else {
            adjacent_cells.push(cell);
        }
    }
    sort_dedup(&mut sector_cells);
    sort_dedup(&mut adjacent_cells);

    tracing::debug!(
        seed = %seed,
        grouping = seed_grouping,
        kind = %kinds.for_grouping(seed_grouping).name,
        points = points.len(),
        width = points.width(),
        sector_cells = sector_cells.len(),
        adjacent_cells = adjacent_cells.len(),
        "region discovered"
    );

    Region {
        seed,
        grouping: seed_grouping,
        kind: kinds.for_grouping(seed_grouping).clone(),
        points,
        sector_cells,
        adjacent_cells,
        truncated,
    }
}
