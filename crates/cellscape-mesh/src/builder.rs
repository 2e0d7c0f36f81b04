//! Triangulation of a region's height field.
//!
//! Every 2×2 block of recorded points is a quad candidate. Neighbouring
//! regions record each other's border points, so most boundary blocks are
//! seen by two regions; a block is emitted only by the region owning its
//! lowest-valued corner.

use std::cmp::Ordering;

use cellscape_noise::{ParamError, PointData};
use cellscape_terrain::{HeightField, Region};
use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::buffers::{Color, MeshBuffers};

/// Grid offsets of a block's corners, counter-clockwise seen from below.
const CORNERS: [IVec2; 4] = [
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
];

/// Colouring and water parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Faces whose corner heights differ by more than this are drawn as rock.
    pub cliff_threshold: f32,
    /// How much a face darkens at full distance from the cell edge.
    pub edge_darkening: f32,
    /// Depth of the water plane below the seed cell's base height.
    pub water_offset: f32,
    pub grass_color: Color,
    pub rock_color: Color,
    pub water_color: Color,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            cliff_threshold: 2.0,
            edge_darkening: 0.35,
            water_offset: 1.0,
            grass_color: [0.30, 0.62, 0.22, 1.0],
            rock_color: [0.52, 0.52, 0.50, 1.0],
            water_color: [0.16, 0.38, 0.72, 0.65],
        }
    }
}

impl MeshParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.cliff_threshold.is_finite() && self.cliff_threshold >= 0.0) {
            return Err(ParamError::out_of_range(
                "cliff_threshold",
                format!("must be non-negative, got {}", self.cliff_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.edge_darkening) {
            return Err(ParamError::out_of_range(
                "edge_darkening",
                format!("must be in [0, 1], got {}", self.edge_darkening),
            ));
        }
        if !self.water_offset.is_finite() {
            return Err(ParamError::out_of_range("water_offset", "must be finite"));
        }
        Ok(())
    }
}

/// One recorded corner of a quad candidate.
#[derive(Clone, Copy)]
struct Corner<'a> {
    point: &'a PointData,
    position: Vec3,
    sloped: bool,
}

impl Corner<'_> {
    fn order(&self, other: &Self) -> Ordering {
        let a = &self.point.current_cell;
        let b = &other.point.current_cell;
        a.value
            .total_cmp(&b.value)
            .then(a.index.x.cmp(&b.index.x))
            .then(a.index.y.cmp(&b.index.y))
    }
}

/// Builds terrain and water meshes for discovered regions.
#[derive(Clone, Debug, Default)]
pub struct MeshBuilder {
    params: MeshParams,
}

impl MeshBuilder {
    pub fn new(params: MeshParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MeshParams {
        &self.params
    }

    fn corner<'a>(
        &self,
        region: &'a Region,
        heights: &HeightField,
        index: IVec2,
    ) -> Option<Corner<'a>> {
        let point = region.points.get_index(index)?;
        let height = heights.get_index(index)?;
        let world = region.points.world_position_of(index);
        Some(Corner {
            point,
            position: Vec3::new(world.x, height, world.y),
            sloped: heights.is_sloped_index(index),
        })
    }

    /// Whether the region owns a block: its lowest-valued corner must be one
    /// of the region's own points.
    fn owns(region: &Region, corners: &[Corner<'_>]) -> bool {
        corners
            .iter()
            .min_by(|a, b| a.order(b))
            .is_some_and(|lowest| lowest.point.grouping == region.grouping)
    }

    fn face_color(&self, region: &Region, corners: &[Corner<'_>]) -> Color {
        let p = &self.params;
        let (lo, hi) = corners.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.position.y), hi.max(c.position.y))
        });
        let mut color = if region.kind.rocky || hi - lo > p.cliff_threshold {
            p.rock_color
        } else {
            p.grass_color
        };

        let mean_edge = corners
            .iter()
            .map(|c| c.point.distance_to_edge)
            .sum::<f32>()
            / corners.len() as f32;
        let shade = 1.0 - mean_edge.clamp(0.0, 1.0) * p.edge_darkening;
        for channel in &mut color[..3] {
            *channel *= shade;
        }
        color
    }

    /// Triangulate the blocks this region owns.
    pub fn build_terrain(&self, region: &Region, heights: &HeightField) -> MeshBuffers {
        debug_assert_eq!(heights.width(), region.points.width());
        let mut mesh = MeshBuffers::new();
        let width = region.points.width() as i32;
        let mut present: Vec<Corner<'_>> = Vec::with_capacity(4);

        for y in 0..width - 1 {
            for x in 0..width - 1 {
                let origin = IVec2::new(x, y);
                let corners = CORNERS.map(|offset| self.corner(region, heights, origin + offset));
                present.clear();
                present.extend(corners.iter().flatten().copied());
                if present.len() < 3 || !Self::owns(region, &present) {
                    continue;
                }
                let color = self.face_color(region, &present);

                match corners {
                    [Some(c0), Some(c1), Some(c2), Some(c3)] => {
                        let [p0, p1, p2, p3] = [c0, c1, c2, c3].map(|c| c.position);
                        if present.iter().any(|c| c.sloped) {
                            mesh.push_quad([p0, p1, p2, p3], color);
                        } else {
                            // Split along the diagonal whose corners sum lower.
                            let split_02 = p0.y + p2.y <= p1.y + p3.y;
                            mesh.push_split_quad([p0, p1, p2, p3], split_02, color);
                        }
                    }
                    _ => {
                        // Three corners, kept in grid order; reversed to face up.
                        mesh.push_triangle(
                            [present[0].position, present[2].position, present[1].position],
                            color,
                        );
                    }
                }
            }
        }

        tracing::debug!(
            seed = %region.seed,
            quads = mesh.quad_count,
            triangles = mesh.lone_triangle_count,
            vertices = mesh.vertices.len(),
            "terrain mesh built"
        );
        mesh
    }

    /// Flat water plane over the region, or `None` when its kind has no water.
    ///
    /// One quad per fully recorded block, border ring included, at
    /// `seed_base_height - water_offset`. Ownership does not apply.
    pub fn build_water(&self, region: &Region, seed_base_height: f32) -> Option<MeshBuffers> {
        if !region.kind.requires_water {
            return None;
        }
        let level = seed_base_height - self.params.water_offset;
        let width = region.points.width() as i32;
        let mut mesh = MeshBuffers::new();

        for y in 0..width - 1 {
            for x in 0..width - 1 {
                let origin = IVec2::new(x, y);
                if !CORNERS
                    .iter()
                    .all(|offset| region.points.is_set_index(origin + *offset))
                {
                    continue;
                }
                let corners = CORNERS.map(|offset| {
                    let world = region.points.world_position_of(origin + offset);
                    Vec3::new(world.x, level, world.y)
                });
                mesh.push_quad(corners, self.params.water_color);
            }
        }

        tracing::debug!(seed = %region.seed, quads = mesh.quad_count, level, "water mesh built");
        Some(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cellscape_grid::SparseGrid;
    use cellscape_noise::{
        CellClassifier, CellRef, CellSampler, CellularParams, ClassifierParams, FractalParams,
        FractalType,
    };
    use cellscape_terrain::{
        DiscoveryParams, HeightParams, HeightSample, HeightSynthesis, RegionKind,
        RegionKindTable, TerrainGenerator,
    };
    use glam::Vec2;

    fn generator() -> TerrainGenerator {
        let classifier = CellClassifier::new(ClassifierParams {
            grouping: FractalParams {
                seed: 21,
                frequency: 0.9,
                fractal_type: FractalType::None,
                ..Default::default()
            },
            grouping_count: 6,
            height: FractalParams {
                seed: 8,
                frequency: 0.4,
                octaves: 2,
                ..Default::default()
            },
            level_count: 4,
            memoize: true,
        });
        let sampler = CellSampler::new(
            CellularParams {
                frequency: 0.25,
                ..Default::default()
            },
            Arc::new(classifier),
        );
        TerrainGenerator::with_sampler(
            sampler,
            HeightParams::default(),
            DiscoveryParams::default(),
            RegionKindTable::default(),
        )
    }

    /// A square of `width²` points that all belong to one flat cell.
    fn square_region(width: usize, kind: RegionKind) -> Region {
        let cell = CellRef {
            position: Vec2::ZERO,
            index: IVec2::ZERO,
            value: 0.5,
        };
        let mut points = SparseGrid::new(Vec2::ZERO, width, 1.0);
        let half = (width / 2) as i32;
        for y in -half..=half {
            for x in -half..=half {
                let world = Vec2::new(x as f32, y as f32);
                let point = PointData {
                    is_set: true,
                    world_position: world,
                    current_cell: cell,
                    adjacent_cell: cell,
                    ..Default::default()
                };
                points.set(point, world);
            }
        }
        Region {
            seed: IVec2::ZERO,
            grouping: 0,
            kind,
            points,
            sector_cells: Vec::new(),
            adjacent_cells: Vec::new(),
            truncated: false,
        }
    }

    fn flat_heights(region: &Region) -> HeightField {
        let classifier = CellClassifier::new(ClassifierParams::default());
        HeightSynthesis::new(HeightParams::default()).synthesize(
            &classifier,
            region,
            &RegionKindTable(vec![region.kind.clone()]),
        )
    }

    /// Heights given per world position.
    fn heights_from(region: &Region, f: impl Fn(Vec2) -> HeightSample) -> HeightField {
        HeightField::from_points(&region.points, |point| f(point.world_position))
    }

    fn flat(height: f32) -> HeightSample {
        HeightSample {
            height,
            sloped: false,
        }
    }

    /// Flat-shaded triangles; every one owns its three vertices.
    fn flat_triangles(mesh: &MeshBuffers) -> Vec<[Vec3; 3]> {
        mesh.indices
            .chunks_exact(3)
            .map(|t| [0, 1, 2].map(|k| mesh.vertices[t[k] as usize]))
            .collect()
    }

    fn assert_well_formed(mesh: &MeshBuffers) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert_eq!(mesh.vertices.len(), mesh.colors.len());
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.vertices[tri[k] as usize]);
            assert!((b - a).cross(c - a).y > 0.0, "triangle faces down");
        }
    }

    #[test]
    fn test_params_validate() {
        assert!(MeshParams::default().validate().is_ok());
        let params = MeshParams {
            edge_darkening: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_full_square_emits_every_block() {
        let region = square_region(9, RegionKind::default());
        let heights = flat_heights(&region);
        let mesh = MeshBuilder::default().build_terrain(&region, &heights);
        assert_well_formed(&mesh);
        assert_eq!(mesh.quad_count, 8 * 8);
        assert_eq!(mesh.lone_triangle_count, 0);
        assert_eq!(mesh.triangle_count(), 2 * 8 * 8);
    }

    #[test]
    fn test_missing_corner_makes_single_triangle() {
        let mut region = square_region(3, RegionKind::default());
        let mut points = SparseGrid::new(Vec2::ZERO, 3, 1.0);
        for (index, point) in region.points.iter() {
            if index != IVec2::new(2, 2) {
                points.set(*point, region.points.world_position_of(index));
            }
        }
        region.points = points;
        let heights = flat_heights(&region);
        let mesh = MeshBuilder::default().build_terrain(&region, &heights);
        assert_well_formed(&mesh);
        // Three full blocks split in two, one block with three corners.
        assert_eq!(mesh.quad_count, 3);
        assert_eq!(mesh.lone_triangle_count, 1);
        assert_eq!(mesh.triangle_count(), 3 * 2 + 1);
    }

    #[test]
    fn test_sloped_corner_makes_one_four_vertex_face() {
        let region = square_region(3, RegionKind::default());
        // Only the top-right point lies on a ramp; it belongs to one block.
        let heights = heights_from(&region, |world| HeightSample {
            height: if world == Vec2::ONE { 0.5 } else { 0.0 },
            sloped: world == Vec2::ONE,
        });
        let mesh = MeshBuilder::default().build_terrain(&region, &heights);
        assert_well_formed(&mesh);
        assert_eq!(mesh.quad_count, 4);
        assert_eq!(mesh.triangle_count(), 4 * 2);
        // Three split blocks with six vertices each, one shared-vertex face.
        assert_eq!(mesh.vertices.len(), 3 * 6 + 4);
        let ramp_vertices = mesh
            .vertices
            .iter()
            .filter(|v| **v == Vec3::new(1.0, 0.5, 1.0))
            .count();
        assert_eq!(ramp_vertices, 1);
    }

    #[test]
    fn test_split_follows_lower_diagonal() {
        let region = square_region(3, RegionKind::default());
        let builder = MeshBuilder::default();
        let p1 = Vec3::new(1.0, 0.0, 0.0);
        let p3 = Vec3::new(0.0, 0.0, 1.0);
        let p0 = Vec3::ZERO;

        // A raised p2 makes the p1-p3 pair the lower one.
        let raised = heights_from(&region, |w| flat(if w == Vec2::ONE { 1.5 } else { 0.0 }));
        let mesh = builder.build_terrain(&region, &raised);
        assert_well_formed(&mesh);
        let peak = Vec3::new(1.0, 1.5, 1.0);
        let touching: Vec<_> = flat_triangles(&mesh)
            .into_iter()
            .filter(|t| t.contains(&peak))
            .collect();
        assert_eq!(touching.len(), 1);
        assert!(touching[0].contains(&p1) && touching[0].contains(&p3));

        // A sunken p2 makes the p0-p2 pair the lower one.
        let sunken = heights_from(&region, |w| flat(if w == Vec2::ONE { -1.5 } else { 0.0 }));
        let mesh = builder.build_terrain(&region, &sunken);
        assert_well_formed(&mesh);
        let pit = Vec3::new(1.0, -1.5, 1.0);
        let touching: Vec<_> = flat_triangles(&mesh)
            .into_iter()
            .filter(|t| t.contains(&pit))
            .collect();
        assert_eq!(touching.len(), 2);
        assert!(touching.iter().all(|t| t.contains(&p0)));
    }

    #[test]
    fn test_cliff_faces_are_rock() {
        let region = square_region(3, RegionKind::default());
        let builder = MeshBuilder::default();
        let jump = builder.params().cliff_threshold + 1.0;
        let heights = heights_from(&region, |w| flat(if w == Vec2::ONE { jump } else { 0.0 }));
        let mesh = builder.build_terrain(&region, &heights);
        assert_well_formed(&mesh);

        let peak = Vec3::new(1.0, jump, 1.0);
        for (tri, colors) in flat_triangles(&mesh).iter().zip(mesh.colors.chunks_exact(3)) {
            let block_has_peak = tri.iter().all(|v| v.x >= 0.0 && v.z >= 0.0);
            let expected = if block_has_peak {
                builder.params().rock_color
            } else {
                builder.params().grass_color
            };
            assert!(colors.iter().all(|c| *c == expected), "wrong colour near {peak}");
        }
    }

    #[test]
    fn test_edge_distance_darkens_faces() {
        let region = square_region(3, RegionKind::default());
        let mut points = SparseGrid::new(Vec2::ZERO, 3, 1.0);
        for (index, point) in region.points.iter() {
            let shaded = PointData {
                distance_to_edge: 0.5,
                ..*point
            };
            points.set(shaded, region.points.world_position_of(index));
        }
        let region = Region { points, ..region };
        let builder = MeshBuilder::default();
        let mesh = builder.build_terrain(&region, &heights_from(&region, |_| flat(0.0)));

        let params = builder.params();
        let shade = 1.0 - 0.5 * params.edge_darkening;
        for color in &mesh.colors {
            for channel in 0..3 {
                let expected = params.grass_color[channel] * shade;
                assert!((color[channel] - expected).abs() < 1e-6);
            }
            assert_eq!(color[3], params.grass_color[3]);
        }
    }

    #[test]
    fn test_foreign_blocks_are_skipped() {
        let mut region = square_region(5, RegionKind::default());
        region.grouping = 1;
        let heights = flat_heights(&region);
        let mesh = MeshBuilder::default().build_terrain(&region, &heights);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_rocky_kind_is_grey() {
        let kind = RegionKind {
            rocky: true,
            ..Default::default()
        };
        let region = square_region(3, kind);
        let heights = flat_heights(&region);
        let builder = MeshBuilder::default();
        let mesh = builder.build_terrain(&region, &heights);
        // Distance to edge is zero everywhere, so nothing is darkened.
        assert!(mesh.colors.iter().all(|c| *c == builder.params().rock_color));
    }

    #[test]
    fn test_water_plane() {
        let lake = RegionKind {
            lake: true,
            requires_water: true,
            ..Default::default()
        };
        let region = square_region(5, lake);
        let builder = MeshBuilder::default();
        let water = builder.build_water(&region, 8.0).expect("lake regions have water");
        assert_well_formed(&water);
        assert_eq!(water.quad_count, 4 * 4);
        assert!(water.vertices.iter().all(|v| v.y == 7.0));

        // Ownership does not apply to water.
        let mut foreign = region.clone();
        foreign.grouping = 3;
        assert_eq!(builder.build_water(&foreign, 8.0).map(|w| w.quad_count), Some(16));

        let dry = square_region(5, RegionKind::default());
        assert!(builder.build_water(&dry, 8.0).is_none());
    }

    #[test]
    fn test_neighbouring_regions_do_not_overlap() {
        let generator = generator();
        let builder = MeshBuilder::default();
        let region = generator.discover(IVec2::new(2, 2));
        let mesh = builder.build_terrain(&region, &generator.synthesize(&region));
        assert_well_formed(&mesh);
        assert!(!mesh.is_empty());

        for neighbour in region.adjacent_cells.iter().take(3) {
            let other = generator.discover(neighbour.index);
            let other_mesh = builder.build_terrain(&other, &generator.synthesize(&other));
            assert_well_formed(&other_mesh);
            let centroids = |m: &MeshBuffers| {
                m.indices
                    .chunks_exact(3)
                    .map(|t| {
                        let sum: Vec3 = t.iter().map(|&i| m.vertices[i as usize]).sum();
                        let c = sum / 3.0;
                        ((c.x * 3.0).round() as i64, (c.z * 3.0).round() as i64)
                    })
                    .collect::<std::collections::HashSet<_>>()
            };
            let ours = centroids(&mesh);
            let theirs = centroids(&other_mesh);
            assert!(
                ours.is_disjoint(&theirs),
                "regions {} and {} both emitted the same triangle",
                region.seed,
                other.seed
            );
        }
    }
}
