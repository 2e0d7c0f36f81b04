//! One-stop terrain generator bundling the sampler, discovery limits, kinds
//! and height synthesis.

use std::sync::Arc;

use cellscape_noise::{CellClassifier, CellSampler, CellularParams, ClassifierParams};
use glam::{IVec2, Vec2};

use crate::height::{HeightField, HeightParams, HeightSynthesis};
use crate::kind::{RegionKind, RegionKindTable};
use crate::region::{DiscoveryParams, Region, discover_region};

/// Everything needed to turn a seed cell into a region with heights.
///
/// Cloning is cheap apart from the kind table; the classifier and its memo
/// cache are shared between clones.
#[derive(Clone)]
pub struct TerrainGenerator {
    sampler: CellSampler,
    synthesis: HeightSynthesis,
    discovery: DiscoveryParams,
    kinds: RegionKindTable,
}

impl TerrainGenerator {
    /// Build a generator from validated parameters.
    pub fn new(
        cellular: CellularParams,
        classifier: ClassifierParams,
        height: HeightParams,
        discovery: DiscoveryParams,
        kinds: RegionKindTable,
    ) -> Self {
        let classifier = Arc::new(CellClassifier::new(classifier));
        Self::with_sampler(CellSampler::new(cellular, classifier), height, discovery, kinds)
    }

    /// Build a generator around an existing sampler.
    pub fn with_sampler(
        sampler: CellSampler,
        height: HeightParams,
        discovery: DiscoveryParams,
        kinds: RegionKindTable,
    ) -> Self {
        Self {
            sampler,
            synthesis: HeightSynthesis::new(height),
            discovery,
            kinds,
        }
    }

    pub fn sampler(&self) -> &CellSampler {
        &self.sampler
    }

    pub fn classifier(&self) -> &CellClassifier {
        self.sampler.classifier()
    }

    pub fn synthesis(&self) -> &HeightSynthesis {
        &self.synthesis
    }

    pub fn kinds(&self) -> &RegionKindTable {
        &self.kinds
    }

    /// Kind of the grouping a cell belongs to.
    pub fn kind_of(&self, index: IVec2) -> &RegionKind {
        self.kinds.for_grouping(self.classifier().grouping(index))
    }

    /// Flat height of a cell.
    pub fn base_height(&self, index: IVec2) -> f32 {
        self.synthesis.base_height(self.classifier(), index)
    }

    /// Discover the region whose seed is `seed`.
    pub fn discover(&self, seed: IVec2) -> Region {
        discover_region(&self.sampler, seed, &self.discovery, &self.kinds)
    }

    /// Discover the region around the cell owning a world position.
    pub fn discover_at(&self, world: Vec2) -> Region {
        self.discover(self.sampler.cell_at(world))
    }

    /// Heights for a discovered region.
    pub fn synthesize(&self, region: &Region) -> HeightField {
        self.synthesis.synthesize(self.classifier(), region, &self.kinds)
    }

    /// Height of the terrain at an arbitrary world position, sampled directly
    /// without discovering a region.
    pub fn height_at(&self, world: Vec2) -> f32 {
        let point = self.sampler.sample_point(world.x, world.y);
        let kind = self.kinds.for_grouping(point.grouping);
        self.synthesis.point_height(self.classifier(), &point, kind).height
    }
}

static_assertions::assert_impl_all!(TerrainGenerator: Send, Sync);
