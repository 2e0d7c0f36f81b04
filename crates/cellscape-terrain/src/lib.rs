//! Region terrain: flood-fill discovery of cellular regions, slope placement
//! on cell boundaries, and height synthesis.

mod generator;
mod height;
mod kind;
mod region;
mod slope;

#[cfg(test)]
mod test_support;

pub use generator::TerrainGenerator;
pub use height::{
    HeightField, HeightParams, HeightSample, HeightSynthesis, lake_depression, slope_factor,
    smoothstep,
};
pub use kind::{RegionKind, RegionKindTable};
pub use region::{
    CellData, DiscoveryParams, Region, RegionMetadata, SAMPLE_SPACING, discover_region,
};
pub use slope::{Octant, SlopeSelector};
