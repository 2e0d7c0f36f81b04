//! Meshing: triangulation of region height fields, water planes, and the
//! worker pool that runs discovery, heights and meshing per region.

pub mod buffers;
pub mod builder;
pub mod pipeline;

pub use buffers::{Color, MeshBuffers};
pub use builder::{MeshBuilder, MeshParams};
pub use pipeline::{
    PipelineParams, RegionMesh, RegionOutcome, RegionPipeline, RegionResult, RegionTask,
};
