//! Region pipeline: discovery, heights and meshing on a worker pool.
//!
//! Each task runs the whole chain for one seed cell on a worker thread and
//! sends the finished region back over a channel. Seeds falling inside a
//! region that was already built are answered with
//! [`RegionOutcome::Duplicate`] instead of being rebuilt.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use cellscape_noise::ParamError;
use cellscape_terrain::{HeightField, RegionMetadata, TerrainGenerator};
use crossbeam_channel::{Receiver, Sender};
use dashmap::{DashMap, DashSet};
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::buffers::MeshBuffers;
use crate::builder::MeshBuilder;

/// Worker pool sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Worker threads; `0` picks a count from the number of CPUs.
    pub worker_count: usize,
    /// Maximum queued plus executing tasks.
    pub budget: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            worker_count: 0,
            budget: 64,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.budget == 0 {
            return Err(ParamError::out_of_range("budget", "must be at least 1"));
        }
        Ok(())
    }

    /// Worker count with `0` resolved against the machine.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            num_cpus::get().saturating_sub(1).max(1)
        }
    }
}

/// A request to build the region containing one seed cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionTask {
    pub seed: IVec2,
}

/// A fully built region.
#[derive(Debug)]
pub struct RegionMesh {
    /// Identity of the region (its lowest-valued sector cell).
    pub region_id: IVec2,
    pub metadata: RegionMetadata,
    /// Name of the region's kind.
    pub kind: String,
    /// Number of recorded points.
    pub point_count: usize,
    /// Discovery stopped at the point cap.
    pub truncated: bool,
    pub heights: HeightField,
    pub terrain: MeshBuffers,
    /// Present when the region's kind requires water.
    pub water: Option<MeshBuffers>,
}

/// What happened to a task.
#[derive(Debug)]
pub enum RegionOutcome {
    Built(Box<RegionMesh>),
    /// The seed lies in a region built by an earlier task.
    Duplicate { region_id: IVec2 },
}

/// Result of one task.
#[derive(Debug)]
pub struct RegionResult {
    pub task: RegionTask,
    pub outcome: RegionOutcome,
    /// Wall time spent on the task, in microseconds.
    pub generation_time_us: u64,
}

/// Regions already built, shared by the workers.
#[derive(Default)]
struct BuiltRegions {
    /// Every sector cell of a built region, mapped to the region's id.
    cells: DashMap<IVec2, IVec2>,
    ids: DashSet<IVec2>,
}

impl BuiltRegions {
    fn run(
        &self,
        generator: &TerrainGenerator,
        builder: &MeshBuilder,
        task: RegionTask,
    ) -> RegionOutcome {
        if let Some(region_id) = self.cells.get(&task.seed).map(|id| *id) {
            return RegionOutcome::Duplicate { region_id };
        }

        let region = generator.discover(task.seed);
        let region_id = region.canonical_cell();
        // Two workers may discover the same region concurrently; the first
        // to claim the id keeps it.
        if !self.ids.insert(region_id) {
            return RegionOutcome::Duplicate { region_id };
        }
        for cell in &region.sector_cells {
            self.cells.insert(cell.index, region_id);
        }

        let heights = generator.synthesize(&region);
        let terrain = builder.build_terrain(&region, &heights);
        let water = builder.build_water(&region, generator.base_height(region.seed));

        RegionOutcome::Built(Box::new(RegionMesh {
            region_id,
            metadata: region.metadata(),
            kind: region.kind.name.clone(),
            point_count: region.points.len(),
            truncated: region.truncated,
            heights,
            terrain,
            water,
        }))
    }
}

/// Releases one in-flight slot when dropped, including when a task panics.
struct InFlightSlot(Arc<AtomicUsize>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Region pipeline backed by a thread pool.
///
/// The caller submits [`RegionTask`]s via [`submit`](Self::submit) and
/// collects [`RegionResult`]s via [`drain_results`](Self::drain_results).
pub struct RegionPipeline {
    task_sender: Option<Sender<RegionTask>>,
    result_receiver: Receiver<RegionResult>,
    worker_handles: Vec<JoinHandle<()>>,
    budget: usize,
    in_flight: Arc<AtomicUsize>,
    built: Arc<BuiltRegions>,
}

impl RegionPipeline {
    /// Spawn `worker_count` workers sharing `generator` and `builder`.
    ///
    /// `budget` caps queued plus executing tasks.
    pub fn new(
        worker_count: usize,
        budget: usize,
        generator: Arc<TerrainGenerator>,
        builder: Arc<MeshBuilder>,
    ) -> std::io::Result<Self> {
        let (task_tx, task_rx) = crossbeam_channel::bounded::<RegionTask>(budget.max(1));
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let built = Arc::new(BuiltRegions::default());

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count.max(1) {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let generator = Arc::clone(&generator);
            let builder = Arc::clone(&builder);
            let built = Arc::clone(&built);
            let flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("region-worker-{i}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let slot = InFlightSlot(Arc::clone(&flight));
                        let start = Instant::now();
                        let outcome = built.run(&generator, &builder, task);
                        let generation_time_us = start.elapsed().as_micros() as u64;
                        drop(slot);
                        tracing::debug!(
                            seed = %task.seed,
                            generation_time_us,
                            "region task finished"
                        );

                        let _ = tx.send(RegionResult {
                            task,
                            outcome,
                            generation_time_us,
                        });
                    }
                })?;
            handles.push(handle);
        }

        tracing::info!(workers = handles.len(), budget, "region pipeline started");

        Ok(Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
            built,
        })
    }

    /// Create a pipeline sized by `params`.
    pub fn with_params(
        params: &PipelineParams,
        generator: Arc<TerrainGenerator>,
        builder: Arc<MeshBuilder>,
    ) -> std::io::Result<Self> {
        Self::new(params.resolved_worker_count(), params.budget, generator, builder)
    }

    /// Queue a task.
    ///
    /// Returns the task back if the budget is exhausted or the pipeline has
    /// been shut down.
    pub fn submit(&self, task: RegionTask) -> Result<(), RegionTask> {
        let Some(sender) = &self.task_sender else {
            return Err(task);
        };
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return Err(task);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        sender.try_send(task).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            e.into_inner()
        })
    }

    /// Collect every finished result without blocking.
    pub fn drain_results(&self) -> Vec<RegionResult> {
        self.result_receiver.try_iter().collect()
    }

    /// Tasks queued or executing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of distinct regions built so far.
    pub fn built_count(&self) -> usize {
        self.built.ids.len()
    }

    /// Id of the built region containing `cell`, if any.
    pub fn region_of(&self, cell: IVec2) -> Option<IVec2> {
        self.built.cells.get(&cell).map(|id| *id)
    }

    /// Stop accepting work, let the workers finish the queue, and join them.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for RegionPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use cellscape_noise::{CellularParams, ClassifierParams, FractalParams, FractalType};
    use cellscape_terrain::{DiscoveryParams, HeightParams, RegionKindTable};

    fn generator() -> Arc<TerrainGenerator> {
        Arc::new(TerrainGenerator::new(
            CellularParams {
                frequency: 0.25,
                ..Default::default()
            },
            ClassifierParams {
                grouping: FractalParams {
                    seed: 21,
                    frequency: 0.9,
                    fractal_type: FractalType::None,
                    ..Default::default()
                },
                grouping_count: 6,
                level_count: 4,
                memoize: true,
                ..Default::default()
            },
            HeightParams::default(),
            DiscoveryParams::default(),
            RegionKindTable::default(),
        ))
    }

    fn pipeline(workers: usize, budget: usize) -> RegionPipeline {
        RegionPipeline::new(workers, budget, generator(), Arc::new(MeshBuilder::default()))
            .expect("spawn workers")
    }

    fn collect(pipeline: &RegionPipeline, expected: usize) -> Vec<RegionResult> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            results.extend(pipeline.drain_results());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_task_produces_region_mesh() {
        let pipeline = pipeline(2, 8);
        assert!(pipeline.submit(RegionTask { seed: IVec2::new(1, 2) }).is_ok());
        let results = collect(&pipeline, 1);
        assert_eq!(results.len(), 1);
        let RegionOutcome::Built(mesh) = &results[0].outcome else {
            panic!("first task must build its region");
        };
        assert_eq!(mesh.metadata.seed, IVec2::new(1, 2));
        assert!(!mesh.terrain.is_empty());
        assert_eq!(mesh.terrain.indices.len() % 3, 0);
        assert!(mesh.point_count > 0);
        assert_eq!(pipeline.region_of(IVec2::new(1, 2)), Some(mesh.region_id));
    }

    #[test]
    fn test_concurrent_tasks_build_each_region_once() {
        let pipeline = pipeline(4, 256);
        let mut submitted = 0;
        for x in 0..8 {
            for y in 0..8 {
                if pipeline.submit(RegionTask { seed: IVec2::new(x, y) }).is_ok() {
                    submitted += 1;
                }
            }
        }
        let results = collect(&pipeline, submitted);
        assert_eq!(results.len(), submitted);

        let mut ids = std::collections::HashSet::new();
        for result in &results {
            if let RegionOutcome::Built(mesh) = &result.outcome {
                assert!(ids.insert(mesh.region_id), "region {} built twice", mesh.region_id);
            }
        }
        assert_eq!(ids.len(), pipeline.built_count());
        assert!(ids.len() < submitted, "some seeds share a region");
    }

    #[test]
    fn test_submit_over_budget_returns_task() {
        let pipeline = pipeline(1, 2);
        let mut rejected = None;
        for i in 0..64 {
            let task = RegionTask { seed: IVec2::new(i * 50, 0) };
            if let Err(task) = pipeline.submit(task) {
                rejected = Some(task);
                break;
            }
        }
        let task = rejected.expect("budget of two must reject eventually");
        assert_eq!(task.seed.y, 0);
    }

    #[test]
    fn test_finished_tasks_release_budget() {
        let pipeline = pipeline(2, 4);
        for i in 0..4 {
            assert!(pipeline.submit(RegionTask { seed: IVec2::new(i * 7, -i) }).is_ok());
        }
        let results = collect(&pipeline, 4);
        assert_eq!(results.len(), 4);
        assert_eq!(pipeline.in_flight_count(), 0);
        assert!(pipeline.submit(RegionTask { seed: IVec2::new(40, 40) }).is_ok());
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let mut pipeline = pipeline(2, 4);
        pipeline.shutdown();
        let task = RegionTask { seed: IVec2::ZERO };
        assert_eq!(pipeline.submit(task), Err(task));
        assert_eq!(pipeline.in_flight_count(), 0);
    }

    #[test]
    fn test_default_worker_count_is_positive() {
        assert!(PipelineParams::default().resolved_worker_count() >= 1);
        let fixed = PipelineParams {
            worker_count: 3,
            ..Default::default()
        };
        assert_eq!(fixed.resolved_worker_count(), 3);
    }
}
