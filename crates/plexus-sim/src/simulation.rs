//! The top-level simulation aggregate: ingestion, configuration, and the
//! tick scheduler.

use rand::Rng;

use crate::algorithm::{AlgorithmKind, LayoutAlgorithm};
use crate::config::{LockConfig, LockUpdate, PhysicsConfig, PhysicsUpdate};
use crate::gpu::GpuContext;
use crate::registry::{names, BufferHandle, BufferRegistry};
use crate::render::{RenderCounts, RenderTarget};
use crate::{
    Result, SimError, ELEMENTS_PER_EDGE, ELEMENTS_PER_POINT, ELEMENTS_PER_WORK_ITEM, RAND_LENGTH,
};

/// Default point size when the caller provides none.
const DEFAULT_POINT_SIZE: u8 = 4;

/// Default packed RGBA point color when the caller provides none.
const DEFAULT_POINT_COLOR: u32 = (255 << 24) | (102 << 16) | (102 << 8) | 255;

/// One direction of the edge list: flat (source, target) index pairs,
/// per-node degree counts, and the (start offset, run length) work
/// distribution balancing edges across parallel workers.
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    pub edges: Vec<u32>,
    pub degrees: Vec<u32>,
    pub work_items: Vec<u32>,
}

/// Creation-time configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Spatial dimensionality; only 2 is supported.
    pub dimensions: u32,
    /// Mid-points per edge.
    pub num_splits: u32,
    pub locked: LockConfig,
    /// Ordered algorithm pipeline; order is data flow.
    pub algorithms: Vec<AlgorithmKind>,
    /// Tree node provisioning multiple (empirical tuning, default 4x).
    pub tree_node_multiple: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dimensions: ELEMENTS_PER_POINT,
            num_splits: 1,
            locked: LockConfig::default(),
            algorithms: vec![
                AlgorithmKind::BarnesHut,
                AlgorithmKind::SpringRelax,
                AlgorithmKind::EdgeBundling,
            ],
            tree_node_multiple: 4,
        }
    }
}

/// Mutable simulation state shared with every layout algorithm during hooks
/// and ticks. Algorithms read counts and locks, and act on registry buffers;
/// they never own either.
pub struct SimState {
    pub ctx: GpuContext,
    pub registry: BufferRegistry,
    pub num_splits: u32,
    pub num_points: u32,
    pub num_edges: u32,
    pub num_mid_points: u32,
    pub num_mid_edges: u32,
    pub num_forwards_work_items: u32,
    pub num_backwards_work_items: u32,
    pub locked: LockConfig,
    pub physics: PhysicsConfig,
    point_colors: Vec<u32>,
    point_sizes: Vec<u8>,
}

/// The simulation aggregate. Owns the buffer registry and the ordered
/// algorithm pipeline; one instance per visualization session.
pub struct Simulation {
    state: SimState,
    algorithms: Vec<Box<dyn LayoutAlgorithm>>,
    render: Box<dyn RenderTarget>,
}

fn validate_points(points: &[f32]) -> Result<()> {
    if points.is_empty() {
        return Err(SimError::Validation("the points buffer is empty".into()));
    }
    if points.len() % ELEMENTS_PER_POINT as usize != 0 {
        return Err(SimError::Validation(format!(
            "the points buffer length must be a multiple of {ELEMENTS_PER_POINT}"
        )));
    }
    Ok(())
}

fn validate_edge_list(label: &str, list: &EdgeList) -> Result<()> {
    if list.edges.is_empty() {
        return Err(SimError::Validation(format!("the {label} edge buffer is empty")));
    }
    if list.edges.len() % ELEMENTS_PER_EDGE as usize != 0 {
        return Err(SimError::Validation(format!(
            "the {label} edge buffer length must be a multiple of {ELEMENTS_PER_EDGE}"
        )));
    }
    if list.work_items.is_empty() {
        return Err(SimError::Validation(format!(
            "the {label} work item buffer is empty"
        )));
    }
    if list.work_items.len() % ELEMENTS_PER_WORK_ITEM as usize != 0 {
        return Err(SimError::Validation(format!(
            "the {label} work item buffer length must be a multiple of {ELEMENTS_PER_WORK_ITEM}"
        )));
    }
    Ok(())
}

/// Pad byte data to the device's copy alignment.
fn padded(bytes: &[u8]) -> Vec<u8> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let mut out = bytes.to_vec();
    while out.len() % align != 0 {
        out.push(0);
    }
    out
}

impl Simulation {
    /// Create a simulation with a fresh GPU context.
    pub async fn create(render: Box<dyn RenderTarget>, config: SimConfig) -> Result<Self> {
        let ctx = GpuContext::new().await?;
        Self::with_context(ctx, render, config)
    }

    /// Create a simulation over an existing GPU context.
    pub fn with_context(
        ctx: GpuContext,
        render: Box<dyn RenderTarget>,
        config: SimConfig,
    ) -> Result<Self> {
        if config.dimensions != ELEMENTS_PER_POINT {
            return Err(SimError::Validation(format!(
                "only {ELEMENTS_PER_POINT}-dimensional layouts are supported"
            )));
        }
        if config.algorithms.is_empty() {
            return Err(SimError::Validation("the algorithm pipeline is empty".into()));
        }

        let algorithms: Vec<Box<dyn LayoutAlgorithm>> = config
            .algorithms
            .iter()
            .map(|kind| kind.build(&ctx, config.tree_node_multiple))
            .collect();

        let registry = BufferRegistry::new(&ctx);
        tracing::info!(
            algorithms = config.algorithms.len(),
            num_splits = config.num_splits,
            "simulation created"
        );

        Ok(Self {
            state: SimState {
                ctx,
                registry,
                num_splits: config.num_splits,
                num_points: 0,
                num_edges: 0,
                num_mid_points: 0,
                num_mid_edges: 0,
                num_forwards_work_items: 0,
                num_backwards_work_items: 0,
                locked: config.locked,
                physics: PhysicsConfig::default(),
                point_colors: Vec::new(),
                point_sizes: Vec::new(),
            },
            algorithms,
            render,
        })
    }

    /// Load point positions (flat (x, y) pairs) with optional per-point
    /// sizes and packed RGBA colors; defaults are generated when absent.
    ///
    /// Fails fast on malformed input before any device resource is touched.
    pub fn set_points(
        &mut self,
        points: &[f32],
        sizes: Option<&[u8]>,
        colors: Option<&[u32]>,
    ) -> Result<()> {
        validate_points(points)?;
        let num_points = (points.len() as u32) / ELEMENTS_PER_POINT;

        let point_sizes = match sizes {
            Some(s) => s.to_vec(),
            None => vec![DEFAULT_POINT_SIZE; num_points as usize],
        };
        let point_colors = match colors {
            Some(c) => c.to_vec(),
            None => vec![DEFAULT_POINT_COLOR; num_points as usize],
        };

        let state = &mut self.state;
        let stale: Vec<BufferHandle> = [
            names::CUR_POINTS,
            names::NEXT_POINTS,
            names::RAND_VALUES,
            names::POINT_SIZES,
            names::POINT_COLORS,
        ]
        .iter()
        .filter_map(|name| state.registry.handle(name))
        .collect();
        state.registry.reset_buffers(&stale)?;

        state.num_points = num_points;
        tracing::debug!(num_points, "points ingested");

        let shared = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::VERTEX;
        let device_only = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let points_bytes: &[u8] = bytemuck::cast_slice(points);
        let registry = &mut state.registry;
        registry.create_buffer(&state.ctx, points_bytes.len() as u64, names::CUR_POINTS, shared)?;
        registry.write(&state.ctx, names::CUR_POINTS, points_bytes)?;

        registry.create_buffer(
            &state.ctx,
            points_bytes.len() as u64,
            names::NEXT_POINTS,
            device_only,
        )?;

        let sizes_bytes = padded(&point_sizes);
        registry.create_buffer(&state.ctx, sizes_bytes.len() as u64, names::POINT_SIZES, shared)?;
        registry.write(&state.ctx, names::POINT_SIZES, &sizes_bytes)?;

        let colors_bytes: &[u8] = bytemuck::cast_slice(&point_colors);
        registry.create_buffer(
            &state.ctx,
            colors_bytes.len() as u64,
            names::POINT_COLORS,
            shared,
        )?;
        registry.write(&state.ctx, names::POINT_COLORS, colors_bytes)?;

        // Fixed-size seed pool consumed by the stochastic force terms.
        let mut rng = rand::thread_rng();
        let rands: Vec<f32> = (0..RAND_LENGTH * ELEMENTS_PER_POINT)
            .map(|_| rng.gen::<f32>())
            .collect();
        registry.create_buffer(
            &state.ctx,
            (rands.len() * 4) as u64,
            names::RAND_VALUES,
            device_only,
        )?;
        registry.write(&state.ctx, names::RAND_VALUES, bytemuck::cast_slice(&rands))?;

        registry.tick_buffers(
            &[
                names::CUR_POINTS,
                names::POINT_SIZES,
                names::POINT_COLORS,
                names::RAND_VALUES,
            ],
            None,
        );

        state.point_sizes = point_sizes;
        state.point_colors = point_colors;

        for name in [names::CUR_POINTS, names::POINT_SIZES, names::POINT_COLORS] {
            self.render
                .bind_buffer(name, state.registry.require(name)?.clone());
        }
        self.render.set_counts(RenderCounts {
            num_points: state.num_points,
            num_edges: state.num_edges,
            num_mid_points: state.num_mid_points,
            num_mid_edges: state.num_mid_edges,
        });

        for algorithm in &mut self.algorithms {
            algorithm.set_points(&mut self.state)?;
        }
        Ok(())
    }

    /// Load the edge lists, per-edge mid-point seeds, and optional edge
    /// endpoint colors (derived from point colors when absent).
    ///
    /// Malformed input fails fast; failures after validation (allocation,
    /// algorithm setup) are logged and tolerated so the simulation keeps
    /// running with its previous edge state.
    pub fn set_edges(
        &mut self,
        forwards: &EdgeList,
        backwards: &EdgeList,
        mid_points: &[f32],
        edge_colors: Option<&[u32]>,
    ) -> Result<()> {
        validate_edge_list("forwards", forwards)?;
        validate_edge_list("backwards", backwards)?;

        let edge_colors = match edge_colors {
            Some(c) => c.to_vec(),
            None => forwards
                .edges
                .iter()
                .map(|&endpoint| {
                    self.state
                        .point_colors
                        .get(endpoint as usize)
                        .copied()
                        .unwrap_or(DEFAULT_POINT_COLOR)
                })
                .collect(),
        };

        if let Err(err) = self.init_edge_buffers(forwards, backwards, mid_points, &edge_colors) {
            tracing::error!(
                error = %err,
                "edge initialization degraded; simulation continues with previous edge state"
            );
        }
        Ok(())
    }

    fn init_edge_buffers(
        &mut self,
        forwards: &EdgeList,
        backwards: &EdgeList,
        mid_points: &[f32],
        edge_colors: &[u32],
    ) -> Result<()> {
        let state = &mut self.state;

        let stale: Vec<BufferHandle> = [
            names::FORWARDS_EDGES,
            names::FORWARDS_DEGREES,
            names::FORWARDS_WORK_ITEMS,
            names::BACKWARDS_EDGES,
            names::BACKWARDS_DEGREES,
            names::BACKWARDS_WORK_ITEMS,
            names::EDGE_COLORS,
            names::SPRINGS_POS,
            names::CUR_MID_POINTS,
            names::NEXT_MID_POINTS,
            names::MID_SPRINGS_POS,
            names::MID_SPRINGS_COLOR_COORD,
        ]
        .iter()
        .filter_map(|name| state.registry.handle(name))
        .collect();
        state.registry.reset_buffers(&stale)?;

        state.num_edges = (forwards.edges.len() as u32) / ELEMENTS_PER_EDGE;
        state.num_forwards_work_items =
            (forwards.work_items.len() as u32) / ELEMENTS_PER_WORK_ITEM;
        state.num_backwards_work_items =
            (backwards.work_items.len() as u32) / ELEMENTS_PER_WORK_ITEM;
        state.num_mid_points = (mid_points.len() as u32) / ELEMENTS_PER_POINT;
        state.num_mid_edges = state.num_mid_points + state.num_edges;
        tracing::debug!(
            num_edges = state.num_edges,
            num_mid_points = state.num_mid_points,
            num_mid_edges = state.num_mid_edges,
            "edges ingested"
        );

        let shared = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::VERTEX;
        let device_only = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let uploads: [(&str, &[u8], wgpu::BufferUsages); 7] = [
            (names::FORWARDS_EDGES, bytemuck::cast_slice(&forwards.edges), device_only),
            (names::FORWARDS_DEGREES, bytemuck::cast_slice(&forwards.degrees), device_only),
            (
                names::FORWARDS_WORK_ITEMS,
                bytemuck::cast_slice(&forwards.work_items),
                device_only,
            ),
            (names::BACKWARDS_EDGES, bytemuck::cast_slice(&backwards.edges), device_only),
            (names::BACKWARDS_DEGREES, bytemuck::cast_slice(&backwards.degrees), device_only),
            (
                names::BACKWARDS_WORK_ITEMS,
                bytemuck::cast_slice(&backwards.work_items),
                device_only,
            ),
            (names::EDGE_COLORS, bytemuck::cast_slice(edge_colors), shared),
        ];
        for (name, bytes, usage) in uploads {
            state
                .registry
                .create_buffer(&state.ctx, bytes.len() as u64, name, usage)?;
            state.registry.write(&state.ctx, name, bytes)?;
        }

        // Render geometry: one (start, end) coordinate pair per edge and per
        // mid-edge segment.
        let springs_len = u64::from(state.num_edges) * 16;
        state
            .registry
            .create_buffer(&state.ctx, springs_len, names::SPRINGS_POS, shared)?;
        let mid_springs_len = u64::from(state.num_mid_edges) * 16;
        state
            .registry
            .create_buffer(&state.ctx, mid_springs_len, names::MID_SPRINGS_POS, shared)?;
        state.registry.create_buffer(
            &state.ctx,
            mid_springs_len,
            names::MID_SPRINGS_COLOR_COORD,
            shared,
        )?;

        // Mid-point chains; zero splits still gets placeholder slots so the
        // bundling kernels have something to bind.
        let mid_len = (u64::from(state.num_mid_points) * 8).max(8);
        state
            .registry
            .create_buffer(&state.ctx, mid_len, names::CUR_MID_POINTS, shared)?;
        if !mid_points.is_empty() {
            state
                .registry
                .write(&state.ctx, names::CUR_MID_POINTS, bytemuck::cast_slice(mid_points))?;
        }
        state
            .registry
            .create_buffer(&state.ctx, mid_len, names::NEXT_MID_POINTS, device_only)?;

        state.registry.tick_buffers(
            &[
                names::FORWARDS_EDGES,
                names::FORWARDS_DEGREES,
                names::FORWARDS_WORK_ITEMS,
                names::BACKWARDS_EDGES,
                names::BACKWARDS_DEGREES,
                names::BACKWARDS_WORK_ITEMS,
                names::EDGE_COLORS,
                names::CUR_MID_POINTS,
            ],
            None,
        );

        for name in [
            names::EDGE_COLORS,
            names::SPRINGS_POS,
            names::CUR_MID_POINTS,
            names::MID_SPRINGS_POS,
            names::MID_SPRINGS_COLOR_COORD,
        ] {
            self.render
                .bind_buffer(name, state.registry.require(name)?.clone());
        }
        self.render.set_counts(RenderCounts {
            num_points: state.num_points,
            num_edges: state.num_edges,
            num_mid_points: state.num_mid_points,
            num_mid_edges: state.num_mid_edges,
        });

        // Temporary tree setup and per-algorithm edge hooks; the first
        // pipeline entry is the hierarchical engine, so its buffers land
        // before anything depends on them.
        for algorithm in &mut self.algorithms {
            algorithm.set_edges(&mut self.state)?;
        }
        Ok(())
    }

    /// Merge partial lock-flag updates; pure state, no validation.
    pub fn set_locked(&mut self, update: LockUpdate) {
        self.state.locked.apply(update);
    }

    /// Merge partial physics updates and forward the full configuration to
    /// every algorithm.
    pub fn set_physics(&mut self, update: PhysicsUpdate) {
        self.state.physics.apply(update);
        tracing::debug!(physics = ?self.state.physics, "physics updated");
        let physics = self.state.physics;
        for algorithm in &mut self.algorithms {
            algorithm.set_physics(&physics);
        }
    }

    /// Advance the layout one step: every configured algorithm in order,
    /// then one synchronization barrier against the compute backend and one
    /// against the renderer.
    ///
    /// Algorithm failures abandon the current tick but leave the simulation
    /// usable; they are logged, not propagated.
    pub fn tick(&mut self, step: u32) -> Result<()> {
        if self.state.num_points == 0 {
            return Ok(());
        }
        self.state.registry.advance_tick();

        for algorithm in &mut self.algorithms {
            if let Err(err) = algorithm.tick(&mut self.state, step) {
                tracing::error!(
                    algorithm = algorithm.name(),
                    error = %err,
                    "tick abandoned"
                );
                break;
            }
        }

        self.state.ctx.finish();
        self.render.finish();
        Ok(())
    }

    pub fn num_points(&self) -> u32 {
        self.state.num_points
    }

    pub fn num_edges(&self) -> u32 {
        self.state.num_edges
    }

    pub fn num_mid_points(&self) -> u32 {
        self.state.num_mid_points
    }

    pub fn num_mid_edges(&self) -> u32 {
        self.state.num_mid_edges
    }

    /// Current global tick counter.
    pub fn current_tick(&self) -> u64 {
        self.state.registry.tick()
    }

    /// Version stamp of a buffer, for staleness checks by consumers.
    pub fn buffer_stamp(&self, name: &str) -> Option<u64> {
        self.state.registry.stamp(name)
    }

    /// Registry access for integration-level consumers.
    pub fn registry(&self) -> &BufferRegistry {
        &self.state.registry
    }

    /// Blocking readback of a device buffer as f32 values.
    pub fn read_buffer_f32(&self, name: &str) -> Result<Vec<f32>> {
        let buffer = self.state.registry.require(name)?;
        let bytes = self
            .state
            .ctx
            .read_buffer(buffer, self.state.registry.byte_len(name))?;
        Ok(bytemuck::cast_slice(&bytes).to_vec())
    }

    /// Blocking readback of the current point positions.
    pub fn read_points(&self) -> Result<Vec<f32>> {
        self.read_buffer_f32(names::CUR_POINTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_list(edges: &[u32], work_items: &[u32]) -> EdgeList {
        EdgeList {
            edges: edges.to_vec(),
            degrees: vec![1; edges.len() / 2],
            work_items: work_items.to_vec(),
        }
    }

    #[test]
    fn empty_points_fail_validation() {
        assert!(matches!(
            validate_points(&[]),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn odd_points_fail_validation() {
        assert!(matches!(
            validate_points(&[0.0, 1.0, 2.0]),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn even_points_pass_validation() {
        assert!(validate_points(&[0.0, 0.0, 10.0, 10.0]).is_ok());
    }

    #[test]
    fn empty_edges_fail_validation() {
        let list = edge_list(&[], &[0, 1]);
        assert!(matches!(
            validate_edge_list("forwards", &list),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn odd_edges_fail_validation() {
        let list = edge_list(&[0, 1, 2], &[0, 1]);
        assert!(matches!(
            validate_edge_list("forwards", &list),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn empty_work_items_fail_validation() {
        let list = edge_list(&[0, 1], &[]);
        assert!(matches!(
            validate_edge_list("forwards", &list),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn valid_edge_list_passes() {
        let list = edge_list(&[0, 1], &[0, 1]);
        assert!(validate_edge_list("forwards", &list).is_ok());
    }

    #[test]
    fn byte_padding_reaches_copy_alignment() {
        assert_eq!(padded(&[1]).len(), 4);
        assert_eq!(padded(&[1, 2, 3, 4]).len(), 4);
        assert_eq!(padded(&[1, 2, 3, 4, 5]).len(), 8);
    }
}
