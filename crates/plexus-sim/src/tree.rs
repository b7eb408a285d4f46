//! Host-side driver for the hierarchical (Barnes-Hut) force pipeline.
//!
//! The engine is instantiated twice per simulation: once over the points and
//! once, with a name prefix and its own parameters, over the edge mid-points
//! for bundling. Every temporary buffer lives in the [`BufferRegistry`] under
//! a prefixed logical name and is reset and reallocated whenever body counts
//! change.

use bytemuck::{Pod, Zeroable};

use crate::gpu::{workgroups_for, Binding, GpuContext, KernelPipeline};
use crate::registry::{names, BufferHandle, BufferRegistry};
use crate::tree_shaders::{
    BOUND_BOX_SHADER, BOUND_COMBINE_SHADER, BUILD_TREE_SHADER, CELL_KEYS_SHADER,
    COMPUTE_SUMS_SHADER, FORCES_SHADER, INTEGRATE_SHADER, SORT_STEP_SHADER, START_OFFSETS_SHADER,
    WEIGH_BODIES_SHADER,
};
use crate::{Result, SimError};

/// Host mirror of the `TreeParams` uniform.
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct TreeParamsRaw {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

/// Host mirror of the `SortStage` uniform region.
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct SortStageRaw {
    k: u32,
    j: u32,
    padded_bodies: u32,
    _pad: u32,
}

/// Per-tick force parameters an engine instance runs with.
#[derive(Debug, Clone, Copy)]
pub struct TreeForceParams {
    pub theta: f32,
    pub repulsion: f32,
    pub gravity: f32,
    pub overlap_distance: f32,
    pub dt: f32,
    pub damping: f32,
    pub flags: u32,
    pub step: u32,
}

/// Total node count of a complete quad-tree of the given depth:
/// sum of 4^l for l in 0..=depth.
fn tree_size_for_depth(depth: u32) -> u32 {
    ((1u32 << (2 * (depth + 1))) - 1) / 3
}

/// Smallest depth whose complete quad-tree holds at least
/// `node_multiple * num_bodies` cells. The multiple is empirical tuning, not
/// a semantic contract; 4x matches the historical provisioning.
fn depth_for_bodies(num_bodies: u32, node_multiple: u32) -> u32 {
    let target = node_multiple.saturating_mul(num_bodies).max(5);
    let mut depth = 1;
    while depth < 12 && tree_size_for_depth(depth) < target {
        depth += 1;
    }
    depth
}

/// Bitonic (k, j) stages for a padded body count.
fn sort_stages(padded_bodies: u32) -> Vec<(u32, u32)> {
    let mut stages = Vec::new();
    let mut k = 2;
    while k <= padded_bodies {
        let mut j = k / 2;
        while j > 0 {
            stages.push((k, j));
            j /= 2;
        }
        k *= 2;
    }
    stages
}

const SORT_STAGE_STRIDE: u64 = 256;

struct Pipelines {
    weigh: KernelPipeline,
    bound_box: KernelPipeline,
    bound_combine: KernelPipeline,
    cell_keys: KernelPipeline,
    sort_step: KernelPipeline,
    start_offsets: KernelPipeline,
    build: KernelPipeline,
    sums: KernelPipeline,
    forces: KernelPipeline,
    integrate: KernelPipeline,
}

/// Device geometry: sizes, temp-buffer handles, and bind groups for the
/// current body count. Rebuilt wholesale by [`TreeEngine::alloc`].
struct TreeGeometry {
    num_bodies: u32,
    num_nodes: u32,
    padded_bodies: u32,
    num_stages: u32,
    handles: Vec<BufferHandle>,

    // Clear/copy targets, refreshed with the bind groups on every alloc.
    x_sums: wgpu::Buffer,
    y_sums: wgpu::Buffer,
    count: wgpu::Buffer,
    start: wgpu::Buffer,
    tree_state: wgpu::Buffer,
    tree_bounds: wgpu::Buffer,
    tree_params: wgpu::Buffer,

    bind_weigh: wgpu::BindGroup,
    bind_bounds: wgpu::BindGroup,
    bind_combine: wgpu::BindGroup,
    bind_keys: wgpu::BindGroup,
    bind_sort: wgpu::BindGroup,
    bind_starts: wgpu::BindGroup,
    bind_build: wgpu::BindGroup,
    bind_sums: wgpu::BindGroup,
    bind_forces: wgpu::BindGroup,
    bind_integrate: wgpu::BindGroup,
}

/// One instance of the hierarchical force pipeline.
pub struct TreeEngine {
    prefix: &'static str,
    node_multiple: u32,
    max_depth: u32,
    pipelines: Pipelines,
    geometry: Option<TreeGeometry>,
}

impl TreeEngine {
    pub fn new(ctx: &GpuContext, prefix: &'static str, node_multiple: u32) -> Self {
        use Binding::{DynamicUniform, ReadStorage, Storage, Uniform};

        let label = |pass: &str| format!("{prefix}{pass}");
        let pipelines = Pipelines {
            weigh: KernelPipeline::new(
                ctx,
                &label("weigh_bodies"),
                WEIGH_BODIES_SHADER,
                &[Storage, ReadStorage, Uniform],
            ),
            bound_box: KernelPipeline::new(
                ctx,
                &label("bound_box"),
                BOUND_BOX_SHADER,
                &[ReadStorage, Storage, Storage, Storage, Storage, Uniform],
            ),
            bound_combine: KernelPipeline::new(
                ctx,
                &label("bound_combine"),
                BOUND_COMBINE_SHADER,
                &[
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    Storage,
                    Uniform,
                ],
            ),
            cell_keys: KernelPipeline::new(
                ctx,
                &label("cell_keys"),
                CELL_KEYS_SHADER,
                &[ReadStorage, Storage, Uniform, Uniform],
            ),
            sort_step: KernelPipeline::new(
                ctx,
                &label("sort_step"),
                SORT_STEP_SHADER,
                &[Storage, DynamicUniform(16)],
            ),
            start_offsets: KernelPipeline::new(
                ctx,
                &label("start_offsets"),
                START_OFFSETS_SHADER,
                &[ReadStorage, Storage, Uniform],
            ),
            build: KernelPipeline::new(
                ctx,
                &label("build_tree"),
                BUILD_TREE_SHADER,
                &[
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    Storage,
                    Storage,
                    Storage,
                    Uniform,
                ],
            ),
            sums: KernelPipeline::new(
                ctx,
                &label("compute_sums"),
                COMPUTE_SUMS_SHADER,
                &[
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    Storage,
                    Storage,
                    Storage,
                    Storage,
                    Uniform,
                ],
            ),
            forces: KernelPipeline::new(
                ctx,
                &label("compute_forces"),
                FORCES_SHADER,
                &[
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    ReadStorage,
                    Storage,
                    Uniform,
                    Uniform,
                ],
            ),
            integrate: KernelPipeline::new(
                ctx,
                &label("integrate"),
                INTEGRATE_SHADER,
                &[ReadStorage, ReadStorage, Storage, Storage, Uniform],
            ),
        };

        Self {
            prefix,
            node_multiple,
            max_depth: 0,
            pipelines,
            geometry: None,
        }
    }

    /// Whether temporary buffers are allocated for a body count.
    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    /// Drop the current geometry; the next [`TreeEngine::alloc`] rebuilds it.
    pub fn invalidate(&mut self) {
        self.geometry = None;
    }

    fn name(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    /// Allocate (or reallocate) every temporary tree buffer for `num_bodies`
    /// bodies read from `in_name` and integrated into `out_name`.
    pub fn alloc(
        &mut self,
        ctx: &GpuContext,
        registry: &mut BufferRegistry,
        num_bodies: u32,
        in_name: &str,
        out_name: &str,
    ) -> Result<()> {
        if num_bodies == 0 {
            return Err(SimError::Validation("tree engine needs at least one body".into()));
        }

        // Stale geometry goes first so resized buffers never alias.
        if let Some(old) = self.geometry.take() {
            registry.reset_buffers(&old.handles)?;
        }

        let max_depth = depth_for_bodies(num_bodies, self.node_multiple);
        let num_nodes = tree_size_for_depth(max_depth);
        let padded_bodies = num_bodies.next_power_of_two();
        let num_groups = workgroups_for(num_bodies);
        let stages = sort_stages(padded_bodies);
        self.max_depth = max_depth;

        tracing::debug!(
            prefix = self.prefix,
            num_bodies,
            num_nodes,
            max_depth,
            "allocating tree buffers"
        );

        let storage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let node_f32 = 4 * num_nodes as u64;
        let mut handles = Vec::new();
        let mut create = |registry: &mut BufferRegistry,
                          base: &str,
                          byte_len: u64,
                          usage: wgpu::BufferUsages|
         -> Result<wgpu::Buffer> {
            let name = format!("{}{}", self.prefix, base);
            let handle = registry.create_buffer(ctx, byte_len, &name, usage)?;
            handles.push(handle);
            Ok(registry.require(&name)?.clone())
        };

        let x_cords = create(registry, "x_cords", node_f32, storage)?;
        let y_cords = create(registry, "y_cords", node_f32, storage)?;
        let mass = create(registry, "mass", node_f32, storage)?;
        let x_sums = create(registry, "x_sums", node_f32, storage)?;
        let y_sums = create(registry, "y_sums", node_f32, storage)?;
        let count = create(registry, "count", node_f32, storage)?;
        let children = create(registry, "children", 16 * num_nodes as u64, storage)?;
        let start = create(registry, "start", node_f32, storage)?;
        let cells = create(registry, "sort", 8 * padded_bodies as u64, storage)?;
        let accel = create(registry, "accel", 8 * num_bodies as u64, storage)?;
        let weights = create(registry, "weights", 4 * num_bodies as u64, storage)?;
        let velocities = create(registry, "velocities", 8 * num_bodies as u64, storage)?;
        let gx_mins = create(registry, "global_x_mins", 4 * num_groups as u64, storage)?;
        let gx_maxs = create(registry, "global_x_maxs", 4 * num_groups as u64, storage)?;
        let gy_mins = create(registry, "global_y_mins", 4 * num_groups as u64, storage)?;
        let gy_maxs = create(registry, "global_y_maxs", 4 * num_groups as u64, storage)?;
        let tree_state = create(registry, "tree_state", 32, storage)?;
        let tree_bounds = create(
            registry,
            "tree_bounds",
            32,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;
        let tree_params = create(
            registry,
            "tree_params",
            std::mem::size_of::<TreeParamsRaw>() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;
        let sort_params = create(
            registry,
            "sort_params",
            SORT_STAGE_STRIDE * stages.len().max(1) as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;

        // The (k, j) schedule is fixed per allocation; one aligned region
        // per stage, selected with a dynamic offset at encode time.
        let mut stage_bytes = vec![0u8; (SORT_STAGE_STRIDE as usize) * stages.len().max(1)];
        for (i, &(k, j)) in stages.iter().enumerate() {
            let raw = SortStageRaw {
                k,
                j,
                padded_bodies,
                _pad: 0,
            };
            let at = i * SORT_STAGE_STRIDE as usize;
            stage_bytes[at..at + 16].copy_from_slice(bytemuck::bytes_of(&raw));
        }
        ctx.queue.write_buffer(&sort_params, 0, &stage_bytes);

        let positions = registry.require(in_name)?.clone();
        let out_positions = registry.require(out_name)?.clone();
        let degrees = registry.require(names::FORWARDS_DEGREES)?.clone();
        let rand_values = registry.require(names::RAND_VALUES)?.clone();

        let p = &self.pipelines;
        let geometry = TreeGeometry {
            num_bodies,
            num_nodes,
            padded_bodies,
            num_stages: stages.len() as u32,
            handles,
            x_sums: x_sums.clone(),
            y_sums: y_sums.clone(),
            count: count.clone(),
            start: start.clone(),
            tree_state: tree_state.clone(),
            tree_bounds: tree_bounds.clone(),
            tree_params: tree_params.clone(),
            bind_weigh: p.weigh.bind(
                ctx,
                &self.name("weigh_bodies"),
                &[&weights, &degrees, &tree_params],
            ),
            bind_bounds: p.bound_box.bind(
                ctx,
                &self.name("bound_box"),
                &[&positions, &gx_mins, &gx_maxs, &gy_mins, &gy_maxs, &tree_params],
            ),
            bind_combine: p.bound_combine.bind(
                ctx,
                &self.name("bound_combine"),
                &[&gx_mins, &gx_maxs, &gy_mins, &gy_maxs, &tree_state, &tree_params],
            ),
            bind_keys: p.cell_keys.bind(
                ctx,
                &self.name("cell_keys"),
                &[&positions, &cells, &tree_params, &tree_bounds],
            ),
            bind_sort: p.sort_step.bind(ctx, &self.name("sort_step"), &[&cells, &sort_params]),
            bind_starts: p.start_offsets.bind(
                ctx,
                &self.name("start_offsets"),
                &[&cells, &start, &tree_params],
            ),
            bind_build: p.build.bind(
                ctx,
                &self.name("build_tree"),
                &[&cells, &positions, &weights, &x_sums, &y_sums, &count, &tree_params],
            ),
            bind_sums: p.sums.bind(
                ctx,
                &self.name("compute_sums"),
                &[
                    &x_sums,
                    &y_sums,
                    &count,
                    &x_cords,
                    &y_cords,
                    &mass,
                    &children,
                    &tree_params,
                ],
            ),
            bind_forces: p.forces.bind(
                ctx,
                &self.name("compute_forces"),
                &[
                    &positions,
                    &x_cords,
                    &y_cords,
                    &mass,
                    &children,
                    &cells,
                    &rand_values,
                    &accel,
                    &tree_params,
                    &tree_bounds,
                ],
            ),
            bind_integrate: p.integrate.bind(
                ctx,
                &self.name("integrate"),
                &[&positions, &accel, &velocities, &out_positions, &tree_params],
            ),
        };

        self.geometry = Some(geometry);
        Ok(())
    }

    /// Write the per-tick uniform parameters.
    pub fn write_params(&self, ctx: &GpuContext, force: &TreeForceParams) -> Result<()> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| SimError::Compute("tree engine has no allocated geometry".into()))?;
        let raw = TreeParamsRaw {
            num_bodies: geometry.num_bodies,
            num_nodes: geometry.num_nodes,
            max_depth: self.max_depth,
            padded_bodies: geometry.padded_bodies,
            num_groups: workgroups_for(geometry.num_bodies),
            step: force.step,
            flags: force.flags,
            theta: force.theta,
            repulsion: force.repulsion,
            gravity: force.gravity,
            overlap_distance: force.overlap_distance,
            dt: force.dt,
            damping: force.damping,
            ..Default::default()
        };
        ctx.queue
            .write_buffer(&geometry.tree_params, 0, bytemuck::bytes_of(&raw));
        Ok(())
    }

    /// Encode one full tree tick: bounds, build, mass accumulation, sort,
    /// force evaluation, integration.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) -> Result<()> {
        let g = self
            .geometry
            .as_ref()
            .ok_or_else(|| SimError::Compute("tree engine has no allocated geometry".into()))?;
        let p = &self.pipelines;

        // Last tick's accumulators must never leak into this build.
        encoder.clear_buffer(&g.x_sums, 0, None);
        encoder.clear_buffer(&g.y_sums, 0, None);
        encoder.clear_buffer(&g.count, 0, None);
        encoder.clear_buffer(&g.start, 0, None);

        let body_groups = workgroups_for(g.num_bodies);
        let padded_groups = workgroups_for(g.padded_bodies);
        let node_groups = workgroups_for(g.num_nodes);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("tree build pass"),
                timestamp_writes: None,
            });

            pass.set_pipeline(&p.weigh.pipeline);
            pass.set_bind_group(0, &g.bind_weigh, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);

            pass.set_pipeline(&p.bound_box.pipeline);
            pass.set_bind_group(0, &g.bind_bounds, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);

            pass.set_pipeline(&p.bound_combine.pipeline);
            pass.set_bind_group(0, &g.bind_combine, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }

        // The combine pass writes bounds into storage; the later passes read
        // them as a uniform.
        encoder.copy_buffer_to_buffer(&g.tree_state, 0, &g.tree_bounds, 0, 32);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("tree sort and force pass"),
                timestamp_writes: None,
            });

            pass.set_pipeline(&p.cell_keys.pipeline);
            pass.set_bind_group(0, &g.bind_keys, &[]);
            pass.dispatch_workgroups(padded_groups, 1, 1);

            pass.set_pipeline(&p.sort_step.pipeline);
            for stage in 0..g.num_stages {
                let offset = (stage as u64 * SORT_STAGE_STRIDE) as u32;
                pass.set_bind_group(0, &g.bind_sort, &[offset]);
                pass.dispatch_workgroups(padded_groups, 1, 1);
            }

            pass.set_pipeline(&p.start_offsets.pipeline);
            pass.set_bind_group(0, &g.bind_starts, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);

            pass.set_pipeline(&p.build.pipeline);
            pass.set_bind_group(0, &g.bind_build, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);

            pass.set_pipeline(&p.sums.pipeline);
            pass.set_bind_group(0, &g.bind_sums, &[]);
            pass.dispatch_workgroups(node_groups, 1, 1);

            pass.set_pipeline(&p.forces.pipeline);
            pass.set_bind_group(0, &g.bind_forces, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);

            pass.set_pipeline(&p.integrate.pipeline);
            pass.set_bind_group(0, &g.bind_integrate, &[]);
            pass.dispatch_workgroups(body_groups, 1, 1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_size_matches_level_sums() {
        assert_eq!(tree_size_for_depth(0), 1);
        assert_eq!(tree_size_for_depth(1), 5);
        assert_eq!(tree_size_for_depth(2), 21);
        assert_eq!(tree_size_for_depth(3), 85);
    }

    #[test]
    fn depth_provisions_a_multiple_of_bodies() {
        // 4x provisioning: 100 bodies want >= 400 cells, depth 4 holds 341,
        // depth 5 holds 1365.
        let depth = depth_for_bodies(100, 4);
        assert_eq!(depth, 5);
        assert!(tree_size_for_depth(depth) >= 400);
        assert!(tree_size_for_depth(depth - 1) < 400);
    }

    #[test]
    fn depth_has_a_floor_and_a_ceiling() {
        assert_eq!(depth_for_bodies(1, 4), 1);
        assert_eq!(depth_for_bodies(u32::MAX / 8, 4), 12);
    }

    #[test]
    fn bitonic_schedule_covers_all_stages() {
        assert!(sort_stages(1).is_empty());
        assert_eq!(sort_stages(2), vec![(2, 1)]);
        assert_eq!(sort_stages(4), vec![(2, 1), (4, 2), (4, 1)]);
        // m = log2(n) gives m * (m + 1) / 2 stages.
        assert_eq!(sort_stages(1024).len(), 10 * 11 / 2);
    }

    #[test]
    fn bitonic_schedule_sorts_on_the_host() {
        // Mirror of the shader's compare-exchange, run over the schedule.
        let mut keys: Vec<u32> = vec![9, 3, 7, 1, 8, 2, 5, 0];
        let n = keys.len() as u32;
        for (k, j) in sort_stages(n) {
            for i in 0..n {
                let partner = i ^ j;
                if partner > i {
                    let ascending = (i & k) == 0;
                    if (keys[i as usize] > keys[partner as usize]) == ascending {
                        keys.swap(i as usize, partner as usize);
                    }
                }
            }
        }
        assert_eq!(keys, vec![0, 1, 2, 3, 5, 7, 8, 9]);
    }
}
