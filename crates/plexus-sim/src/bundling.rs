//! Edge bundling over per-edge mid-point chains.
//!
//! Two independent phases per tick, each gated by its own lock flag:
//! a reduced hierarchical force pass treating mid-points as bodies (keeps
//! bundled paths visually separated), then a spring relaxation of each edge's
//! chain through its mid-points, emitting the curved render geometry and
//! color interpolation coordinates. Locked phases copy the previous buffer
//! forward unchanged while the version stamps keep advancing.

use bytemuck::{Pod, Zeroable};

use crate::algorithm::LayoutAlgorithm;
use crate::config::{PhysicsConfig, FLAG_DISSUADE_HUBS};
use crate::gpu::{workgroups_for, Binding, GpuContext, KernelPipeline};
use crate::registry::names;
use crate::shaders::MID_SPRINGS_SHADER;
use crate::simulation::SimState;
use crate::tree::{TreeEngine, TreeForceParams};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct MidParamsRaw {
    num_work_items: u32,
    num_edges: u32,
    num_splits: u32,
    step: u32,
    strength: f32,
    distance: f32,
    _pad0: u32,
    _pad1: u32,
}

const MID_PARAMS: &str = "midSpringsParams";

struct MidBindings {
    springs: wgpu::BindGroup,
    params: wgpu::Buffer,
}

pub struct EdgeBundling {
    engine: TreeEngine,
    mid_springs: KernelPipeline,
    bindings: Option<MidBindings>,
    physics: PhysicsConfig,
    flags: u32,
}

impl EdgeBundling {
    pub fn new(ctx: &GpuContext, node_multiple: u32) -> Self {
        use Binding::{ReadStorage, Storage, Uniform};
        let mid_springs = KernelPipeline::new(
            ctx,
            "mid_springs",
            MID_SPRINGS_SHADER,
            &[
                ReadStorage,
                ReadStorage,
                ReadStorage,
                ReadStorage,
                Storage,
                Storage,
                Storage,
                Uniform,
            ],
        );
        Self {
            engine: TreeEngine::new(ctx, "mid_", node_multiple),
            mid_springs,
            bindings: None,
            physics: PhysicsConfig::default(),
            flags: 0,
        }
    }
}

impl LayoutAlgorithm for EdgeBundling {
    fn name(&self) -> &'static str {
        "edge_bundling"
    }

    fn set_points(&mut self, _state: &mut SimState) -> Result<()> {
        self.engine.invalidate();
        self.bindings = None;
        Ok(())
    }

    fn set_edges(&mut self, state: &mut SimState) -> Result<()> {
        if state.num_mid_points > 0 {
            self.engine.alloc(
                &state.ctx,
                &mut state.registry,
                state.num_mid_points,
                names::CUR_MID_POINTS,
                names::NEXT_MID_POINTS,
            )?;
        } else {
            self.engine.invalidate();
        }

        state.registry.create_buffer(
            &state.ctx,
            std::mem::size_of::<MidParamsRaw>() as u64,
            MID_PARAMS,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;

        let registry = &state.registry;
        let params = registry.require(MID_PARAMS)?.clone();
        let springs = self.mid_springs.bind(
            &state.ctx,
            "mid_springs",
            &[
                registry.require(names::FORWARDS_EDGES)?,
                registry.require(names::FORWARDS_WORK_ITEMS)?,
                registry.require(names::CUR_POINTS)?,
                registry.require(names::NEXT_MID_POINTS)?,
                registry.require(names::CUR_MID_POINTS)?,
                registry.require(names::MID_SPRINGS_POS)?,
                registry.require(names::MID_SPRINGS_COLOR_COORD)?,
                &params,
            ],
        );
        self.bindings = Some(MidBindings { springs, params });
        Ok(())
    }

    fn set_physics(&mut self, physics: &PhysicsConfig) {
        self.physics = *physics;
        // Hub dissuasion is meaningless for mid-points; every chain control
        // point has the same connectivity.
        self.flags = physics.flags() & !FLAG_DISSUADE_HUBS;
    }

    fn tick(&mut self, state: &mut SimState, step: u32) -> Result<()> {
        if state.num_mid_points == 0 && state.num_edges == 0 {
            return Ok(());
        }
        let locks = state.locked;
        if locks.lock_midpoints && locks.lock_midedges {
            // Fully frozen: contents stay byte-identical, stamps advance.
            state
                .registry
                .tick_buffers(&[names::NEXT_MID_POINTS, names::CUR_MID_POINTS], None);
            return Ok(());
        }

        let mut encoder = state
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("edge_bundling tick"),
            });

        // Phase 1: mid-point repulsion, curMidPoints -> nextMidPoints.
        if state.num_mid_points > 0 {
            if locks.lock_midpoints || !self.engine.is_ready() {
                let cur = state.registry.require(names::CUR_MID_POINTS)?;
                let next = state.registry.require(names::NEXT_MID_POINTS)?;
                encoder.copy_buffer_to_buffer(
                    cur,
                    0,
                    next,
                    0,
                    state.registry.byte_len(names::CUR_MID_POINTS),
                );
            } else {
                self.engine.write_params(
                    &state.ctx,
                    &TreeForceParams {
                        theta: self.physics.mid_theta,
                        repulsion: self.physics.mid_repulsion,
                        gravity: self.physics.mid_gravity,
                        overlap_distance: self.physics.overlap_distance,
                        dt: self.physics.dt,
                        damping: self.physics.damping,
                        flags: self.flags,
                        step,
                    },
                )?;
                self.engine.encode(&mut encoder)?;
            }
        }

        // Phase 2: chain relaxation and geometry, nextMidPoints ->
        // curMidPoints, or an identity copy when frozen.
        let relax_chains = state.num_edges > 0 && !locks.lock_midedges;
        if relax_chains {
            let bindings = self
                .bindings
                .as_ref()
                .ok_or_else(|| crate::SimError::Compute("mid-spring bindings missing".into()))?;
            // Without mid-points every edge renders as its single closing
            // segment, whatever the configured subdivision.
            let num_splits = if state.num_mid_points == 0 {
                0
            } else {
                state.num_splits
            };
            let raw = MidParamsRaw {
                num_work_items: state.num_forwards_work_items,
                num_edges: state.num_edges,
                num_splits,
                step,
                strength: self.physics.mid_spring_strength,
                distance: self.physics.mid_spring_distance,
                ..Default::default()
            };
            state
                .ctx
                .queue
                .write_buffer(&bindings.params, 0, bytemuck::bytes_of(&raw));

            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mid springs"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.mid_springs.pipeline);
            pass.set_bind_group(0, &bindings.springs, &[]);
            pass.dispatch_workgroups(workgroups_for(state.num_forwards_work_items), 1, 1);
        } else if state.num_mid_points > 0 {
            let next = state.registry.require(names::NEXT_MID_POINTS)?;
            let cur = state.registry.require(names::CUR_MID_POINTS)?;
            encoder.copy_buffer_to_buffer(
                next,
                0,
                cur,
                0,
                state.registry.byte_len(names::NEXT_MID_POINTS),
            );
        }

        state.ctx.queue.submit(Some(encoder.finish()));

        if state.num_mid_points > 0 {
            state.registry.tick_buffers(&[names::NEXT_MID_POINTS], None);
        }
        if relax_chains {
            state.registry.tick_buffers(
                &[
                    names::CUR_MID_POINTS,
                    names::MID_SPRINGS_POS,
                    names::MID_SPRINGS_COLOR_COORD,
                ],
                None,
            );
        } else if state.num_mid_points > 0 {
            state.registry.tick_buffers(&[names::CUR_MID_POINTS], None);
        }
        Ok(())
    }
}
