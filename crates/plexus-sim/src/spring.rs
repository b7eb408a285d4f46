//! Local spring relaxation over the edge lists.
//!
//! Runs after the repulsion pass: each work item walks its run of edges and
//! nudges the run's source endpoints toward the configured rest length. The
//! forwards and backwards lists together correct both endpoints of every
//! edge. A final per-edge pass rewrites the straight-edge render geometry.

use bytemuck::{Pod, Zeroable};

use crate::algorithm::LayoutAlgorithm;
use crate::config::PhysicsConfig;
use crate::gpu::{workgroups_for, Binding, GpuContext, KernelPipeline};
use crate::registry::names;
use crate::shaders::{EDGE_GEOMETRY_SHADER, SPRING_SHADER};
use crate::simulation::SimState;
use crate::Result;

#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct SpringParamsRaw {
    num_work_items: u32,
    num_edges: u32,
    flags: u32,
    step: u32,
    strength: f32,
    distance: f32,
    _pad0: u32,
    _pad1: u32,
}

const FORWARD_PARAMS: &str = "springParams";
const BACKWARD_PARAMS: &str = "springParamsBackwards";

struct SpringBindings {
    forwards: wgpu::BindGroup,
    backwards: wgpu::BindGroup,
    geometry: wgpu::BindGroup,
    forward_params: wgpu::Buffer,
    backward_params: wgpu::Buffer,
}

pub struct SpringLayout {
    relax: KernelPipeline,
    geometry: KernelPipeline,
    bindings: Option<SpringBindings>,
    physics: PhysicsConfig,
    flags: u32,
}

impl SpringLayout {
    pub fn new(ctx: &GpuContext) -> Self {
        use Binding::{ReadStorage, Storage, Uniform};
        let relax = KernelPipeline::new(
            ctx,
            "spring_relax",
            SPRING_SHADER,
            &[ReadStorage, ReadStorage, ReadStorage, ReadStorage, Storage, Uniform],
        );
        let geometry = KernelPipeline::new(
            ctx,
            "edge_geometry",
            EDGE_GEOMETRY_SHADER,
            &[ReadStorage, ReadStorage, Storage, Uniform],
        );
        Self {
            relax,
            geometry,
            bindings: None,
            physics: PhysicsConfig::default(),
            flags: 0,
        }
    }

    fn write_params(&self, state: &SimState) -> Result<()> {
        let bindings = self.bindings.as_ref().expect("bindings checked by caller");
        let common = SpringParamsRaw {
            num_edges: state.num_edges,
            flags: self.flags,
            strength: self.physics.spring_strength,
            distance: self.physics.spring_distance,
            ..Default::default()
        };
        let forwards = SpringParamsRaw {
            num_work_items: state.num_forwards_work_items,
            ..common
        };
        let backwards = SpringParamsRaw {
            num_work_items: state.num_backwards_work_items,
            ..common
        };
        state
            .ctx
            .queue
            .write_buffer(&bindings.forward_params, 0, bytemuck::bytes_of(&forwards));
        state
            .ctx
            .queue
            .write_buffer(&bindings.backward_params, 0, bytemuck::bytes_of(&backwards));
        Ok(())
    }
}

impl LayoutAlgorithm for SpringLayout {
    fn name(&self) -> &'static str {
        "spring_relax"
    }

    fn set_points(&mut self, _state: &mut SimState) -> Result<()> {
        self.bindings = None;
        Ok(())
    }

    fn set_edges(&mut self, state: &mut SimState) -> Result<()> {
        let uniform = wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST;
        let params_len = std::mem::size_of::<SpringParamsRaw>() as u64;
        state
            .registry
            .create_buffer(&state.ctx, params_len, FORWARD_PARAMS, uniform)?;
        state
            .registry
            .create_buffer(&state.ctx, params_len, BACKWARD_PARAMS, uniform)?;

        let registry = &state.registry;
        let forward_params = registry.require(FORWARD_PARAMS)?.clone();
        let backward_params = registry.require(BACKWARD_PARAMS)?.clone();
        let cur = registry.require(names::CUR_POINTS)?;
        let next = registry.require(names::NEXT_POINTS)?;

        let forwards = self.relax.bind(
            &state.ctx,
            "spring_relax forwards",
            &[
                registry.require(names::FORWARDS_EDGES)?,
                registry.require(names::FORWARDS_WORK_ITEMS)?,
                registry.require(names::FORWARDS_DEGREES)?,
                cur,
                next,
                &forward_params,
            ],
        );
        let backwards = self.relax.bind(
            &state.ctx,
            "spring_relax backwards",
            &[
                registry.require(names::BACKWARDS_EDGES)?,
                registry.require(names::BACKWARDS_WORK_ITEMS)?,
                registry.require(names::BACKWARDS_DEGREES)?,
                cur,
                next,
                &backward_params,
            ],
        );
        let geometry = self.geometry.bind(
            &state.ctx,
            "edge_geometry",
            &[
                registry.require(names::FORWARDS_EDGES)?,
                cur,
                registry.require(names::SPRINGS_POS)?,
                &forward_params,
            ],
        );

        self.bindings = Some(SpringBindings {
            forwards,
            backwards,
            geometry,
            forward_params,
            backward_params,
        });
        Ok(())
    }

    fn set_physics(&mut self, physics: &PhysicsConfig) {
        self.physics = *physics;
        self.flags = physics.flags();
    }

    fn tick(&mut self, state: &mut SimState, _step: u32) -> Result<()> {
        if state.num_edges == 0 {
            return Ok(());
        }
        let Some(bindings) = self.bindings.as_ref() else {
            tracing::debug!("no spring bindings yet, skipping relaxation pass");
            return Ok(());
        };

        let relax_points = !state.locked.lock_points;
        let write_geometry = !state.locked.lock_edges;
        if !relax_points && !write_geometry {
            return Ok(());
        }

        self.write_params(state)?;

        let registry = &state.registry;
        let cur = registry.require(names::CUR_POINTS)?;
        let next = registry.require(names::NEXT_POINTS)?;
        let points_len = registry.byte_len(names::CUR_POINTS);

        let mut encoder = state
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spring tick"),
            });

        if relax_points {
            // Seed the output with the untouched positions, then fold in
            // each direction's corrections.
            encoder.copy_buffer_to_buffer(cur, 0, next, 0, points_len);
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("spring forwards"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.relax.pipeline);
                pass.set_bind_group(0, &bindings.forwards, &[]);
                pass.dispatch_workgroups(workgroups_for(state.num_forwards_work_items), 1, 1);
            }
            encoder.copy_buffer_to_buffer(next, 0, cur, 0, points_len);
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("spring backwards"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.relax.pipeline);
                pass.set_bind_group(0, &bindings.backwards, &[]);
                pass.dispatch_workgroups(workgroups_for(state.num_backwards_work_items), 1, 1);
            }
            encoder.copy_buffer_to_buffer(next, 0, cur, 0, points_len);
        }
        if write_geometry {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("edge geometry"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.geometry.pipeline);
            pass.set_bind_group(0, &bindings.geometry, &[]);
            pass.dispatch_workgroups(workgroups_for(state.num_edges), 1, 1);
        }

        state.ctx.queue.submit(Some(encoder.finish()));
        if relax_points {
            state
                .registry
                .tick_buffers(&[names::CUR_POINTS, names::NEXT_POINTS], None);
        }
        if write_geometry {
            state.registry.tick_buffers(&[names::SPRINGS_POS], None);
        }
        Ok(())
    }
}
