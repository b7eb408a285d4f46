//! Hierarchical n-body repulsion over the graph's points.

use crate::algorithm::LayoutAlgorithm;
use crate::config::PhysicsConfig;
use crate::gpu::GpuContext;
use crate::registry::names;
use crate::simulation::SimState;
use crate::tree::{TreeEngine, TreeForceParams};
use crate::Result;

pub struct BarnesHutLayout {
    engine: TreeEngine,
    physics: PhysicsConfig,
    flags: u32,
}

impl BarnesHutLayout {
    pub fn new(ctx: &GpuContext, node_multiple: u32) -> Self {
        Self {
            engine: TreeEngine::new(ctx, "", node_multiple),
            physics: PhysicsConfig::default(),
            flags: 0,
        }
    }
}

impl LayoutAlgorithm for BarnesHutLayout {
    fn name(&self) -> &'static str {
        "barnes_hut"
    }

    fn set_points(&mut self, _state: &mut SimState) -> Result<()> {
        // Body count changed; geometry is rebuilt on the next edge setup.
        self.engine.invalidate();
        Ok(())
    }

    fn set_edges(&mut self, state: &mut SimState) -> Result<()> {
        self.engine.alloc(
            &state.ctx,
            &mut state.registry,
            state.num_points,
            names::CUR_POINTS,
            names::NEXT_POINTS,
        )
    }

    fn set_physics(&mut self, physics: &PhysicsConfig) {
        self.physics = *physics;
        self.flags = physics.flags();
    }

    fn tick(&mut self, state: &mut SimState, step: u32) -> Result<()> {
        if state.locked.lock_points {
            // Positions stay frozen; the version bookkeeping still happens.
            state
                .registry
                .tick_buffers(&[names::CUR_POINTS, names::NEXT_POINTS], None);
            return Ok(());
        }
        if !self.engine.is_ready() {
            tracing::debug!("no tree geometry yet, skipping repulsion pass");
            return Ok(());
        }

        self.engine.write_params(
            &state.ctx,
            &TreeForceParams {
                theta: self.physics.theta,
                repulsion: self.physics.repulsion,
                gravity: self.physics.gravity,
                overlap_distance: self.physics.overlap_distance,
                dt: self.physics.dt,
                damping: self.physics.damping,
                flags: self.flags,
                step,
            },
        )?;

        let mut encoder = state
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("barnes_hut tick"),
            });
        self.engine.encode(&mut encoder)?;

        // Publish the integrated positions back to the canonical buffer.
        let next = state.registry.require(names::NEXT_POINTS)?;
        let cur = state.registry.require(names::CUR_POINTS)?;
        encoder.copy_buffer_to_buffer(next, 0, cur, 0, state.registry.byte_len(names::CUR_POINTS));

        state.ctx.queue.submit(Some(encoder.finish()));
        state
            .registry
            .tick_buffers(&[names::CUR_POINTS, names::NEXT_POINTS], None);
        Ok(())
    }
}
