//! The layout-algorithm abstraction.

use crate::barnes_hut::BarnesHutLayout;
use crate::bundling::EdgeBundling;
use crate::config::PhysicsConfig;
use crate::gpu::GpuContext;
use crate::simulation::SimState;
use crate::spring::SpringLayout;
use crate::Result;

/// One stage of the per-tick layout pipeline.
///
/// Implementations own pipelines and bind groups, never simulation state:
/// positions, counts, and locks live in the [`SimState`] handed to every
/// call. Hooks are invoked by the simulation after the corresponding
/// ingestion step has (re)allocated the registry buffers, and must not cache
/// buffer references across those calls.
pub trait LayoutAlgorithm {
    fn name(&self) -> &'static str;

    /// Point buffers were (re)allocated.
    fn set_points(&mut self, state: &mut SimState) -> Result<()>;

    /// Edge and mid-point buffers were (re)allocated.
    fn set_edges(&mut self, state: &mut SimState) -> Result<()>;

    /// The physics configuration changed; translate the relevant keys into
    /// kernel parameters.
    fn set_physics(&mut self, physics: &PhysicsConfig);

    /// Advance one simulation step.
    fn tick(&mut self, state: &mut SimState, step: u32) -> Result<()>;
}

/// Selectable algorithm variants, composed into an ordered pipeline at
/// simulation creation. Order is data flow: repulsion before relaxation
/// before bundling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    BarnesHut,
    SpringRelax,
    EdgeBundling,
}

impl AlgorithmKind {
    pub(crate) fn build(
        self,
        ctx: &GpuContext,
        node_multiple: u32,
    ) -> Box<dyn LayoutAlgorithm> {
        match self {
            AlgorithmKind::BarnesHut => Box::new(BarnesHutLayout::new(ctx, node_multiple)),
            AlgorithmKind::SpringRelax => Box::new(SpringLayout::new(ctx)),
            AlgorithmKind::EdgeBundling => Box::new(EdgeBundling::new(ctx, node_multiple)),
        }
    }
}
