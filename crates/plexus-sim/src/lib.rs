//! GPU-accelerated n-body graph layout simulation with edge bundling.
//!
//! The crate maintains graph positions as device-resident buffers and advances
//! them toward a force-equilibrium layout with an ordered pipeline of layout
//! algorithms, each a set of compute passes over buffers owned by a central
//! registry:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Ingestion                             │
//! │  set_points / set_edges ──▶ BufferRegistry (named, versioned)│
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     tick(step) scheduler                     │
//! │  ┌────────────┐   ┌──────────────┐   ┌───────────────┐       │
//! │  │ Barnes-Hut │──▶│ Spring relax │──▶│ Edge bundling │       │
//! │  │ (repulsion)│   │ (attraction) │   │ (mid-points)  │       │
//! │  └────────────┘   └──────────────┘   └───────────────┘       │
//! │                 ... then one device drain per tick           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Points and edges arrive as flat typed slices (f32 coordinate pairs, u32
//! index pairs, packed RGBA colors). The hierarchical repulsion engine builds
//! an implicit quad-tree on the device every tick; bundling runs a reduced
//! instance of the same engine over per-edge mid-points. Render-visible
//! buffers (positions, sizes, colors, edge geometry) are shared with a
//! [`RenderTarget`] collaborator; everything else stays device-only.

mod algorithm;
mod barnes_hut;
mod bundling;
mod config;
mod error;
mod gpu;
mod registry;
mod render;
mod shaders;
mod simulation;
mod spring;
mod tree;
mod tree_shaders;

pub use algorithm::{AlgorithmKind, LayoutAlgorithm};
pub use config::{LockConfig, LockUpdate, PhysicsConfig, PhysicsUpdate};
pub use error::SimError;
pub use gpu::GpuContext;
pub use registry::{names, BufferHandle, BufferRegistry};
pub use render::{HeadlessTarget, RenderCounts, RenderTarget};
pub use simulation::{EdgeList, SimConfig, SimState, Simulation};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Number of coordinate elements per point (2-D layouts).
pub const ELEMENTS_PER_POINT: u32 = 2;

/// Number of index elements per edge (source, target).
pub const ELEMENTS_PER_EDGE: u32 = 2;

/// Number of elements per work item (start offset, run length).
pub const ELEMENTS_PER_WORK_ITEM: u32 = 2;

/// Size of the per-point random seed pool, in seeds.
pub const RAND_LENGTH: u32 = 73;
