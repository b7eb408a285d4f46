//! Error types for the simulation core.

use thiserror::Error;

/// Errors that can occur while building or driving a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// Failed to acquire a GPU adapter or device.
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    /// Malformed or empty input, rejected before any device resource is touched.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The backend refused a buffer allocation.
    #[error("buffer allocation failed: {0}")]
    Allocation(String),

    /// A buffer handle could not be mapped back to its logical name.
    /// This is a programmer bug, not a recoverable runtime condition.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// A compute pass could not be encoded or a required buffer was missing.
    #[error("compute failure: {0}")]
    Compute(String),

    /// Failed to read data back from the device.
    #[error("GPU readback failed: {0}")]
    Readback(String),
}
