//! Named, versioned device buffers.
//!
//! The registry is the sole owner of every device-resident buffer in a
//! simulation. Buffers are identified by a stable logical name; algorithms
//! borrow them by name or by [`BufferHandle`] and never keep a handle across a
//! reset. Each buffer carries a version stamp: the value of the global tick
//! counter at its last write. A consumer compares stamps instead of contents
//! to decide whether a buffer changed since it last read it.

use std::collections::HashMap;

use crate::gpu::GpuContext;
use crate::{Result, SimError};

/// Logical buffer names.
///
/// The strings are wire-stable: renderers and tooling key their buffer maps by
/// them, so they are data, not identifiers.
pub mod names {
    pub const CUR_POINTS: &str = "curPoints";
    pub const NEXT_POINTS: &str = "nextPoints";
    pub const RAND_VALUES: &str = "randValues";
    pub const POINT_SIZES: &str = "pointSizes";
    pub const POINT_COLORS: &str = "pointColors";
    pub const EDGE_COLORS: &str = "edgeColors";

    pub const FORWARDS_EDGES: &str = "forwardsEdges";
    pub const FORWARDS_DEGREES: &str = "forwardsDegrees";
    pub const FORWARDS_WORK_ITEMS: &str = "forwardsWorkItems";
    pub const BACKWARDS_EDGES: &str = "backwardsEdges";
    pub const BACKWARDS_DEGREES: &str = "backwardsDegrees";
    pub const BACKWARDS_WORK_ITEMS: &str = "backwardsWorkItems";

    pub const SPRINGS_POS: &str = "springsPos";
    pub const CUR_MID_POINTS: &str = "curMidPoints";
    pub const NEXT_MID_POINTS: &str = "nextMidPoints";
    pub const MID_SPRINGS_POS: &str = "midSpringsPos";
    pub const MID_SPRINGS_COLOR_COORD: &str = "midSpringsColorCoord";
}

/// Stable handle to a registry slot.
///
/// Handles stay valid across resets of the same logical name: the slot is
/// nulled, not removed. A handle that was never issued by this registry fails
/// reverse lookup with [`SimError::InternalConsistency`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(u32);

struct Slot {
    name: String,
    buffer: Option<wgpu::Buffer>,
    byte_len: u64,
}

/// Global tick counter plus per-buffer last-modified stamps.
#[derive(Debug, Default)]
pub struct Versions {
    tick: u64,
    buffers: HashMap<String, u64>,
}

/// Arena of named device buffers with a bidirectional name/handle index.
pub struct BufferRegistry {
    slots: Vec<Slot>,
    index: HashMap<String, u32>,
    versions: Versions,
    max_buffer_size: u64,
}

impl BufferRegistry {
    pub fn new(ctx: &GpuContext) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            versions: Versions::default(),
            max_buffer_size: ctx.device.limits().max_buffer_size,
        }
    }

    /// Current value of the global tick counter.
    pub fn tick(&self) -> u64 {
        self.versions.tick
    }

    /// Last-modified stamp for a logical name, if it was ever stamped.
    pub fn stamp(&self, name: &str) -> Option<u64> {
        self.versions.buffers.get(name).copied()
    }

    /// Advance the global tick counter and return the new value.
    pub fn advance_tick(&mut self) -> u64 {
        self.versions.tick += 1;
        self.versions.tick
    }

    /// Stamp every listed name with `tick`, or with a freshly incremented
    /// global tick when `tick` is `None`.
    ///
    /// An empty name list only advances the counter: the mechanism for "a
    /// tick happened but nothing changed".
    pub fn tick_buffers(&mut self, buffer_names: &[&str], tick: Option<u64>) {
        let tick = match tick {
            Some(t) => t,
            None => self.advance_tick(),
        };
        for name in buffer_names {
            self.versions.buffers.insert((*name).to_owned(), tick);
        }
    }

    /// Allocate a device buffer under `name`, replacing any stale buffer
    /// already held by that slot.
    pub fn create_buffer(
        &mut self,
        ctx: &GpuContext,
        byte_len: u64,
        name: &str,
        usage: wgpu::BufferUsages,
    ) -> Result<BufferHandle> {
        if byte_len == 0 || byte_len > self.max_buffer_size {
            return Err(SimError::Allocation(format!(
                "buffer '{name}' of {byte_len} bytes is outside device limits"
            )));
        }

        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(name),
            size: byte_len,
            usage,
            mapped_at_creation: false,
        });

        let slot_idx = match self.index.get(name) {
            Some(&idx) => {
                let slot = &mut self.slots[idx as usize];
                if let Some(stale) = slot.buffer.take() {
                    tracing::debug!(name, "replacing stale buffer");
                    stale.destroy();
                }
                slot.buffer = Some(buffer);
                slot.byte_len = byte_len;
                idx
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(Slot {
                    name: name.to_owned(),
                    buffer: Some(buffer),
                    byte_len,
                });
                self.index.insert(name.to_owned(), idx);
                idx
            }
        };

        Ok(BufferHandle(slot_idx))
    }

    /// Borrow a buffer by logical name.
    pub fn get(&self, name: &str) -> Option<&wgpu::Buffer> {
        let idx = *self.index.get(name)?;
        self.slots[idx as usize].buffer.as_ref()
    }

    /// Borrow a buffer by logical name, erroring when absent.
    pub fn require(&self, name: &str) -> Result<&wgpu::Buffer> {
        self.get(name)
            .ok_or_else(|| SimError::Compute(format!("buffer '{name}' is not allocated")))
    }

    /// Handle for a logical name, if a slot exists (occupied or not).
    pub fn handle(&self, name: &str) -> Option<BufferHandle> {
        self.index.get(name).map(|&idx| BufferHandle(idx))
    }

    /// Reverse lookup: the logical name a handle was issued for.
    pub fn name_of(&self, handle: BufferHandle) -> Result<&str> {
        self.slots
            .get(handle.0 as usize)
            .map(|slot| slot.name.as_str())
            .ok_or_else(|| {
                SimError::InternalConsistency(format!(
                    "handle {:?} was not issued by this registry",
                    handle
                ))
            })
    }

    /// Byte length recorded for a logical name (0 when absent).
    pub fn byte_len(&self, name: &str) -> u64 {
        self.index
            .get(name)
            .map(|&idx| self.slots[idx as usize].byte_len)
            .unwrap_or(0)
    }

    /// Delete the buffers behind the given handles and null their slots.
    ///
    /// Vacant slots are skipped (they are the "already reset" case). All
    /// affected names are stamped with one freshly incremented tick. The
    /// host-side slot is nulled immediately; device-side deallocation may
    /// complete later and is not observable by callers.
    pub fn reset_buffers(&mut self, handles: &[BufferHandle]) -> Result<()> {
        let mut affected: Vec<u32> = Vec::with_capacity(handles.len());
        for &handle in handles {
            // Validate every handle before mutating anything.
            self.name_of(handle)?;
            if self.slots[handle.0 as usize].buffer.is_some() {
                affected.push(handle.0);
            }
        }
        if affected.is_empty() {
            return Ok(());
        }

        let tick = self.advance_tick();
        for idx in affected {
            let slot = &mut self.slots[idx as usize];
            if let Some(buffer) = slot.buffer.take() {
                buffer.destroy();
            }
            slot.byte_len = 0;
            self.versions.buffers.insert(slot.name.clone(), tick);
        }
        Ok(())
    }

    /// Write `data` into the buffer registered under `name`.
    pub fn write(&self, ctx: &GpuContext, name: &str, data: &[u8]) -> Result<()> {
        let buffer = self.require(name)?;
        ctx.queue.write_buffer(buffer, 0, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BufferRegistry {
        BufferRegistry {
            slots: Vec::new(),
            index: HashMap::new(),
            versions: Versions::default(),
            max_buffer_size: 1 << 30,
        }
    }

    #[test]
    fn empty_tick_advances_counter_only() {
        let mut reg = registry();
        reg.tick_buffers(&[names::CUR_POINTS], None);
        let stamped = reg.stamp(names::CUR_POINTS);

        reg.tick_buffers(&[], None);
        assert_eq!(reg.tick(), 2);
        assert_eq!(reg.stamp(names::CUR_POINTS), stamped);
    }

    #[test]
    fn explicit_tick_is_used_verbatim() {
        let mut reg = registry();
        reg.tick_buffers(&[names::SPRINGS_POS], Some(41));
        assert_eq!(reg.stamp(names::SPRINGS_POS), Some(41));
        // The counter itself is untouched by explicit stamping.
        assert_eq!(reg.tick(), 0);
    }

    #[test]
    fn stamps_are_per_name() {
        let mut reg = registry();
        reg.tick_buffers(&[names::CUR_POINTS, names::NEXT_POINTS], None);
        reg.tick_buffers(&[names::CUR_POINTS], None);
        assert_eq!(reg.stamp(names::CUR_POINTS), Some(2));
        assert_eq!(reg.stamp(names::NEXT_POINTS), Some(1));
        assert_eq!(reg.stamp(names::SPRINGS_POS), None);
    }

    #[test]
    fn foreign_handle_fails_reverse_lookup() {
        let reg = registry();
        let err = reg.name_of(BufferHandle(7)).unwrap_err();
        assert!(matches!(err, SimError::InternalConsistency(_)));
    }
}
