//! Lock and physics configuration.

/// Per-entity-class freeze switches.
///
/// A locked class keeps its positions/geometry byte-identical across ticks
/// while its version stamps keep advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    pub lock_points: bool,
    pub lock_midpoints: bool,
    pub lock_edges: bool,
    pub lock_midedges: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_points: false,
            lock_midpoints: true,
            lock_edges: false,
            lock_midedges: true,
        }
    }
}

/// Partial update merged into a [`LockConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LockUpdate {
    pub lock_points: Option<bool>,
    pub lock_midpoints: Option<bool>,
    pub lock_edges: Option<bool>,
    pub lock_midedges: Option<bool>,
}

impl LockConfig {
    pub fn apply(&mut self, update: LockUpdate) {
        if let Some(v) = update.lock_points {
            self.lock_points = v;
        }
        if let Some(v) = update.lock_midpoints {
            self.lock_midpoints = v;
        }
        if let Some(v) = update.lock_edges {
            self.lock_edges = v;
        }
        if let Some(v) = update.lock_midedges {
            self.lock_midedges = v;
        }
    }
}

/// Bit positions of the packed boolean force modifiers.
pub const FLAG_PREVENT_OVERLAP: u32 = 1 << 0;
pub const FLAG_STRONG_GRAVITY: u32 = 1 << 1;
pub const FLAG_DISSUADE_HUBS: u32 = 1 << 2;
pub const FLAG_LIN_LOG: u32 = 1 << 3;

/// Numeric and boolean physics parameters.
///
/// The `mid_*` family parameterizes the reduced force pipeline that edge
/// bundling runs over mid-points, independently of the point-level values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Barnes-Hut opening angle for the point engine.
    pub theta: f32,
    pub repulsion: f32,
    pub gravity: f32,
    /// Distance under which overlap prevention boosts repulsion.
    pub overlap_distance: f32,
    pub spring_strength: f32,
    pub spring_distance: f32,

    pub mid_theta: f32,
    pub mid_repulsion: f32,
    pub mid_gravity: f32,
    pub mid_spring_strength: f32,
    pub mid_spring_distance: f32,

    pub dt: f32,
    pub damping: f32,

    pub prevent_overlap: bool,
    pub strong_gravity: bool,
    pub dissuade_hubs: bool,
    pub lin_log: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            theta: 0.5,
            repulsion: 1000.0,
            gravity: 0.1,
            overlap_distance: 10.0,
            spring_strength: 0.1,
            spring_distance: 50.0,
            mid_theta: 0.8,
            mid_repulsion: 60.0,
            mid_gravity: 0.0,
            mid_spring_strength: 0.3,
            mid_spring_distance: 10.0,
            dt: 0.016,
            damping: 0.85,
            prevent_overlap: false,
            strong_gravity: false,
            dissuade_hubs: false,
            lin_log: false,
        }
    }
}

impl PhysicsConfig {
    /// Pack the boolean modifiers into the kernel flags word.
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.prevent_overlap {
            flags |= FLAG_PREVENT_OVERLAP;
        }
        if self.strong_gravity {
            flags |= FLAG_STRONG_GRAVITY;
        }
        if self.dissuade_hubs {
            flags |= FLAG_DISSUADE_HUBS;
        }
        if self.lin_log {
            flags |= FLAG_LIN_LOG;
        }
        flags
    }

    pub fn apply(&mut self, update: PhysicsUpdate) {
        macro_rules! merge {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(v) = update.$field { self.$field = v; })+
            };
        }
        merge!(
            theta,
            repulsion,
            gravity,
            overlap_distance,
            spring_strength,
            spring_distance,
            mid_theta,
            mid_repulsion,
            mid_gravity,
            mid_spring_strength,
            mid_spring_distance,
            dt,
            damping,
            prevent_overlap,
            strong_gravity,
            dissuade_hubs,
            lin_log,
        );
    }
}

/// Partial update merged into a [`PhysicsConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsUpdate {
    pub theta: Option<f32>,
    pub repulsion: Option<f32>,
    pub gravity: Option<f32>,
    pub overlap_distance: Option<f32>,
    pub spring_strength: Option<f32>,
    pub spring_distance: Option<f32>,
    pub mid_theta: Option<f32>,
    pub mid_repulsion: Option<f32>,
    pub mid_gravity: Option<f32>,
    pub mid_spring_strength: Option<f32>,
    pub mid_spring_distance: Option<f32>,
    pub dt: Option<f32>,
    pub damping: Option<f32>,
    pub prevent_overlap: Option<bool>,
    pub strong_gravity: Option<bool>,
    pub dissuade_hubs: Option<bool>,
    pub lin_log: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_defaults_freeze_mid_geometry_only() {
        let locks = LockConfig::default();
        assert!(!locks.lock_points);
        assert!(locks.lock_midpoints);
        assert!(!locks.lock_edges);
        assert!(locks.lock_midedges);
    }

    #[test]
    fn lock_update_merges_partially() {
        let mut locks = LockConfig::default();
        locks.apply(LockUpdate {
            lock_points: Some(true),
            lock_midedges: Some(false),
            ..Default::default()
        });
        assert!(locks.lock_points);
        assert!(locks.lock_midpoints);
        assert!(!locks.lock_midedges);
    }

    #[test]
    fn flags_pack_in_declared_order() {
        let mut physics = PhysicsConfig::default();
        assert_eq!(physics.flags(), 0);

        physics.prevent_overlap = true;
        physics.dissuade_hubs = true;
        assert_eq!(physics.flags(), 0b0101);

        physics.strong_gravity = true;
        physics.lin_log = true;
        assert_eq!(physics.flags(), 0b1111);
    }

    #[test]
    fn physics_update_leaves_unset_fields_alone() {
        let mut physics = PhysicsConfig::default();
        let distance = physics.spring_distance;
        physics.apply(PhysicsUpdate {
            gravity: Some(2.5),
            lin_log: Some(true),
            ..Default::default()
        });
        assert_eq!(physics.gravity, 2.5);
        assert!(physics.lin_log);
        assert_eq!(physics.spring_distance, distance);
    }
}
