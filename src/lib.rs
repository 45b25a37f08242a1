//! Swarm Arena - lockstep agent simulation in a bounded arena
//!
//! Core modules:
//! - `sim`: Deterministic step engine (boundary geometry, buffers, noise, kernel)
//! - `config`: Serializable setup documents and their validation
//! - `error`: Setup and lifecycle errors

pub mod config;
pub mod error;
pub mod sim;

pub use config::{ArenaSpec, EngineConfig, GroupSpec, InitialPositions, InitialVelocities, Speed};
pub use error::EngineError;
pub use sim::{AgentType, Arena, Behavior, Engine, EnginePhase, Frame, Snapshot};

use glam::Vec2;

/// Engine defaults
pub mod consts {
    /// Only planar geometry is defined for boundary resolution
    pub const SUPPORTED_DIMENSION: usize = 2;

    /// Default group speed (distance per step)
    pub const DEFAULT_SPEED: f32 = 0.01;
    /// Default angular noise coefficient (radians per unit normal draw)
    pub const DEFAULT_ANGULAR_NOISE: f32 = 0.1;
    /// Default speed noise coefficient
    pub const DEFAULT_SPEED_NOISE: f32 = 0.0;

    /// Below this many agents a step runs on the calling thread
    pub const PARALLEL_THRESHOLD: usize = 512;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_range() {
        for raw in [-7.0, -PI, -0.5, 0.0, 0.5, PI, 3.5 * PI, 100.0] {
            let a = normalize_angle(raw);
            assert!((-PI..PI).contains(&a), "{raw} -> {a}");
            assert!((a.cos() - raw.cos()).abs() < 1e-4);
            assert!((a.sin() - raw.sin()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_polar_round_trip() {
        let p = polar_to_cartesian(2.0, 0.75);
        let (r, theta) = cartesian_to_polar(p);
        assert!((r - 2.0).abs() < 1e-5);
        assert!((theta - 0.75).abs() < 1e-5);
    }
}
