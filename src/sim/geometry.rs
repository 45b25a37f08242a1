//! Arena boundary resolution
//!
//! A tentative move may leave the arena. Resolving it depends on the arena
//! topology and on whether each edge wraps (periodic) or bounces (reflective):
//!
//! - Rectangular: each axis is handled independently, so a corner overshoot
//!   wraps or mirrors both coordinates in one pass.
//! - Circular periodic: the agent reappears diametrically opposite, at a
//!   radius mirrored about the rim. Velocity is untouched.
//! - Circular reflective: the path is cut where it crosses the rim and the
//!   leftover travel is folded back specularly about the local normal.

use glam::Vec2;

use crate::error::{EngineError, Result};
use crate::{cartesian_to_polar, polar_to_cartesian};

/// Arena shape and boundary policy. Immutable for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arena {
    /// Disk of the given radius centred on the origin
    Circular { radius: f32, periodic: bool },
    /// Axis-aligned box spanning `[-half_extents, half_extents]`
    Rectangular {
        half_extents: Vec2,
        periodic: [bool; 2],
    },
}

impl Arena {
    pub fn circular(radius: f32, periodic: bool) -> Self {
        Arena::Circular { radius, periodic }
    }

    pub fn rectangular(half_x: f32, half_y: f32, periodic: [bool; 2]) -> Self {
        Arena::Rectangular {
            half_extents: Vec2::new(half_x, half_y),
            periodic,
        }
    }

    /// Reject extents that would make the resolver produce non-finite state
    pub fn validate(&self) -> Result<()> {
        let degenerate = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::DegenerateArena(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        };
        match *self {
            Arena::Circular { radius, .. } => degenerate("radius", radius),
            Arena::Rectangular { half_extents, .. } => {
                degenerate("half-extent x", half_extents.x)?;
                degenerate("half-extent y", half_extents.y)
            }
        }
    }

    /// Whether a point lies inside the closed arena
    pub fn contains(&self, p: Vec2) -> bool {
        match *self {
            Arena::Circular { radius, .. } => p.length() <= radius,
            Arena::Rectangular { half_extents, .. } => {
                p.x.abs() <= half_extents.x && p.y.abs() <= half_extents.y
            }
        }
    }
}

/// Resolve a tentative move into a valid (position, velocity) pair.
///
/// `old` is the position at the start of the step, `candidate` the
/// unconstrained end point and `velocity` the (already reoriented)
/// displacement for this step.
pub fn resolve(old: Vec2, candidate: Vec2, velocity: Vec2, arena: &Arena) -> (Vec2, Vec2) {
    match *arena {
        Arena::Circular { radius, periodic } => {
            if candidate.length() <= radius {
                (candidate, velocity)
            } else if periodic {
                (wrap_circular(candidate, radius), velocity)
            } else {
                reflect_circular(old, velocity, radius)
            }
        }
        Arena::Rectangular {
            half_extents,
            periodic,
        } => {
            let (px, vx) = resolve_axis(candidate.x, velocity.x, half_extents.x, periodic[0]);
            let (py, vy) = resolve_axis(candidate.y, velocity.y, half_extents.y, periodic[1]);
            (Vec2::new(px, py), Vec2::new(vx, vy))
        }
    }
}

/// One axis of a rectangular arena
#[inline]
fn resolve_axis(x: f32, v: f32, half: f32, periodic: bool) -> (f32, f32) {
    if periodic {
        if x > half {
            (x - 2.0 * half, v)
        } else if x < -half {
            (x + 2.0 * half, v)
        } else {
            (x, v)
        }
    } else if x > half {
        (2.0 * half - x, -v)
    } else if x < -half {
        (-2.0 * half - x, -v)
    } else {
        (x, v)
    }
}

/// Reappear on the opposite side, radius mirrored about the rim
#[inline]
fn wrap_circular(candidate: Vec2, radius: f32) -> Vec2 {
    let (r, theta) = cartesian_to_polar(candidate);
    polar_to_cartesian(2.0 * radius - r, theta + std::f32::consts::PI)
}

/// Specular bounce off the rim of a circular arena
fn reflect_circular(old: Vec2, velocity: Vec2, radius: f32) -> (Vec2, Vec2) {
    let (speed, heading) = cartesian_to_polar(velocity);

    // Perpendicular offset of the path from the centre fixes where it meets the rim
    let offset = old.y * heading.cos() - old.x * heading.sin();
    let phi = heading + (offset / radius).clamp(-1.0, 1.0).asin();
    let crossing = polar_to_cartesian(radius, phi);

    let normal = Vec2::new(phi.cos(), phi.sin());
    let reflected = reflect_velocity(velocity, normal);
    let remaining = speed - (crossing - old).length();

    let position = crossing + reflected.normalize_or_zero() * remaining;
    (position, reflected)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_inside_is_untouched() {
        let arena = Arena::rectangular(1.0, 1.0, [false, true]);
        let step = Vec2::new(0.5, -0.5);
        let (p, v) = resolve(Vec2::ZERO, step, step, &arena);
        assert_eq!(p, step);
        assert_eq!(v, step);

        let arena = Arena::circular(1.0, false);
        let step = Vec2::new(0.3, 0.4);
        let (p, v) = resolve(Vec2::ZERO, step, step, &arena);
        assert_eq!(p, step);
        assert_eq!(v, step);
    }

    #[test]
    fn test_rectangular_periodic_wrap() {
        let arena = Arena::rectangular(1.0, 2.0, [true, true]);
        let old = Vec2::new(0.95, -1.95);
        let vel = Vec2::new(0.1, -0.1);
        let (p, v) = resolve(old, old + vel, vel, &arena);
        assert!((p.x - (-0.95)).abs() < EPS);
        assert!((p.y - 1.95).abs() < EPS);
        assert_eq!(v, vel);
    }

    #[test]
    fn test_rectangular_reflective_bounce() {
        let arena = Arena::rectangular(1.0, 1.0, [false, false]);
        let old = Vec2::new(0.95, 0.0);
        let vel = Vec2::new(0.1, 0.0);
        let (p, v) = resolve(old, old + vel, vel, &arena);
        assert!((p.x - 0.95).abs() < EPS);
        assert_eq!(v, Vec2::new(-0.1, 0.0));

        let old = Vec2::new(-0.95, 0.0);
        let (p, v) = resolve(old, old - vel, -vel, &arena);
        assert!((p.x - (-0.95)).abs() < EPS);
        assert_eq!(v, vel);
    }

    #[test]
    fn test_rectangular_corner_resolves_both_axes() {
        let arena = Arena::rectangular(1.0, 1.0, [true, false]);
        let old = Vec2::new(0.95, 0.95);
        let vel = Vec2::new(0.1, 0.1);
        let (p, v) = resolve(old, old + vel, vel, &arena);
        assert!((p.x - (-0.95)).abs() < EPS);
        assert!((p.y - 0.95).abs() < EPS);
        assert_eq!(v, Vec2::new(0.1, -0.1));
    }

    #[test]
    fn test_circular_periodic_wrap() {
        let arena = Arena::circular(1.0, true);
        let theta = 0.6_f32;
        let candidate = polar_to_cartesian(1.05, theta);
        let vel = Vec2::new(0.02, 0.01);
        let (p, v) = resolve(candidate - vel, candidate, vel, &arena);
        let (r, phase) = cartesian_to_polar(p);
        assert!((r - 0.95).abs() < EPS);
        let turned = crate::normalize_angle(phase - theta - std::f32::consts::PI);
        assert!(turned.abs() < EPS);
        assert_eq!(v, vel);
    }

    #[test]
    fn test_circular_reflect_head_on() {
        let arena = Arena::circular(1.0, false);
        let old = Vec2::new(0.99, 0.0);
        let vel = Vec2::new(0.02, 0.0);
        let (p, v) = resolve(old, old + vel, vel, &arena);
        assert!(p.length() < 1.0);
        assert!((p.x - 0.99).abs() < EPS);
        assert!(p.y.abs() < EPS);
        assert!((v.x + 0.02).abs() < EPS);
        assert!(v.y.abs() < EPS);
    }

    #[test]
    fn test_circular_reflect_oblique() {
        let arena = Arena::circular(1.0, false);
        let old = Vec2::new(0.0, 0.95);
        let vel = Vec2::new(0.05, 0.08);
        let (p, v) = resolve(old, old + vel, vel, &arena);

        assert!((v.length() - vel.length()).abs() < EPS);
        assert!(p.length() <= 1.0 + EPS);
        // Path length is conserved across the fold
        let crossing_dist = (p - old).length();
        assert!(crossing_dist <= vel.length() + EPS);
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        let degenerate = [
            Arena::circular(0.0, true),
            Arena::circular(f32::NAN, true),
            Arena::rectangular(1.0, -1.0, [true, true]),
        ];
        assert!(degenerate.iter().all(|arena| arena.validate().is_err()));
        let arena = Arena::rectangular(1.0, 0.5, [true, false]);
        assert!(arena.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_periodic_axis_wrap(half in 0.1f32..10.0, frac in 0.01f32..0.9, v in -1.0f32..1.0) {
            let overshoot = half * frac;
            let (x, vx) = resolve_axis(half + overshoot, v, half, true);
            prop_assert!((x - (-half + overshoot)).abs() < 1e-4 * half.max(1.0));
            prop_assert_eq!(vx, v);
        }

        #[test]
        fn prop_reflective_axis_mirror(half in 0.1f32..10.0, frac in 0.01f32..0.9, v in -1.0f32..1.0) {
            let overshoot = half * frac;
            let (x, vx) = resolve_axis(-half - overshoot, v, half, false);
            prop_assert!((x - (-half + overshoot)).abs() < 1e-4 * half.max(1.0));
            prop_assert_eq!(vx, -v);
            prop_assert!(x.abs() <= half + 1e-4);
        }

        #[test]
        fn prop_circular_reflection_is_elastic(
            r0 in 0.8f32..0.99,
            theta0 in -3.1f32..3.1,
            speed in 0.05f32..0.3,
            relative_heading in -1.3f32..1.3,
        ) {
            let radius = 1.0;
            let old = polar_to_cartesian(r0, theta0);
            let vel = polar_to_cartesian(speed, theta0 + relative_heading);
            let candidate = old + vel;

            let (_, v) = resolve(old, candidate, vel, &Arena::circular(radius, false));
            prop_assert!((v.length() - speed).abs() < 1e-4);

            if candidate.length() > radius {
                // Incidence equals reflection about the normal at the crossing point
                let (_, heading) = cartesian_to_polar(vel);
                let offset = old.y * heading.cos() - old.x * heading.sin();
                let phi = heading + (offset / radius).clamp(-1.0, 1.0).asin();
                let normal = Vec2::new(phi.cos(), phi.sin());
                let tangent = normal.perp();
                prop_assert!((v.dot(normal) + vel.dot(normal)).abs() < 1e-4);
                prop_assert!((v.dot(tangent) - vel.dot(tangent)).abs() < 1e-4);
                prop_assert!(v.dot(normal) <= 1e-6);
            } else {
                prop_assert_eq!(v, vel);
            }
        }

        #[test]
        fn prop_circular_wrap_mirrors_radius(overshoot in 0.001f32..0.5, theta in -3.1f32..3.1) {
            let radius = 1.0;
            let candidate = polar_to_cartesian(radius + overshoot, theta);
            let (p, _) = resolve(Vec2::ZERO, candidate, Vec2::X, &Arena::circular(radius, true));
            prop_assert!((p.length() - (radius - overshoot)).abs() < 1e-4);
            prop_assert!(p.dot(candidate) <= 1e-6);
        }
    }
}
