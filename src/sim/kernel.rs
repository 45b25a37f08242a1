//! Per-lane step procedure
//!
//! One call advances one agent by one step. A lane reads only its own
//! source entries, the shared percepts and the arena; it writes only its own
//! destination entries.

use glam::Vec2;
use rand_pcg::Pcg32;

use super::agents::AgentType;
use super::behavior::{AgentView, Behavior, Percepts};
use super::geometry::{Arena, resolve};
use super::rng::normal_sample;
use crate::normalize_angle;

/// Per-agent noise coefficients
#[derive(Debug, Clone, Copy, Default)]
pub struct Noise {
    pub angular: f32,
    pub speed: f32,
}

/// A lane's destination entries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec2,
    pub velocity: Vec2,
    pub heading: f32,
}

/// Advance one lane by one step.
///
/// Fixed agents are copied through untouched and draw no noise. Every other
/// lane draws exactly one angular sample, plus one speed sample when its
/// speed-noise coefficient is non-zero. Speed is floored at 0; a resting
/// agent keeps turning and sets off again along its heading once the speed
/// draw comes up positive.
pub fn advance_lane(
    agent: &AgentView,
    noise: Noise,
    behavior: Option<&dyn Behavior>,
    percepts: &Percepts<'_>,
    arena: &Arena,
    rng: &mut Pcg32,
) -> Motion {
    if agent.agent_type == AgentType::Fixed {
        return Motion {
            position: agent.position,
            velocity: agent.velocity,
            heading: agent.heading,
        };
    }

    let da = behavior.map_or(0.0, |b| b.reorientation(agent, percepts));
    let an = noise.angular * normal_sample(rng);
    let turn = da + an;

    let heading = normalize_angle(agent.heading + turn);
    let mut velocity = Vec2::from_angle(turn).rotate(agent.velocity);
    if noise.speed != 0.0 {
        let speed = velocity.length();
        let perturbed = (speed + noise.speed * normal_sample(rng)).max(0.0);
        let direction = velocity
            .try_normalize()
            .unwrap_or_else(|| Vec2::from_angle(heading));
        velocity = direction * perturbed;
    }

    let (position, velocity) = resolve(agent.position, agent.position + velocity, velocity, arena);
    let heading = if velocity == Vec2::ZERO {
        heading
    } else {
        velocity.to_angle()
    };
    Motion {
        position,
        velocity,
        heading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::behavior::Blind;
    use rand::SeedableRng;

    fn lane(agent_type: AgentType, position: Vec2, velocity: Vec2) -> AgentView {
        AgentView {
            index: 0,
            agent_type,
            group: 0,
            position,
            velocity,
            heading: velocity.to_angle(),
        }
    }

    fn percepts<'a>(arena: &'a Arena, agent: &'a AgentView) -> Percepts<'a> {
        Percepts {
            step: 0,
            arena,
            positions: std::slice::from_ref(&agent.position),
            velocities: std::slice::from_ref(&agent.velocity),
            agent_types: std::slice::from_ref(&agent.agent_type),
            groups: std::slice::from_ref(&agent.group),
        }
    }

    fn quarter_turn(_: &AgentView, _: &Percepts<'_>) -> f32 {
        std::f32::consts::FRAC_PI_2
    }

    fn blind_step(agent: &AgentView, noise: Noise, arena: &Arena, rng: &mut Pcg32) -> Motion {
        let shared = percepts(arena, agent);
        advance_lane(agent, noise, Some(&Blind), &shared, arena, rng)
    }

    #[test]
    fn test_fixed_lane_is_copied() {
        let arena = Arena::circular(1.0, false);
        let agent = lane(AgentType::Fixed, Vec2::new(0.2, 0.3), Vec2::new(0.01, 0.0));
        let mut rng = Pcg32::seed_from_u64(0);
        let before = rng.clone();
        let noise = Noise {
            angular: 1.0,
            speed: 1.0,
        };
        let shared = percepts(&arena, &agent);
        let out = advance_lane(&agent, noise, None, &shared, &arena, &mut rng);
        assert_eq!(out.position, agent.position);
        assert_eq!(out.velocity, agent.velocity);
        assert_eq!(out.heading, agent.heading);
        // No draw consumed
        assert_eq!(format!("{rng:?}"), format!("{before:?}"));
    }

    #[test]
    fn test_blind_lane_without_noise_moves_straight() {
        let arena = Arena::rectangular(1.0, 1.0, [true, true]);
        let velocity = Vec2::new(0.05, -0.02);
        let agent = lane(AgentType::Blind, Vec2::new(0.1, 0.1), velocity);
        let mut rng = Pcg32::seed_from_u64(0);
        let out = blind_step(&agent, Noise::default(), &arena, &mut rng);
        assert!((out.position - Vec2::new(0.15, 0.08)).length() < 1e-6);
        assert!((out.velocity - agent.velocity).length() < 1e-6);
        assert!((out.heading - agent.heading).abs() < 1e-6);
    }

    #[test]
    fn test_angular_noise_preserves_speed() {
        let arena = Arena::rectangular(10.0, 10.0, [false, false]);
        let agent = lane(AgentType::Blind, Vec2::ZERO, Vec2::new(0.03, 0.04));
        let mut rng = Pcg32::seed_from_u64(9);
        let noise = Noise {
            angular: 0.5,
            speed: 0.0,
        };
        let out = blind_step(&agent, noise, &arena, &mut rng);
        assert!((out.velocity.length() - 0.05).abs() < 1e-6);
        assert!((out.position - out.velocity).length() < 1e-6);
        assert!((out.heading - out.velocity.to_angle()).abs() < 1e-6);
    }

    #[test]
    fn test_behavior_delta_rotates_heading() {
        let arena = Arena::rectangular(10.0, 10.0, [false, false]);
        let agent = lane(AgentType::PerceptionA, Vec2::ZERO, Vec2::new(0.1, 0.0));
        let mut rng = Pcg32::seed_from_u64(0);
        let out = advance_lane(
            &agent,
            Noise::default(),
            Some(&quarter_turn),
            &percepts(&arena, &agent),
            &arena,
            &mut rng,
        );
        assert!(out.velocity.x.abs() < 1e-6);
        assert!((out.velocity.y - 0.1).abs() < 1e-6);
        assert!((out.heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_speed_noise_never_negative() {
        let arena = Arena::rectangular(10.0, 10.0, [false, false]);
        let agent = lane(AgentType::Blind, Vec2::ZERO, Vec2::new(0.001, 0.0));
        let mut rng = Pcg32::seed_from_u64(1);
        let noise = Noise {
            angular: 0.0,
            speed: 1.0,
        };
        for _ in 0..100 {
            let v = blind_step(&agent, noise, &arena, &mut rng).velocity;
            assert!(v.is_finite());
            assert!(v.x >= 0.0);
            assert!(v.y.abs() < 1e-6);
        }
    }

    #[test]
    fn test_resting_agent_sets_off_along_heading() {
        let arena = Arena::rectangular(10.0, 10.0, [false, false]);
        let mut agent = lane(AgentType::Blind, Vec2::ZERO, Vec2::ZERO);
        agent.heading = std::f32::consts::FRAC_PI_2;
        let mut rng = Pcg32::seed_from_u64(3);
        let noise = Noise {
            angular: 0.0,
            speed: 0.01,
        };

        // Half the draws are negative and leave the agent at rest
        let out = (0..64)
            .map(|_| blind_step(&agent, noise, &arena, &mut rng))
            .find(|out| out.velocity != Vec2::ZERO)
            .expect("a positive speed draw within 64 tries");
        assert!(out.velocity.x.abs() < 1e-6);
        assert!(out.velocity.y > 0.0);
        assert_eq!(out.position, out.velocity);
        assert!((out.heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_speed_keeps_turning_heading() {
        let arena = Arena::rectangular(10.0, 10.0, [false, false]);
        let agent = lane(AgentType::PerceptionA, Vec2::ZERO, Vec2::ZERO);
        let mut rng = Pcg32::seed_from_u64(0);
        let out = advance_lane(
            &agent,
            Noise::default(),
            Some(&quarter_turn),
            &percepts(&arena, &agent),
            &arena,
            &mut rng,
        );
        assert_eq!(out.velocity, Vec2::ZERO);
        assert!((out.heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
