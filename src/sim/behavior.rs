//! Reorientation models
//!
//! A behavior turns an agent's own state plus a read-only view of the whole
//! population (as it stood at the start of the step) into an orientation
//! delta in radians. Noise is added by the kernel, not by behaviors.

use glam::Vec2;

use super::agents::AgentType;
use super::geometry::Arena;

/// An agent's own state at the start of a step
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    pub index: usize,
    pub agent_type: AgentType,
    pub group: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Direction of travel in radians, defined even when the agent is at rest
    pub heading: f32,
}

/// Shared read-only inputs for perception
#[derive(Debug, Clone, Copy)]
pub struct Percepts<'a> {
    /// Index of the step being computed
    pub step: u64,
    pub arena: &'a Arena,
    pub positions: &'a [Vec2],
    pub velocities: &'a [Vec2],
    pub agent_types: &'a [AgentType],
    pub groups: &'a [u32],
}

/// Orientation delta for one agent
pub trait Behavior: Send + Sync {
    fn reorientation(&self, agent: &AgentView, percepts: &Percepts<'_>) -> f32;
}

/// Keeps heading; only noise turns it
#[derive(Debug, Clone, Copy, Default)]
pub struct Blind;

impl Behavior for Blind {
    fn reorientation(&self, _agent: &AgentView, _percepts: &Percepts<'_>) -> f32 {
        0.0
    }
}

impl<F> Behavior for F
where
    F: Fn(&AgentView, &Percepts<'_>) -> f32 + Send + Sync,
{
    fn reorientation(&self, agent: &AgentView, percepts: &Percepts<'_>) -> f32 {
        self(agent, percepts)
    }
}

/// Behavior lookup by agent type. Fixed agents never consult it.
pub struct BehaviorTable {
    blind: Box<dyn Behavior>,
    perception_a: Option<Box<dyn Behavior>>,
    perception_b: Option<Box<dyn Behavior>>,
}

impl Default for BehaviorTable {
    fn default() -> Self {
        Self {
            blind: Box::new(Blind),
            perception_a: None,
            perception_b: None,
        }
    }
}

impl std::fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTable")
            .field("perception_a", &self.perception_a.is_some())
            .field("perception_b", &self.perception_b.is_some())
            .finish()
    }
}

impl BehaviorTable {
    /// Install a behavior. Fixed agents ignore behaviors, so that slot is a no-op.
    pub fn set(&mut self, agent_type: AgentType, behavior: Box<dyn Behavior>) {
        match agent_type {
            AgentType::Fixed => {}
            AgentType::Blind => self.blind = behavior,
            AgentType::PerceptionA => self.perception_a = Some(behavior),
            AgentType::PerceptionB => self.perception_b = Some(behavior),
        }
    }

    pub fn get(&self, agent_type: AgentType) -> Option<&dyn Behavior> {
        match agent_type {
            AgentType::Fixed => None,
            AgentType::Blind => Some(self.blind.as_ref()),
            AgentType::PerceptionA => self.perception_a.as_deref(),
            AgentType::PerceptionB => self.perception_b.as_deref(),
        }
    }

    pub fn has(&self, agent_type: AgentType) -> bool {
        agent_type == AgentType::Fixed || self.get(agent_type).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> AgentView {
        AgentView {
            index: 0,
            agent_type: AgentType::Blind,
            group: 0,
            position: Vec2::ZERO,
            velocity: Vec2::X,
            heading: 0.0,
        }
    }

    /// Turn 0.1 rad for every agent after this one
    fn turn_per_neighbour(agent: &AgentView, percepts: &Percepts<'_>) -> f32 {
        (percepts.positions.len() - 1 - agent.index) as f32 * 0.1
    }

    #[test]
    fn test_default_table() {
        let table = BehaviorTable::default();
        assert!(table.has(AgentType::Fixed));
        assert!(table.has(AgentType::Blind));
        assert!(!table.has(AgentType::PerceptionA));
        assert!(!table.has(AgentType::PerceptionB));
    }

    #[test]
    fn test_closure_behavior() {
        let arena = Arena::circular(1.0, true);
        let percepts = Percepts {
            step: 0,
            arena: &arena,
            positions: &[Vec2::ZERO, Vec2::new(0.5, 0.0)],
            velocities: &[Vec2::X, Vec2::Y],
            agent_types: &[AgentType::PerceptionA, AgentType::Blind],
            groups: &[0, 0],
        };

        let mut table = BehaviorTable::default();
        let behavior = Box::new(turn_per_neighbour);
        table.set(AgentType::PerceptionA, behavior);
        let turn = |agent_type| {
            let behavior = table.get(agent_type).unwrap();
            behavior.reorientation(&view(), &percepts)
        };
        assert!((turn(AgentType::PerceptionA) - 0.1).abs() < 1e-6);
        assert_eq!(turn(AgentType::Blind), 0.0);
    }
}
