//! Agent population and double-buffered kinematic state
//!
//! Agents are stored column-wise. Creation order is identity: index `i` in
//! every column refers to the same agent for the life of the engine.

use std::fmt;
use std::iter::repeat_n;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::SUPPORTED_DIMENSION;
use crate::error::{EngineError, Result};

/// Agent kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Never moves
    Fixed,
    /// Moves straight ahead, reoriented by noise only
    Blind,
    /// Perception-driven, first model (`ripo`)
    PerceptionA,
    /// Perception-driven, second model (`rinno`)
    PerceptionB,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Fixed,
        AgentType::Blind,
        AgentType::PerceptionA,
        AgentType::PerceptionB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Fixed => "fixed",
            AgentType::Blind => "blind",
            AgentType::PerceptionA => "ripo",
            AgentType::PerceptionB => "rinno",
        }
    }

    /// Whether the kernel needs a registered behavior for this kind
    pub fn needs_perception(&self) -> bool {
        matches!(self, AgentType::PerceptionA | AgentType::PerceptionB)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(AgentType::Fixed),
            "blind" => Ok(AgentType::Blind),
            "ripo" | "perception_a" => Ok(AgentType::PerceptionA),
            "rinno" | "perception_b" => Ok(AgentType::PerceptionB),
            _ => Err(EngineError::InvalidAgentType(s.to_string())),
        }
    }
}

/// One physical position/velocity buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BufferSlot {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    /// Direction of travel in radians. Survives steps where the speed is 0.
    pub headings: Vec<f32>,
}

impl BufferSlot {
    fn extend(&mut self, positions: &[Vec2], velocities: &[Vec2]) {
        self.positions.extend_from_slice(positions);
        self.velocities.extend_from_slice(velocities);
        let headings = velocities.iter().map(|v| v.to_angle());
        self.headings.extend(headings);
    }

    fn holds(&self, n: usize) -> bool {
        self.positions.len() == n && self.velocities.len() == n && self.headings.len() == n
    }

    /// Positions as a flat `N × 2` component array
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Velocities as a flat `N × 2` component array
    pub fn velocities_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.velocities)
    }
}

/// A group of agents to append, with components laid out flat (`count × dim`)
#[derive(Debug, Clone, Copy)]
pub struct NewAgents<'a> {
    pub name: &'a str,
    pub agent_type: AgentType,
    pub count: usize,
    pub positions: &'a [f32],
    pub velocities: &'a [f32],
    pub angular_noise: f32,
    pub speed_noise: f32,
}

/// Column store for the whole population plus both buffer slots
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub(crate) agent_types: Vec<AgentType>,
    pub(crate) angular_noise: Vec<f32>,
    pub(crate) speed_noise: Vec<f32>,
    pub(crate) groups: Vec<u32>,
    pub(crate) group_names: Vec<String>,
    /// Slot 0 holds the initial state; roles alternate by step parity
    pub(crate) buffers: [BufferSlot; 2],
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of agents
    pub fn len(&self) -> usize {
        self.agent_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agent_types.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.group_names.len()
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Group id for a name, if that group exists
    pub fn group_id(&self, name: &str) -> Option<u32> {
        let index = self.group_names.iter().position(|n| n == name)?;
        Some(index as u32)
    }

    pub fn agent_types(&self) -> &[AgentType] {
        &self.agent_types
    }

    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    pub fn angular_noise(&self) -> &[f32] {
        &self.angular_noise
    }

    pub fn speed_noise(&self) -> &[f32] {
        &self.speed_noise
    }

    pub fn contains_type(&self, agent_type: AgentType) -> bool {
        self.agent_types.contains(&agent_type)
    }

    /// Buffer slot by physical index (0 or 1)
    pub fn slot(&self, index: usize) -> &BufferSlot {
        &self.buffers[index & 1]
    }

    /// Append a group, returning its group id.
    ///
    /// Groups sharing a name share an id. New rows are written to both buffer
    /// slots so neither slot ever holds an unset entry.
    pub fn append(&mut self, group: NewAgents<'_>) -> Result<u32> {
        let expected = group.count * SUPPORTED_DIMENSION;
        if group.positions.len() != expected {
            return Err(EngineError::DimensionMismatch {
                what: "positions",
                expected,
                actual: group.positions.len(),
            });
        }
        if group.velocities.len() != expected {
            return Err(EngineError::DimensionMismatch {
                what: "velocities",
                expected,
                actual: group.velocities.len(),
            });
        }

        let positions = to_vectors(group.positions);
        let velocities = to_vectors(group.velocities);

        let group_id = match self.group_id(group.name) {
            Some(id) => id,
            None => {
                self.group_names.push(group.name.to_string());
                (self.group_names.len() - 1) as u32
            }
        };

        let n = group.count;
        self.agent_types.extend(repeat_n(group.agent_type, n));
        self.angular_noise.extend(repeat_n(group.angular_noise, n));
        self.speed_noise.extend(repeat_n(group.speed_noise, n));
        self.groups.extend(repeat_n(group_id, n));
        for slot in &mut self.buffers {
            slot.extend(&positions, &velocities);
        }

        debug_assert!(self.columns_consistent());
        Ok(group_id)
    }

    fn columns_consistent(&self) -> bool {
        let n = self.len();
        self.angular_noise.len() == n
            && self.speed_noise.len() == n
            && self.groups.len() == n
            && self.buffers.iter().all(|slot| slot.holds(n))
    }
}

fn to_vectors(flat: &[f32]) -> Vec<Vec2> {
    flat.chunks_exact(2).map(Vec2::from_slice).collect()
}
