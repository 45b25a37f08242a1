//! Engine configuration documents
//!
//! Loaded from JSON. Loose on input (strings for kinds and types, vectors
//! for per-axis values) and validated into typed values before anything runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{EngineError, Result};
use crate::sim::{AgentType, Arena};

/// Arena description as written in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSpec {
    /// `circular` or `rectangular`
    pub kind: String,
    /// Radius (circular) or one half-width per axis (rectangular)
    #[serde(default)]
    pub half_extents: Vec<f32>,
    /// Wrap flags; all edges periodic when omitted
    #[serde(default)]
    pub periodic: Option<Vec<bool>>,
}

impl ArenaSpec {
    pub fn circular(radius: f32, periodic: bool) -> Self {
        Self {
            kind: "circular".to_string(),
            half_extents: vec![radius],
            periodic: Some(vec![periodic]),
        }
    }

    pub fn rectangular(half_x: f32, half_y: f32, periodic: [bool; 2]) -> Self {
        Self {
            kind: "rectangular".to_string(),
            half_extents: vec![half_x, half_y],
            periodic: Some(periodic.to_vec()),
        }
    }

    /// Validate into a typed arena for the given dimension
    pub fn to_arena(&self, dimension: usize) -> Result<Arena> {
        if dimension != SUPPORTED_DIMENSION {
            return Err(EngineError::UnsupportedDimension(dimension));
        }

        let arena = match self.kind.trim().to_lowercase().as_str() {
            "circular" => {
                let [radius] = self.half_extents[..] else {
                    return Err(EngineError::MissingArenaParameter(
                        "circular arena needs exactly one half-extent (the radius)",
                    ));
                };
                let periodic = match self.periodic.as_deref() {
                    None => true,
                    Some(&[flag]) => flag,
                    Some(_) => {
                        return Err(EngineError::MissingArenaParameter(
                            "circular arena takes exactly one periodicity flag",
                        ));
                    }
                };
                Arena::circular(radius, periodic)
            }
            "rectangular" => {
                let [half_x, half_y] = self.half_extents[..] else {
                    return Err(EngineError::MissingArenaParameter(
                        "rectangular arena needs one half-extent per axis",
                    ));
                };
                let periodic = match self.periodic.as_deref() {
                    None => [true, true],
                    Some(&[px, py]) => [px, py],
                    Some(_) => {
                        return Err(EngineError::MissingArenaParameter(
                            "rectangular arena needs one periodicity flag per axis",
                        ));
                    }
                };
                Arena::rectangular(half_x, half_y, periodic)
            }
            _ => return Err(EngineError::UnknownArenaKind(self.kind.clone())),
        };

        arena.validate()?;
        Ok(arena)
    }
}

/// Where a group's agents start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPositions {
    /// Uniform over the arena
    #[default]
    Random,
    /// One row per agent
    Explicit(Vec<Vec<f32>>),
}

/// Which way a group's agents start moving
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialVelocities {
    /// Uniformly random heading at the group speed
    #[default]
    Random,
    /// One row per agent; the group speed is ignored
    Explicit(Vec<Vec<f32>>),
}

/// Initial speed for randomly oriented velocities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Speed {
    Uniform(f32),
    PerAgent(Vec<f32>),
}

impl Default for Speed {
    fn default() -> Self {
        Speed::Uniform(DEFAULT_SPEED)
    }
}

fn default_angular_noise() -> f32 {
    DEFAULT_ANGULAR_NOISE
}

fn default_speed_noise() -> f32 {
    DEFAULT_SPEED_NOISE
}

/// One group of agents sharing type and noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// `fixed`, `blind`, `ripo` or `rinno`
    pub agent_type: String,
    pub count: usize,
    /// Defaults to the agent type; repeated names share a group id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub positions: InitialPositions,
    #[serde(default)]
    pub velocities: InitialVelocities,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default = "default_angular_noise")]
    pub angular_noise: f32,
    #[serde(default = "default_speed_noise")]
    pub speed_noise: f32,
}

impl GroupSpec {
    pub fn new(agent_type: &str, count: usize) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            count,
            name: None,
            positions: InitialPositions::default(),
            velocities: InitialVelocities::default(),
            speed: Speed::default(),
            angular_noise: DEFAULT_ANGULAR_NOISE,
            speed_noise: DEFAULT_SPEED_NOISE,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn at(mut self, rows: Vec<Vec<f32>>) -> Self {
        self.positions = InitialPositions::Explicit(rows);
        self
    }

    pub fn moving(mut self, rows: Vec<Vec<f32>>) -> Self {
        self.velocities = InitialVelocities::Explicit(rows);
        self
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_noise(mut self, angular: f32, speed: f32) -> Self {
        self.angular_noise = angular;
        self.speed_noise = speed;
        self
    }

    pub fn parsed_type(&self) -> Result<AgentType> {
        self.agent_type.parse()
    }

    /// Group name, falling back to the agent type string
    pub fn group_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.agent_type)
    }
}

fn default_dimension() -> usize {
    SUPPORTED_DIMENSION
}

/// Complete engine setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    pub arena: ArenaSpec,
    /// Seed for initial conditions and every lane's noise stream
    #[serde(default)]
    pub seed: u64,
    /// Step budget; `None` runs until halted
    #[serde(default)]
    pub steps: Option<u64>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl EngineConfig {
    pub fn new(arena: ArenaSpec) -> Self {
        Self {
            dimension: SUPPORTED_DIMENSION,
            arena,
            seed: 0,
            steps: None,
            groups: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn arena(&self) -> Result<Arena> {
        self.arena.to_arena(self.dimension)
    }
}
