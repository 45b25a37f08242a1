//! Deterministic simulation module
//!
//! Everything that advances agent state lives here. This module must be pure and deterministic:
//! - Seeded RNG only, one stream per agent lane
//! - Stable agent order (creation index is identity)
//! - Lanes never read what another lane writes within a step
//! - No rendering or platform dependencies

pub mod agents;
pub mod behavior;
pub mod engine;
pub mod geometry;
pub mod kernel;
pub mod rng;
pub mod spawn;

pub use agents::{AgentState, AgentType, BufferSlot, NewAgents};
pub use behavior::{AgentView, Behavior, BehaviorTable, Blind, Percepts};
pub use engine::{Engine, EnginePhase, Frame, Snapshot};
pub use geometry::{Arena, resolve};
pub use rng::NoiseStreams;
