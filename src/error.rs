//! Errors raised while configuring or driving an engine
//!
//! Every variant is detected synchronously before the first step runs, or
//! when a lifecycle call is made in the wrong phase. Nothing is raised from
//! inside the parallel kernel.

use thiserror::Error;

use crate::sim::AgentType;

/// Errors that can occur when building or driving a simulation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Boundary resolution is only defined for planar arenas.
    #[error("unsupported dimension {0}: only 2D arenas are defined")]
    UnsupportedDimension(usize),

    #[error("unknown arena kind `{0}` (expected `circular` or `rectangular`)")]
    UnknownArenaKind(String),

    #[error("missing arena parameter: {0}")]
    MissingArenaParameter(&'static str),

    /// Zero, negative or non-finite extents.
    #[error("degenerate arena: {0}")]
    DegenerateArena(String),

    #[error("invalid agent type `{0}`")]
    InvalidAgentType(String),

    /// Supplied component count disagrees with the configured dimension.
    #[error("{what}: expected {expected} components, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Per-agent array length disagrees with the group size.
    #[error("{what}: expected {expected} entries, got {actual}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cannot prepare an engine with no agents")]
    EmptyPopulation,

    #[error("no behavior registered for {0:?} agents")]
    MissingBehavior(AgentType),

    /// Population and behaviors are frozen once the engine is ready.
    #[error("setup is closed once the engine is ready")]
    SetupClosed,

    #[error("engine is not ready; call prepare() first")]
    NotReady,

    #[error("engine has stopped")]
    Stopped,

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
