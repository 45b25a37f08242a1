//! Initial conditions for new groups
//!
//! Random placement and headings are drawn from a setup generator seeded by
//! the run seed. It is separate from the per-lane noise streams, so adding a
//! group never shifts the noise any lane sees.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::geometry::Arena;
use crate::config::{InitialPositions, InitialVelocities, Speed};
use crate::consts::SUPPORTED_DIMENSION;
use crate::error::{EngineError, Result};
use crate::polar_to_cartesian;

/// Uniform positions over the arena
pub fn random_positions(arena: &Arena, count: usize, rng: &mut Pcg32) -> Vec<Vec2> {
    (0..count)
        .map(|_| match *arena {
            Arena::Rectangular { half_extents, .. } => Vec2::new(
                rng.random_range(-1.0f32..=1.0) * half_extents.x,
                rng.random_range(-1.0f32..=1.0) * half_extents.y,
            ),
            Arena::Circular { radius, .. } => {
                // sqrt keeps the density uniform over the disk
                let r = radius * rng.random::<f32>().sqrt();
                polar_to_cartesian(r, rng.random::<f32>() * TAU)
            }
        })
        .collect()
}

/// Uniformly random headings at the given per-agent speeds
pub fn random_velocities(speeds: &[f32], rng: &mut Pcg32) -> Vec<Vec2> {
    speeds
        .iter()
        .map(|&speed| polar_to_cartesian(speed, rng.random::<f32>() * TAU))
        .collect()
}

/// Expand a speed directive into one speed per agent
pub fn expand_speeds(speed: &Speed, count: usize) -> Result<Vec<f32>> {
    match speed {
        Speed::Uniform(s) => Ok(vec![*s; count]),
        Speed::PerAgent(list) if list.len() == count => Ok(list.clone()),
        Speed::PerAgent(list) => Err(EngineError::CountMismatch {
            what: "speeds",
            expected: count,
            actual: list.len(),
        }),
    }
}

/// Flatten explicit rows into `count × dim` components
pub fn flatten_rows(what: &'static str, rows: &[Vec<f32>], count: usize) -> Result<Vec<f32>> {
    if rows.len() != count {
        return Err(EngineError::CountMismatch {
            what,
            expected: count,
            actual: rows.len(),
        });
    }
    if let Some(bad) = rows.iter().find(|row| row.len() != SUPPORTED_DIMENSION) {
        return Err(EngineError::DimensionMismatch {
            what,
            expected: SUPPORTED_DIMENSION,
            actual: bad.len(),
        });
    }
    Ok(rows.concat())
}

/// Resolve position directives to flat components
pub fn initial_positions(
    spec: &InitialPositions,
    arena: &Arena,
    count: usize,
    rng: &mut Pcg32,
) -> Result<Vec<f32>> {
    match spec {
        InitialPositions::Random => {
            let positions = random_positions(arena, count, rng);
            Ok(bytemuck::cast_slice(&positions).to_vec())
        }
        InitialPositions::Explicit(rows) => flatten_rows("positions", rows, count),
    }
}

/// Resolve velocity directives to flat components
pub fn initial_velocities(
    spec: &InitialVelocities,
    speed: &Speed,
    count: usize,
    rng: &mut Pcg32,
) -> Result<Vec<f32>> {
    match spec {
        InitialVelocities::Random => {
            let speeds = expand_speeds(speed, count)?;
            let velocities = random_velocities(&speeds, rng);
            Ok(bytemuck::cast_slice(&velocities).to_vec())
        }
        InitialVelocities::Explicit(rows) => flatten_rows("velocities", rows, count),
    }
}
