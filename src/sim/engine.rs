//! Lockstep simulation loop
//!
//! The engine owns the population, picks which buffer slot is read and which
//! is written on each step, dispatches the kernel over every lane and only
//! then publishes the written slot. Consumers pull state between steps.

use std::ops::ControlFlow;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::agents::{AgentState, AgentType, BufferSlot, NewAgents};
use super::behavior::{AgentView, Behavior, BehaviorTable, Percepts};
use super::geometry::Arena;
use super::kernel::{Noise, advance_lane};
use super::rng::NoiseStreams;
use super::spawn;
use crate::config::{EngineConfig, GroupSpec};
use crate::consts::PARALLEL_THRESHOLD;
use crate::error::{EngineError, Result};

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Accepting groups and behaviors
    Uninitialized,
    /// Population frozen and noise seeded; no step taken yet
    Ready,
    /// At least one step completed
    Running,
    /// Budget exhausted or halted. Terminal.
    Stopped,
}

/// Read-only view of the published state after a step
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Number of completed steps
    pub step: u64,
    pub positions: &'a [Vec2],
    pub velocities: &'a [Vec2],
    pub agent_types: &'a [AgentType],
    pub groups: &'a [u32],
}

impl<'a> Frame<'a> {
    /// Positions as `N × 2` components in creation order
    pub fn positions_flat(&self) -> &'a [f32] {
        bytemuck::cast_slice(self.positions)
    }

    /// Velocities as `N × 2` components in creation order
    pub fn velocities_flat(&self) -> &'a [f32] {
        bytemuck::cast_slice(self.velocities)
    }
}

/// Owned copy of the published state, for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    pub groups: Vec<u32>,
    pub group_names: Vec<String>,
}

/// Slot read and slot written on a given step
#[inline]
fn buffer_roles(step: u64) -> (usize, usize) {
    let source = (step % 2) as usize;
    (source, 1 - source)
}

/// The simulation loop
#[derive(Debug)]
pub struct Engine {
    arena: Arena,
    seed: u64,
    /// Draws for random initial conditions only
    setup_rng: Pcg32,
    agents: AgentState,
    behaviors: BehaviorTable,
    /// Seeded when the engine becomes ready
    noise: Option<NoiseStreams>,
    step_budget: Option<u64>,
    parallel_threshold: usize,
    step: u64,
    phase: EnginePhase,
}

impl Engine {
    /// Create an empty engine over a validated arena
    pub fn new(arena: Arena, seed: u64) -> Result<Self> {
        arena.validate()?;
        Ok(Self {
            arena,
            seed,
            setup_rng: Pcg32::seed_from_u64(seed),
            agents: AgentState::new(),
            behaviors: BehaviorTable::default(),
            noise: None,
            step_budget: None,
            parallel_threshold: PARALLEL_THRESHOLD,
            step: 0,
            phase: EnginePhase::Uninitialized,
        })
    }

    /// Build an engine and all its groups from a config document
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut engine = Self::new(config.arena()?, config.seed)?;
        engine.set_step_budget(config.steps);
        for group in &config.groups {
            engine.add_group(group)?;
        }
        Ok(engine)
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Completed steps
    pub fn steps_completed(&self) -> u64 {
        self.step
    }

    pub fn step_budget(&self) -> Option<u64> {
        self.step_budget
    }

    pub fn agents(&self) -> &AgentState {
        &self.agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// `None` runs until halted
    pub fn set_step_budget(&mut self, budget: Option<u64>) {
        self.step_budget = budget;
    }

    /// Populations at or above this size are stepped on the rayon pool
    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.phase == EnginePhase::Uninitialized {
            Ok(())
        } else {
            Err(EngineError::SetupClosed)
        }
    }

    /// Append a group, returning its group id
    pub fn add_group(&mut self, spec: &GroupSpec) -> Result<u32> {
        self.ensure_open()?;
        let agent_type = spec.parsed_type()?;

        let rng = &mut self.setup_rng;
        let positions = spawn::initial_positions(&spec.positions, &self.arena, spec.count, rng)?;
        let velocities = spawn::initial_velocities(&spec.velocities, &spec.speed, spec.count, rng)?;

        let group_id = self.agents.append(NewAgents {
            name: spec.group_name(),
            agent_type,
            count: spec.count,
            positions: &positions,
            velocities: &velocities,
            angular_noise: spec.angular_noise,
            speed_noise: spec.speed_noise,
        })?;

        log::debug!(
            "Added {} {} agents to group '{}' (id {}), population {}",
            spec.count,
            agent_type,
            spec.group_name(),
            group_id,
            self.agents.len()
        );
        Ok(group_id)
    }

    /// Install the reorientation model for an agent type
    pub fn register_behavior(
        &mut self,
        agent_type: AgentType,
        behavior: impl Behavior + 'static,
    ) -> Result<()> {
        self.ensure_open()?;
        self.behaviors.set(agent_type, Box::new(behavior));
        Ok(())
    }

    /// Freeze the population, seed one noise stream per lane and become ready
    pub fn prepare(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.agents.is_empty() {
            return Err(EngineError::EmptyPopulation);
        }
        let unserved = AgentType::ALL.into_iter().find(|&t| {
            t.needs_perception() && self.agents.contains_type(t) && !self.behaviors.has(t)
        });
        if let Some(missing) = unserved {
            return Err(EngineError::MissingBehavior(missing));
        }

        self.noise = Some(NoiseStreams::seeded(self.seed, self.agents.len()));
        self.phase = EnginePhase::Ready;
        log::info!(
            "Engine ready: {} agents in {} groups, seed {}, budget {:?}",
            self.agents.len(),
            self.agents.group_count(),
            self.seed,
            self.step_budget
        );

        if self.budget_exhausted() {
            self.stop();
        }
        Ok(())
    }

    fn budget_exhausted(&self) -> bool {
        self.step_budget.is_some_and(|budget| self.step >= budget)
    }

    fn stop(&mut self) {
        self.phase = EnginePhase::Stopped;
        log::info!("Engine stopped after {} steps", self.step);
    }

    /// Stop between steps. No-op unless ready or running.
    pub fn halt(&mut self) {
        if matches!(self.phase, EnginePhase::Ready | EnginePhase::Running) {
            log::warn!("Engine halted externally after {} steps", self.step);
            self.stop();
        }
    }

    /// Advance every agent by one step, returning the completed step count
    pub fn step(&mut self) -> Result<u64> {
        match self.phase {
            EnginePhase::Uninitialized => return Err(EngineError::NotReady),
            EnginePhase::Stopped => return Err(EngineError::Stopped),
            EnginePhase::Ready | EnginePhase::Running => {}
        }

        self.dispatch()?;
        self.step += 1;
        self.phase = EnginePhase::Running;
        log::trace!("Step {} complete", self.step);

        if self.budget_exhausted() {
            self.stop();
        }
        Ok(self.step)
    }

    /// Run the kernel over all lanes, reading one slot and writing the other.
    /// Returns only once every lane has written its destination entries.
    fn dispatch(&mut self) -> Result<()> {
        let (source, _) = buffer_roles(self.step);
        let step = self.step;
        let parallel = self.agents.len() >= self.parallel_threshold;

        let streams = self.noise.as_mut().ok_or(EngineError::NotReady)?;
        let arena = &self.arena;
        let behaviors = &self.behaviors;
        let AgentState {
            agent_types,
            angular_noise,
            speed_noise,
            groups,
            buffers,
            ..
        } = &mut self.agents;
        let (agent_types, angular_noise, speed_noise, groups) = (
            agent_types.as_slice(),
            angular_noise.as_slice(),
            speed_noise.as_slice(),
            groups.as_slice(),
        );

        let [slot_a, slot_b] = buffers;
        let (src, dst): (&BufferSlot, &mut BufferSlot) = if source == 0 {
            (&*slot_a, slot_b)
        } else {
            (&*slot_b, slot_a)
        };

        let percepts = Percepts {
            step,
            arena,
            positions: &src.positions,
            velocities: &src.velocities,
            agent_types,
            groups,
        };

        let lane = |index: usize, rng: &mut Pcg32| {
            let agent = AgentView {
                index,
                agent_type: agent_types[index],
                group: groups[index],
                position: src.positions[index],
                velocity: src.velocities[index],
                heading: src.headings[index],
            };
            let noise = Noise {
                angular: angular_noise[index],
                speed: speed_noise[index],
            };
            let behavior = behaviors.get(agent.agent_type);
            advance_lane(&agent, noise, behavior, &percepts, arena, rng)
        };

        let BufferSlot {
            positions,
            velocities,
            headings,
        } = dst;
        let rngs = streams.lanes_mut();

        if parallel {
            positions
                .par_iter_mut()
                .zip(velocities.par_iter_mut())
                .zip(headings.par_iter_mut())
                .zip(rngs.par_iter_mut())
                .enumerate()
                .for_each(|(index, (((position, velocity), heading), rng))| {
                    let out = lane(index, rng);
                    *position = out.position;
                    *velocity = out.velocity;
                    *heading = out.heading;
                });
        } else {
            for (index, (((position, velocity), heading), rng)) in positions
                .iter_mut()
                .zip(velocities.iter_mut())
                .zip(headings.iter_mut())
                .zip(rngs.iter_mut())
                .enumerate()
            {
                let out = lane(index, rng);
                *position = out.position;
                *velocity = out.velocity;
                *heading = out.heading;
            }
        }
        Ok(())
    }

    /// Step until stopped or the observer breaks, handing the observer each
    /// published frame. Returns the completed step count.
    ///
    /// With no step budget this only returns once the observer breaks.
    pub fn run_until<F>(&mut self, mut observer: F) -> Result<u64>
    where
        F: FnMut(&Frame<'_>) -> ControlFlow<()>,
    {
        if self.phase == EnginePhase::Stopped {
            return Ok(self.step);
        }
        loop {
            self.step()?;
            let flow = observer(&self.frame());
            if self.phase == EnginePhase::Stopped {
                break;
            }
            if flow.is_break() {
                self.halt();
                break;
            }
        }
        Ok(self.step)
    }

    /// Step until the budget is exhausted
    pub fn run(&mut self) -> Result<u64> {
        self.run_until(|_| ControlFlow::Continue(()))
    }

    fn current(&self) -> &BufferSlot {
        self.agents.slot(buffer_roles(self.step).0)
    }

    /// Published positions, creation order
    pub fn positions(&self) -> &[Vec2] {
        &self.current().positions
    }

    /// Published velocities, creation order
    pub fn velocities(&self) -> &[Vec2] {
        &self.current().velocities
    }

    pub fn positions_flat(&self) -> &[f32] {
        self.current().positions_flat()
    }

    pub fn velocities_flat(&self) -> &[f32] {
        self.current().velocities_flat()
    }

    pub fn frame(&self) -> Frame<'_> {
        let current = self.current();
        Frame {
            step: self.step,
            positions: &current.positions,
            velocities: &current.velocities,
            agent_types: self.agents.agent_types(),
            groups: self.agents.groups(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.step,
            positions: self.positions().to_vec(),
            velocities: self.velocities().to_vec(),
            groups: self.agents.groups().to_vec(),
            group_names: self.agents.group_names().to_vec(),
        }
    }
}
