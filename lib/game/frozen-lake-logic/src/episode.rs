/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

//! A single episode, from the start cell to a crack or the goal.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CandidateFilter, SimulationConfig};
use crate::grid::{CellKind, Grid};
use crate::render::Renderer;
use crate::transition::TransitionEngine;
use crate::{Direction, FrozenLakeError, Position, Rng, Score};

/// Lifecycle of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeStatus {
    /// The agent is still on the lake.
    Active,

    /// The agent reached a crack or the goal.
    Terminated,
}

/// What a single call to [`EpisodeController::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Where the agent ended up.
    pub position: Position,

    /// Kind of the cell the agent ended up on.
    pub kind: CellKind,

    /// Reward of the final cell. Added to the score exactly once.
    pub reward: Score,

    /// Accumulated score after this step.
    pub score: Score,

    /// Episode status after this step.
    pub status: EpisodeStatus,

    /// Whether the agent left its cell at all.
    pub moved: bool,

    /// Whether the step (or its slip) ran into the edge of the grid.
    pub hit_boundary: bool,

    /// Whether a new slip started during this step.
    pub slip_started: bool,

    /// Extra cells travelled while sliding.
    pub slides: u32,
}

impl StepOutcome {
    /// Whether the episode is over.
    pub fn is_terminal(&self) -> bool {
        self.status == EpisodeStatus::Terminated
    }
}

/// Owns the mutable state of one episode at a time and drives it step by step.
///
/// The random number generator is shared so that a random move source can draw from the same
/// stream, which keeps seeded runs reproducible.
pub struct EpisodeController {
    grid: Grid,
    engine: TransitionEngine,
    rng: Rc<RefCell<Rng>>,
    start: Position,
    position: Position,
    score: Score,
    slipping: bool,
    status: EpisodeStatus,
    steps: u32,
}

impl EpisodeController {
    /// Create a controller and start the first episode.
    pub fn new(config: &SimulationConfig, rng: Rc<RefCell<Rng>>) -> Result<Self, FrozenLakeError> {
        let grid = config.grid.clone();
        let engine = TransitionEngine::for_grid(&grid, config.slip_probability)?;
        let start = grid.locate_start()?;
        Ok(Self {
            grid,
            engine,
            rng,
            start,
            position: start,
            score: 0,
            slipping: false,
            status: EpisodeStatus::Active,
            steps: 0,
        })
    }

    /// Throw away the current episode and start a fresh one.
    pub fn reset(&mut self) {
        debug!(score = self.score, steps = self.steps, "resetting episode");
        self.position = self.start;
        self.score = 0;
        self.slipping = false;
        self.status = EpisodeStatus::Active;
        self.steps = 0;
    }

    /// The lake.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The transition model.
    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Current position of the agent.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Score accumulated so far in this episode.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Whether the agent is sliding.
    pub fn is_slipping(&self) -> bool {
        self.slipping
    }

    /// Force the slipping flag.
    pub fn set_slipping(&mut self, slipping: bool) {
        self.slipping = slipping;
    }

    /// Current status.
    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    /// Number of steps taken in this episode.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Directions a move source may choose from at the current position.
    pub fn candidate_directions(&self, filter: CandidateFilter) -> Vec<Direction> {
        let in_bounds = self.engine.in_bounds_directions(self.position);
        match filter {
            CandidateFilter::InBounds => in_bounds,
            CandidateFilter::AvoidCracks => {
                let safe: Vec<Direction> = in_bounds
                    .iter()
                    .copied()
                    .filter(|&direction| {
                        let target = self.engine.propose(self.position, direction);
                        self.grid.kind_at(target) != Ok(CellKind::Crack)
                    })
                    .collect();
                if safe.is_empty() {
                    in_bounds
                } else {
                    safe
                }
            }
        }
    }

    /// Take one step in `direction`, sliding as far as the ice takes the agent.
    ///
    /// A move off the grid leaves the agent where it is and clears the slipping flag. It still
    /// earns the reward of the current cell, so bumping a wall while standing on a ship pays out
    /// every time.
    pub fn step<R: Renderer + ?Sized>(
        &mut self,
        direction: Direction,
        renderer: &mut R,
    ) -> Result<StepOutcome, FrozenLakeError> {
        if self.status == EpisodeStatus::Terminated {
            return Err(FrozenLakeError::EpisodeTerminated);
        }

        let resolution = {
            let mut rng = self.rng.borrow_mut();
            self.engine.resolve(
                &self.grid,
                self.position,
                direction,
                self.slipping,
                &mut rng,
            )?
        };

        if resolution.slip_started {
            renderer.on_episode_message("slipped on the ice!");
        }
        for position in &resolution.path {
            renderer.on_state_changed(*position, &self.grid);
        }
        if resolution.hit_boundary && resolution.path.last() != Some(&resolution.position) {
            renderer.on_state_changed(resolution.position, &self.grid);
        }

        self.position = resolution.position;
        self.slipping = resolution.slipping;
        self.steps += 1;

        let reward = self.grid.reward_for(resolution.kind);
        self.score += reward;

        match resolution.kind {
            CellKind::Goal => {
                self.status = EpisodeStatus::Terminated;
                renderer.on_episode_message(&format!("reached the goal! score: {}", self.score));
            }
            CellKind::Crack => {
                self.status = EpisodeStatus::Terminated;
                renderer.on_episode_message(&format!("fell through the ice! score: {}", self.score));
            }
            _ => {}
        }

        debug!(
            %direction,
            position = %self.position,
            reward,
            score = self.score,
            slides = resolution.slides,
            slipping = self.slipping,
            "step"
        );

        Ok(StepOutcome {
            position: self.position,
            kind: resolution.kind,
            reward,
            score: self.score,
            status: self.status,
            moved: resolution.moved(),
            hit_boundary: resolution.hit_boundary,
            slip_started: resolution.slip_started,
            slides: resolution.slides,
        })
    }
}
