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

//! Simulation configuration.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::{CellKind, Grid};
use crate::transition::TransitionEngine;
use crate::{FrozenLakeError, Position};

/// Chance that landing on ice starts a slip.
pub const SLIP_PROBABILITY: f64 = 0.05;

/// Default per-episode step cap.
pub const MAX_STEPS_PER_EPISODE: u32 = 1_000;

/// Which directions a random walk may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFilter {
    /// Any direction whose single move stays on the grid.
    #[default]
    InBounds,

    /// Like `InBounds`, but also skip directions whose single move lands on a crack. If every
    /// in-bounds direction leads to a crack, all of them are allowed.
    AvoidCracks,
}

/// Everything a simulation needs, passed to constructors instead of living in globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Lake layout.
    pub grid: Grid,

    /// Chance that landing on ice starts a slip.
    pub slip_probability: f64,

    /// Number of episodes in a rollout.
    pub max_episodes: u32,

    /// Episodes still running after this many steps are cut short. `None` means no limit, which
    /// is only accepted when every episode can reach a terminal cell.
    pub max_steps_per_episode: Option<u32>,

    /// Candidate directions offered to the move source.
    pub candidate_filter: CandidateFilter,

    /// Pause after each move. Only renderers use it.
    pub step_delay_ms: u64,

    /// Pause after each finished episode. Only renderers use it.
    pub episode_delay_ms: u64,

    /// Random seed for reproducibility. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Create a configuration for a grid, with default values for everything else.
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            slip_probability: SLIP_PROBABILITY,
            max_episodes: 100,
            max_steps_per_episode: Some(MAX_STEPS_PER_EPISODE),
            candidate_filter: CandidateFilter::default(),
            step_delay_ms: 0,
            episode_delay_ms: 0,
            seed: None,
        }
    }

    /// Set the slip probability.
    pub fn with_slip_probability(mut self, slip_probability: f64) -> Self {
        self.slip_probability = slip_probability;
        self
    }

    /// Set the episode cap.
    pub fn with_max_episodes(mut self, max_episodes: u32) -> Self {
        self.max_episodes = max_episodes;
        self
    }

    /// Set the per-episode step cap.
    pub fn with_max_steps_per_episode(mut self, max_steps: u32) -> Self {
        self.max_steps_per_episode = Some(max_steps);
        self
    }

    /// Remove the per-episode step cap.
    pub fn without_step_cap(mut self) -> Self {
        self.max_steps_per_episode = None;
        self
    }

    /// Set the candidate filter.
    pub fn with_candidate_filter(mut self, filter: CandidateFilter) -> Self {
        self.candidate_filter = filter;
        self
    }

    /// Set the presentation delays.
    pub fn with_delays(mut self, step_delay_ms: u64, episode_delay_ms: u64) -> Self {
        self.step_delay_ms = step_delay_ms;
        self.episode_delay_ms = episode_delay_ms;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the values a grid alone cannot check. Grids are validated when they are built.
    ///
    /// Without a step cap, a rollout only makes progress if episodes end on their own. Under
    /// `InBounds` that needs a goal or a crack somewhere on the grid. Under `AvoidCracks` the walk
    /// never steps onto a crack while a safe move exists, so the goal must be reachable from the
    /// start without crossing one.
    pub fn validate(&self) -> Result<(), FrozenLakeError> {
        let engine = TransitionEngine::for_grid(&self.grid, self.slip_probability)?;
        if self.max_steps_per_episode.is_some() {
            return Ok(());
        }
        let ends = match self.candidate_filter {
            CandidateFilter::InBounds => has_terminal(&self.grid),
            CandidateFilter::AvoidCracks => goal_reachable_without_cracks(&self.grid, &engine)?,
        };
        if ends {
            Ok(())
        } else {
            Err(FrozenLakeError::EpisodesNeverEnd)
        }
    }
}

fn has_terminal(grid: &Grid) -> bool {
    (0..grid.rows() as i32).any(|row| {
        (0..grid.cols() as i32).any(|col| {
            grid.kind_at(Position::new(row, col))
                .is_ok_and(|kind| kind.is_terminal())
        })
    })
}

fn goal_reachable_without_cracks(
    grid: &Grid,
    engine: &TransitionEngine,
) -> Result<bool, FrozenLakeError> {
    let start = grid.locate_start()?;
    let mut visited = vec![false; grid.rows() * grid.cols()];
    let index = |p: Position| p.row as usize * grid.cols() + p.col as usize;
    visited[index(start)] = true;
    let mut queue = VecDeque::from([start]);
    while let Some(position) = queue.pop_front() {
        for direction in engine.in_bounds_directions(position) {
            let next = engine.propose(position, direction);
            if visited[index(next)] {
                continue;
            }
            visited[index(next)] = true;
            match grid.kind_at(next)? {
                CellKind::Goal => return Ok(true),
                CellKind::Crack => {}
                _ => queue.push_back(next),
            }
        }
    }
    Ok(false)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(Grid::default())
    }
}
