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

//! Movement over the lake: unit moves, boundary checks, and slip chains.
//!
//! A move that would leave the grid is rejected and the agent stays put. A move that lands on ice
//! may start a slip, after which the agent keeps sliding the same way without new input until it
//! reaches a cell that stops it. Ships keep an existing slip going but never start one. Cracks and
//! the goal always stop the agent because the episode is over.

use rand::Rng as _;
use tracing::trace;

use crate::config::SLIP_PROBABILITY;
use crate::grid::{CellKind, Grid};
use crate::{Direction, FrozenLakeError, Position, Rng};

/// Result of resolving one move, including every cell passed over while sliding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Every cell landed on, in order. Empty if the very first move was rejected.
    pub path: Vec<Position>,

    /// Where the agent ends up.
    pub position: Position,

    /// Kind of the cell the agent ends up on.
    pub kind: CellKind,

    /// Slipping flag after the move.
    pub slipping: bool,

    /// Whether a fresh slip was started on ice during this move, as opposed to continuing one.
    pub slip_started: bool,

    /// Number of extra cells travelled because of sliding.
    pub slides: u32,

    /// Whether the chain ended because the next move would have left the grid.
    pub hit_boundary: bool,
}

impl Resolution {
    /// Whether the agent moved at all.
    pub fn moved(&self) -> bool {
        !self.path.is_empty()
    }

    /// Whether the move ended the episode.
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

/// Pure transition model over a grid of fixed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEngine {
    rows: i32,
    cols: i32,
    slip_probability: f64,
}

impl TransitionEngine {
    /// Create a transition engine for a grid of the given size.
    pub fn new(rows: usize, cols: usize, slip_probability: f64) -> Result<Self, FrozenLakeError> {
        if !(0.0..=1.0).contains(&slip_probability) {
            return Err(FrozenLakeError::InvalidSlipProbability(
                slip_probability.to_string(),
            ));
        }
        Ok(Self {
            rows: rows as i32,
            cols: cols as i32,
            slip_probability,
        })
    }

    /// Create a transition engine sized for a grid.
    pub fn for_grid(grid: &Grid, slip_probability: f64) -> Result<Self, FrozenLakeError> {
        Self::new(grid.rows(), grid.cols(), slip_probability)
    }

    /// Chance that landing on ice starts a slip.
    pub fn slip_probability(&self) -> f64 {
        self.slip_probability
    }

    /// Target of a single unit move. The result may be off the grid.
    pub fn propose(&self, position: Position, direction: Direction) -> Position {
        let (dr, dc) = direction.delta();
        Position::new(position.row + dr, position.col + dc)
    }

    /// Whether a position lies within the grid.
    pub fn is_in_bounds(&self, position: Position) -> bool {
        (0..self.rows).contains(&position.row) && (0..self.cols).contains(&position.col)
    }

    /// Directions whose single move from `position` stays on the grid.
    pub fn in_bounds_directions(&self, position: Position) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&direction| self.is_in_bounds(self.propose(position, direction)))
            .collect()
    }

    /// Resolve a move from `from` in `direction`, following any slip chain to its end.
    ///
    /// `slipping` is the slipping flag carried over from previous moves in the episode. When it
    /// is set, landing on ice or a ship does not stop the agent. Otherwise landing on ice starts a
    /// slip with probability [`TransitionEngine::slip_probability`].
    pub fn resolve(
        &self,
        grid: &Grid,
        from: Position,
        direction: Direction,
        slipping: bool,
        rng: &mut Rng,
    ) -> Result<Resolution, FrozenLakeError> {
        let mut position = from;
        let mut slipping = slipping;
        let mut slip_started = false;
        let mut slides = 0;
        let mut path = Vec::new();

        loop {
            let target = self.propose(position, direction);
            if !self.is_in_bounds(target) {
                return Ok(Resolution {
                    path,
                    position,
                    kind: grid.kind_at(position)?,
                    slipping: false,
                    slip_started,
                    slides,
                    hit_boundary: true,
                });
            }

            if !path.is_empty() {
                slides += 1;
            }
            position = target;
            path.push(position);

            let kind = grid.kind_at(position)?;
            let keep_sliding = match kind {
                CellKind::Goal | CellKind::Crack => false,
                CellKind::Ice if slipping => true,
                CellKind::Ice => {
                    let slipped = rng.gen_bool(self.slip_probability);
                    if slipped {
                        trace!(%position, %direction, "slip started on ice");
                        slip_started = true;
                    }
                    slipped
                }
                CellKind::Ship => slipping,
                CellKind::Start => false,
            };

            if !keep_sliding {
                return Ok(Resolution {
                    path,
                    position,
                    kind,
                    slipping: slipping && !kind.is_terminal(),
                    slip_started,
                    slides,
                    hit_boundary: false,
                });
            }
            slipping = true;
        }
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        let grid = Grid::default();
        Self {
            rows: grid.rows() as i32,
            cols: grid.cols() as i32,
            slip_probability: SLIP_PROBABILITY,
        }
    }
}
