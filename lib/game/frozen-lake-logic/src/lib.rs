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

#![warn(missing_docs)]

//! Frozen Lake simulation logic.
//!
//! An agent walks a fixed grid of ice. Some cells are cracked (the episode ends badly), one is the
//! goal (the episode ends well), ships give a bonus, and ice is slippery: landing on it can send
//! the agent sliding further in the same direction. This crate holds the grid, the transition
//! model and the single-episode state machine. Running many episodes under a policy lives in the
//! `frozen-lake-rollout` crate.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod episode;
pub mod grid;
pub mod render;
pub mod transition;

pub use config::{CandidateFilter, SimulationConfig, MAX_STEPS_PER_EPISODE, SLIP_PROBABILITY};
pub use episode::{EpisodeController, EpisodeStatus, StepOutcome};
pub use grid::{CellKind, Grid};
pub use render::{NullRenderer, Renderer, TracingRenderer};
pub use transition::{Resolution, TransitionEngine};

/// Random number generator used for slips and random walks.
pub type Rng = rand_pcg::Pcg64;

/// Reward or score value.
pub type Score = i32;

/// Frozen Lake error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrozenLakeError {
    /// The grid has no rows or no columns.
    #[error("grid is empty")]
    EmptyGrid,

    /// A grid row has a different length than the first row.
    #[error("grid row {row} has {found} cells, expected {expected}")]
    RaggedGrid {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// A character in a grid layout does not name a cell kind.
    #[error("unknown cell '{0}' in grid layout")]
    UnknownCell(char),

    /// The grid has no start cell.
    #[error("no start in grid")]
    NoStartCell,

    /// The grid has more than one start cell.
    #[error("grid has more than one start: {first} and {second}")]
    MultipleStartCells {
        /// First start cell in row-major order.
        first: Position,
        /// Second start cell in row-major order.
        second: Position,
    },

    /// Slip probability is not within [0, 1].
    #[error("slip probability must be within [0, 1], got {0}")]
    InvalidSlipProbability(String),

    /// Without a step cap, episodes on this grid could run forever.
    #[error("episodes can never end: add a reachable goal or crack, or set a step cap")]
    EpisodesNeverEnd,

    /// A grid lookup was made outside of the grid.
    #[error("position is outside of the grid: {0}")]
    OutOfBounds(Position),

    /// The episode already reached a terminal cell and must be reset before stepping again.
    #[error("episode has terminated")]
    EpisodeTerminated,

    /// No direction keeps the agent on the grid.
    #[error("no candidate moves from {0}")]
    NoCandidateMoves(Position),
}

impl FrozenLakeError {
    /// Whether this error comes from a malformed grid or configuration. These are fatal at startup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FrozenLakeError::EmptyGrid
                | FrozenLakeError::RaggedGrid { .. }
                | FrozenLakeError::UnknownCell(_)
                | FrozenLakeError::NoStartCell
                | FrozenLakeError::MultipleStartCells { .. }
                | FrozenLakeError::InvalidSlipProbability(_)
                | FrozenLakeError::EpisodesNeverEnd
        )
    }
}

/// A cell coordinate. Signed so that a proposed move off the grid is representable before it is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row, 0 is the top row.
    pub row: i32,

    /// Column, 0 is the left column.
    pub col: i32,
}

impl Position {
    /// Create a new position.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Direction of a single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// One row up.
    Up,

    /// One column right.
    Right,

    /// One row down.
    Down,

    /// One column left.
    Left,
}

impl Direction {
    /// All directions, in the order Up, Right, Down, Left.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit (row, col) delta of this direction.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "Up"),
            Direction::Right => write!(f, "Right"),
            Direction::Down => write!(f, "Down"),
            Direction::Left => write!(f, "Left"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_deltas_are_unit_moves() {
        for direction in Direction::ALL {
            let (dr, dc) = direction.delta();
            assert_eq!(dr.abs() + dc.abs(), 1, "direction: {}", direction);
        }
        assert_eq!(Direction::Up.delta(), (-1, 0));
        assert_eq!(Direction::Right.delta(), (0, 1));
        assert_eq!(Direction::Down.delta(), (1, 0));
        assert_eq!(Direction::Left.delta(), (0, -1));
    }

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(FrozenLakeError::NoStartCell.is_configuration());
        assert!(FrozenLakeError::UnknownCell('?').is_configuration());
        assert!(!FrozenLakeError::OutOfBounds(Position::new(-1, 0)).is_configuration());
        assert!(!FrozenLakeError::EpisodeTerminated.is_configuration());
    }

    #[test]
    fn test_no_start_message() {
        assert_eq!(FrozenLakeError::NoStartCell.to_string(), "no start in grid");
    }
}
