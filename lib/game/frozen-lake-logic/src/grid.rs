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

//! The lake itself: a fixed rectangular layout of cells and what each cell is worth.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FrozenLakeError, Position, Score};

/// Kind of a grid cell. Determines its reward and how the agent slides over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Where every episode begins.
    Start,

    /// Slippery, landing here may start a slip.
    Ice,

    /// Broken ice, ends the episode with a penalty.
    Crack,

    /// Bonus cell. Does not stop a slip that is already underway.
    Ship,

    /// Ends the episode with the largest reward.
    Goal,
}

impl CellKind {
    /// Whether landing on this cell ends the episode.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CellKind::Crack | CellKind::Goal)
    }

    /// Character used for this kind in a text layout.
    pub fn symbol(&self) -> char {
        match self {
            CellKind::Start => 'S',
            CellKind::Ice => '.',
            CellKind::Crack => 'X',
            CellKind::Ship => '$',
            CellKind::Goal => 'G',
        }
    }
}

impl TryFrom<char> for CellKind {
    type Error = FrozenLakeError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'S' => Ok(CellKind::Start),
            '.' => Ok(CellKind::Ice),
            'X' => Ok(CellKind::Crack),
            '$' => Ok(CellKind::Ship),
            'G' => Ok(CellKind::Goal),
            _ => Err(FrozenLakeError::UnknownCell(c)),
        }
    }
}

/// Reward for landing on (or bumping a wall while standing on) a cell of this kind.
pub fn reward_for(kind: CellKind) -> Score {
    match kind {
        CellKind::Start => 0,
        CellKind::Ice => 0,
        CellKind::Crack => -10,
        CellKind::Ship => 20,
        CellKind::Goal => 100,
    }
}

/// The default lake: start bottom-left, goal top-right, one ship in the middle.
pub const DEFAULT_LAYOUT: [&str; 4] = ["...G", ".X.X", "..$X", "SXXX"];

/// Frozen Lake grid. Always rectangular, never empty, and always has exactly one start cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Grid {
    cells: Vec<CellKind>,
    width: usize,
    height: usize,
    start: Position,
}

impl Grid {
    /// Create a grid from rows of cells.
    pub fn new(rows: Vec<Vec<CellKind>>) -> Result<Self, FrozenLakeError> {
        let height = rows.len();
        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(FrozenLakeError::EmptyGrid);
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(FrozenLakeError::RaggedGrid {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
        }
        let cells: Vec<CellKind> = rows.into_iter().flatten().collect();
        let start = find_single_start(&cells, width)?;
        Ok(Self {
            cells,
            width,
            height,
            start,
        })
    }

    /// Create a grid from a text layout, one string per row. See [`CellKind::symbol`].
    pub fn from_layout<S: AsRef<str>>(layout: &[S]) -> Result<Self, FrozenLakeError> {
        let rows = layout
            .iter()
            .map(|line| {
                line.as_ref()
                    .trim()
                    .chars()
                    .map(CellKind::try_from)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rows)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.width
    }

    /// Whether a position lies on the grid.
    pub fn contains(&self, position: Position) -> bool {
        position.row >= 0
            && position.col >= 0
            && (position.row as usize) < self.height
            && (position.col as usize) < self.width
    }

    /// The start cell. Construction already guarantees there is exactly one, so this only fails
    /// if that invariant is broken.
    pub fn locate_start(&self) -> Result<Position, FrozenLakeError> {
        find_single_start(&self.cells, self.width)
    }

    /// Kind of the cell at a position.
    pub fn kind_at(&self, position: Position) -> Result<CellKind, FrozenLakeError> {
        if !self.contains(position) {
            return Err(FrozenLakeError::OutOfBounds(position));
        }
        Ok(self.cells[position.row as usize * self.width + position.col as usize])
    }

    /// Reward for a cell kind.
    pub fn reward_for(&self, kind: CellKind) -> Score {
        reward_for(kind)
    }

    /// Text layout of the grid with the agent drawn as `@`.
    pub fn render_with_agent(&self, agent: Position) -> String {
        let mut s = String::with_capacity((self.width + 1) * self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                let here = Position::new(row as i32, col as i32);
                if here == agent {
                    s.push('@');
                } else {
                    s.push(self.cells[row * self.width + col].symbol());
                }
            }
            if row < self.height - 1 {
                s.push('\n');
            }
        }
        s
    }

    fn layout(&self) -> Vec<String> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(CellKind::symbol).collect())
            .collect()
    }
}

fn find_single_start(cells: &[CellKind], width: usize) -> Result<Position, FrozenLakeError> {
    let mut starts = cells
        .iter()
        .enumerate()
        .filter(|(_, kind)| **kind == CellKind::Start)
        .map(|(i, _)| Position::new((i / width) as i32, (i % width) as i32));
    let first = starts.next().ok_or(FrozenLakeError::NoStartCell)?;
    match starts.next() {
        Some(second) => Err(FrozenLakeError::MultipleStartCells { first, second }),
        None => Ok(first),
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::from_layout(&DEFAULT_LAYOUT).expect("default layout is valid")
    }
}

impl FromStr for Grid {
    type Err = FrozenLakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().filter(|line| !line.trim().is_empty()).collect();
        Self::from_layout(&lines)
    }
}

impl TryFrom<Vec<String>> for Grid {
    type Error = FrozenLakeError;

    fn try_from(layout: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_layout(&layout)
    }
}

impl From<Grid> for Vec<String> {
    fn from(grid: Grid) -> Self {
        grid.layout()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.layout().join("\n"))
    }
}
