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

//! Where moves come from.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use frozen_lake_logic::{Direction, Position, Rng};
use rand::seq::SliceRandom;

/// Supplies the next move of an episode.
pub trait DirectionSource {
    /// Pick one of `candidates`. The driver never passes an empty slice.
    fn next_direction(&mut self, position: Position, candidates: &[Direction]) -> Direction;
}

impl<F> DirectionSource for F
where
    F: FnMut(Position, &[Direction]) -> Direction,
{
    fn next_direction(&mut self, position: Position, candidates: &[Direction]) -> Direction {
        self(position, candidates)
    }
}

/// Uniform random choice among the candidates.
pub struct RandomDirectionSource {
    rng: Rc<RefCell<Rng>>,
}

impl RandomDirectionSource {
    /// Create a random source drawing from a shared generator.
    pub fn new(rng: Rc<RefCell<Rng>>) -> Self {
        Self { rng }
    }
}

impl DirectionSource for RandomDirectionSource {
    fn next_direction(&mut self, _position: Position, candidates: &[Direction]) -> Direction {
        let mut rng = self.rng.borrow_mut();
        *candidates
            .choose(&mut *rng)
            .expect("driver always offers at least one candidate")
    }
}

/// Replays a queue of buffered moves, e.g. keys pressed ahead of time.
///
/// A queued move that is not among the candidates is dropped and the first candidate is used
/// instead, and so is an empty queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDirectionSource {
    moves: VecDeque<Direction>,
}

impl ScriptedDirectionSource {
    /// Create a source that replays `moves` in order.
    pub fn new<I: IntoIterator<Item = Direction>>(moves: I) -> Self {
        Self {
            moves: moves.into_iter().collect(),
        }
    }

    /// Queue another move.
    pub fn push(&mut self, direction: Direction) {
        self.moves.push_back(direction);
    }

    /// Number of moves still queued.
    pub fn remaining(&self) -> usize {
        self.moves.len()
    }
}

impl DirectionSource for ScriptedDirectionSource {
    fn next_direction(&mut self, _position: Position, candidates: &[Direction]) -> Direction {
        match self.moves.pop_front() {
            Some(direction) if candidates.contains(&direction) => direction,
            _ => candidates[0],
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const HERE: Position = Position { row: 0, col: 0 };

    #[test]
    fn test_random_source_only_picks_candidates() {
        let rng = Rc::new(RefCell::new(rand_pcg::Pcg64::seed_from_u64(42)));
        let mut source = RandomDirectionSource::new(rng);
        let candidates = [Direction::Up, Direction::Left];
        let mut seen_up = false;
        let mut seen_left = false;
        for _ in 0..100 {
            match source.next_direction(HERE, &candidates) {
                Direction::Up => seen_up = true,
                Direction::Left => seen_left = true,
                other => panic!("picked a non-candidate: {:?}", other),
            }
        }
        assert!(seen_up && seen_left);
    }

    #[test]
    fn test_scripted_source_replays_in_order() {
        let mut source = ScriptedDirectionSource::new([Direction::Up, Direction::Right]);
        let all = Direction::ALL;
        assert_eq!(source.next_direction(HERE, &all), Direction::Up);
        assert_eq!(source.next_direction(HERE, &all), Direction::Right);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_scripted_source_falls_back_to_first_candidate() {
        let mut source = ScriptedDirectionSource::new([Direction::Left]);
        let candidates = [Direction::Down, Direction::Right];
        assert_eq!(source.next_direction(HERE, &candidates), Direction::Down);
        assert_eq!(source.next_direction(HERE, &candidates), Direction::Down);
        source.push(Direction::Right);
        assert_eq!(source.next_direction(HERE, &candidates), Direction::Right);
    }

    #[test]
    fn test_closure_is_a_source() {
        let mut source = |_: Position, candidates: &[Direction]| candidates[candidates.len() - 1];
        assert_eq!(
            source.next_direction(HERE, &[Direction::Up, Direction::Down]),
            Direction::Down
        );
    }
}
