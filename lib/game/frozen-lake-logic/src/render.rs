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

//! Presentation hooks. The simulation tells a renderer what happened; renderers never change the
//! simulation.

use tracing::{debug, info};

use crate::grid::Grid;
use crate::Position;

/// Receives state changes from an episode.
pub trait Renderer {
    /// Called after every accepted or rejected move, including each cell of a slip.
    fn on_state_changed(&mut self, position: Position, grid: &Grid);

    /// Called with human-readable news: slips, wins, failures and score summaries.
    fn on_episode_message(&mut self, text: &str);
}

/// Renderer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn on_state_changed(&mut self, _position: Position, _grid: &Grid) {}

    fn on_episode_message(&mut self, _text: &str) {}
}

/// Renderer that forwards everything to `tracing`. Moves are logged at debug level, messages at
/// info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn on_state_changed(&mut self, position: Position, _grid: &Grid) {
        debug!(%position, "agent moved");
    }

    fn on_episode_message(&mut self, text: &str) {
        info!("{}", text);
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn on_state_changed(&mut self, position: Position, grid: &Grid) {
        (**self).on_state_changed(position, grid);
    }

    fn on_episode_message(&mut self, text: &str) {
        (**self).on_episode_message(text);
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn on_state_changed(&mut self, position: Position, grid: &Grid) {
        (**self).on_state_changed(position, grid);
    }

    fn on_episode_message(&mut self, text: &str) {
        (**self).on_episode_message(text);
    }
}
