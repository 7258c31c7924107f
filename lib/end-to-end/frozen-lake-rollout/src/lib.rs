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

//! Rollouts over the frozen lake.
//!
//! A rollout runs episode after episode under a move source, records the final score of each, and
//! stops at an episode cap or when cancelled.

pub mod cancel;
pub mod direction;
pub mod driver;

pub use cancel::CancellationToken;
pub use direction::{DirectionSource, RandomDirectionSource, ScriptedDirectionSource};
pub use driver::{EpisodeOutcome, EpisodeSummary, RolloutDriver, RolloutHistory, RolloutReport};
