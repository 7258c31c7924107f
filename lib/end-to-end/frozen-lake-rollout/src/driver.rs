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

//! The rollout driver runs capped sequences of episodes and keeps score.

use std::cell::RefCell;
use std::rc::Rc;

use frozen_lake_logic::{
    CandidateFilter, CellKind, EpisodeController, FrozenLakeError, Renderer, Rng, Score,
    SimulationConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::direction::DirectionSource;

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// Reached the goal.
    Goal,

    /// Fell through a crack.
    Crack,

    /// Hit the per-episode step cap.
    Truncated,
}

impl std::fmt::Display for EpisodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeOutcome::Goal => write!(f, "goal"),
            EpisodeOutcome::Crack => write!(f, "crack"),
            EpisodeOutcome::Truncated => write!(f, "truncated"),
        }
    }
}

/// A finished episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Index of the episode within the driver's lifetime, starting at 0.
    pub index: usize,

    /// How it ended.
    pub outcome: EpisodeOutcome,

    /// Final score.
    pub score: Score,

    /// Steps taken.
    pub steps: u32,
}

/// Final scores of completed episodes, in order. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutHistory {
    scores: Vec<Score>,
}

impl RolloutHistory {
    fn record(&mut self, score: Score) {
        self.scores.push(score);
    }

    /// All recorded scores.
    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    /// Number of completed episodes.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no episode has completed yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Best score so far.
    pub fn best(&self) -> Option<Score> {
        self.scores.iter().copied().max()
    }

    /// Mean score so far.
    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let total: i64 = self.scores.iter().map(|&s| i64::from(s)).sum();
        Some(total as f64 / self.scores.len() as f64)
    }
}

/// Result of one call to [`RolloutDriver::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolloutReport {
    /// Episodes completed during this run.
    pub episodes: u32,

    /// Episodes that reached the goal.
    pub goals: u32,

    /// Episodes that ended on a crack.
    pub cracks: u32,

    /// Episodes cut short by the step cap.
    pub truncated: u32,

    /// Best score in the whole history, not just this run.
    pub best_score: Option<Score>,

    /// Mean score in the whole history.
    pub mean_score: Option<f64>,

    /// Whether the run stopped because it was cancelled.
    pub cancelled: bool,
}

/// Runs episodes one after another under a move source.
pub struct RolloutDriver<R: Renderer> {
    controller: EpisodeController,
    renderer: R,
    candidate_filter: CandidateFilter,
    max_steps_per_episode: Option<u32>,
    history: RolloutHistory,
    cancellation: CancellationToken,
}

impl<R: Renderer> RolloutDriver<R> {
    /// Create a driver. Fails if the configuration is malformed.
    pub fn new(
        config: &SimulationConfig,
        rng: Rc<RefCell<Rng>>,
        renderer: R,
    ) -> Result<Self, FrozenLakeError> {
        config.validate()?;
        Ok(Self {
            controller: EpisodeController::new(config, rng)?,
            renderer,
            candidate_filter: config.candidate_filter,
            max_steps_per_episode: config.max_steps_per_episode,
            history: RolloutHistory::default(),
            cancellation: CancellationToken::new(),
        })
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Token that cancels this driver's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Scores of all completed episodes.
    pub fn history(&self) -> &RolloutHistory {
        &self.history
    }

    /// The episode currently being played.
    pub fn controller(&self) -> &EpisodeController {
        &self.controller
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run up to `max_episodes` episodes, calling `on_episode_end` after each.
    ///
    /// Cancellation is checked before every step. An episode that is still in progress when the
    /// run is cancelled is thrown away and not recorded.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        max_episodes: u32,
        mut on_episode_end: F,
    ) -> Result<RolloutReport, FrozenLakeError>
    where
        S: DirectionSource + ?Sized,
        F: FnMut(&EpisodeSummary),
    {
        let mut report = RolloutReport::default();
        self.controller.reset();

        while report.episodes < max_episodes {
            if self.cancellation.is_cancelled() {
                if self.controller.steps() > 0 {
                    debug!(
                        steps = self.controller.steps(),
                        "discarding unfinished episode"
                    );
                }
                self.controller.reset();
                warn!(episodes = report.episodes, "rollout cancelled");
                report.cancelled = true;
                break;
            }

            let position = self.controller.position();
            let candidates = self.controller.candidate_directions(self.candidate_filter);
            if candidates.is_empty() {
                return Err(FrozenLakeError::NoCandidateMoves(position));
            }
            let direction = source.next_direction(position, &candidates);
            let outcome = self.controller.step(direction, &mut self.renderer)?;

            let truncated = !outcome.is_terminal()
                && self
                    .max_steps_per_episode
                    .is_some_and(|max| self.controller.steps() >= max);
            if !outcome.is_terminal() && !truncated {
                continue;
            }

            let episode_outcome = match outcome.kind {
                CellKind::Goal => EpisodeOutcome::Goal,
                CellKind::Crack => EpisodeOutcome::Crack,
                _ => EpisodeOutcome::Truncated,
            };
            match episode_outcome {
                EpisodeOutcome::Goal => report.goals += 1,
                EpisodeOutcome::Crack => report.cracks += 1,
                EpisodeOutcome::Truncated => report.truncated += 1,
            }

            let summary = EpisodeSummary {
                index: self.history.len(),
                outcome: episode_outcome,
                score: self.controller.score(),
                steps: self.controller.steps(),
            };
            self.history.record(summary.score);
            report.episodes += 1;

            let best = self.history.best().unwrap_or(summary.score);
            info!(
                episode = summary.index,
                outcome = %summary.outcome,
                score = summary.score,
                steps = summary.steps,
                best,
                "episode finished"
            );
            self.renderer.on_episode_message(&format!(
                "episode {} ended ({}) with score {}, best so far {}",
                summary.index, summary.outcome, summary.score, best
            ));
            on_episode_end(&summary);

            self.controller.reset();
        }

        report.best_score = self.history.best();
        report.mean_score = self.history.mean();
        info!(
            episodes = report.episodes,
            goals = report.goals,
            cracks = report.cracks,
            truncated = report.truncated,
            best = ?report.best_score,
            "rollout finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use frozen_lake_logic::{Direction, Grid, NullRenderer, Position, Rng};
    use proptest::prelude::*;
    use rand::SeedableRng;

    use super::*;
    use crate::direction::{RandomDirectionSource, ScriptedDirectionSource};

    fn shared_rng(seed: u64) -> Rc<RefCell<Rng>> {
        Rc::new(RefCell::new(rand_pcg::Pcg64::seed_from_u64(seed)))
    }

    fn no_slip_config(layout: &[&str]) -> SimulationConfig {
        let grid = Grid::from_layout(layout).expect("valid grid");
        SimulationConfig::new(grid).with_slip_probability(0.0)
    }

    const PATH_TO_GOAL: [&str; 4] = ["...G", ".XXX", ".XXX", "SXXX"];

    #[test]
    fn test_random_rollout_completes_all_episodes() {
        let config = SimulationConfig::default().with_seed(42);
        let rng = shared_rng(42);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let mut source = RandomDirectionSource::new(rng);
        let mut seen = Vec::new();

        let report = driver
            .run(&mut source, 50, |summary| seen.push(*summary))
            .expect("run failed");

        assert_eq!(report.episodes, 50);
        assert_eq!(report.goals + report.cracks, 50);
        assert_eq!(report.truncated, 0);
        assert!(!report.cancelled);
        assert_eq!(driver.history().len(), 50);
        assert_eq!(seen.len(), 50);
        assert_eq!(
            seen.iter().map(|s| s.score).collect::<Vec<_>>(),
            driver.history().scores()
        );
        assert_eq!(report.best_score, driver.history().scores().iter().copied().max());
        for (i, summary) in seen.iter().enumerate() {
            assert_eq!(summary.index, i);
        }
    }

    #[test]
    fn test_scripted_walk_to_goal_every_episode() {
        let config = no_slip_config(&PATH_TO_GOAL);
        let mut driver =
            RolloutDriver::new(&config, shared_rng(1), NullRenderer).expect("valid config");
        let walk = [
            Direction::Up,
            Direction::Up,
            Direction::Up,
            Direction::Right,
            Direction::Right,
            Direction::Right,
        ];
        let mut source = ScriptedDirectionSource::new(walk.iter().chain(walk.iter()).copied());

        let report = driver.run(&mut source, 2, |_| {}).expect("run failed");

        assert_eq!(report.goals, 2);
        assert_eq!(driver.history().scores(), &[100, 100]);
        assert_eq!(report.best_score, Some(100));
        assert_eq!(report.mean_score, Some(100.0));
    }

    #[derive(Default)]
    struct MessageLog {
        moves: usize,
        messages: Vec<String>,
    }

    impl Renderer for MessageLog {
        fn on_state_changed(&mut self, _position: Position, _grid: &Grid) {
            self.moves += 1;
        }

        fn on_episode_message(&mut self, text: &str) {
            self.messages.push(text.to_string());
        }
    }

    #[test]
    fn test_renderer_hears_about_each_episode() {
        let config = no_slip_config(&["S.G"]);
        let mut log = MessageLog::default();
        {
            let mut driver =
                RolloutDriver::new(&config, shared_rng(5), &mut log).expect("valid config");
            let mut source = ScriptedDirectionSource::default();
            let report = driver.run(&mut source, 2, |_| {}).expect("run failed");
            assert_eq!(report.goals, 2);
        }
        assert_eq!(log.moves, 4);
        assert_eq!(
            log.messages,
            vec![
                "reached the goal! score: 100".to_string(),
                "episode 0 ended (goal) with score 100, best so far 100".to_string(),
                "reached the goal! score: 100".to_string(),
                "episode 1 ended (goal) with score 100, best so far 100".to_string(),
            ]
        );
    }

    #[test]
    fn test_avoid_cracks_filter_reaches_goal() {
        let config =
            no_slip_config(&PATH_TO_GOAL).with_candidate_filter(CandidateFilter::AvoidCracks);
        let rng = shared_rng(3);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let mut source = RandomDirectionSource::new(rng);

        let report = driver.run(&mut source, 10, |_| {}).expect("run failed");

        assert_eq!(report.goals, 10);
        assert_eq!(report.cracks, 0);
    }

    #[test]
    fn test_zero_episodes_reports_nothing() {
        let config = SimulationConfig::default();
        let mut driver =
            RolloutDriver::new(&config, shared_rng(0), NullRenderer).expect("valid config");
        let mut source = ScriptedDirectionSource::default();
        let report = driver.run(&mut source, 0, |_| {}).expect("run failed");
        assert_eq!(report.episodes, 0);
        assert_eq!(report.best_score, None);
        assert!(driver.history().is_empty());
    }

    #[test]
    fn test_step_cap_truncates_episode() {
        let config = no_slip_config(&["S..", "...", "..G"]).with_max_steps_per_episode(5);
        let mut driver =
            RolloutDriver::new(&config, shared_rng(0), NullRenderer).expect("valid config");
        // Always taking the first candidate bounces between (0, 2) and (1, 2) forever.
        let mut source = |_: Position, candidates: &[Direction]| candidates[0];

        let report = driver.run(&mut source, 3, |_| {}).expect("run failed");

        assert_eq!(report.truncated, 3);
        assert_eq!(driver.history().len(), 3);
    }

    #[test]
    fn test_cancel_between_episodes_keeps_history() {
        let config = SimulationConfig::default();
        let rng = shared_rng(7);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let token = driver.cancellation_token();
        let mut source = RandomDirectionSource::new(rng);

        let report = driver
            .run(&mut source, 100, |summary| {
                if summary.index == 2 {
                    token.cancel();
                }
            })
            .expect("run failed");

        assert!(report.cancelled);
        assert_eq!(report.episodes, 3);
        assert_eq!(driver.history().len(), 3);
    }

    #[test]
    fn test_cancel_mid_episode_discards_it() {
        let config = no_slip_config(&PATH_TO_GOAL);
        let token = CancellationToken::new();
        let mut driver = RolloutDriver::new(&config, shared_rng(0), NullRenderer)
            .expect("valid config")
            .with_cancellation(token.clone());
        let mut calls = 0;
        let mut source = |_: Position, _: &[Direction]| {
            calls += 1;
            if calls == 2 {
                token.cancel();
            }
            Direction::Up
        };

        let report = driver.run(&mut source, 5, |_| {}).expect("run failed");

        assert!(report.cancelled);
        assert_eq!(report.episodes, 0);
        assert!(driver.history().is_empty());
        assert_eq!(driver.controller().steps(), 0);
        assert_eq!(driver.controller().position(), Position::new(3, 0));
    }

    #[test]
    fn test_history_persists_across_runs() {
        let config = SimulationConfig::default();
        let rng = shared_rng(11);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let mut source = RandomDirectionSource::new(rng);

        driver.run(&mut source, 4, |_| {}).expect("run failed");
        let first: Vec<Score> = driver.history().scores().to_vec();
        let report = driver.run(&mut source, 3, |_| {}).expect("run failed");

        assert_eq!(report.episodes, 3);
        assert_eq!(driver.history().len(), 7);
        assert_eq!(&driver.history().scores()[..4], &first[..]);
    }

    #[test]
    fn test_default_step_cap_ends_episodes_on_grid_without_terminal() {
        let config = no_slip_config(&["S.."]);
        let rng = shared_rng(1);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let mut source = RandomDirectionSource::new(rng);

        let report = driver.run(&mut source, 2, |_| {}).expect("run failed");

        assert_eq!(report.truncated, 2);
        assert_eq!(driver.history().len(), 2);
    }

    #[test]
    fn test_uncapped_endless_configs_are_refused() {
        let no_terminal = no_slip_config(&["S.."]).without_step_cap();
        assert!(matches!(
            RolloutDriver::new(&no_terminal, shared_rng(1), NullRenderer),
            Err(FrozenLakeError::EpisodesNeverEnd)
        ));

        let goal_behind_crack = no_slip_config(&["S.XG"])
            .with_candidate_filter(CandidateFilter::AvoidCracks)
            .without_step_cap();
        assert!(matches!(
            RolloutDriver::new(&goal_behind_crack, shared_rng(1), NullRenderer),
            Err(FrozenLakeError::EpisodesNeverEnd)
        ));
    }

    #[test]
    fn test_goal_behind_crack_is_truncated_under_avoid_cracks() {
        let config =
            no_slip_config(&["S.XG"]).with_candidate_filter(CandidateFilter::AvoidCracks);
        let rng = shared_rng(1);
        let mut driver =
            RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
        let mut source = RandomDirectionSource::new(rng);

        let report = driver.run(&mut source, 1, |_| {}).expect("run failed");

        assert_eq!(report.truncated, 1);
        assert_eq!(report.cracks, 0);
    }

    #[test]
    fn test_single_cell_grid_has_no_moves() {
        let config = no_slip_config(&["S"]);
        let mut driver =
            RolloutDriver::new(&config, shared_rng(0), NullRenderer).expect("valid config");
        let mut source = ScriptedDirectionSource::default();
        assert_eq!(
            driver.run(&mut source, 1, |_| {}),
            Err(FrozenLakeError::NoCandidateMoves(Position::new(0, 0)))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_history_length_matches_completed_episodes(
            seed in any::<u64>(),
            max_episodes in 0..20u32,
        ) {
            let config = SimulationConfig::default().with_max_steps_per_episode(500);
            let rng = shared_rng(seed);
            let mut driver = RolloutDriver::new(&config, Rc::clone(&rng), NullRenderer).expect("valid config");
            let mut source = RandomDirectionSource::new(rng);
            let mut completed = 0usize;

            let report = driver.run(&mut source, max_episodes, |_| completed += 1).expect("run failed");

            prop_assert_eq!(report.episodes, max_episodes);
            prop_assert_eq!(driver.history().len(), completed);
            prop_assert_eq!(completed, max_episodes as usize);
            prop_assert_eq!(report.goals + report.cracks + report.truncated, max_episodes);
            prop_assert_eq!(report.best_score, driver.history().scores().iter().copied().max());
        }
    }
}
