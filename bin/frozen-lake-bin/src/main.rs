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

use std::cell::RefCell;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use frozen_lake_logic::{Grid, Position, Renderer, SimulationConfig, TracingRenderer};
use frozen_lake_rollout::{RandomDirectionSource, RolloutDriver};
use rand::SeedableRng;
use tracing::{error, info};

// Random-walk rollouts on the frozen lake.
//
// Usage: frozen-lake-bin [config.json]
//
// Without a config file the default 4x4 lake is used. With a non-zero step delay the board is
// drawn after every move, otherwise progress goes to the log (set RUST_LOG=debug for every move).
fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => SimulationConfig::default(),
    };

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, episodes = config.max_episodes, "starting rollout");
    let rng = Rc::new(RefCell::new(rand_pcg::Pcg64::seed_from_u64(seed)));

    let renderer: Box<dyn Renderer> = if config.step_delay_ms > 0 {
        Box::new(ConsoleRenderer::new(Duration::from_millis(config.step_delay_ms)))
    } else {
        Box::new(TracingRenderer)
    };
    let episode_delay = Duration::from_millis(config.episode_delay_ms);

    let mut driver = RolloutDriver::new(&config, Rc::clone(&rng), renderer)?;
    let mut source = RandomDirectionSource::new(rng);
    let report = driver.run(&mut source, config.max_episodes, |_| {
        if !episode_delay.is_zero() {
            std::thread::sleep(episode_delay);
        }
    })?;

    println!(
        "episodes: {} (goal: {}, crack: {}, truncated: {})",
        report.episodes, report.goals, report.cracks, report.truncated
    );
    match report.best_score {
        Some(best) => println!("best score: {}", best),
        None => println!("best score: none"),
    }
    if let Some(mean) = report.mean_score {
        println!("mean score: {:.2}", mean);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    parse_config(&text)
}

fn parse_config(text: &str) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let config: SimulationConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Draws the board to stdout after every move and pauses so a person can follow along.
struct ConsoleRenderer {
    step_delay: Duration,
}

impl ConsoleRenderer {
    fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Renderer for ConsoleRenderer {
    fn on_state_changed(&mut self, position: Position, grid: &Grid) {
        println!("{}\n", grid.render_with_agent(position));
        std::thread::sleep(self.step_delay);
    }

    fn on_episode_message(&mut self, text: &str) {
        println!("{}", text);
    }
}
