//! Swarm Arena headless runner
//!
//! Usage: `swarm-arena [config.json]`
//!
//! Runs the configured simulation and prints the final snapshot as JSON.
//! Without a config file a small demo population is used.

use std::ops::ControlFlow;
use std::process::ExitCode;

use swarm_arena::{ArenaSpec, Engine, EngineConfig, EngineError, GroupSpec};

/// Log a progress line every this many steps
const REPORT_INTERVAL: u64 = 1000;

fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::new(ArenaSpec::rectangular(1.0, 1.0, [true, false]));
    config.seed = 1;
    config.steps = Some(5000);
    config.groups = vec![
        GroupSpec::new("blind", 1000).named("swarm"),
        GroupSpec::new("fixed", 10).named("posts"),
    ];
    config
}

fn run() -> Result<(), EngineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            EngineConfig::load(path)?
        }
        None => {
            log::info!("No configuration given, running demo population");
            demo_config()
        }
    };
    if config.steps.is_none() {
        log::warn!("No step budget configured; running until interrupted");
    }

    let mut engine = Engine::from_config(&config)?;
    engine.prepare()?;

    let started = std::time::Instant::now();
    let steps = engine.run_until(|frame| {
        if frame.step % REPORT_INTERVAL == 0 {
            log::info!("Step {} ({:.1?} elapsed)", frame.step, started.elapsed());
        }
        ControlFlow::Continue(())
    })?;
    log::info!("Completed {} steps in {:.2?}", steps, started.elapsed());

    println!("{}", serde_json::to_string(&engine.snapshot())?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Swarm Arena starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
