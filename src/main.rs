use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use murmuration::reporting::write_json_line;
use murmuration::save_load;
use murmuration::Scenario;

#[derive(Parser, Debug)]
#[command(name = "murmuration", version, about = "Run a headless boid simulation")]
struct Cli {
    /// Scenario JSON file. The built-in demo flock is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Frames to simulate, overriding the scenario.
    #[arg(long)]
    frames: Option<u32>,

    /// Step length in seconds, overriding the scenario.
    #[arg(long)]
    dt: Option<f32>,

    /// Write one JSON summary line per system and frame.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Save the world here after the last frame.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a saved world instead of spawning the scenario.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Step agents one at a time instead of in parallel.
    #[arg(long)]
    sequential: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Frames to run after `start`, failing instead of wrapping past `u32::MAX`.
fn frame_range(start: u32, frames: u32) -> Result<Range<u32>> {
    let end = start
        .checked_add(frames)
        .with_context(|| format!("{frames} frames from frame {start} overflows the frame counter"))?;
    Ok(start..end)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let scenario = match &cli.scenario {
        Some(path) => Scenario::from_json_file(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => Scenario::demo(),
    };
    let dt = cli.dt.unwrap_or(scenario.dt);
    anyhow::ensure!(dt > 0.0 && dt.is_finite(), "dt must be finite and positive, got {dt}");
    let frames = cli.frames.unwrap_or(scenario.frames);

    let (mut world, start) = match &cli.load {
        Some(path) => {
            let state = save_load::load_from_file(path)
                .with_context(|| format!("failed to resume from {}", path.display()))?;
            (state.world, state.frame)
        }
        None => (scenario.build(), 0),
    };
    if cli.sequential {
        world.parallel = false;
    }

    let mut report = match &cli.report {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => None,
    };

    info!(
        systems = world.systems.len(),
        agents = world.systems.iter().map(|s| s.agents.len()).sum::<usize>(),
        start,
        frames,
        dt,
        parallel = world.parallel,
        "simulation starting"
    );

    let range = frame_range(start, frames)?;
    let end = range.end;
    for frame in range {
        let summaries = world.step(dt, frame);
        if let Some(out) = report.as_mut() {
            for summary in &summaries {
                write_json_line(out, summary).context("failed to write report")?;
            }
        }
    }

    if let Some(mut out) = report {
        out.flush().context("failed to flush report")?;
    }

    for system in &world.systems {
        info!(name = %system.name, alive = system.alive(), total = system.agents.len(), "system finished");
    }

    if let Some(path) = &cli.save {
        save_load::save_to_file(&world, end, path)
            .with_context(|| format!("failed to save to {}", path.display()))?;
    }
    Ok(())
}
