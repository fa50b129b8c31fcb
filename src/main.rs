//! Isogrow entry point
//!
//! Seeds the simulation from the origin and steps it at a soft frame cadence,
//! logging statistics. Rendering is left to whoever consumes the particles.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;

use isogrow::{DetailPreset, GrowthSettings, Simulation};

/// Grow particles over the zero level-set of a seeded noise field
#[derive(Parser, Debug)]
#[command(name = "isogrow", version, about)]
struct Args {
    /// JSON settings file (missing keys use defaults)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Noise seed
    #[arg(long)]
    noise_seed: Option<u32>,

    /// Seed for tangent-direction draws
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Iso value on the [0, 1] noise
    #[arg(long)]
    level_curve: Option<f64>,

    /// Particle spacing preset: coarse, medium or fine
    #[arg(long)]
    preset: Option<String>,

    /// Stop after this many steps (runs until interrupted otherwise)
    #[arg(long)]
    steps: Option<u64>,

    /// Soft per-step frame budget in milliseconds (0 = as fast as possible)
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Log statistics every N steps
    #[arg(long, default_value_t = 50)]
    log_every: u64,
}

impl Args {
    fn settings(&self) -> Result<GrowthSettings> {
        let mut settings = match &self.settings {
            Some(path) => GrowthSettings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => GrowthSettings::default(),
        };
        if let Some(name) = &self.preset {
            let Some(preset) = DetailPreset::from_str(name) else {
                bail!("unknown preset {name:?} (expected coarse, medium or fine)");
            };
            settings.apply_preset(preset);
        }
        if let Some(seed) = self.noise_seed {
            settings.noise_seed = seed;
        }
        if let Some(seed) = self.rng_seed {
            settings.rng_seed = seed;
        }
        if let Some(level) = self.level_curve {
            settings.level_curve = level;
        }
        if let Some(ms) = self.frame_ms {
            settings.frame_ms = ms;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = args.settings()?;
    log::info!(
        "Isogrow starting: noise seed {}, level curve {}, target edge {}",
        settings.noise_seed,
        settings.level_curve,
        settings.target_edge_length
    );

    let frame = Duration::from_millis(settings.frame_ms);
    // A degenerate seed is fatal: retrying elsewhere would change the shape
    let mut sim = Simulation::from_settings(settings).context("seeding from the origin")?;

    let log_every = args.log_every.max(1);
    let mut step = 0u64;
    loop {
        if args.steps.is_some_and(|limit| step >= limit) {
            break;
        }
        let started = Instant::now();
        let stats = sim.step();
        step += 1;

        if step % log_every == 0 || stats.reverted > 0 {
            log::info!("{stats}");
        }

        // Overruns start the next step immediately; no backlog is kept
        if let Some(rest) = frame.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    log::info!(
        "Stopped after {step} steps with {} particles (force {:.3e})",
        sim.particles().len(),
        sim.force_strength()
    );
    Ok(())
}
