use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use lavabottle::{BottleConfig, RenderToggles, Simulation};

#[derive(Parser, Debug)]
#[command(name = "lavabottle")]
#[command(about = "Lava lamp in a bottle: rigid-body balls rendered as metaballs", long_about = None)]
struct Args {
    /// Number of balls
    #[arg(long, default_value_t = 150)]
    balls: usize,

    /// Seed for ball placement (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Force the CPU canvas renderer instead of the GPU
    #[arg(long, default_value_t = false)]
    cpu: bool,

    /// Start with blur disabled
    #[arg(long, default_value_t = false)]
    no_blur: bool,

    /// Start with threshold disabled
    #[arg(long, default_value_t = false)]
    no_threshold: bool,

    /// Write every frame as a PNG into DIR
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = "frames")]
    record: Option<PathBuf>,

    /// Window width in logical pixels
    #[arg(long, default_value_t = 500)]
    width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value_t = 700)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut bottle = BottleConfig::default().with_ball_count(args.balls);
    if let Some(seed) = args.seed {
        bottle = bottle.with_seed(seed);
    }

    let mut simulation = Simulation::new()
        .with_bottle(bottle)
        .with_toggles(RenderToggles {
            blur: !args.no_blur,
            threshold: !args.no_threshold,
        })
        .with_canvas(args.cpu)
        .with_window_size(args.width, args.height);
    if let Some(dir) = args.record {
        simulation = simulation.with_recording(dir);
    }

    simulation.run()?;
    Ok(())
}
