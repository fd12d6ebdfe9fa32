//! nightdrive - play the synth from the computer keyboard
//!
//! Run with: cargo run -- --sequencer

mod app;
mod keys;

use clap::Parser;

use app::Nightdrive;

#[derive(Debug, Parser)]
#[command(name = "nightdrive", about = "Polyphonic synth with an 8-step sequencer")]
struct Args {
    /// Sequencer tempo, clamped to 60-240
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// Number of voices
    #[arg(long, default_value_t = 8)]
    polyphony: usize,

    /// Master volume, 0.0-1.0
    #[arg(long, default_value_t = 0.7)]
    volume: f32,

    /// Start the sequencer immediately
    #[arg(long)]
    sequencer: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    Nightdrive::new()
        .bpm(args.bpm)
        .polyphony(args.polyphony)
        .volume(args.volume)
        .autoplay(args.sequencer)
        .run()
}
