//! holiday_tree: interactive entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use holiday_tree::app::{self, SourceKind};
use holiday_tree::{logging, settings};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "holiday_tree", version, about = "Gesture-controlled holiday tree")]
struct Cli {
    /// Settings file (TOML).  Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay JSON-lines landmark records instead of simulating; `-` reads stdin.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Track a real hand with a LeapMotion controller.
    #[cfg(feature = "leap")]
    #[arg(long, conflicts_with = "replay")]
    leap: bool,

    /// Default log level; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed for scene generation, for reproducible layouts.
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn source(&self) -> SourceKind {
        if let Some(hw) = self.hardware() {
            return hw;
        }
        match &self.replay {
            Some(p) if p.as_os_str() == "-" => SourceKind::Replay(None),
            Some(p) => SourceKind::Replay(Some(p.clone())),
            None => SourceKind::Simulated,
        }
    }

    #[cfg(feature = "leap")]
    fn hardware(&self) -> Option<SourceKind> {
        self.leap.then_some(SourceKind::Leap)
    }

    #[cfg(not(feature = "leap"))]
    fn hardware(&self) -> Option<SourceKind> {
        None
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    let settings = settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let source = cli.source();
    info!(?source, seed = ?cli.seed, "starting");

    app::run(&settings, source, cli.seed).context("visualizer failed")?;
    info!("bye");
    Ok(())
}
