//! ChainFx Standalone - run the effects chain on live audio
//!
//! Opens the default (or configured) input and output devices, restores the
//! last saved state and hands control to a console on stdin.
//!
//! ## Command line flags
//!
//! - `--config <path>`: YAML config file (default `~/.config/chainfx/standalone.yaml`)
//! - `--no-audio`: run the console without opening audio devices

mod audio;
mod config;
mod control;
mod error;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use chainfx_core::config::load_config;
use chainfx_core::engine::{create_engine, EngineController};

use config::StandaloneConfig;
use control::Console;

struct Args {
    config_path: PathBuf,
    no_audio: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: config::default_config_file(),
        no_audio: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => args.config_path = PathBuf::from(path),
                None => bail!("--config needs a path"),
            },
            "--no-audio" => args.no_audio = true,
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(args)
}

/// Restore the saved state file, if there is one
fn restore_state(controller: &mut EngineController, path: &Path) {
    if !path.exists() {
        log::info!("No saved state at {:?}, starting from defaults", path);
        return;
    }
    match std::fs::read(path) {
        Ok(bytes) => {
            if let Err(e) = controller.set_state(&bytes) {
                log::warn!("Ignoring saved state {:?}: {}", path, e);
            }
        }
        Err(e) => log::warn!("Failed to read saved state {:?}: {}", path, e),
    }
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    log::info!("chainfx-standalone starting up");

    let config: StandaloneConfig = load_config(&args.config_path);
    let state_path = config.state_path();

    let (engine, mut controller) = create_engine(&config.engine);
    restore_state(&mut controller, &state_path);

    let audio = if args.no_audio {
        log::info!("Audio devices disabled (--no-audio), running offline");
        audio::start_offline(&config.audio, engine)
    } else {
        audio::start_audio(&config.audio, engine)
    }
    .context("Could not start audio (use --no-audio to run without devices)")?;
    log::info!(
        "Audio running at {}Hz, {} frames (~{:.1}ms latency)",
        audio.sample_rate(),
        audio.buffer_size(),
        audio.latency_ms()
    );

    // The console echoes the order as soon as it attaches
    controller.request_order_echo();
    Console::new(controller, Some(audio), state_path).run()?;

    log::info!("chainfx-standalone shut down");
    Ok(())
}
