//! Console controller
//!
//! A reader thread forwards stdin lines over a crossbeam channel; the main
//! thread ticks at 30 Hz, applies commands, polls the restore queue and
//! reports changes in the audio thread's counters.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use thiserror::Error;

use chainfx_core::engine::{EngineController, StatsSnapshot};
use chainfx_core::order::{EffectId, ProcessingOrder, NUM_EFFECTS};
use chainfx_core::params::ParamId;

use crate::audio::AudioHandle;

/// Control loop rate
const TICK: Duration = Duration::from_millis(33);

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the whole order
    Order(ProcessingOrder),
    /// Move the effect at one chain position to another (0-based)
    Move { from: usize, to: usize },
    /// Swap two chain positions (0-based)
    Swap { a: usize, b: usize },
    Bypass { effect: EffectId, bypassed: bool },
    Set { param: ParamId, value: f32 },
    Params,
    Meters,
    Status,
    Save,
    Help,
    Quit,
}

/// Why a console line could not be parsed
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("invalid value '{0}'")]
    InvalidValue(String),

    #[error("an order must name each of the {n} effects exactly once", n = NUM_EFFECTS)]
    NotPermutation,

    #[error("positions run from 1 to {n}", n = NUM_EFFECTS)]
    Position,
}

const HELP: &str = "\
commands:
  order <e1> <e2> <e3> <e4> <e5>   set the full order (names or aliases, comma-separated for multi-word names)
  move <from> <to>                 move the effect at position <from> to <to> (1-5)
  swap <a> <b>                     swap two positions
  bypass <effect> on|off           toggle a stage
  set <param> <value>              set a parameter (plain units)
  params | meters | status         show state
  save                             write the state file
  quit                             save and exit";

impl Command {
    /// Parse one console line; `Ok(None)` for blank lines
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        let Some((verb, rest)) = split_verb(line) else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "order" => Command::Order(parse_order(rest)?),
            "move" => {
                let (from, to) = parse_positions(rest, "move <from> <to>")?;
                Command::Move { from, to }
            }
            "swap" => {
                let (a, b) = parse_positions(rest, "swap <a> <b>")?;
                Command::Swap { a, b }
            }
            "bypass" => {
                let (name, state) = rest.rsplit_once(' ').ok_or(CommandError::Usage("bypass <effect> on|off"))?;
                let effect = EffectId::parse(name).ok_or_else(|| CommandError::UnknownEffect(name.trim().to_string()))?;
                let bypassed = parse_switch(state)?;
                Command::Bypass { effect, bypassed }
            }
            "set" => {
                let (name, value) = rest.rsplit_once(' ').ok_or(CommandError::Usage("set <param> <value>"))?;
                let param = ParamId::find(name).ok_or_else(|| CommandError::UnknownParam(name.trim().to_string()))?;
                let value = match value.parse::<f32>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        if parse_switch(value)? {
                            1.0
                        } else {
                            0.0
                        }
                    }
                };
                Command::Set { param, value }
            }
            "params" => Command::Params,
            "meters" => Command::Meters,
            "status" => Command::Status,
            "save" => Command::Save,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn split_verb(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    })
}

fn parse_order(rest: &str) -> Result<ProcessingOrder, CommandError> {
    let names: Vec<&str> = if rest.contains(',') {
        rest.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    } else {
        rest.split_whitespace().collect()
    };
    if names.len() != NUM_EFFECTS {
        return Err(CommandError::NotPermutation);
    }

    let mut effects = [EffectId::Phase; NUM_EFFECTS];
    for (slot, name) in effects.iter_mut().zip(&names) {
        *slot = EffectId::parse(name).ok_or_else(|| CommandError::UnknownEffect(name.to_string()))?;
    }
    let order = ProcessingOrder::from_effects(effects);
    if !order.is_permutation() {
        return Err(CommandError::NotPermutation);
    }
    Ok(order)
}

/// Two 1-based positions, returned 0-based
fn parse_positions(rest: &str, usage: &'static str) -> Result<(usize, usize), CommandError> {
    let mut parts = rest.split_whitespace();
    let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CommandError::Usage(usage));
    };
    let parse = |text: &str| -> Result<usize, CommandError> {
        let pos: usize = text.parse().map_err(|_| CommandError::InvalidValue(text.to_string()))?;
        if pos == 0 || pos > NUM_EFFECTS {
            return Err(CommandError::Position);
        }
        Ok(pos - 1)
    };
    Ok((parse(a)?, parse(b)?))
}

fn parse_switch(text: &str) -> Result<bool, CommandError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(CommandError::InvalidValue(other.to_string())),
    }
}

/// Spawn the stdin reader; the channel closes at end of input
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = channel::bounded(64);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader thread")?;
    Ok(rx)
}

/// Console state on the control thread
pub struct Console {
    controller: EngineController,
    audio: Option<AudioHandle>,
    state_path: PathBuf,
    /// Order as last confirmed by the audio thread
    displayed_order: ProcessingOrder,
    last_stats: StatsSnapshot,
    last_xruns: (u64, u64),
}

impl Console {
    pub fn new(controller: EngineController, audio: Option<AudioHandle>, state_path: PathBuf) -> Self {
        let displayed_order = controller.active_order();
        Self {
            controller,
            audio,
            state_path,
            displayed_order,
            last_stats: StatsSnapshot::default(),
            last_xruns: (0, 0),
        }
    }

    /// Run until `quit` or end of input, then save state
    pub fn run(mut self) -> Result<()> {
        let lines = spawn_stdin_reader()?;
        let ticker = channel::tick(TICK);
        println!("{}", HELP);

        loop {
            channel::select! {
                recv(lines) -> line => match line {
                    Ok(line) => {
                        if !self.handle_line(&line) {
                            break;
                        }
                    }
                    Err(_) => {
                        log::info!("Input closed, shutting down");
                        break;
                    }
                },
                recv(ticker) -> _ => self.tick(),
            }
        }

        self.save_state()
    }

    /// Apply one line; `false` means quit
    fn handle_line(&mut self, line: &str) -> bool {
        match Command::parse(line) {
            Ok(Some(Command::Quit)) => return false,
            Ok(Some(command)) => {
                if let Err(e) = self.execute(command) {
                    println!("error: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
        true
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Order(order) => self.request(order),
            Command::Move { from, to } => {
                if let Some(order) = self.current_order().moved(from, to) {
                    self.request(order);
                }
            }
            Command::Swap { a, b } => {
                if let Some(order) = self.current_order().swapped(a, b) {
                    self.request(order);
                }
            }
            Command::Bypass { effect, bypassed } => {
                self.controller.set_bypass(effect, bypassed);
                println!("{} {}", effect, if bypassed { "bypassed" } else { "active" });
            }
            Command::Set { param, value } => {
                self.controller.set_param(param, value);
                println!("{} = {}", param.name(), self.controller.params().display(param));
            }
            Command::Params => {
                for id in ParamId::ALL {
                    println!("  {:<28} {}", id.name(), self.controller.params().display(id));
                }
            }
            Command::Meters => {
                let meters = self.controller.meters();
                let (pre, post) = (meters.pre_db(), meters.post_db());
                println!(
                    "  in  L {:>7.1} dB  R {:>7.1} dB\n  out L {:>7.1} dB  R {:>7.1} dB",
                    pre[0], pre[1], post[0], post[1]
                );
            }
            Command::Status => self.print_status(),
            Command::Save => self.save_state()?,
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Order that relative edits (move/swap) start from, including
    /// requests the audio thread hasn't picked up yet
    fn current_order(&self) -> ProcessingOrder {
        self.controller.requested_order()
    }

    fn request(&mut self, order: ProcessingOrder) {
        if self.controller.request_order(order) {
            println!("order requested: {}", order);
        } else {
            println!("order queue full, try again");
        }
    }

    fn print_status(&self) {
        let stats = self.controller.stats();
        println!("  order     {}", self.displayed_order);
        for id in EffectId::ALL {
            let state = if self.controller.is_bypassed(id) { "bypassed" } else { "active" };
            println!("  {:<15} {}", id.name(), state);
        }
        println!(
            "  callbacks {}  order changes {}  rejected {}  dropped echoes {}",
            stats.callbacks, stats.order_changes, stats.rejected_orders, stats.dropped_echoes
        );
        if let Some(audio) = &self.audio {
            println!(
                "  audio     {}Hz, {} frames (~{:.1}ms)",
                audio.sample_rate(),
                audio.buffer_size(),
                audio.latency_ms()
            );
        }
    }

    /// 30 Hz housekeeping
    fn tick(&mut self) {
        if let Some(order) = self.controller.poll_restored_order() {
            if order != self.displayed_order {
                log::info!("Chain order: {}", order);
            }
            self.displayed_order = order;
        }

        let active = self.controller.active_order();
        if active != self.displayed_order {
            log::info!("Chain order: {}", active);
            self.displayed_order = active;
        }

        let stats = self.controller.stats();
        if stats.rejected_orders > self.last_stats.rejected_orders {
            log::warn!(
                "Audio thread rejected {} malformed order(s)",
                stats.rejected_orders - self.last_stats.rejected_orders
            );
        }
        if stats.dropped_echoes > self.last_stats.dropped_echoes {
            log::warn!(
                "Restore queue full, {} order echo(es) dropped",
                stats.dropped_echoes - self.last_stats.dropped_echoes
            );
        }
        self.last_stats = stats;

        if let Some(audio) = &self.audio {
            let xruns = audio.xruns();
            let now = (
                xruns.input_overruns.load(Ordering::Relaxed),
                xruns.input_underruns.load(Ordering::Relaxed),
            );
            if now.0 > self.last_xruns.0 {
                log::debug!("Input ring overrun: {} frames dropped", now.0 - self.last_xruns.0);
            }
            if now.1 > self.last_xruns.1 {
                log::debug!("Input ring underrun: {} frames of silence", now.1 - self.last_xruns.1);
            }
            self.last_xruns = now;
        }
    }

    fn save_state(&self) -> Result<()> {
        let bytes = self.controller.get_state().context("Failed to serialize engine state")?;
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }
        std::fs::write(&self.state_path, bytes)
            .with_context(|| format!("Failed to write state file: {:?}", self.state_path))?;
        log::info!("Saved state to {:?}", self.state_path);
        Ok(())
    }
}
