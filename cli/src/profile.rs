//! Profiles -- the parameters in a TOML file, overridden by the command line.
//!
//! Every field is optional; a missing one takes its default value.
//! ```toml
//! main_inflation = 1.8
//! expansion_threads = 4
//! [prune]
//! mode = "adaptive"
//! select_number = 500
//! [interpret]
//! closure = { depth_bounded = 20 }
//! ```
use super::mcl_commands::{McLArgs, Pruning};
use mcl::{MclConfig, PruningMode};
use std::path::Path;

pub fn parse_profile(text: &str) -> std::io::Result<MclConfig> {
    toml::from_str(text).map_err(|why| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{why}"))
    })
}

pub fn load_profile<P: AsRef<Path>>(path: P) -> std::io::Result<MclConfig> {
    let text = std::fs::read_to_string(path.as_ref())?;
    debug!("PROFILE\t{}", path.as_ref().display());
    parse_profile(&text)
}

/// Apply the options given on the command line.
pub fn apply_args(mut c: MclConfig, args: &McLArgs) -> MclConfig {
    if let Some(inflation) = args.inflation {
        c.main_inflation = inflation;
    }
    if let Some(inflation) = args.init_inflation {
        c.init_inflation = inflation;
    }
    if let Some(len) = args.init_loop {
        c.init_loop_length = len;
    }
    if args.main_loop.is_some() {
        c.main_loop_length = args.main_loop;
    }
    if args.precision.is_some() {
        c.prune.precision = args.precision;
    }
    if args.select.is_some() {
        c.prune.select_number = args.select;
    }
    if args.recover.is_some() {
        c.prune.recover_number = args.recover;
    }
    if let Some(pct) = args.pct {
        c.prune.recover_mass_pct = pct;
    }
    if let Some(pruning) = args.pruning {
        c.prune.mode = match pruning {
            Pruning::Rigid => PruningMode::Rigid,
            Pruning::Adaptive => PruningMode::Adaptive,
        };
    }
    if let Some(threads) = args.threads {
        c.expansion_threads = threads;
    }
    if let Some(threads) = args.inflation_threads {
        c.inflation_threads = threads;
    }
    c
}

/// The profile (if any) with the command line options on top of it.
pub fn config_of(args: &McLArgs) -> std::io::Result<MclConfig> {
    let c = match args.profile.as_ref() {
        Some(path) => load_profile(path)?,
        None => MclConfig::default(),
    };
    let c = apply_args(c, args);
    let positive = |x: f64| x.is_finite() && 0f64 < x;
    if !positive(c.main_inflation) || !positive(c.init_inflation) {
        let msg = format!("Inflation should be positive:{c:?}");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg));
    }
    Ok(c)
}
