/*
 *  config.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Layered configuration: defaults, then YAML file, then CLI overrides.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CURRENTSONG, DEFAULT_I2C_ADDRESS, DEFAULT_I2C_BUS, DEFAULT_METADATA_PIPE,
    SCROLL_FRAME_MS, SCROLL_HOLD_MS, SCROLL_STEP_PX,
};

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// e.g. "info" | "debug"
    pub log_level: Option<String>,
    /// shairport-sync metadata FIFO
    pub metadata_pipe: Option<PathBuf>,
    /// moOde currentsong status file
    pub currentsong: Option<PathBuf>,
    /// scroll animation timing
    pub scroll: Option<ScrollConfig>,
    /// display geometry and wiring
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScrollConfig {
    pub step_px: Option<u32>,
    pub frame_ms: Option<u64>,
    pub hold_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub brightness: Option<u8>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        /// e.g. "/dev/i2c-1"
        bus: String,
        /// 7-bit address, e.g. 0x3C
        address: u8,
    },
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "moled", about = "moOde OLED now-playing monitor")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Force debug logging
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Path to the shairport-sync metadata FIFO
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub metadata_pipe: Option<PathBuf>,
    /// Path to the currentsong status file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub currentsong: Option<PathBuf>,
    /// I2C bus device, e.g. /dev/i2c-1
    #[arg(long)]
    pub i2c_bus: Option<String>,
    /// I2C display address, e.g. 60 for 0x3C
    #[arg(long)]
    pub i2c_address: Option<u8>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    #[arg(long)]
    pub display_brightness: Option<u8>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/moled/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/moled/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/moled.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    // project local
    for candidate in &["moled.yaml", "config.yaml", "config/moled.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()     { dst.log_level = src.log_level; }
    if src.metadata_pipe.is_some() { dst.metadata_pipe = src.metadata_pipe; }
    if src.currentsong.is_some()   { dst.currentsong = src.currentsong; }
    match (&mut dst.scroll, src.scroll) {
        (None, Some(s)) => dst.scroll = Some(s),
        (Some(d), Some(s)) => merge_scroll(d, s),
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_scroll(dst: &mut ScrollConfig, src: ScrollConfig) {
    if src.step_px.is_some()  { dst.step_px = src.step_px; }
    if src.frame_ms.is_some() { dst.frame_ms = src.frame_ms; }
    if src.hold_ms.is_some()  { dst.hold_ms = src.hold_ms; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()      { dst.width = src.width; }
    if src.height.is_some()     { dst.height = src.height; }
    if src.rotate_deg.is_some() { dst.rotate_deg = src.rotate_deg; }
    if src.brightness.is_some() { dst.brightness = src.brightness; }
    if src.bus.is_some()        { dst.bus = src.bus; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug {
        cfg.log_level = Some("debug".into());
    } else if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.metadata_pipe.is_some() { cfg.metadata_pipe = cli.metadata_pipe.clone(); }
    if cli.currentsong.is_some()   { cfg.currentsong = cli.currentsong.clone(); }

    let any_display = cli.i2c_bus.is_some()
        || cli.i2c_address.is_some()
        || cli.display_rotate_deg.is_some()
        || cli.display_brightness.is_some();

    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.display_rotate_deg.is_some() { display.rotate_deg = cli.display_rotate_deg; }
        if cli.display_brightness.is_some() { display.brightness = cli.display_brightness; }
        if cli.i2c_bus.is_some() || cli.i2c_address.is_some() {
            let (file_bus, file_addr) = match display.bus.take() {
                Some(BusConfig::I2c { bus, address }) => (bus, address),
                None => (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS),
            };
            display.bus = Some(BusConfig::I2c {
                bus: cli.i2c_bus.clone().unwrap_or(file_bus),
                address: cli.i2c_address.unwrap_or(file_addr),
            });
        }
    }
}

/// Invariants over the merged config.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(scroll) = cfg.scroll.as_ref() {
        if scroll.step_px == Some(0) {
            return Err(ConfigError::Validation("scroll step_px must be > 0".into()));
        }
        if scroll.frame_ms == Some(0) {
            return Err(ConfigError::Validation("scroll frame_ms must be > 0".into()));
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let (Some(w), Some(h)) = (display.width, display.height) {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(
                    "display width/height must be > 0".into(),
                ));
            }
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {}
                _ => {
                    return Err(ConfigError::Validation(
                        "display rotate_deg must be 0|90|180|270".into(),
                    ));
                }
            }
        }
        if let Some(BusConfig::I2c { address, .. }) = display.bus.as_ref() {
            if *address > 0x7F {
                return Err(ConfigError::Validation(
                    "i2c address must be a 7-bit value (0..=0x7F)".into(),
                ));
            }
        }
    }
    Ok(())
}

impl Config {
    pub fn metadata_pipe(&self) -> PathBuf {
        self.metadata_pipe
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_PIPE))
    }

    pub fn currentsong(&self) -> PathBuf {
        self.currentsong
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CURRENTSONG))
    }

    /// I2C wiring with defaults filled in.
    pub fn i2c(&self) -> (String, u8) {
        if let Some(display) = self.display.as_ref() {
            if let Some(BusConfig::I2c { bus, address }) = display.bus.as_ref() {
                return (bus.clone(), *address);
            }
        }
        (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS)
    }

    /// Scroll timing with defaults filled in: (step, frame sleep, hold).
    pub fn scroll_timing(&self) -> (i32, Duration, Duration) {
        let scroll = self.scroll.clone().unwrap_or_default();
        (
            scroll.step_px.map(|s| s as i32).unwrap_or(SCROLL_STEP_PX),
            Duration::from_millis(scroll.frame_ms.unwrap_or(SCROLL_FRAME_MS)),
            Duration::from_millis(scroll.hold_ms.unwrap_or(SCROLL_HOLD_MS)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("moled").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_fill_missing_paths() {
        let cfg = Config::default();
        assert_eq!(cfg.metadata_pipe(), PathBuf::from("/tmp/shairport-sync-metadata"));
        assert_eq!(cfg.currentsong(), PathBuf::from("/var/local/www/currentsong.txt"));
        assert_eq!(cfg.i2c(), ("/dev/i2c-1".to_string(), 0x3C));
    }

    #[test]
    fn cli_overrides_beat_yaml() {
        let mut cfg: Config = serde_yaml::from_str(
            "metadata_pipe: /tmp/other-pipe\nlog_level: warn\n",
        )
        .unwrap();
        let cli = cli(&["--metadata-pipe", "/tmp/cli-pipe", "--debug"]);
        apply_cli_overrides(&mut cfg, &cli);

        assert_eq!(cfg.metadata_pipe(), PathBuf::from("/tmp/cli-pipe"));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn i2c_override_keeps_file_address() {
        let mut cfg: Config = serde_yaml::from_str(
            "display:\n  bus:\n    type: i2c\n    bus: /dev/i2c-0\n    address: 61\n",
        )
        .unwrap();
        let cli = cli(&["--i2c-bus", "/dev/i2c-3"]);
        apply_cli_overrides(&mut cfg, &cli);

        assert_eq!(cfg.i2c(), ("/dev/i2c-3".to_string(), 61));
    }

    #[test]
    fn validate_rejects_bad_rotation() {
        let cfg: Config = serde_yaml::from_str("display:\n  rotate_deg: 45\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_scroll_step() {
        let cfg: Config = serde_yaml::from_str("scroll:\n  step_px: 0\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn scroll_timing_merges_partial_overrides() {
        let cfg: Config = serde_yaml::from_str("scroll:\n  hold_ms: 500\n").unwrap();
        let (step, frame, hold) = cfg.scroll_timing();
        assert_eq!(step, 4);
        assert_eq!(frame, Duration::from_millis(25));
        assert_eq!(hold, Duration::from_millis(500));
    }
}
