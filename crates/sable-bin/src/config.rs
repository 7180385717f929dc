//! Configuration loading and parsing.
//!
//! Parses `sable.toml` from the working directory or the user config
//! directory (an explicit `--config` path wins). Unknown fields are
//! ignored so the file format can grow without breaking older binaries;
//! a missing file just yields defaults.

use anyhow::Result;
use core_compose::Blitter;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    /// Emit sixel graphics; half blocks otherwise.
    #[serde(default = "RenderConfig::default_sixel")]
    pub sixel: bool,
    #[serde(default = "RenderConfig::default_blitter")]
    pub blitter: String,
    #[serde(default = "RenderConfig::default_fps")]
    pub fps: u32,
}

impl RenderConfig {
    fn default_sixel() -> bool {
        true
    }
    fn default_blitter() -> String {
        "sixel".to_string()
    }
    fn default_fps() -> u32 {
        30
    }

    pub fn blitter(&self) -> Blitter {
        match self.blitter.as_str() {
            "full" => Blitter::Full,
            "half" => Blitter::Half,
            "braille" => Blitter::Braille,
            _ if self.sixel => Blitter::Sixel,
            _ => Blitter::Half,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sixel: Self::default_sixel(),
            blitter: Self::default_blitter(),
            fps: Self::default_fps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    #[serde(default = "DemoConfig::default_background")]
    pub background: [u8; 3],
    #[serde(default = "DemoConfig::default_particles")]
    pub particles: usize,
}

impl DemoConfig {
    fn default_background() -> [u8; 3] {
        [16, 16, 32]
    }
    fn default_particles() -> usize {
        160
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            background: Self::default_background(),
            particles: Self::default_particles(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Candidate config paths in priority order.
fn discover() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("sable.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sable").join("sable.toml"));
    }
    paths
}

pub fn load_from(explicit: Option<PathBuf>) -> Result<Config> {
    let candidates = match explicit {
        Some(p) => vec![p],
        None => discover(),
    };
    for path in candidates {
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let config: Config = toml::from_str(&raw)?;
                info!(target: "config", file = %path.display(), "config loaded");
                return Ok(config);
            }
            Err(_) => continue,
        }
    }
    info!(target: "config", "no config file, using defaults");
    Ok(Config::default())
}
