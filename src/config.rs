use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use anyhow::{bail, Context, Result};

use crate::graph::WindowSize;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub window: Window,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub metrics: Metrics,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Window {
    #[serde(default = "default_window_secs")]
    pub seconds: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Output {
    /// Repeat the current median for rejected (too old) payments.
    #[serde(default)]
    pub emit_on_reject: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Log {
    #[serde(default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metrics {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_window_secs() -> i64 { crate::graph::DEFAULT_WINDOW_SECS }
fn default_bind() -> String { "127.0.0.1:9100".into() }

impl Default for Window {
    fn default() -> Self {
        Window { seconds: default_window_secs() }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics { enabled: false, bind: default_bind() }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.window.seconds <= 0 {
            bail!("window.seconds must be positive (got {})", self.window.seconds);
        }
        if self.metrics.enabled && self.metrics.bind.trim().is_empty() {
            bail!("metrics.bind must be set when metrics are enabled");
        }
        Ok(())
    }

    /// Validated window size.
    pub fn window_size(&self) -> Result<WindowSize> {
        WindowSize::try_from(self.window.seconds).map_err(anyhow::Error::msg)
    }
}

/// Read the TOML file at `p` and deserialize into `Config`.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read, parsed or fails validation.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())?;
    cfg.validate()?;
    Ok(cfg)
}
