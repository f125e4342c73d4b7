//Command line interface
// runtime configuration (channels, periods, log destinations)
use crate::errors::NodeError;
use crate::sensors::SensorKind;
use clap::Parser;
use sensor_protocol::{DEFAULT_PERIOD_MS, INFO_VERB};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub channels: Vec<ChannelSpec>,
    pub seed: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    pub prefix: String,
    pub label: String,
    pub kind: SensorKind,
    pub period_ms: u64,
    pub precision: usize,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sensor_node", about = "Sample sensor channels on command from stdin")]
pub struct Cli {
    /// TOML file with `[[channels]]` tables; built-in channels when absent.
    #[arg(long)]                                   pub config: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_PERIOD_MS)] pub period_ms: u64,
    /// Seed for the simulated ADC.
    #[arg(long)]                                   pub seed: Option<u64>,
    /// Also write logs to a daily file in this directory.
    #[arg(long)]                                   pub log_dir: Option<PathBuf>,
    /// Write commands.csv / cycles.csv audit files here.
    #[arg(long)]                                   pub csv_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse_and_build_config() -> Result<Config, NodeError> {
        <Cli as Parser>::parse().build_config()
    }

    pub fn build_config(self) -> Result<Config, NodeError> {
        let channels = match &self.config {
            Some(path) => load_channels(path, self.period_ms)?,
            None => default_channels(self.period_ms),
        };
        let cfg = Config {
            channels,
            seed: self.seed,
            log_dir: self.log_dir,
            csv_dir: self.csv_dir,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    period_ms: Option<u64>,
    channels: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    id: String,
    prefix: String,
    kind: SensorKind,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    period_ms: Option<u64>,
    #[serde(default)]
    precision: Option<usize>,
}

/// Per-channel period wins over the file's, which wins over `--period-ms`.
fn load_channels(path: &Path, cli_period_ms: u64) -> Result<Vec<ChannelSpec>, NodeError> {
    let file: FileConfig = ::config::Config::builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;

    let default_period = file.period_ms.unwrap_or(cli_period_ms);
    Ok(file
        .channels
        .into_iter()
        .map(|e| ChannelSpec {
            label: e.label.unwrap_or_else(|| e.id.clone()),
            period_ms: e.period_ms.unwrap_or(default_period),
            precision: e.precision.unwrap_or_else(|| e.kind.default_precision()),
            id: e.id,
            prefix: e.prefix,
            kind: e.kind,
        })
        .collect())
}

/// The board's two sensors.
pub fn default_channels(period_ms: u64) -> Vec<ChannelSpec> {
    vec![
        ChannelSpec {
            id: "temperature".into(),
            prefix: "tm".into(),
            label: "temperature".into(),
            kind: SensorKind::Thermistor,
            period_ms,
            precision: SensorKind::Thermistor.default_precision(),
        },
        ChannelSpec {
            id: "audio-level".into(),
            prefix: "am".into(),
            label: "audio-level".into(),
            kind: SensorKind::Level,
            period_ms,
            precision: SensorKind::Level.default_precision(),
        },
    ]
}

impl Config {
    pub fn validate(&self) -> Result<(), NodeError> {
        let bad = |msg: String| -> Result<(), NodeError> { Err(NodeError::Config(msg)) };

        if self.channels.is_empty() {
            return bad("no channels configured".into());
        }

        let mut ids = HashSet::new();
        let mut prefixes = HashSet::new();
        for c in &self.channels {
            if c.id.trim().is_empty() {
                return bad("channel id must not be empty".into());
            }
            if c.prefix.is_empty() || c.prefix.chars().any(char::is_whitespace) {
                return bad(format!("channel '{}': prefix must be one non-empty word", c.id));
            }
            if c.prefix == INFO_VERB {
                return bad(format!("channel '{}': prefix '{INFO_VERB}' is reserved", c.id));
            }
            if c.period_ms == 0 {
                return bad(format!("channel '{}': period_ms must be > 0", c.id));
            }
            if !ids.insert(c.id.as_str()) {
                return bad(format!("duplicate channel id '{}'", c.id));
            }
            if !prefixes.insert(c.prefix.as_str()) {
                return bad(format!("duplicate channel prefix '{}'", c.prefix));
            }
        }
        Ok(())
    }
}
