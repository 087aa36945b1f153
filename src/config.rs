use crate::generation::cloud::CloudConfig;
use crate::synth::SpeechSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::read_to_string;

pub const CONFIG_FILE: &str = "Config.toml";

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".yomiage")
}

fn default_output_addr() -> String {
    "127.0.0.1:7878".to_string()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Cloud text-to-speech service, local synthesis only when absent
    #[serde(default)]
    pub cloud: Option<CloudConfig>,

    #[serde(default)]
    pub speech: SpeechSettings,

    /// Where the recent items list is kept
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Address the WAV output stream listens on
    #[serde(default = "default_output_addr")]
    pub output_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cloud: None,
            speech: SpeechSettings::default(),
            storage_dir: default_storage_dir(),
            output_addr: default_output_addr(),
        }
    }
}

pub fn parse(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("Invalid configuration")
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();

    match read_to_string(path).await {
        Ok(contents) => parse(&contents).with_context(|| format!("in {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No {} found, using default configuration", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub async fn load() -> Result<Config> {
    load_from(CONFIG_FILE).await
}
