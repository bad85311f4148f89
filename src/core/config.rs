use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, AppResult};

use super::schema::{
    MULTIPLIER2_MIN_SIZE_BYTES, MULTIPLIER2_ZKEY_NAME, MULTIPLIER2_ZKEY_URL, ProvingArtifact,
};

/// Which proving key to use and where it comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub name: String,
    pub local_path: Option<String>,
    pub remote_url: String,
    pub min_size_bytes: u64,
    /// Request timeout for the download, 0 disables it
    pub download_timeout_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            name: MULTIPLIER2_ZKEY_NAME.to_string(),
            local_path: None,
            remote_url: MULTIPLIER2_ZKEY_URL.to_string(),
            min_size_bytes: MULTIPLIER2_MIN_SIZE_BYTES,
            download_timeout_secs: 0,
        }
    }
}

impl ArtifactConfig {
    /// Resolve into a `ProvingArtifact`, placing it under the platform data
    /// directory when no explicit path is configured.
    pub fn to_artifact(&self) -> ProvingArtifact {
        let local_path = self
            .local_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join(&self.name).to_string_lossy().into_owned());
        ProvingArtifact::new(
            self.name.clone(),
            local_path,
            self.remote_url.clone(),
            self.min_size_bytes,
        )
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        (self.download_timeout_secs > 0).then(|| Duration::from_secs(self.download_timeout_secs))
    }
}

/// External prover commands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Placeholders: {zkey}, {inputs}
    pub prove_template: Option<String>,
    /// Placeholders: {zkey}, {proof}
    pub verify_template: Option<String>,
    /// 0 disables the timeout
    pub timeout_secs: u64,
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub artifact: ArtifactConfig,
    pub engine: EngineConfig,
}

/// Directory used for downloaded artifacts when none is configured.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("zkey-prover")
}

pub fn parse_config(s: &str) -> AppResult<ProverConfig> {
    toml::from_str(s).map_err(|e| AppError::Message(format!("invalid config: {e}")))
}

pub fn load_config(path: &Path) -> AppResult<ProverConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| AppError::Message(format!("failed to read {}: {e}", path.display())))?;
    parse_config(&s)
}
