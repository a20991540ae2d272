//! Index configuration loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, e.g. `TI_INITIAL_CAPACITY`.
const ENV_PREFIX: &str = "TI_";

/// Tunables shared by the point and interval indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of entries to reserve when an index is created.
    /// Default: 0.
    pub initial_capacity: usize,

    /// Tolerance used by `PointIndex::nearest_default`.
    /// Default: 60000 (1 minute).
    pub nearest_tolerance_ms: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            nearest_tolerance_ms: 60_000, // 1 minute
        }
    }
}

impl IndexConfig {
    /// Loads configuration from the platform config file and `TI_*`
    /// environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, layering `config_path` between the platform
    /// config file and the environment.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(config_path).extract()?;
        tracing::debug!(?config, "loaded index configuration");
        Ok(config)
    }

    /// Builds the provider stack; later providers win.
    fn figment(config_path: Option<&Path>) -> Figment {
        let files = dirs_config_path()
            .map(|dir| dir.join("config.toml"))
            .into_iter()
            .chain(config_path.map(Path::to_path_buf));

        files
            .fold(
                Figment::from(Serialized::defaults(Self::default())),
                |figment, file| figment.merge(Toml::file(file)),
            )
            .merge(Env::prefixed(ENV_PREFIX))
    }
}

/// Returns the platform-specific config directory for timeindex.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timeindex"))
}
