use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

/// Environment variable that points at a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "DISTRICT_PREP_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub refine: RefineConfig,
    pub split: SplitConfig,
    pub dissolve: DissolveConfig,
    pub preview: PreviewConfig,
    pub check: CheckConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefineConfig {
    /// Unsimplified district boundaries used for containment checks.
    pub districts: PathBuf,
    /// Directory of `<state-key>.geojson` files, read and rewritten in place.
    pub states_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SplitConfig {
    pub districts: PathBuf,
    pub states: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DissolveConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PreviewConfig {
    pub root: PathBuf,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CheckConfig {
    pub target: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            districts: PathBuf::from("tmp/geoBoundaries/geoBoundaries-IND-ADM4.geojson"),
            states_dir: PathBuf::from("public/state-districts"),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            districts: PathBuf::from("tmp/geoBoundaries/geoBoundaries-IND-ADM4_simplified.geojson"),
            states: PathBuf::from("public/india_states.geojson"),
            out_dir: PathBuf::from("public/state-districts"),
        }
    }
}

impl Default for DissolveConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("public/state-districts"),
            output_dir: PathBuf::from("public/state-polygons"),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            port: 5177,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:5177/".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Explicit paths must exist. Without one, `$DISTRICT_PREP_CONFIG` and then
    /// `./config.toml` are tried, falling back to built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Ok(from_env) = std::env::var(CONFIG_ENV) {
            return Self::load_from_file(Path::new(&from_env));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::load_from_file(default_path);
        }
        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }
}
