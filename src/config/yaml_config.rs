use super::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let mut config: Config = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML config: {}", path.as_ref().display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.as_ref().display()))?;
    config.apply_env_overrides();
    Ok(config)
}

pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Config {
    match load_config(&path) {
        Ok(config) => {
            log::info!("Loaded configuration from: {}", path.as_ref().display());
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({:#}), using defaults", e);
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

pub fn write_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let yaml = serde_yaml::to_string(&Config::default())?;
    fs::write(&path, yaml)
        .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
    Ok(())
}
