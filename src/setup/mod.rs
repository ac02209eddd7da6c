//! First-run setup: writes the default configuration file.

use crate::config::get_config_path;
use std::path::Path;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/wfall.toml");

/// Writes the default config if none exists yet.
///
/// # Errors
/// Returns an error if the config path cannot be determined or written.
pub fn run_setup() -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    if write_default_config(&config_path)? {
        tracing::info!("Wrote default configuration to {}", config_path.display());
    } else {
        tracing::debug!("Using configuration at {}", config_path.display());
    }
    Ok(())
}

/// Returns true if the template was written.
fn write_default_config(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WfallConfig;

    #[test]
    fn test_template_matches_defaults() {
        let config = WfallConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, WfallConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_existing_config_is_kept() {
        let path = std::env::temp_dir().join(format!("wfall_setup_{}.toml", std::process::id()));
        std::fs::remove_file(&path).ok();

        assert!(write_default_config(&path).unwrap());
        std::fs::write(&path, "[display]\nheight = 64\n").unwrap();
        assert!(!write_default_config(&path).unwrap());

        let kept = WfallConfig::load_from(&path).unwrap();
        assert_eq!(kept.display.height, 64);
        std::fs::remove_file(&path).ok();
    }
}
