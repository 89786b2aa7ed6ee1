use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::types::config::RuntimeConfig;

/// Settings file name inside the config directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Environment variables that override individual settings.
pub const ENV_CONFIG_DIR: &str = "SECDOMAIN_CONFIG_DIR";
pub const ENV_BASE: &str = "SECDOMAIN_BASE";
pub const ENV_USER: &str = "SECDOMAIN_USER";
pub const ENV_CONTROLLER: &str = "SECDOMAIN_CONTROLLER";


/// `$SECDOMAIN_CONFIG_DIR`, else `$HOME/.config/secdomain`.
pub fn resolve_config_dir() -> Result<PathBuf, ConfigError> {
    config_dir_from(|key| std::env::var(key).ok())
}


fn config_dir_from(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = lookup(ENV_CONFIG_DIR).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = lookup("HOME")
        .filter(|h| !h.is_empty())
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(PathBuf::from(home).join(".config").join("secdomain"))
}


/// Load settings from `path`.
pub fn load(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}


/// Load settings from `path`, falling back to defaults when the file does
/// not exist.
pub fn load_or_default(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(RuntimeConfig::default());
    }
    load(path)
}


/// Save settings to `path`, creating the parent directory if needed.
pub fn save(path: &Path, config: &RuntimeConfig) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}


/// Parse settings from YAML. An empty document yields the defaults.
pub fn parse(content: &str) -> Result<RuntimeConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(RuntimeConfig::default());
    }
    serde_yaml::from_str(content)
}


/// Apply `SECDOMAIN_BASE`, `SECDOMAIN_USER` and `SECDOMAIN_CONTROLLER` from
/// the process environment.
pub fn apply_env_overrides(config: &mut RuntimeConfig) {
    overrides_from(config, |key| std::env::var(key).ok());
}


fn overrides_from(config: &mut RuntimeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(base) = lookup(ENV_BASE).filter(|v| !v.is_empty()) {
        config.base_dir = PathBuf::from(base);
    }
    if let Some(user) = lookup(ENV_USER) {
        // An empty value means "run as the current user".
        config.user = if user.is_empty() { None } else { Some(user) };
    }
    if let Some(controller) = lookup(ENV_CONTROLLER).filter(|v| !v.is_empty()) {
        config.controller = Some(controller);
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_dir_prefers_explicit_env() {
        let dir = config_dir_from(env(&[(ENV_CONFIG_DIR, "/etc/secdomain"), ("HOME", "/root")])).unwrap();
        assert_eq!(dir, PathBuf::from("/etc/secdomain"));
    }

    #[test]
    fn config_dir_falls_back_to_home() {
        let dir = config_dir_from(env(&[("HOME", "/home/ops")])).unwrap();
        assert_eq!(dir, PathBuf::from("/home/ops/.config/secdomain"));
    }

    #[test]
    fn config_dir_without_home_fails() {
        assert!(matches!(config_dir_from(env(&[])), Err(ConfigError::NoConfigDir)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
        assert_eq!(cfg.user.as_deref(), Some("wildfly"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut cfg = RuntimeConfig::new("/srv/eap");
        cfg.user = Some("jboss".into());
        cfg.controller = Some("localhost:9990".into());
        cfg.timeout_secs = 15;
        save(&path, &cfg).unwrap();
        assert_eq!(load(&path).unwrap(), cfg);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "base_dir: [unclosed\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("\n").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = RuntimeConfig::default();
        overrides_from(
            &mut cfg,
            env(&[
                (ENV_BASE, "/opt/eap7"),
                (ENV_USER, "jboss"),
                (ENV_CONTROLLER, "eap:9990"),
            ]),
        );
        assert_eq!(cfg.base_dir, PathBuf::from("/opt/eap7"));
        assert_eq!(cfg.user.as_deref(), Some("jboss"));
        assert_eq!(cfg.controller.as_deref(), Some("eap:9990"));
    }

    #[test]
    fn empty_user_override_clears_identity() {
        let mut cfg = RuntimeConfig::default();
        overrides_from(&mut cfg, env(&[(ENV_USER, "")]));
        assert!(cfg.user.is_none());
        assert_eq!(cfg.base_dir, PathBuf::from("/opt/wildfly"));
    }
}
