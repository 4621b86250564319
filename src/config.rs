use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DATABASE: &str = "partmatch.db";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration, built once at startup and handed to the server
/// and the classification client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file
    pub database: String,
    pub port: u16,
    /// Label used when the completion call fails; unset means the request fails
    pub fallback_label: Option<String>,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            port: DEFAULT_PORT,
            fallback_label: None,
            openai: OpenAiConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the config file (if present), overlaid with the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = load_config(path)?.unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database = strip_sqlite_scheme(&url).to_string();
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").or_else(|| lookup("OPEN_AI_TOKEN")) {
            self.openai.api_key = Some(key);
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(label) = lookup("FALLBACK_LABEL") {
            self.fallback_label = Some(label);
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }

    /// The database path, with its parent directory created if missing
    pub fn prepare_database_path(&self) -> anyhow::Result<PathBuf> {
        let path = self.database_path();
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating database directory {}", dir.display()))?;
            }
            _ => {}
        }
        Ok(path)
    }
}

impl OpenAiConfig {
    /// The API key, or a configuration error naming where to set it
    pub fn require_api_key(&self) -> crate::Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                crate::Error::Config(
                    "no API key configured (set OPENAI_API_KEY or openai.api_key)".to_string(),
                )
            })
    }
}

fn strip_sqlite_scheme(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("partmatch.toml")
}

/// Header written above the generated TOML by `partmatch init`
const CONFIG_TEMPLATE_HEADER: &str = "\
# partmatch configuration
#
# The completion API key is not written here. Export OPENAI_API_KEY before
# `partmatch serve`, or set api_key under [openai].
# DATABASE_URL, PORT, OPENAI_BASE_URL, OPENAI_MODEL and FALLBACK_LABEL
# override the values below.

";

/// Read the config file; `Ok(None)` when it does not exist
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AppConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(Some(config))
}

/// Write `config` as a commented template; refuses to overwrite unless `force`
pub fn write_config(path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let body = toml::to_string_pretty(config)?;
    std::fs::write(path, format!("{CONFIG_TEMPLATE_HEADER}{body}"))
        .with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.openai.model, "gpt-4-turbo");
        assert!(config.fallback_label.is_none());
        assert!(config.openai.require_api_key().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("DATABASE_URL", "sqlite://data/app.db"),
            ("PORT", "8080"),
            ("OPEN_AI_TOKEN", "sk-legacy"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]);

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.database, "data/app.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai.require_api_key().unwrap(), "sk-legacy");
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_primary_key_variable_wins() {
        let vars = env(&[("OPENAI_API_KEY", "sk-new"), ("OPEN_AI_TOKEN", "sk-legacy")]);
        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-new"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let vars = env(&[("PORT", "not-a-port")]);
        let mut config = AppConfig::default();
        assert!(config.apply_env(|key| vars.get(key).cloned()).is_err());
    }

    #[test]
    fn test_write_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partmatch.toml");

        let mut config = AppConfig::default();
        config.port = 5000;
        config.fallback_label = Some("Unknown".to_string());
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);

        assert!(write_config(&path, &config, false).is_err());
        assert!(write_config(&path, &config, true).is_ok());
    }

    #[test]
    fn test_written_template_explains_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partmatch.toml");
        write_config(&path, &AppConfig::default(), false).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# partmatch configuration"));
        assert!(contents.contains("OPENAI_API_KEY"));
        assert!(contents.contains("[openai]"));
        assert!(!contents.contains("api_key ="), "key must not be written:\n{contents}");

        assert_eq!(load_config(Some(&path)).unwrap().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_prepare_database_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database: dir.path().join("data/nested/partmatch.db").display().to_string(),
            ..AppConfig::default()
        };

        let path = config.prepare_database_path().unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partmatch.toml");
        std::fs::write(&path, "port = 9000\n\n[openai]\nmodel = \"gpt-4o\"\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.port, 9000);
        assert_eq!(loaded.database, DEFAULT_DATABASE);
        assert_eq!(loaded.openai.model, "gpt-4o");
        assert_eq!(loaded.openai.base_url, DEFAULT_OPENAI_BASE_URL);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }
}
