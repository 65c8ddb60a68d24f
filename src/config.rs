use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;

/// Persisted user preferences, `~/.config/ollama-chat/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub list_timeout_secs: Option<u64>,
    pub chat_timeout_secs: Option<u64>,
}

/// Values the client actually runs with, after defaults, file, env and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub preferred_model: Option<String>,
    pub list_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            preferred_model: None,
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
            chat_timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
        }
    }
}

/// Command-line overrides; `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub list_timeout_secs: Option<u64>,
    pub chat_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_default();
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// Layer this file over the defaults, then `OLLAMA_HOST`, then CLI flags.
    pub fn resolve(&self, env_host: Option<String>, overrides: &Overrides) -> Settings {
        let defaults = Settings::default();

        let base_url = overrides
            .base_url
            .clone()
            .or(env_host
                .filter(|host| !host.trim().is_empty())
                .map(|host| normalize_host(&host)))
            .or_else(|| self.base_url.clone())
            .unwrap_or(defaults.base_url);

        let list_secs = overrides
            .list_timeout_secs
            .or(self.list_timeout_secs)
            .unwrap_or(DEFAULT_LIST_TIMEOUT_SECS);
        let chat_secs = overrides
            .chat_timeout_secs
            .or(self.chat_timeout_secs)
            .unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS);

        Settings {
            base_url: base_url.trim_end_matches('/').to_string(),
            preferred_model: overrides.model.clone().or_else(|| self.default_model.clone()),
            list_timeout: Duration::from_secs(list_secs),
            chat_timeout: Duration::from_secs(chat_secs),
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ollama-chat").join("config.json"))
    }
}

/// `OLLAMA_HOST` is often just `host` or `host:port`. Without a scheme the
/// Ollama port is assumed; with one, the scheme's own default applies.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }

    let (authority, path) = match host.find('/') {
        Some(i) => host.split_at(i),
        None => (host, ""),
    };
    let authority = if authority.is_empty() || authority.starts_with(':') {
        format!("127.0.0.1{}", authority)
    } else {
        authority.to_string()
    };
    // Bracketed IPv6 literals carry colons of their own
    let has_port = match authority.rfind(']') {
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    };

    if has_port {
        format!("http://{}{}", authority, path)
    } else {
        format!("http://{}:{}{}", authority, DEFAULT_PORT, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resolve(None, &Overrides::default()), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://gpu-box:11434".to_string()),
            default_model: Some("llama3.2:latest".to_string()),
            list_timeout_secs: None,
            chat_timeout_secs: Some(120),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_precedence() {
        let config = Config {
            base_url: Some("http://from-file:11434/".to_string()),
            default_model: Some("gemma3:latest".to_string()),
            list_timeout_secs: Some(2),
            chat_timeout_secs: Some(30),
        };

        let settings = config.resolve(None, &Overrides::default());
        assert_eq!(settings.base_url, "http://from-file:11434");
        assert_eq!(settings.preferred_model.as_deref(), Some("gemma3:latest"));
        assert_eq!(settings.list_timeout, Duration::from_secs(2));
        assert_eq!(settings.chat_timeout, Duration::from_secs(30));

        let settings = config.resolve(Some("127.0.0.1:9999".to_string()), &Overrides::default());
        assert_eq!(settings.base_url, "http://127.0.0.1:9999");

        let overrides = Overrides {
            base_url: Some("http://flag:1".to_string()),
            model: Some("qwen2.5:7b".to_string()),
            list_timeout_secs: None,
            chat_timeout_secs: Some(5),
        };
        let settings = config.resolve(Some("127.0.0.1:9999".to_string()), &overrides);
        assert_eq!(settings.base_url, "http://flag:1");
        assert_eq!(settings.preferred_model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(settings.list_timeout, Duration::from_secs(2));
        assert_eq!(settings.chat_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_ollama_host_without_port_uses_ollama_port() {
        assert_eq!(normalize_host("localhost"), "http://localhost:11434");
        assert_eq!(normalize_host("0.0.0.0"), "http://0.0.0.0:11434");
        assert_eq!(normalize_host("gpu-box:8080"), "http://gpu-box:8080");
        assert_eq!(normalize_host("[::1]"), "http://[::1]:11434");
        assert_eq!(normalize_host("[::1]:9000"), "http://[::1]:9000");
        assert_eq!(normalize_host(":9000"), "http://127.0.0.1:9000");
        assert_eq!(normalize_host("https://ollama.example.com"), "https://ollama.example.com");

        let settings = Config::default().resolve(Some("localhost".to_string()), &Overrides::default());
        assert_eq!(settings.base_url, "http://localhost:11434");

        let settings = Config::default().resolve(Some("  ".to_string()), &Overrides::default());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
