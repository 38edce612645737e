use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8787";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_TITLE_CLASS: &str = "elementor-control-title";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the relay server binds to.
    pub listen: String,

    /// Base URL of a running relay server, used by `fill`.
    pub server_url: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            server_url: None,
        }
    }
}

/// Generation defaults. None of these are operator-controllable per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider identifier ("openai" or "stub").
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub system_instruction: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC secret for session tokens; a random one is generated per process when unset.
    pub secret: Option<String>,
    pub lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Input class that marks a title field as eligible regardless of its type.
    pub title_class: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            title_class: DEFAULT_TITLE_CLASS.to_string(),
        }
    }
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_optional(dir.path().join("config.toml")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider]\nname = \"stub\"\n\n[relay]\nlisten = \"0.0.0.0:9000\"\n").unwrap();

        let cfg = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(cfg.provider.name, "stub");
        assert_eq!(cfg.provider.model, DEFAULT_MODEL);
        assert_eq!(cfg.provider.max_tokens, 300);
        assert_eq!(cfg.relay.listen, "0.0.0.0:9000");
        assert_eq!(cfg.trigger.title_class, DEFAULT_TITLE_CLASS);
    }

    #[test]
    fn session_secret_is_redacted() {
        let cfg = SessionConfig {
            secret: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
