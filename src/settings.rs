//! Administrative settings: the stored provider API key.
//!
//! The relay never holds the key between requests. It asks its
//! [`CredentialSource`] on every call, so a key saved with
//! `fieldgen settings set-key` takes effect without a restart.

use crate::sanitize::sanitize_text;
use anyhow::{anyhow, Context};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "FIELDGEN_API_KEY";

/// Opaque provider API key.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Returns None for a key that is empty after sanitization.
    pub fn new(raw: &str) -> Option<Self> {
        let key = sanitize_text(raw);
        if key.is_empty() {
            None
        } else {
            Some(Self(SecretString::new(key)))
        }
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Key with everything but the last four characters hidden.
    pub fn masked(&self) -> String {
        let key = self.expose();
        let hidden = key.chars().count().saturating_sub(4);
        let tail: String = key.chars().skip(hidden).collect();
        format!("{}{tail}", "*".repeat(hidden.min(12)))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Where the relay reads the key from at request time.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> anyhow::Result<Option<Credential>>;
}

/// A fixed key (or none). Used for one-shot runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<Credential>);

impl StaticCredential {
    pub fn new(key: Option<&str>) -> Self {
        Self(key.and_then(Credential::new))
    }
}

impl CredentialSource for StaticCredential {
    fn credential(&self) -> anyhow::Result<Option<Credential>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    api_key: Option<String>,
}

/// JSON settings file in the state directory, with an environment override.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    env_override: bool,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_override: true,
        }
    }

    /// Ignore `FIELDGEN_API_KEY`; only the file counts.
    pub fn without_env(mut self) -> Self {
        self.env_override = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitize and persist a key. Returns the stored credential.
    pub fn set_key(&self, raw: &str) -> anyhow::Result<Credential> {
        let cred = Credential::new(raw).ok_or_else(|| anyhow!("API key is empty"))?;
        let mut file = load_from(&self.path)?;
        file.api_key = Some(cred.expose().to_string());
        save_atomic(&self.path, &file)?;
        tracing::info!(path = %self.path.display(), "saved API key");
        Ok(cred)
    }

    /// Returns true if a key was present.
    pub fn clear_key(&self) -> anyhow::Result<bool> {
        let mut file = load_from(&self.path)?;
        let had = file.api_key.take().is_some();
        save_atomic(&self.path, &file)?;
        Ok(had)
    }

    /// Stored key only, ignoring the environment.
    pub fn stored(&self) -> anyhow::Result<Option<Credential>> {
        let file = load_from(&self.path)?;
        Ok(file.api_key.as_deref().and_then(Credential::new))
    }
}

impl CredentialSource for FileSettings {
    fn credential(&self) -> anyhow::Result<Option<Credential>> {
        if self.env_override {
            if let Some(cred) = std::env::var(ENV_API_KEY).ok().as_deref().and_then(Credential::new) {
                return Ok(Some(cred));
            }
        }
        self.stored()
    }
}

fn load_from(path: &Path) -> anyhow::Result<SettingsFile> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SettingsFile::default()),
        Err(e) => {
            return Err(anyhow::Error::new(e))
                .with_context(|| format!("failed to read settings: {}", path.display()))
        }
    };

    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse JSON: {}", path.display()))
}

fn save_atomic(path: &Path, file: &SettingsFile) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create settings directory: {}", dir.display()))?;

    let tmp = tmp_path(path);
    let bytes = serde_json::to_vec_pretty(file).context("failed to encode settings")?;
    std::fs::write(&tmp, bytes).with_context(|| format!("failed to write: {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace: {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "settings.json".to_string());
    p.set_file_name(format!("{file}.tmp"));
    p
}
