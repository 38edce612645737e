use crate::settings::FileSettings;
use anyhow::Context;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const ENV_HOME: &str = "FIELDGEN_HOME";
const APP_DIR: &str = "fieldgen";

/// Where the config file and the stored API key live.
///
/// `FIELDGEN_HOME` puts both under one root (`config/`, `state/`). Otherwise
/// the XDG config and state homes are used, falling back to `~/.config` and
/// `~/.local/state`. Nothing is created here; writers create what they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    config_dir: PathBuf,
    state_dir: PathBuf,
}

impl AppDirs {
    pub fn resolve() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> anyhow::Result<Self> {
        if let Some(base) = lookup(ENV_HOME).filter(|v| !v.is_empty()).map(PathBuf::from) {
            return Ok(Self {
                config_dir: base.join("config"),
                state_dir: base.join("state"),
            });
        }

        let home = || -> anyhow::Result<PathBuf> {
            lookup("HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .context("HOME is not set (set FIELDGEN_HOME instead)")
        };
        let xdg = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let config_dir = match xdg("XDG_CONFIG_HOME") {
            Some(dir) => dir.join(APP_DIR),
            None => home()?.join(".config").join(APP_DIR),
        };
        let state_dir = match xdg("XDG_STATE_HOME") {
            Some(dir) => dir.join(APP_DIR),
            None => home()?.join(".local").join("state").join(APP_DIR),
        };
        Ok(Self { config_dir, state_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Settings store for the API key, in the state directory.
    pub fn settings(&self) -> FileSettings {
        FileSettings::new(self.state_dir.join("settings.json"))
    }
}
