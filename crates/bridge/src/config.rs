use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_OBJECT: &str = "abNative";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BridgeConfig {
    pub channel: Option<ChannelConfig>,
    pub calls: Option<CallsConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Global object on the web side that receives outbound commands.
    pub object: Option<String>,
    pub echo_diagnostics: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallsConfig {
    pub timeout_ms: Option<u64>,
}

impl BridgeConfig {
    pub fn load() -> Self {
        match Self::find_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", path.display(), err);
                return Self::default();
            }
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str::<BridgeConfig>(contents)?;
        if let Some(object) = config.channel.as_ref().and_then(|c| c.object.as_ref()) {
            if !is_script_path(object) {
                return Err(ConfigError::InvalidObject(object.clone()));
            }
        }
        Ok(config)
    }

    pub fn object_name(&self) -> &str {
        self.channel
            .as_ref()
            .and_then(|channel| channel.object.as_deref())
            .unwrap_or(DEFAULT_OBJECT)
    }

    pub fn echo_diagnostics(&self) -> bool {
        self.channel
            .as_ref()
            .and_then(|channel| channel.echo_diagnostics)
            .unwrap_or(true)
    }

    /// `None` keeps outstanding calls forever.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.calls
            .as_ref()?
            .timeout_ms
            .map(Duration::from_millis)
    }

    fn find_config_path() -> Option<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(path) = std::env::var("BRIDGE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!("BRIDGE_CONFIG set but file not found: {}", path.display());
        }

        candidates.push(PathBuf::from("bridge.toml"));

        if let Some(path) = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        {
            candidates.push(path.join("bridge").join("bridge.toml"));
        }

        candidates.into_iter().find(|path| path.exists())
    }
}

/// `name` or `a.b.c`, each segment a plain script identifier.
fn is_script_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}
