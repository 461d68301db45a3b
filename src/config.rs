//! Persistent CLI configuration stored in `~/.voidkey/config.yaml`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::{Result, VoidkeyError};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";
pub const DEFAULT_TOKEN_ENV: &str = "OIDC_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_name: Option<String>,
    #[serde(default)]
    pub token_env: String,
    /// Endpoint for key based minting, for brokers that do not serve `/credentials/mint-keys`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_keys_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.into(),
            idp_name: None,
            token_env: DEFAULT_TOKEN_ENV.into(),
            mint_keys_path: None,
        }
    }
}

/// Keys accepted by `config get` and `config set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Server,
    Idp,
    TokenEnv,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [ConfigKey::Server, ConfigKey::Idp, ConfigKey::TokenEnv];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Server => "server",
            ConfigKey::Idp => "idp",
            ConfigKey::TokenEnv => "token-env",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = VoidkeyError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                VoidkeyError::Usage(format!(
                    "unknown configuration key: {}\nValid keys: server, idp, token-env",
                    s
                ))
            })
    }
}

/// Location of the config file: `~/.voidkey/config.yaml`.
pub fn config_path() -> Result<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Err(VoidkeyError::Config(
            "failed to get home directory".into(),
        ));
    };
    Ok(home.join(".voidkey").join("config.yaml"))
}

/// Returns true for names usable as environment variables in a POSIX shell.
pub fn is_valid_env_name(name: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    re.is_match(name)
}

impl Config {
    /// Loads the config file, falling back to defaults if it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        log::debug!("Loading config from {}", path.display());

        let data = fs::read_to_string(path)
            .map_err(|e| VoidkeyError::Config(format!("failed to read config file: {}", e)))?;
        let mut config: Config = if data.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&data)
                .map_err(|e| VoidkeyError::Config(format!("failed to parse config file: {}", e)))?
        };

        // empty fields fall back to defaults
        if config.server.is_empty() {
            config.server = DEFAULT_SERVER.into();
        }
        if config.token_env.is_empty() {
            config.token_env = DEFAULT_TOKEN_ENV.into();
        }
        if config.idp_name.as_deref() == Some("") {
            config.idp_name = None;
        }
        if config
            .mint_keys_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            config.mint_keys_path = None;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                VoidkeyError::Config(format!("failed to create config directory: {}", e))
            })?;
        }
        let data = serde_yaml::to_string(self)
            .map_err(|e| VoidkeyError::Config(format!("failed to marshal config: {}", e)))?;
        fs::write(path, data)
            .map_err(|e| VoidkeyError::Config(format!("failed to write config file: {}", e)))?;
        restrict_permissions(path)?;
        log::debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::Server => &self.server,
            ConfigKey::Idp => self.idp_name.as_deref().unwrap_or(""),
            ConfigKey::TokenEnv => &self.token_env,
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            ConfigKey::Server => {
                if value.is_empty() {
                    return Err(VoidkeyError::Usage("server URL can not be empty".into()));
                }
                self.server = value.into();
            }
            ConfigKey::Idp => {
                self.idp_name = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            ConfigKey::TokenEnv => {
                if !is_valid_env_name(value) {
                    return Err(VoidkeyError::Usage(format!(
                        "invalid environment variable name: {:?}",
                        value
                    )));
                }
                self.token_env = value.into();
            }
        }
        Ok(())
    }

    /// Applies the global `--server` flag on top of the file contents.
    pub fn with_server_override(mut self, server: Option<&str>) -> Self {
        if let Some(server) = server.filter(|s| !s.is_empty()) {
            self.server = server.into();
        }
        self
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| VoidkeyError::Config(format!("failed to set config file permissions: {}", e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
