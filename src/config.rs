// Configuration: the vendor endpoints the client talks to, and the small
// credentials file that remembers the account and the chosen figurine
// between runs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Production vendor API base URL.
pub const DEFAULT_API_URL: &str = "https://api.tonie.cloud/v2";
/// Production identity provider token endpoint.
pub const DEFAULT_TOKEN_URL: &str =
    "https://login.tonies.com/auth/realms/tonies/protocol/openid-connect/token";
/// Public OAuth client identifier; the token endpoint expects no secret.
pub const DEFAULT_CLIENT_ID: &str = "meine-tonies";

/// File name of the credentials file inside the user config directory.
pub const CONFIG_FILE: &str = "tonie_upload.yml";

/// Where the vendor API and its token endpoint live. Tests point this at a
/// local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base_url: String,
    pub token_url: String,
    pub client_id: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api_base_url: DEFAULT_API_URL.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            client_id: DEFAULT_CLIENT_ID.into(),
        }
    }
}

impl Endpoints {
    /// Build an API URL from a path such as `/households`.
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

/// Account credentials plus the household and figurine the uploads go to.
/// The two identifiers stay empty until first-run setup has picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: String,
    #[serde(default)]
    pub household_id: String,
    #[serde(default, rename = "tonie_id")]
    pub figurine_id: String,
}

impl Credentials {
    /// True when nothing is left for the setup wizard to fill in.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty()
            && !self.password.is_empty()
            && !self.household_id.is_empty()
            && !self.figurine_id.is_empty()
    }
}

/// Reads and writes `Credentials` as YAML at a fixed path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    /// Store located in the per-user configuration directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the credentials. A missing file is `Ok(None)` so the caller can
    /// start the setup wizard; every other failure is an error.
    pub fn load(&self) -> Result<Option<Credentials>, ConfigError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let credentials = serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(credentials))
    }

    /// Persist the credentials, creating the parent directory if needed.
    pub fn save(&self, credentials: &Credentials) -> Result<(), ConfigError> {
        let data = serde_yaml::to_string(credentials).map_err(ConfigError::Encode)?;
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.path, data).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), "saved config");
        Ok(())
    }
}
