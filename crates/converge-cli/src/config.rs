use std::path::{Path, PathBuf};

use converge_client::Config;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

pub const DEFAULT_TOKEN_VAR: &str = "CONVERGE_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    #[serde(default)]
    pub client: Config,
    #[serde(default)]
    pub credentials: CredentialSource,
}

/// Where the bearer token for API calls comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_token: String,
    },
    Env {
        #[serde(default = "default_token_var")]
        var: String,
    },
    None,
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Env {
            var: default_token_var(),
        }
    }
}

fn default_token_var() -> String {
    DEFAULT_TOKEN_VAR.to_string()
}

impl CredentialSource {
    /// The token to send, if any. An unset environment variable means no
    /// token rather than an error, so unauthenticated endpoints still work.
    pub fn token(&self) -> Option<String> {
        match self {
            CredentialSource::Inline { access_token } => Some(access_token.clone()),
            CredentialSource::Env { var } => std::env::var(var).ok().filter(|t| !t.is_empty()),
            CredentialSource::None => None,
        }
    }
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("converge").join("config.json"))
}

/// Load the config from `explicit`, or from the default location.
///
/// A missing file at the default location yields the default config; a
/// missing file that was asked for by name is an error.
pub fn load_config(explicit: Option<&Path>) -> eyre::Result<CliConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                tracing::debug!(path = %p.display(), "no config file, using defaults");
                return Ok(CliConfig::default());
            }
            p
        }
    };
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> eyre::Result<CliConfig> {
    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(contents)?;
    let on_disk_version = match json.get("config_version") {
        None => 0,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| eyre::eyre!("config_version {v} is not a supported version number"))?,
    };

    let migrated = migrate(json, on_disk_version)?;
    let config: CliConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update converge."
        ));
    }

    // v0 → v1: credentials moved under a tagged `credentials` object
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        if let Some(token) = obj.remove("access_token") {
            obj.insert(
                "credentials".to_string(),
                serde_json::json!({ "type": "inline", "access_token": token }),
            );
        }
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(CURRENT_VERSION.into()),
        );
        tracing::info!("migrated config v0 → v1");
    }

    Ok(json)
}
