use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use std::{collections::HashMap, env, fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address of the authenticated sending account
    pub sender: String,
    /// Display name shown on the `From` header
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    pub smtp_relay: String,
    pub smtp_username: String,
    pub smtp_pass: String,
    /// Fixed inbox every submission is delivered to
    pub recipient: String,
    /// Origins allowed to call the service, compared by exact match
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Reject blank subject or message with 400 instead of sending them through
    #[serde(default)]
    pub strict_validation: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(
        "Config file not found and environment variables are incomplete. \
         Tried: '{path}', 'config.yaml', environment variables, and 'config.example.yaml'. \
         Error: {source}"
    )]
    NotFound { path: String, source: envy::Error },

    #[error("Failed to parse PORT: {0}")]
    Port(#[from] std::num::ParseIntError),

    #[error("Invalid allowed origin '{0}': wildcards and non-header characters are not accepted")]
    InvalidOrigin(String),
}

const CONFIG_PATH_VAR: &str = "VIBAE_MAILER_CONFIG";
const ENV_PREFIX: &str = "VIBAE_";

fn default_sender_name() -> String {
    "Vibae".to_string()
}

const fn default_port() -> u16 {
    4000
}

impl Config {
    /// Origins must be literal header values; `*` would turn the allow-list
    /// into a wildcard.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.allowed_origins {
            if origin.trim() == "*" || HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidOrigin(origin.clone()));
            }
        }
        Ok(())
    }
}

type Vars = HashMap<String, String>;

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn load_from_env(vars: &Vars) -> Result<Config, envy::Error> {
    envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(
        vars.iter().map(|(key, value)| (key.clone(), value.clone())),
    )
}

/// Resolution order: explicit file, `config.yaml`, `VIBAE_*` variables,
/// then the placeholder `config.example.yaml`.
fn load_from_sources(dir: &Path, vars: &Vars) -> Result<Config, ConfigError> {
    // Retrieve env variable
    let config_path = vars
        .get(CONFIG_PATH_VAR)
        .cloned()
        .unwrap_or_else(|| "config.yaml".to_string());

    // Try env path
    let explicit = dir.join(&config_path);
    if explicit.exists() {
        return read_file(&explicit);
    }

    // Fallback to config.yaml
    let default = dir.join("config.yaml");
    if default.exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_file(&default);
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    let source = match load_from_env(vars) {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            return Ok(config);
        }
        Err(e) => e,
    };

    // Fallback to config.example.yaml
    let example = dir.join("config.example.yaml");
    if example.exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found and environment is incomplete ({}), \
             falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path,
            source
        );
        return read_file(&example);
    }

    Err(ConfigError::NotFound {
        path: config_path,
        source,
    })
}

/// Applies a bare `PORT` variable on top of whatever source produced the config.
fn apply_port_override(mut config: Config, port: Option<&str>) -> Result<Config, ConfigError> {
    if let Some(port) = port {
        config.port = port.trim().parse()?;
    }
    Ok(config)
}

/// Resolves the config relative to `dir` using the given variables instead of
/// the process environment.
pub fn load_config_from<I>(dir: &Path, vars: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vars = vars.into_iter().collect();

    let config = load_from_sources(dir, &vars)?;
    let config = apply_port_override(config, vars.get("PORT").map(String::as_str))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let dir = env::current_dir()?;
    load_config_from(&dir, env::vars())
}
