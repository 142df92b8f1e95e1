use std::fmt;

use derive_more::{Display, From};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_valid::yaml::FromYamlStr;
use serde_valid::Validate;

// Characters left as-is in the userinfo part of a connection string
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub const ENV_USERNAME: &str = "MONGODB_USERNAME";
pub const ENV_PASSWORD: &str = "MONGODB_PASSWORD";
pub const ENV_CLUSTER: &str = "MONGODB_CLUSTER";
pub const ENV_DATABASE_NAME: &str = "MONGODB_DATABASE_NAME";
pub const ENV_SCHEME: &str = "MONGODB_SCHEME";

// Config Type
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    // Document store connection settings
    #[validate]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn from_file(file_path: &str) -> Result<Self, ConfigError> {
        let config_file_content = std::fs::read_to_string(file_path)?;
        Self::from_yaml_str(&config_file_content)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config = <Config as FromYamlStr>::from_yaml_str(s)?;
        config.database.verify_credentials()?;
        Ok(config)
    }

    /// Builds the configuration from the `MONGODB_*` process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Username, password, cluster and database name are required; the scheme falls back
    /// to `mongodb+srv`. Everything else takes its default.
    pub fn from_env_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let scheme = match lookup(ENV_SCHEME) {
            Some(raw) => raw.parse()?,
            None => Scheme::default(),
        };

        let database = DatabaseConfig {
            scheme,
            username: Some(required(ENV_USERNAME)?),
            password: Some(required(ENV_PASSWORD)?),
            cluster: required(ENV_CLUSTER)?,
            database_name: required(ENV_DATABASE_NAME)?,
            retry_writes: default_retry_writes(),
            write_concern: default_write_concern(),
            app_name: None,
            server_selection_timeout_ms: None,
        };

        let config = Config { database };
        config.validate().map_err(ConfigError::ValidationError)?;
        config.database.verify_credentials()?;
        Ok(config)
    }
}

#[derive(Debug, From, Display)]
pub enum ConfigError {
    #[display("Missing environment variable: {}", _0)]
    #[from(ignore)]
    MissingEnvVar(String),

    #[display("Unknown connection scheme: {}", _0)]
    #[from(ignore)]
    UnknownScheme(String),

    #[display("A password is configured without a username")]
    #[from(ignore)]
    PasswordWithoutUsername,

    #[display("Invalid configuration: {}", _0)]
    ValidationError(serde_valid::validation::Errors),

    #[display("Serde Error: {}", _0)]
    SerdeError(serde_valid::Error<serde_yaml::Error>),

    #[display("Error Reading Config File: {}", _0)]
    IoError(std::io::Error),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display)]
pub enum Scheme {
    // DNS seed list, used by hosted clusters
    #[default]
    #[serde(rename = "mongodb+srv")]
    #[display("mongodb+srv")]
    Srv,
    // Plain host list
    #[serde(rename = "mongodb")]
    #[display("mongodb")]
    Standard,
}

impl std::str::FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mongodb+srv" => Ok(Scheme::Srv),
            "mongodb" => Ok(Scheme::Standard),
            other => Err(ConfigError::UnknownScheme(other.to_string())),
        }
    }
}

#[derive(Clone, Deserialize, Validate)]
pub struct DatabaseConfig {
    // Connection string scheme
    #[serde(default)]
    pub scheme: Scheme,
    // Credentials, omitted for servers without authentication
    pub username: Option<String>,
    pub password: Option<String>,
    // Host (or host:port list) of the cluster
    #[validate(min_length = 1)]
    #[validate(pattern = r"^[^/?#@\s]+$")]
    pub cluster: String,
    // The database every collection lives in, no characters MongoDB forbids in database names
    #[validate(min_length = 1)]
    #[validate(pattern = r#"^[^/\\. "$?*<>:|]+$"#)]
    pub database_name: String,
    #[serde(default = "default_retry_writes")]
    pub retry_writes: bool,
    #[serde(default = "default_write_concern")]
    #[validate(min_length = 1)]
    pub write_concern: String,
    // Reported to the server in the connection handshake
    pub app_name: Option<String>,
    // Overrides the driver's server selection timeout
    #[validate(minimum = 1)]
    pub server_selection_timeout_ms: Option<u64>,
}

fn default_retry_writes() -> bool {
    true
}

fn default_write_concern() -> String {
    "majority".to_string()
}

impl DatabaseConfig {
    pub fn verify_credentials(&self) -> Result<(), ConfigError> {
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::PasswordWithoutUsername);
        }
        Ok(())
    }

    /// Assembles `<scheme>://[user:password@]<cluster>/<database>?retryWrites=..&w=..`.
    ///
    /// Expects a configuration that passed validation and [`DatabaseConfig::verify_credentials`].
    pub fn connection_string(&self) -> String {
        let userinfo = match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!(
                "{}:{}@",
                utf8_percent_encode(username, USERINFO),
                utf8_percent_encode(password, USERINFO)
            ),
            (Some(username), None) => format!("{}@", utf8_percent_encode(username, USERINFO)),
            _ => String::new(),
        };

        format!(
            "{}://{}{}/{}?retryWrites={}&w={}",
            self.scheme,
            userinfo,
            self.cluster,
            self.database_name,
            self.retry_writes,
            self.write_concern
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cluster", &self.cluster)
            .field("database_name", &self.database_name)
            .field("retry_writes", &self.retry_writes)
            .field("write_concern", &self.write_concern)
            .field("app_name", &self.app_name)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .finish()
    }
}
