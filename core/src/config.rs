use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;
use crate::client::{ClientBuilder, ClientCert, ServiceNowClient, DEFAULT_BATCH_SIZE};
use crate::error::{Error, Result};
use crate::record::DisplayValue;

/// snc configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub instance: InstanceConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstanceConfig {
    /// `dev0000` or a full `https://` URL
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub allow_insecure_http: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Basic,
    PasswordGrant,
    Jwt,
    Token,
    /// Mutual TLS with a client certificate, no credentials
    Cert,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub jwt: String,

    #[serde(default)]
    pub token: String,

    /// PEM certificate for `mode = "cert"`
    #[serde(default)]
    pub cert_file: Option<PathBuf>,

    /// PKCS#8 PEM key for `mode = "cert"`
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub proxy: Option<String>,

    /// Defaults to on
    #[serde(default)]
    pub verify: Option<bool>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            verify: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// `true`, `false` or `all`
    #[serde(default = "default_display_value")]
    pub display_value: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            display_value: default_display_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_timeout_secs() -> u64 { 60 }
fn default_connect_timeout_secs() -> u64 { 20 }
fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }
fn default_display_value() -> String { "all".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Overrides from `SNC_INSTANCE`, `SNC_USERNAME`, `SNC_PASSWORD` and
    /// `SNC_TOKEN`. A token switches the auth mode to `token`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(instance) = var("SNC_INSTANCE") {
            self.instance.name = instance;
        }
        if let Some(username) = var("SNC_USERNAME") {
            self.auth.username = username;
        }
        if let Some(password) = var("SNC_PASSWORD") {
            self.auth.password = password;
        }
        if let Some(token) = var("SNC_TOKEN") {
            self.auth.token = token;
            self.auth.mode = AuthMode::Token;
        }
    }

    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let auth = &self.auth;
        let credentials = match auth.mode {
            AuthMode::Basic => {
                require(&auth.username, "auth.username")?;
                Credentials::basic(&auth.username, &auth.password)
            }
            AuthMode::PasswordGrant => {
                require(&auth.username, "auth.username")?;
                require(&auth.client_id, "auth.client_id")?;
                Credentials::PasswordGrant {
                    username: auth.username.clone(),
                    password: auth.password.clone(),
                    client_id: auth.client_id.clone(),
                    client_secret: auth.client_secret.clone(),
                }
            }
            AuthMode::Jwt => {
                require(&auth.client_id, "auth.client_id")?;
                require(&auth.jwt, "auth.jwt")?;
                Credentials::Jwt {
                    client_id: auth.client_id.clone(),
                    client_secret: auth.client_secret.clone(),
                    jwt: auth.jwt.clone(),
                }
            }
            AuthMode::Token => {
                require(&auth.token, "auth.token")?;
                Credentials::Token(auth.token.clone())
            }
            AuthMode::Cert => return Ok(None),
        };
        Ok(Some(credentials))
    }

    fn client_cert(&self) -> Result<Option<ClientCert>> {
        if self.auth.mode != AuthMode::Cert {
            return Ok(None);
        }
        let (cert, key) = match (&self.auth.cert_file, &self.auth.key_file) {
            (Some(cert), Some(key)) => (expand_path(cert), expand_path(key)),
            _ => {
                return Err(Error::InvalidArgument(
                    "auth.cert_file and auth.key_file are required for cert mode".to_string(),
                ))
            }
        };
        Ok(Some(ClientCert {
            cert_pem: std::fs::read(cert)?,
            key_pem: std::fs::read(key)?,
        }))
    }

    pub fn display_mode(&self) -> Result<DisplayValue> {
        self.query.display_value.parse()
    }

    pub fn client_builder(&self) -> Result<ClientBuilder> {
        require(&self.instance.name, "instance.name")?;

        let mut builder = ServiceNowClient::builder(&self.instance.name)
            .allow_insecure_http(self.instance.allow_insecure_http)
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .connect_timeout(Duration::from_secs(self.http.connect_timeout_secs))
            .batch_size(self.query.batch_size);

        if let Some(credentials) = self.credentials()? {
            builder = builder.credentials(credentials);
        }
        if let Some(cert) = self.client_cert()? {
            builder = builder.client_cert(cert);
        }
        if let Some(proxy) = &self.http.proxy {
            builder = builder.proxy(proxy);
        }
        if let Some(verify) = self.http.verify {
            builder = builder.verify(verify);
        }
        if let Some(user_agent) = &self.http.user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(builder)
    }

    pub fn build_client(&self) -> Result<ServiceNowClient> {
        self.client_builder()?.build()
    }

    /// Copy safe to print, secrets replaced
    pub fn masked(&self) -> Config {
        let mut config = self.clone();
        for secret in [
            &mut config.auth.password,
            &mut config.auth.client_secret,
            &mut config.auth.jwt,
            &mut config.auth.token,
        ] {
            if !secret.is_empty() {
                *secret = "********".to_string();
            }
        }
        config
    }
}

fn require(value: &str, key: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} is not configured", key)));
    }
    Ok(())
}

/// Get default config file path
/// Uses ~/.config/snc/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("snc")
        .join("config.toml")
}

/// Reads and parses one config file
pub fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolves the config file: an explicit path (which must exist), else the
/// first of `./snc.toml` and [`default_config_path`] that exists, else
/// defaults. A file that is found but does not parse is an error.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        let path = expand_path(&path);
        if !path.is_file() {
            return Err(Error::InvalidArgument(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return read_config(&path);
    }

    let candidates = [PathBuf::from("snc.toml"), default_config_path()];
    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => read_config(found),
        None => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Replaces a leading `~` component with the home directory
pub fn expand_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.auth.mode, AuthMode::Basic);
        assert_eq!(config.query.batch_size, 100);
        assert_eq!(config.query.display_value, "all");
        assert_eq!(config.http.timeout_secs, 60);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.display_mode().unwrap(), DisplayValue::All);
    }

    #[test]
    fn test_parse_sections() {
        let config: Config = toml::from_str(
            r#"
            [instance]
            name = "dev0000"

            [auth]
            mode = "password_grant"
            username = "admin"
            password = "secret"
            client_id = "cid"
            client_secret = "csecret"

            [http]
            proxy = "http://proxy:8080"
            verify = false

            [query]
            batch_size = 250
            display_value = "false"
            "#,
        )
        .unwrap();

        assert_eq!(config.instance.name, "dev0000");
        assert_eq!(config.auth.mode, AuthMode::PasswordGrant);
        assert_eq!(config.http.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(config.http.verify, Some(false));
        assert_eq!(config.query.batch_size, 250);
        assert_eq!(config.display_mode().unwrap(), DisplayValue::False);
        assert!(matches!(
            config.credentials().unwrap(),
            Some(Credentials::PasswordGrant { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("SNC_INSTANCE", "dev1234"), ("SNC_TOKEN", "abc")].into_iter().collect();
        let mut config = Config::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.instance.name, "dev1234");
        assert_eq!(config.auth.mode, AuthMode::Token);
        assert!(matches!(config.credentials().unwrap(), Some(Credentials::Token(t)) if t == "abc"));
    }

    #[test]
    fn test_missing_values_rejected() {
        let config = Config::default();
        assert!(config.build_client().is_err());
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_build_client() {
        let mut config = Config::default();
        config.instance.name = "dev0000".to_string();
        config.auth.username = "admin".to_string();
        config.auth.password = "admin".to_string();
        config.query.batch_size = 50;
        let client = config.build_client().unwrap();
        assert_eq!(client.instance(), "https://dev0000.service-now.com");
        assert_eq!(client.default_batch_size(), 50);
    }

    #[test]
    fn test_masked() {
        let mut config = Config::default();
        config.auth.password = "secret".to_string();
        let masked = config.masked();
        assert_eq!(masked.auth.password, "********");
        assert_eq!(masked.auth.token, "");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snc.toml");
        std::fs::write(&path, "[instance]\nname = \"dev42\"\n").unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.instance.name, "dev42");

        assert!(load_config(Some(dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = PathBuf::from("/tmp/config.toml");
        assert_eq!(expand_path(&path), path);
        assert_eq!(expand_path(Path::new("~user/x")), PathBuf::from("~user/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path(Path::new("~/.config/snc.toml")), home.join(".config/snc.toml"));
        }
    }

    #[test]
    fn test_broken_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snc.toml");
        std::fs::write(&path, "[query]\nbatch_size = \"lots\"\n").unwrap();
        assert!(matches!(read_config(&path), Err(Error::Config(_))));
        assert!(matches!(load_config(Some(path)), Err(Error::Config(_))));
    }
}
