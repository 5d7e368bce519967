use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site_name: String,
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
    pub consent: ConsentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    // Empty list means same-origin only
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16, // 465 = implicit TLS, anything else STARTTLS
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub contact_address: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub storage_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site_name: "Crescere".to_string(),
            server: ServerConfig::default(),
            smtp: SmtpConfig::default(),
            consent: ConsentConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 25 * 1024 * 1024,
            allowed_origins: vec![],
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_address: "noreply@crescere.sk".to_string(),
            contact_address: "tomas@crescere.sk".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        ConsentConfig {
            storage_path: "crescere-consent.json".to_string(),
        }
    }
}

/// The mail transport cannot be built from the current configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SMTP configuration is incomplete: {0}")]
pub struct ConfigurationError(pub String);

/// Resolved SMTP transport settings.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub contact_address: String,
    pub timeout: Duration,
}

impl SmtpSettings {
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***SET***")
            .field("from_address", &self.from_address)
            .field("contact_address", &self.contact_address)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Applies `SMTP_*`, `CONTACT_EMAIL` and `PORT` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = lookup("SMTP_HOST") {
            self.smtp.host = Some(host);
        }
        if let Some(port) = lookup("SMTP_PORT") {
            match port.trim().parse() {
                Ok(port) => self.smtp.port = port,
                Err(e) => log::warn!("Invalid SMTP_PORT value '{port}': {e}"),
            }
        }
        if let Some(user) = lookup("SMTP_USER") {
            self.smtp.username = Some(user);
        }
        if let Some(pass) = lookup("SMTP_PASS") {
            self.smtp.password = Some(pass);
        }
        if let Some(from) = lookup("SMTP_FROM") {
            self.smtp.from_address = from;
        }
        if let Some(contact) = lookup("CONTACT_EMAIL") {
            self.smtp.contact_address = contact;
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Invalid PORT value '{port}': {e}"),
            }
        }
    }

    pub fn smtp_settings(&self) -> Result<SmtpSettings, ConfigurationError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .as_ref()
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .ok_or_else(|| ConfigurationError(format!("missing {name}")))
        };

        Ok(SmtpSettings {
            host: required(&self.smtp.host, "host")?,
            port: self.smtp.port,
            username: required(&self.smtp.username, "username")?,
            password: required(&self.smtp.password, "password")?,
            from_address: self.smtp.from_address.clone(),
            contact_address: self.smtp.contact_address.clone(),
            timeout: Duration::from_secs(self.smtp.timeout_seconds),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
