//! Configuration loaded from `~/.oshin/config.toml` plus environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OshinError, Result};
use crate::routing::Credential;
use crate::types::Presentation;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OshinConfig {
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub digest: DigestConfig,
    pub reminder: Option<ReminderConfig>,
    pub store: StoreConfig,
    /// Routing descriptor (JSON).
    pub routing_path: String,
}

impl Default for OshinConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            slack: SlackConfig::default(),
            digest: DigestConfig::default(),
            reminder: None,
            store: StoreConfig::default(),
            routing_path: "~/.oshin/routing.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Which notification sink implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Slack Web API `chat.postMessage`; credentials are bot tokens.
    #[default]
    Api,
    /// Incoming webhooks; credentials are webhook URLs.
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Primary credential, used for the working channel, the user
    /// directory and the reminder.
    pub bot_token: Credential,
    /// Every status update is announced here regardless of tags.
    pub primary_channel: String,
    pub icon_url: Option<String>,
    pub username: Option<String>,
    pub api_base: String,
    pub sink: SinkKind,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: Credential::default(),
            primary_channel: "#working".into(),
            icon_url: Some("http://i.imgur.com/fLcxkel.png".into()),
            username: Some("oshin".into()),
            api_base: "https://slack.com/api".into(),
            sink: SinkKind::Api,
        }
    }
}

impl SlackConfig {
    pub fn presentation(&self) -> Presentation {
        Presentation {
            icon_url: self.icon_url.clone(),
            display_name: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Daily trigger, `HH:MM` in `timezone`.
    pub time: String,
    /// IANA zone for the trigger and the title date.
    pub timezone: String,
    /// strftime template rendered against "yesterday".
    pub title_format: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            time: "09:30".into(),
            timezone: "UTC".into(),
            title_format: "Team daily digest for %Y-%m-%d".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub time: String,
    #[serde(default = "default_reminder_channel")]
    pub channel: String,
    #[serde(default = "default_reminder_text")]
    pub text: String,
    /// Appended to the text, typically the meeting link.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_reminder_channel() -> String {
    "#random".into()
}

fn default_reminder_text() -> String {
    "Time for daily scrum <!here|here>".into()
}

impl ReminderConfig {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            channel: default_reminder_channel(),
            text: default_reminder_text(),
            url: None,
        }
    }

    pub fn message(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => format!("{} {}", self.text, url.trim()),
            _ => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// Process-local; contents are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "~/.oshin/oshin.db".into(),
        }
    }
}

/// Expand `~` in user-supplied paths.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

impl OshinConfig {
    /// `~/.oshin`.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".oshin")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OshinError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OshinError::config(format!("Cannot parse config: {e}")))
    }

    /// Apply the deployment variables (`PORT`, `BOT_TOKEN`, `WORKING_CHANNEL`,
    /// `DIGEST_TIME`, `DAILYSCRUM_TIME`, `DAILYSCRUM_URL`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| OshinError::config(format!("Invalid PORT '{port}': {e}")))?;
        }
        if let Some(token) = get("BOT_TOKEN") {
            self.slack.bot_token = Credential::new(token);
        }
        if let Some(channel) = get("WORKING_CHANNEL") {
            self.slack.primary_channel = channel;
        }
        if let Some(time) = get("DIGEST_TIME") {
            self.digest.time = time;
        }
        if let Some(time) = get("DAILYSCRUM_TIME") {
            match &mut self.reminder {
                Some(reminder) => reminder.time = time,
                None => self.reminder = Some(ReminderConfig::new(time)),
            }
        }
        if let Some(url) = get("DAILYSCRUM_URL") {
            if let Some(reminder) = &mut self.reminder {
                reminder.url = Some(url);
            }
        }
        Ok(())
    }

    /// Startup checks. Any failure here stops the process.
    pub fn validate(&self) -> Result<()> {
        if self.slack.bot_token.is_empty() {
            return Err(OshinError::config(
                "No bot token configured (set BOT_TOKEN or slack.bot_token)",
            ));
        }
        if self.slack.primary_channel.trim().is_empty() {
            return Err(OshinError::config("slack.primary_channel is empty"));
        }
        crate::time::parse_time_of_day(&self.digest.time)?;
        crate::time::parse_timezone(&self.digest.timezone)
            .map_err(|e| OshinError::config(format!("digest.timezone: {e}")))?;
        if let Some(reminder) = &self.reminder {
            crate::time::parse_time_of_day(&reminder.time)?;
            if reminder.channel.trim().is_empty() {
                return Err(OshinError::config("reminder.channel is empty"));
            }
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        expand_path(&self.store.path)
    }

    pub fn routing_path(&self) -> PathBuf {
        expand_path(&self.routing_path)
    }
}
