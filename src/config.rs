// config.rs - Bot configuration loading
// Reads botconfig.txt (KEY=VALUE) from the first of several candidate paths and
// falls back to process environment variables for anything the file leaves out.

use crate::error::ConfigError;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

const CONFIG_PATHS: [&str; 4] = [
    "botconfig.txt",
    "../botconfig.txt",
    "../../botconfig.txt",
    "src/botconfig.txt",
];

const KNOWN_KEYS: [&str; 8] = [
    "DISCORD_TOKEN",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "OPENAI_BASE_URL",
    "OPENAI_TEMPERATURE",
    "OPENAI_TIMEOUT",
    "YTDLP_PATH",
    "THREAD_AUTO_ARCHIVE_MINUTES",
];

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";
pub const DEFAULT_AUTO_ARCHIVE_MINUTES: u16 = 60;

/// Auto-archive durations Discord accepts for threads, in minutes.
const AUTO_ARCHIVE_CHOICES: [u16; 4] = [60, 1440, 4320, 10080];

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub ytdlp_path: String,
    pub thread_auto_archive_minutes: u16,
}

impl BotConfig {
    /// Load from botconfig.txt, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut values = match read_config_file() {
            Some((path, content)) => {
                info!("✅ Configuration loaded from {}", path);
                parse_config_content(&content)
            }
            None => {
                info!("No botconfig.txt found, reading configuration from the environment");
                HashMap::new()
            }
        };

        for key in KNOWN_KEYS {
            if values.contains_key(key) {
                continue;
            }
            if let Ok(value) = env::var(key) {
                debug!("Using {} from the environment", key);
                values.insert(key.to_string(), value);
            }
        }

        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let discord_token = lookup("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        if discord_token == "YOUR_BOT_TOKEN_HERE" {
            return Err(ConfigError::Invalid {
                key: "DISCORD_TOKEN",
                reason: "still set to the placeholder value".to_string(),
            });
        }

        let openai_api_key = lookup("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let openai_base_url = lookup("OPENAI_BASE_URL")
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        if !openai_base_url.starts_with("http://") && !openai_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "OPENAI_BASE_URL",
                reason: format!("`{}` must start with http:// or https://", openai_base_url),
            });
        }

        let temperature = match lookup("OPENAI_TEMPERATURE") {
            Some(raw) => raw.parse::<f32>().map_err(|_| ConfigError::Invalid {
                key: "OPENAI_TEMPERATURE",
                reason: format!("`{}` is not a number", raw),
            })?,
            None => DEFAULT_TEMPERATURE,
        };
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "OPENAI_TEMPERATURE",
                reason: format!("{} is outside 0.0-2.0", temperature),
            });
        }

        let timeout_secs = match lookup("OPENAI_TIMEOUT") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "OPENAI_TIMEOUT",
                reason: format!("`{}` is not a whole number of seconds", raw),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 || timeout_secs > 600 {
            return Err(ConfigError::Invalid {
                key: "OPENAI_TIMEOUT",
                reason: format!("{} seconds is outside 1-600", timeout_secs),
            });
        }

        let thread_auto_archive_minutes = match lookup("THREAD_AUTO_ARCHIVE_MINUTES") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "THREAD_AUTO_ARCHIVE_MINUTES",
                reason: format!("`{}` is not a number", raw),
            })?,
            None => DEFAULT_AUTO_ARCHIVE_MINUTES,
        };
        if !AUTO_ARCHIVE_CHOICES.contains(&thread_auto_archive_minutes) {
            return Err(ConfigError::Invalid {
                key: "THREAD_AUTO_ARCHIVE_MINUTES",
                reason: format!("must be one of {:?}", AUTO_ARCHIVE_CHOICES),
            });
        }

        Ok(Self {
            discord_token: discord_token.to_string(),
            openai_api_key: openai_api_key.to_string(),
            openai_model: lookup("OPENAI_MODEL").unwrap_or(DEFAULT_MODEL).to_string(),
            openai_base_url,
            temperature,
            request_timeout: Duration::from_secs(timeout_secs),
            ytdlp_path: lookup("YTDLP_PATH").unwrap_or(DEFAULT_YTDLP_PATH).to_string(),
            thread_auto_archive_minutes,
        })
    }
}

fn read_config_file() -> Option<(&'static str, String)> {
    CONFIG_PATHS
        .iter()
        .find_map(|path| fs::read_to_string(path).ok().map(|content| (*path, content)))
}

/// Parse KEY=VALUE lines, skipping blanks and `#` comments.
pub fn parse_config_content(content: &str) -> HashMap<String, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) => {
                config.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => warn!("⚠️ Ignoring invalid line {} in botconfig.txt: {}", line_num + 1, line),
        }
    }

    config
}
