use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_ITEMS: usize = 5;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_FROM_EMAIL: &str = "onboarding@resend.dev";

/// YouTube Data API credentials.
#[derive(Debug, Clone, Default)]
pub struct YoutubeSettings {
    pub api_key: Option<String>,
}

/// Chat-completions credentials and model choice.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

/// Transactional email credentials.
#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_key: Option<String>,
    pub from_email: String,
}

impl Default for ResendSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            from_email: DEFAULT_FROM_EMAIL.to_string(),
        }
    }
}

/// Application configuration loaded from environment variables
///
/// Service credentials are optional here: a missing key only fails the
/// stage that needs it, so the requester still gets a failure notice.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Absent means jobs are kept in memory.
    pub database_url: Option<String>,
    pub youtube: YoutubeSettings,
    pub openai: OpenAiSettings,
    pub resend: ResendSettings,
    /// How many recent items a job works on.
    pub max_items: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            youtube: YoutubeSettings::default(),
            openai: OpenAiSettings::default(),
            resend: ResendSettings::default(),
            max_items: DEFAULT_MAX_ITEMS,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database_url: non_empty_var("DATABASE_URL"),
            youtube: YoutubeSettings {
                api_key: non_empty_var("YOUTUBE_API_KEY"),
            },
            openai: OpenAiSettings {
                api_key: non_empty_var("OPENAI_API_KEY"),
                model: non_empty_var("OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
            resend: ResendSettings {
                api_key: non_empty_var("RESEND_API_KEY"),
                from_email: non_empty_var("RESEND_FROM_EMAIL")
                    .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            },
            max_items: match non_empty_var("MAX_ITEMS") {
                Some(raw) => parse_max_items(&raw)?,
                None => DEFAULT_MAX_ITEMS,
            },
            allowed_origins: non_empty_var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_max_items(raw: &str) -> Result<usize> {
    let n: usize = raw
        .trim()
        .parse()
        .context("MAX_ITEMS must be a positive number")?;
    anyhow::ensure!(n > 0, "MAX_ITEMS must be at least 1");
    Ok(n)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
