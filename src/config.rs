//! Environment configuration
//!
//! Everything is read from process environment variables; the binaries load
//! a `.env` file first via `dotenv`.

use crate::error::AssistantError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GREETING: &str = "Hello! I am your NairaSense assistant. I can help you analyze spending or make quick transactions like \"Send 5k to Mom\".";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Left unset unless `GEMINI_MAX_OUTPUT_TOKENS` is given
    pub max_output_tokens: Option<u32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_output_tokens: None,
        }
    }
}

/// Timing and seeding of a chat session
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Upper bound on a single assistant call
    pub request_timeout: Duration,
    /// Settlement delay before the success message appears
    pub confirm_delay: Duration,
    /// Settlement delay before the cancellation message appears
    pub cancel_delay: Duration,
    /// Assistant entry seeded at the top of a new session
    pub greeting: Option<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            confirm_delay: Duration::from_millis(800),
            cancel_delay: Duration::from_millis(500),
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub flow: FlowConfig,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            flow: FlowConfig::default(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs = parse_var(&lookup, "ASSISTANT_TIMEOUT_SECS")?
            .unwrap_or(defaults.flow.request_timeout.as_secs());

        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            model: lookup("GEMINI_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.gemini.model),
            base_url: lookup("GEMINI_BASE_URL")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.gemini.base_url),
            timeout: Duration::from_secs(timeout_secs),
            max_output_tokens: parse_var(&lookup, "GEMINI_MAX_OUTPUT_TOKENS")?,
        };

        let flow = FlowConfig {
            request_timeout: Duration::from_secs(timeout_secs),
            confirm_delay: parse_var(&lookup, "CONFIRM_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.flow.confirm_delay),
            cancel_delay: parse_var(&lookup, "CANCEL_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.flow.cancel_delay),
            // Set but empty disables the greeting
            greeting: match lookup("ASSISTANT_GREETING") {
                Some(g) if g.trim().is_empty() => None,
                Some(g) => Some(g),
                None => defaults.flow.greeting,
            },
        };

        let port = match parse_var(&lookup, "PORT")? {
            Some(port) => port,
            None => parse_var(&lookup, "API_PORT")?.unwrap_or(defaults.port),
        };

        Ok(Self { gemini, flow, port })
    }

    pub fn has_api_key(&self) -> bool {
        let key = self.gemini.api_key.trim();
        !key.is_empty() && key != "your_gemini_api_key_here"
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AssistantError::ConfigError(format!("{}={}: {}", key, raw, e))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.flow.confirm_delay, Duration::from_millis(800));
        assert_eq!(config.flow.cancel_delay, Duration::from_millis(500));
        assert!(config.flow.greeting.is_some());
        assert_eq!(config.gemini.max_output_tokens, None);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("ASSISTANT_TIMEOUT_SECS", "5"),
            ("CONFIRM_DELAY_MS", "10"),
            ("ASSISTANT_GREETING", ""),
            ("API_PORT", "9090"),
            ("GEMINI_MAX_OUTPUT_TOKENS", "8192"),
        ])
        .unwrap();

        assert!(config.has_api_key());
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.flow.request_timeout, Duration::from_secs(5));
        assert_eq!(config.gemini.timeout, Duration::from_secs(5));
        assert_eq!(config.flow.confirm_delay, Duration::from_millis(10));
        assert!(config.flow.greeting.is_none());
        assert_eq!(config.port, 9090);
        assert_eq!(config.gemini.max_output_tokens, Some(8192));
    }

    #[test]
    fn test_port_takes_precedence() {
        let config = config_from(&[("PORT", "3000"), ("API_PORT", "9090")]).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_number() {
        let result = config_from(&[("CONFIRM_DELAY_MS", "soon")]);
        assert!(matches!(result, Err(AssistantError::ConfigError(_))));
    }
}
