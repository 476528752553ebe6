//! Environment-driven configuration.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Intake service endpoints and credentials.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Authentication endpoint (username/password → bearer token).
    pub auth_url: String,
    /// Survey intake endpoint (POST SubmissionDocument as JSON).
    pub submit_url: String,
    pub username: String,
    pub password: SecretString,
    /// TLS certificate verification. On by default; disabling it is an
    /// explicit opt-out for broken internal deployments.
    pub verify_tls: bool,
    /// Per-request timeout for both intake calls.
    pub request_timeout: Duration,
}

/// Tunables for the survey engine itself.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    /// Maximum free-text answer length, in characters.
    pub max_text_len: usize,
    /// Delimiter used to join finalized multi-select answers.
    pub multi_delimiter: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            max_text_len: 1000,
            multi_delimiter: ", ".to_string(),
        }
    }
}

/// Full bot configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token. When absent the bot runs on the CLI channel
    /// (local testing).
    pub bot_token: Option<String>,
    /// Telegram usernames/ids allowed to talk to the bot. `*` = anyone.
    pub allowed_users: Vec<String>,
    pub intake: IntakeConfig,
    pub survey: SurveyConfig,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Missing intake credentials or endpoints are a startup failure.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("SURVEY_BOT_TOKEN").ok();

        let allowed_users = std::env::var("SURVEY_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let intake = IntakeConfig {
            auth_url: required("INTAKE_AUTH_URL")?,
            submit_url: required("INTAKE_SUBMIT_URL")?,
            username: required("INTAKE_USERNAME")?,
            password: SecretString::from(required("INTAKE_PASSWORD")?),
            verify_tls: parse_bool(
                "INTAKE_VERIFY_TLS",
                &std::env::var("INTAKE_VERIFY_TLS").unwrap_or_else(|_| "true".to_string()),
            )?,
            request_timeout: Duration::from_secs(parse_u64(
                "INTAKE_TIMEOUT_SECS",
                &std::env::var("INTAKE_TIMEOUT_SECS").unwrap_or_else(|_| "15".to_string()),
            )?),
        };

        let survey = SurveyConfig {
            max_text_len: parse_u64(
                "SURVEY_MAX_TEXT_LEN",
                &std::env::var("SURVEY_MAX_TEXT_LEN").unwrap_or_else(|_| "1000".to_string()),
            )? as usize,
            multi_delimiter: std::env::var("SURVEY_MULTI_DELIMITER")
                .unwrap_or_else(|_| ", ".to_string()),
        };

        Ok(Self {
            bot_token,
            allowed_users,
            intake,
            survey,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected an integer: {e}"),
    })
}
