//! Error types for the survey bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Validation rejection: {0}")]
    Validation(#[from] ValidationRejection),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Configuration-related errors. Fatal at startup: the process must not
/// run with missing credentials or endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A respondent's raw input failed validation.
///
/// Recovered locally: the engine turns each variant into a corrective
/// prompt and leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationRejection {
    #[error("answer is too long: {length} > {max} characters")]
    TooLong { length: usize, max: usize },

    #[error("answer is empty or meaningless after normalization")]
    MeaninglessInput,

    #[error("answer is not one of the offered options")]
    NotInOptionSet,

    #[error("full name does not match the expected shape")]
    InvalidName,

    #[error("numeric identifier must be 1-9 digits")]
    InvalidNumber,

    #[error("multi-select finalized with no options chosen")]
    EmptySelection,
}

/// Session/flow errors. Recovered locally by re-rendering the active prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("input targets a question that is no longer active")]
    StaleInput,

    #[error("no survey in progress for this respondent")]
    NotStarted,
}

/// Intake submission errors. Never fatal to the respondent's experience:
/// the completion acknowledgment is sent regardless and the failure is
/// logged for operational follow-up.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),

    #[error("Authentication against the intake service failed: {0}")]
    AuthFailed(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Intake service returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Intake service response missing record id or message: {0}")]
    InvalidResponse(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
