use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Why a call to the generation service did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunicationFailure {
    /// The service answered with a non-2xx status.
    Status(u16),
    /// The deadline elapsed before the response was read.
    Timeout,
    /// Connection-level failure (DNS, refused, reset, TLS).
    Network(String),
}

impl CommunicationFailure {
    /// 429 and 5xx are worth one more attempt; so is a dropped connection.
    pub fn is_transient(&self) -> bool {
        match self {
            CommunicationFailure::Status(code) => *code == 429 || (500..=599).contains(code),
            CommunicationFailure::Network(_) => true,
            CommunicationFailure::Timeout => false,
        }
    }
}

impl fmt::Display for CommunicationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommunicationFailure::Status(code) => write!(f, "HTTP status {}", code),
            CommunicationFailure::Timeout => write!(f, "timeout"),
            CommunicationFailure::Network(message) => write!(f, "network failure: {}", message),
        }
    }
}

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid transition: cannot {action} a card that is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Authentication error: {message}")]
    AuthenticationError { message: String },

    #[error("Communication error: {failure}")]
    CommunicationError { failure: CommunicationFailure },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Card not found: {card_id}")]
    NotFound { card_id: Uuid },

    #[error("Card {card_id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        card_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Communication,
    Cancellation,
    Persistence,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CardError {
    pub fn validation(message: impl Into<String>) -> Self {
        CardError::ValidationError {
            message: message.into(),
        }
    }

    pub fn communication(failure: CommunicationFailure) -> Self {
        CardError::CommunicationError { failure }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CardError::ValidationError { .. } | CardError::InvalidTransition { .. } => {
                ErrorCategory::Validation
            }
            CardError::AuthenticationError { .. } => ErrorCategory::Authentication,
            CardError::CommunicationError { .. } => ErrorCategory::Communication,
            CardError::Cancelled => ErrorCategory::Cancellation,
            CardError::NotFound { .. } | CardError::Conflict { .. } => ErrorCategory::Persistence,
            CardError::ConfigError { .. }
            | CardError::MissingConfigError { .. }
            | CardError::InvalidConfigValueError { .. }
            | CardError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            CardError::IoError(_) | CardError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Cancellation => ErrorSeverity::Low,
            ErrorCategory::Communication | ErrorCategory::Persistence => ErrorSeverity::Medium,
            ErrorCategory::Validation | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Only transient communication failures qualify for the orchestrator's retry.
    pub fn is_transient(&self) -> bool {
        match self {
            CardError::CommunicationError { failure } => failure.is_transient(),
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CardError::ValidationError { .. } => "Check the input bounds and try again",
            CardError::InvalidTransition { .. } => {
                "Reload the card; its review status no longer allows this action"
            }
            CardError::AuthenticationError { .. } => "Provide a valid model API key",
            CardError::CommunicationError { failure } if failure.is_transient() => {
                "The generation service is unavailable; try again shortly"
            }
            CardError::CommunicationError { .. } => {
                "Check the generation endpoint and timeout settings"
            }
            CardError::Cancelled => "The request was cancelled; start it again if needed",
            CardError::NotFound { .. } => "Verify the card id and owner",
            CardError::Conflict { .. } => "Reload the card and repeat the action",
            CardError::ConfigError { .. }
            | CardError::MissingConfigError { .. }
            | CardError::InvalidConfigValueError { .. }
            | CardError::ConfigValidationError { .. } => "Fix the configuration file",
            CardError::IoError(_) => "Check file paths and permissions",
            CardError::SerializationError(_) => "Check the JSON input",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => format!("The request was rejected: {}", self),
            ErrorCategory::Authentication => {
                "The model API key was rejected by the generation service".to_string()
            }
            ErrorCategory::Communication => {
                format!("Could not reach the generation service ({})", self)
            }
            ErrorCategory::Cancellation => "The operation was cancelled".to_string(),
            ErrorCategory::Persistence => format!("Could not save the card: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("Unexpected failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
