use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedbiomError {
    #[error("Unknown context: {context}")]
    UnknownContext { context: String },

    #[error("No observations were provided")]
    EmptyInput,

    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Store request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Query,
    Store,
    Configuration,
    System,
}

impl RedbiomError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownContext { .. } | Self::EmptyInput => ErrorCategory::Input,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Store { .. } | Self::Api(_) | Self::Serialization(_) => ErrorCategory::Store,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::Io(_) => ErrorCategory::System,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::UnknownContext { .. } => "check the context name against the contexts in the store",
            Self::EmptyInput => "pass observation ids as arguments or through --from",
            Self::Query { .. } => "see `redbiom search metadata --help` for the query syntax",
            Self::Store { .. } | Self::Api(_) | Self::Serialization(_) => {
                "make sure the webdis host is reachable and serves a redbiom store"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "check --host, REDBIOM_HOST and the configuration file"
            }
            Self::Io(_) => "check that the input file exists and is readable",
        }
    }

    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

pub type Result<T> = std::result::Result<T, RedbiomError>;
