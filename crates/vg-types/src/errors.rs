use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the VolGuard system
#[derive(Error, Debug)]
pub enum VgError {
    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Invalid volatility forecast {value} on {date}: must be finite and > 0")]
    InvalidVolatility { date: NaiveDate, value: f64 },

    #[error("Misaligned series: {message}")]
    MisalignedSeries { message: String },

    #[error("Insufficient sample for {context}: required {required} observations, got {actual}")]
    InsufficientSample {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VgError {
    pub fn insufficient_sample(context: impl Into<String>, required: usize, actual: usize) -> Self {
        VgError::InsufficientSample {
            context: context.into(),
            required,
            actual,
        }
    }

    pub fn misaligned(message: impl Into<String>) -> Self {
        VgError::MisalignedSeries {
            message: message.into(),
        }
    }
}

/// Result type alias for VolGuard operations
pub type VgResult<T> = Result<T, VgError>;

/// Macro for creating invalid-parameter errors
#[macro_export]
macro_rules! invalid_parameter {
    ($parameter:expr, $($arg:tt)*) => {
        $crate::VgError::InvalidParameter {
            parameter: $parameter.to_string(),
            message: format!($($arg)*),
        }
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::VgError::Config(format!($($arg)*))
    };
}
