use thiserror::Error;

/// Errors raised by oracle queries.
///
/// Zero matches is never an error; queries return an empty list instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    #[error("Conflicting order flags: merged-only and orders-only were both requested")]
    ConflictingOrderFlags,
}

impl OracleError {
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        OracleError::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
