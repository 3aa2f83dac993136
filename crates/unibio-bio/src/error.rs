use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BioError {
    #[error("{what} must not be empty")]
    EmptySequence { what: &'static str },

    #[error("{what} contains invalid characters: {chars} (allowed: ATGCNRYSWKMBDHV)")]
    InvalidSequence { what: &'static str, chars: String },

    #[error("{what} must be at least {min} nt long (got {actual})")]
    TooShort {
        what: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("{what} must be at most {max} nt long (got {actual})")]
    TooLong {
        what: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, BioError>;
