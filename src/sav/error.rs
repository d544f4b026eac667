use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid variable name: {0}")]
    InvalidName(String),

    #[error("Duplicate variable name: {0}")]
    DuplicateName(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Unsupported width {width} for non-string variable {name}: must be at most 40")]
    UnsupportedWidth { name: String, width: i32 },

    #[error("Value label {value:?} on variable {name} is not a number")]
    InvalidValueLabel { name: String, value: String },

    #[error("Variables cannot be added after the first row has been written")]
    PhaseViolation,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
