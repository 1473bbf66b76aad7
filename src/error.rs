use thiserror::Error;

#[derive(Error, Debug)]
pub enum QfeverError {
    #[error("invalid simulation parameters: {0}")]
    InvalidParameters(String),

    #[error("{name}={value} outside allowed range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("dataset is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QfeverError {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, QfeverError::Io(_))
    }
}

pub type QfeverResult<T> = Result<T, QfeverError>;
