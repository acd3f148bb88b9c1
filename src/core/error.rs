use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An input file could not be read or one of its lines could not be decoded.
    Input { path: String, details: String },
    /// An error occurred in the LLM provider.
    LlmProvider { provider: String, details: String },
    /// The provider answered, but not with a leading text segment.
    ResponseShape(String),
    /// Every permitted attempt failed; `last` is the error of the final one.
    RetriesExhausted { attempts: u32, last: Box<Error> },
    /// Appending to the output file failed.
    Output { path: String, details: String },
}

impl Error {
    pub fn input(path: impl AsRef<std::path::Path>, details: impl Into<String>) -> Self {
        Error::Input {
            path: path.as_ref().display().to_string(),
            details: details.into(),
        }
    }

    pub fn output(path: impl AsRef<std::path::Path>, details: impl Into<String>) -> Self {
        Error::Output {
            path: path.as_ref().display().to_string(),
            details: details.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Input { path, details } => write!(f, "Input error ({path}): {details}"),
            Error::LlmProvider { provider, details } => {
                write!(f, "LLM error ({provider}): {details}")
            }
            Error::ResponseShape(msg) => write!(f, "Unexpected response shape: {msg}"),
            Error::RetriesExhausted { attempts, last } => {
                write!(f, "Gave up after {attempts} attempts: {last}")
            }
            Error::Output { path, details } => write!(f, "Output error ({path}): {details}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}
