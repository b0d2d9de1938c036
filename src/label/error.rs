use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read label {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {}: {message}", .path.display())]
    Xml { path: PathBuf, message: String },
    #[error("no {field} in label {}", .path.display())]
    MissingField { path: PathBuf, field: &'static str },
    #[error("invalid {field} '{value}' in label {}", .path.display())]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        value: String,
    },
}
