use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("no {kind} coverage for {name} at et {et:.3}")]
    NoCoverage {
        kind: &'static str,
        name: String,
        et: f64,
    },
    #[error("unknown frame: {0}")]
    UnknownFrame(String),
    #[error("unknown frame or instrument id: {0}")]
    UnknownId(i32),
    #[error("unknown body: {0}")]
    UnknownBody(String),
    #[error("no body radii for {0}")]
    NoRadii(String),
    #[error("no field of view for instrument {0}")]
    UnknownInstrument(i32),
    #[error("frame chain too deep at {0}")]
    FrameChain(String),
    #[error("invalid time string: {0}")]
    InvalidTime(String),
    #[error("resource not found: {}", .0.display())]
    MissingResource(PathBuf),
    #[error("failed to read resource {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid resource {}: {message}", .path.display())]
    InvalidResource { path: PathBuf, message: String },
    #[error("mandatory resource {} could not be loaded: {reason}", .path.display())]
    MandatoryResource { path: PathBuf, reason: String },
    #[error("window {requested} precedes active window {active}; observations must be time ordered")]
    WindowRegression { active: String, requested: String },
}

impl EphemerisError {
    pub fn is_no_coverage(&self) -> bool {
        matches!(self, EphemerisError::NoCoverage { .. })
    }

    /// Errors that invalidate every later query of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EphemerisError::MandatoryResource { .. })
    }
}
