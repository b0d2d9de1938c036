use thiserror::Error;

use crate::ephemeris::EphemerisError;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid start time '{0}'")]
    InvalidTime(String),
    #[error("unresolved instrument for {name}: {identity}")]
    UnresolvedInstrument { name: String, identity: String },
    #[error("degenerate {what} vector for {name}")]
    Degenerate { name: String, what: &'static str },
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
}

impl GeometryError {
    pub fn is_no_coverage(&self) -> bool {
        matches!(self, GeometryError::Ephemeris(e) if e.is_no_coverage())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, GeometryError::Ephemeris(e) if e.is_fatal())
    }
}
