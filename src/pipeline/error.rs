use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::ephemeris::EphemerisError;
use crate::filter::{ImageError, Rejection};
use crate::geometry::GeometryError;
use crate::label::ParseError;
use crate::mission::MissionError;

/// Failures that end the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("path must be a directory or a label file: {}", .0.display())]
    InvalidInput(PathBuf),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error("missing mandatory resource: {}", .0.display())]
    MissingResource(PathBuf),
    #[error(transparent)]
    Ephemeris(EphemerisError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<EphemerisError> for RunError {
    fn from(e: EphemerisError) -> Self {
        match e {
            EphemerisError::MissingResource(path) => RunError::MissingResource(path),
            other => RunError::Ephemeris(other),
        }
    }
}

/// Why one observation did not make it into the catalog.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Filtered(#[from] Rejection),
}

impl ObservationError {
    /// Short reason used in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            ObservationError::Filtered(r) => r.kind(),
            ObservationError::Parse(_) => "parse_error",
            ObservationError::Image(ImageError::NotFound(_)) => "missing_image",
            ObservationError::Image(ImageError::Unreadable { .. }) => "unreadable_image",
            ObservationError::Geometry(e) if e.is_no_coverage() => "no_coverage",
            ObservationError::Geometry(GeometryError::UnresolvedInstrument { .. }) => {
                "unresolved_instrument"
            }
            ObservationError::Geometry(_) => "geometry_error",
            ObservationError::Catalog(CatalogError::DuplicateName(_)) => "duplicate_name",
            ObservationError::Catalog(_) => "catalog_error",
        }
    }
}
