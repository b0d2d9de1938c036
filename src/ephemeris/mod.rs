//! Ephemeris service seam and the resource-window manager built on it.
//!
//! The pipeline only talks to [`Ephemeris`]; [`TabulatedEphemeris`] is the
//! shipped backend, reading frame, body, instrument and trajectory tables from
//! YAML resource files.

mod error;
mod manager;
mod tabulated;

use std::path::{Path, PathBuf};

use nalgebra::{Rotation3, Vector3};

pub use error::EphemerisError;
pub use manager::{LoadOutcome, LoadReport, Resource, ResourceManager, ResourceWindow, Window};
pub use tabulated::TabulatedEphemeris;

#[cfg(test)]
pub(crate) use tabulated::tests::{scene_ephemeris, SCENE};

/// Name of the inertial root frame every orientation chain ends in.
pub const ROOT_FRAME: &str = "J2000";

/// Instrument field of view in the instrument's own frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOfView {
    pub frame: String,
    pub boresight: Vector3<f64>,
    pub bounds: Vec<Vector3<f64>>,
}

pub trait Ephemeris {
    fn load(&mut self, path: &Path) -> Result<(), EphemerisError>;

    fn unload_all(&mut self);

    fn loaded_resources(&self) -> &[PathBuf];

    fn time_to_internal(&self, iso: &str) -> Result<f64, EphemerisError>;

    fn frame_name_to_id(&self, name: &str) -> Result<i32, EphemerisError>;

    fn frame_id_to_name(&self, id: i32) -> Result<String, EphemerisError>;

    fn field_of_view(&self, instrument_id: i32) -> Result<FieldOfView, EphemerisError>;

    /// Rotation taking vectors expressed in `from` into `to` at `et`.
    fn rotation(&self, from: &str, to: &str, et: f64) -> Result<Rotation3<f64>, EphemerisError>;

    /// Geometric position of `body` relative to `observer`, expressed in
    /// `frame`. No light-time or aberration correction.
    fn position(
        &self,
        body: &str,
        et: f64,
        frame: &str,
        observer: &str,
    ) -> Result<Vector3<f64>, EphemerisError>;

    fn body_mean_radius(&self, body: &str) -> Result<f64, EphemerisError>;
}
