//! Inclusion and exclusion rules applied to each observation.

mod probe;

use chrono::{DateTime, Utc};
use strum_macros::IntoStaticStr;
use thiserror::Error;

pub use probe::{probe as probe_image, ImageError};

use crate::label::ObservationRecord;
use crate::mission::{Exclusions, MissionProfile, TargetConfig};

#[cfg(test)]
pub(crate) use probe::tests::write_fits;

/// Why an observation was deliberately left out of the catalog.
#[derive(Debug, Clone, PartialEq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    #[error("in file exclusion list")]
    ExcludedName,
    #[error("in date exclusion list")]
    ExcludedDate,
    #[error("non-square image {width}x{height}")]
    NonSquare { width: u32, height: u32 },
    #[error("no target_name in label")]
    NoTarget,
    #[error("target={name:?} (not {expected})")]
    WrongTarget { name: String, expected: String },
    #[error("target type {found:?} is not {expected}")]
    WrongTargetType {
        found: Option<String>,
        expected: String,
    },
    #[error("target ~{px:.1}px across (< {min} px threshold)")]
    TooSmall { px: f64, min: f64 },
}

impl Rejection {
    /// Stable short name used for the per-reason summary counts.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

pub struct ObservationFilter {
    exclude: Exclusions,
    target: TargetConfig,
    target_filter: bool,
    min_px: Option<f64>,
}

impl ObservationFilter {
    /// `min_px` is only enforced when positive.
    pub fn new(profile: &MissionProfile, target_filter: bool, min_px: Option<f64>) -> Self {
        Self {
            exclude: profile.exclude.clone(),
            target: profile.target.clone(),
            target_filter,
            min_px: min_px.filter(|px| *px > 0.0),
        }
    }

    pub fn check_exclusions(&self, obs: &ObservationRecord, start: &DateTime<Utc>) -> Result<(), Rejection> {
        if self.exclude.names.contains(&obs.name) {
            return Err(Rejection::ExcludedName);
        }
        if self.exclude.date_ranges.contains(start) {
            return Err(Rejection::ExcludedDate);
        }
        Ok(())
    }

    /// Side length of a square image.
    pub fn check_square(&self, (width, height): (u32, u32)) -> Result<u32, Rejection> {
        if width != height {
            return Err(Rejection::NonSquare { width, height });
        }
        Ok(width)
    }

    pub fn check_target(&self, obs: &ObservationRecord) -> Result<(), Rejection> {
        if !self.target_filter {
            return Ok(());
        }
        let name = obs
            .target_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(Rejection::NoTarget)?;

        let expected = self.target.name_contains.trim().to_uppercase();
        if !name.to_uppercase().contains(&expected) {
            return Err(Rejection::WrongTarget {
                name: name.to_string(),
                expected,
            });
        }

        if let Some(required) = &self.target.required_type {
            let found = obs.target_type.as_deref().map(str::trim);
            if !found.is_some_and(|t| t.eq_ignore_ascii_case(required)) {
                return Err(Rejection::WrongTargetType {
                    found: found.map(String::from),
                    expected: required.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn min_px(&self) -> Option<f64> {
        self.min_px
    }

    /// An unknown size never rejects.
    pub fn check_apparent_size(&self, px: Option<f64>) -> Result<(), Rejection> {
        match (self.min_px, px) {
            (Some(min), Some(px)) if px < min => Err(Rejection::TooSmall { px, min }),
            _ => Ok(()),
        }
    }
}

/// `rz` value: only set when the square image is not the nominal size.
pub fn resolution_override(resolution: u32, nominal: u32) -> Option<u32> {
    (resolution != nominal).then_some(resolution)
}
