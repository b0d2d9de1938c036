use chrono::{DateTime, Utc};

use super::GeometryError;
use crate::ephemeris::{Ephemeris, EphemerisError};
use crate::label::ObservationRecord;
use crate::mission::EndOfExposure;
use crate::time;

/// The instant an observation's geometry is evaluated at.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTime {
    pub start: DateTime<Utc>,
    pub instant: DateTime<Utc>,
    /// Seconds added to the start of the exposure.
    pub offset: f64,
    /// Timestamp emitted in the view record.
    pub ti: String,
}

impl SampleTime {
    pub fn at_end_of_exposure(&self) -> bool {
        self.offset != 0.0
    }

    /// Internal ephemeris time of the sample.
    pub fn et<E: Ephemeris>(&self, start_time: &str, ephemeris: &E) -> Result<f64, EphemerisError> {
        Ok(ephemeris.time_to_internal(start_time)? + self.offset)
    }
}

/// Start-of-exposure sampling, except for curated frames sampled at the end.
#[derive(Debug, Clone, Default)]
pub struct SamplePolicy {
    end_of_exposure: Option<EndOfExposure>,
}

impl SamplePolicy {
    pub fn new(end_of_exposure: Option<EndOfExposure>) -> Self {
        Self { end_of_exposure }
    }

    pub fn sample(&self, obs: &ObservationRecord) -> Result<SampleTime, GeometryError> {
        let start = time::parse_utc(&obs.start_time)
            .ok_or_else(|| GeometryError::InvalidTime(obs.start_time.clone()))?;

        match self.end_of_exposure_offset(obs, &start) {
            Some(exposure) => {
                let instant = start + time::duration_from_seconds(exposure);
                Ok(SampleTime {
                    start,
                    instant,
                    offset: exposure,
                    ti: time::format_millis(&instant),
                })
            }
            None => Ok(SampleTime {
                start,
                instant: start,
                offset: 0.0,
                ti: obs.start_time.clone(),
            }),
        }
    }

    fn end_of_exposure_offset(&self, obs: &ObservationRecord, start: &DateTime<Utc>) -> Option<f64> {
        let rule = self.end_of_exposure.as_ref()?;
        let pattern = rule.name_pattern.to_lowercase();
        if !obs.name.to_lowercase().contains(&pattern) || !rule.ranges.contains(start) {
            return None;
        }
        obs.exposure_duration
    }
}
