use std::collections::HashMap;

use nalgebra::Vector3;

use super::instrument::{self, ResolvedInstrument};
use super::{apparent_size, GeometryError, SamplePolicy, SampleTime};
use crate::catalog::ViewRecord;
use crate::ephemeris::{Ephemeris, FieldOfView, ResourceManager, ResourceWindow};
use crate::label::ObservationRecord;
use crate::mission::{InstrumentTables, MissionProfile};

const SUN: &str = "SUN";

/// Instrument-frame axis projected into the image plane as "up".
const UP_REFERENCE: Vector3<f64> = Vector3::new(1.0, 0.0, 0.0);

/// Below this norm a direction is considered lost to cancellation.
const MIN_NORM: f64 = 1e-12;

/// Everything resolved for one observation before its vectors are computed.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub sample: SampleTime,
    pub et: f64,
    pub instrument: ResolvedInstrument,
    pub fov: FieldOfView,
}

pub struct GeometryEngine<E: Ephemeris> {
    manager: ResourceManager<E>,
    policy: SamplePolicy,
    instruments: InstrumentTables,
    target_body: String,
    target_frame: String,
    observer: String,
    fov_cache: HashMap<i32, FieldOfView>,
    cached_window: ResourceWindow,
}

impl<E: Ephemeris> GeometryEngine<E> {
    pub fn new(manager: ResourceManager<E>, profile: &MissionProfile, target_frame: &str) -> Self {
        Self {
            manager,
            policy: SamplePolicy::new(profile.end_of_exposure.clone()),
            instruments: profile.instruments.clone(),
            target_body: profile.target.body.clone(),
            target_frame: target_frame.to_string(),
            observer: profile.observer.clone(),
            fov_cache: HashMap::new(),
            cached_window: ResourceWindow::None,
        }
    }

    pub fn policy(&self) -> &SamplePolicy {
        &self.policy
    }

    pub fn manager(&self) -> &ResourceManager<E> {
        &self.manager
    }

    /// Sample time, resource window, instrument and field of view.
    pub fn prepare(&mut self, obs: &ObservationRecord) -> Result<Prepared, GeometryError> {
        let sample = self.policy.sample(obs)?;

        let window = self.manager.ensure_window(&sample.instant)?;
        if window != self.cached_window {
            let loaded = self.manager.last_report().map_or(0, |r| r.loaded());
            log::info!(
                "{}: resource window {} at {} ({} resources loaded)",
                obs.name,
                window,
                sample.ti,
                loaded
            );
            self.fov_cache.clear();
            self.cached_window = window;
        }

        let ephemeris = self.manager.ephemeris();
        let instrument = instrument::resolve(&obs.instrument, &self.instruments, ephemeris)
            .ok_or_else(|| GeometryError::UnresolvedInstrument {
                name: obs.name.clone(),
                identity: instrument::describe(&obs.instrument),
            })?;

        let fov = match self.fov_cache.get(&instrument.id) {
            Some(fov) => fov.clone(),
            None => {
                let fov = ephemeris.field_of_view(instrument.id)?;
                self.fov_cache.insert(instrument.id, fov.clone());
                fov
            }
        };

        let et = sample.et(&obs.start_time, ephemeris)?;
        Ok(Prepared {
            sample,
            et,
            instrument,
            fov,
        })
    }

    /// Estimated target diameter in pixels, `None` when it cannot be known.
    pub fn apparent_size_px(&self, prepared: &Prepared, resolution: u32) -> Result<Option<f64>, GeometryError> {
        let Some(scale) = apparent_size::pixel_scale(&prepared.fov, resolution) else {
            return Ok(None);
        };
        let ephemeris = self.manager.ephemeris();
        let range = ephemeris
            .position(&self.observer, prepared.et, &self.target_frame, &self.target_body)?
            .norm();
        let radius = ephemeris.body_mean_radius(&self.target_body)?;
        Ok(apparent_size::diameter_px(range, radius, scale))
    }

    pub fn view(&self, obs: &ObservationRecord, prepared: &Prepared) -> Result<ViewRecord, GeometryError> {
        let ephemeris = self.manager.ephemeris();
        let et = prepared.et;
        let rotation = ephemeris.rotation(&prepared.fov.frame, &self.target_frame, et)?;

        let degenerate = |what| GeometryError::Degenerate {
            name: obs.name.clone(),
            what,
        };

        let sight = (rotation * prepared.fov.boresight)
            .try_normalize(MIN_NORM)
            .ok_or_else(|| degenerate("sight"))?;

        // One Gram-Schmidt step against the sight vector.
        let reference = rotation * UP_REFERENCE;
        let up = (reference - reference.dot(&sight) * sight)
            .try_normalize(MIN_NORM)
            .ok_or_else(|| degenerate("up"))?;

        let sun = ephemeris.position(SUN, et, &self.target_frame, &self.target_body)?;
        let spacecraft = ephemeris.position(&self.observer, et, &self.target_frame, &self.target_body)?;

        Ok(ViewRecord::new(
            obs.name.clone(),
            prepared.sample.ti.clone(),
            sight,
            up,
            sun,
            spacecraft,
        ))
    }

    /// Unload every resource; the next observation starts from a fresh window.
    pub fn release(&mut self) {
        self.manager.reset();
        self.fov_cache.clear();
        self.cached_window = ResourceWindow::None;
    }
}
