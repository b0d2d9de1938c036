use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::Deserialize;

use super::{Ephemeris, EphemerisError, FieldOfView, ROOT_FRAME};
use crate::time;

const MAX_CHAIN_DEPTH: usize = 32;

// ---- Resource file layout ----

#[derive(Debug, Default, Deserialize)]
struct ResourceFile {
    #[serde(default)]
    frames: Vec<FrameEntry>,
    #[serde(default)]
    bodies: Vec<BodyEntry>,
    #[serde(default)]
    instruments: Vec<InstrumentEntry>,
}

#[derive(Debug, Deserialize)]
struct FrameEntry {
    name: String,
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    orientation: Option<OrientationEntry>,
}

/// Quaternions are `[w, x, y, z]` and rotate vectors from the frame into
/// `relative_to`.
#[derive(Debug, Deserialize)]
struct OrientationEntry {
    #[serde(default = "root_frame")]
    relative_to: String,
    #[serde(default)]
    fixed: Option<[f64; 4]>,
    #[serde(default)]
    samples: Vec<QuaternionSample>,
}

#[derive(Debug, Deserialize)]
struct QuaternionSample {
    time: String,
    quaternion: [f64; 4],
}

#[derive(Debug, Deserialize)]
struct BodyEntry {
    name: String,
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    radii: Option<[f64; 3]>,
    #[serde(default)]
    trajectory: Option<TrajectoryEntry>,
}

/// Positions of the body relative to `center`, in the root frame.
#[derive(Debug, Deserialize)]
struct TrajectoryEntry {
    center: String,
    samples: Vec<PositionSample>,
}

#[derive(Debug, Deserialize)]
struct PositionSample {
    time: String,
    position: [f64; 3],
}

#[derive(Debug, Deserialize)]
struct InstrumentEntry {
    #[serde(default)]
    name: Option<String>,
    id: i32,
    frame: String,
    boresight: [f64; 3],
    #[serde(default)]
    bounds: Vec<[f64; 3]>,
}

fn root_frame() -> String {
    ROOT_FRAME.to_string()
}

// ---- In-memory tables ----

#[derive(Debug, Clone)]
struct Track<T> {
    times: Vec<f64>,
    values: Vec<T>,
}

impl<T: Copy> Track<T> {
    fn new(mut samples: Vec<(f64, T)>) -> Result<Self, String> {
        if samples.is_empty() {
            return Err("empty sample list".to_string());
        }
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        if samples.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err("duplicate sample times".to_string());
        }
        let (times, values) = samples.into_iter().unzip();
        Ok(Self { times, values })
    }

    /// Neighbouring samples around `et` and the fraction between them.
    fn bracket(&self, et: f64) -> Option<(T, T, f64)> {
        let first = *self.times.first()?;
        let last = *self.times.last()?;
        if et < first || et > last {
            return None;
        }
        if self.times.len() == 1 {
            return Some((self.values[0], self.values[0], 0.0));
        }
        let upper = self.times.partition_point(|t| *t <= et);
        let i = upper.saturating_sub(1).min(self.times.len() - 2);
        let fraction = (et - self.times[i]) / (self.times[i + 1] - self.times[i]);
        Some((self.values[i], self.values[i + 1], fraction))
    }
}

#[derive(Debug, Clone)]
enum Attitude {
    Fixed(UnitQuaternion<f64>),
    Sampled(Track<UnitQuaternion<f64>>),
}

#[derive(Debug, Clone)]
struct OrientationSegment {
    parent: String,
    attitude: Attitude,
}

impl OrientationSegment {
    fn at(&self, et: f64) -> Option<UnitQuaternion<f64>> {
        match &self.attitude {
            Attitude::Fixed(q) => Some(*q),
            Attitude::Sampled(track) => {
                let (a, b, t) = track.bracket(et)?;
                Some(a.try_slerp(&b, t, 1e-12).unwrap_or(if t < 0.5 { a } else { b }))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct TrajectorySegment {
    center: String,
    track: Track<Vector3<f64>>,
}

impl TrajectorySegment {
    fn at(&self, et: f64) -> Option<Vector3<f64>> {
        let (a, b, t) = self.track.bracket(et)?;
        Some(a + (b - a) * t)
    }
}

#[derive(Debug, Clone, Default)]
struct BodyTable {
    radii: Option<[f64; 3]>,
    trajectory: Vec<TrajectorySegment>,
}

/// Ephemeris service backed by YAML resource tables.
///
/// Later loads take precedence: a redefined name or id replaces the earlier
/// entry, and time-sampled segments are searched newest first. A file that
/// fails to load leaves the tables untouched.
#[derive(Debug, Clone, Default)]
pub struct TabulatedEphemeris {
    loaded: Vec<PathBuf>,
    ids: HashMap<String, i32>,
    names: HashMap<i32, String>,
    orientations: HashMap<String, Vec<OrientationSegment>>,
    bodies: HashMap<String, BodyTable>,
    instruments: HashMap<i32, FieldOfView>,
}

fn key(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

fn unit_quaternion(q: [f64; 4]) -> Result<UnitQuaternion<f64>, String> {
    let raw = Quaternion::new(q[0], q[1], q[2], q[3]);
    if !(raw.norm() > 0.0) {
        return Err(format!("degenerate quaternion {:?}", q));
    }
    Ok(UnitQuaternion::from_quaternion(raw))
}

impl TabulatedEphemeris {
    pub fn new() -> Self {
        Self::default()
    }

    fn merge(&mut self, file: ResourceFile) -> Result<(), String> {
        for frame in file.frames {
            let name = key(&frame.name);
            if let Some(id) = frame.id {
                self.register(&name, id);
            }
            if let Some(orientation) = frame.orientation {
                let segment = parse_orientation(orientation)?;
                self.orientations.entry(name).or_default().push(segment);
            }
        }

        for body in file.bodies {
            let name = key(&body.name);
            if let Some(id) = body.id {
                self.register(&name, id);
            }
            let table = self.bodies.entry(name.clone()).or_default();
            if body.radii.is_some() {
                table.radii = body.radii;
            }
            if let Some(trajectory) = body.trajectory {
                let center = key(&trajectory.center);
                let samples = trajectory
                    .samples
                    .into_iter()
                    .map(|s| {
                        parse_sample_time(&s.time).map(|et| (et, Vector3::from(s.position)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let track = Track::new(samples).map_err(|e| format!("{}: {}", name, e))?;
                table.trajectory.push(TrajectorySegment {
                    center: center.clone(),
                    track,
                });
                self.bodies.entry(center).or_default();
            }
        }

        for instrument in file.instruments {
            if let Some(name) = &instrument.name {
                self.register(&key(name), instrument.id);
            }
            self.instruments.insert(
                instrument.id,
                FieldOfView {
                    frame: key(&instrument.frame),
                    boresight: Vector3::from(instrument.boresight),
                    bounds: instrument.bounds.into_iter().map(Vector3::from).collect(),
                },
            );
        }

        Ok(())
    }

    fn register(&mut self, name: &str, id: i32) {
        self.ids.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
    }

    /// Rotation from `frame` into the root frame.
    fn to_root(&self, frame: &str, et: f64, depth: usize) -> Result<UnitQuaternion<f64>, EphemerisError> {
        if frame == ROOT_FRAME {
            return Ok(UnitQuaternion::identity());
        }
        if depth >= MAX_CHAIN_DEPTH {
            return Err(EphemerisError::FrameChain(frame.to_string()));
        }
        let segments = self
            .orientations
            .get(frame)
            .ok_or_else(|| EphemerisError::UnknownFrame(frame.to_string()))?;

        let (parent, q) = segments
            .iter()
            .rev()
            .find_map(|s| s.at(et).map(|q| (s.parent.as_str(), q)))
            .ok_or_else(|| EphemerisError::NoCoverage {
                kind: "orientation",
                name: frame.to_string(),
                et,
            })?;

        Ok(self.to_root(parent, et, depth + 1)? * q)
    }

    /// Position of `body` relative to the origin of the tabulated system.
    fn absolute(&self, body: &str, et: f64, depth: usize) -> Result<Vector3<f64>, EphemerisError> {
        if depth >= MAX_CHAIN_DEPTH {
            return Err(EphemerisError::FrameChain(body.to_string()));
        }
        let table = self
            .bodies
            .get(body)
            .ok_or_else(|| EphemerisError::UnknownBody(body.to_string()))?;
        if table.trajectory.is_empty() {
            return Ok(Vector3::zeros());
        }

        let (center, offset) = table
            .trajectory
            .iter()
            .rev()
            .find_map(|s| s.at(et).map(|p| (s.center.as_str(), p)))
            .ok_or_else(|| EphemerisError::NoCoverage {
                kind: "trajectory",
                name: body.to_string(),
                et,
            })?;

        Ok(self.absolute(center, et, depth + 1)? + offset)
    }
}

fn parse_sample_time(text: &str) -> Result<f64, String> {
    time::parse_utc(text)
        .map(|dt| time::to_et(&dt))
        .ok_or_else(|| format!("invalid sample time '{}'", text))
}

fn parse_orientation(entry: OrientationEntry) -> Result<OrientationSegment, String> {
    let attitude = match (entry.fixed, entry.samples.is_empty()) {
        (Some(q), true) => Attitude::Fixed(unit_quaternion(q)?),
        (None, false) => {
            let samples = entry
                .samples
                .into_iter()
                .map(|s| Ok((parse_sample_time(&s.time)?, unit_quaternion(s.quaternion)?)))
                .collect::<Result<Vec<_>, String>>()?;
            Attitude::Sampled(Track::new(samples)?)
        }
        _ => return Err("orientation needs exactly one of 'fixed' or 'samples'".to_string()),
    };
    Ok(OrientationSegment {
        parent: key(&entry.relative_to),
        attitude,
    })
}

impl Ephemeris for TabulatedEphemeris {
    fn load(&mut self, path: &Path) -> Result<(), EphemerisError> {
        if !path.exists() {
            return Err(EphemerisError::MissingResource(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| EphemerisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |message: String| EphemerisError::InvalidResource {
            path: path.to_path_buf(),
            message,
        };
        let file: ResourceFile = serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;

        let mut staged = self.clone();
        staged.merge(file).map_err(invalid)?;
        staged.loaded.push(path.to_path_buf());
        *self = staged;

        log::debug!("Loaded ephemeris resource {}", path.display());
        Ok(())
    }

    fn unload_all(&mut self) {
        *self = Self::default();
    }

    fn loaded_resources(&self) -> &[PathBuf] {
        &self.loaded
    }

    fn time_to_internal(&self, iso: &str) -> Result<f64, EphemerisError> {
        time::parse_utc(iso)
            .map(|dt| time::to_et(&dt))
            .ok_or_else(|| EphemerisError::InvalidTime(iso.to_string()))
    }

    fn frame_name_to_id(&self, name: &str) -> Result<i32, EphemerisError> {
        self.ids
            .get(&key(name))
            .copied()
            .ok_or_else(|| EphemerisError::UnknownFrame(name.trim().to_string()))
    }

    fn frame_id_to_name(&self, id: i32) -> Result<String, EphemerisError> {
        self.names
            .get(&id)
            .cloned()
            .ok_or(EphemerisError::UnknownId(id))
    }

    fn field_of_view(&self, instrument_id: i32) -> Result<FieldOfView, EphemerisError> {
        self.instruments
            .get(&instrument_id)
            .cloned()
            .ok_or(EphemerisError::UnknownInstrument(instrument_id))
    }

    fn rotation(&self, from: &str, to: &str, et: f64) -> Result<Rotation3<f64>, EphemerisError> {
        let from_root = self.to_root(&key(from), et, 0)?;
        let to_root = self.to_root(&key(to), et, 0)?;
        Ok((to_root.inverse() * from_root).to_rotation_matrix())
    }

    fn position(
        &self,
        body: &str,
        et: f64,
        frame: &str,
        observer: &str,
    ) -> Result<Vector3<f64>, EphemerisError> {
        let relative = self.absolute(&key(body), et, 0)? - self.absolute(&key(observer), et, 0)?;
        let frame_to_root = self.to_root(&key(frame), et, 0)?;
        Ok(frame_to_root.inverse_transform_vector(&relative))
    }

    fn body_mean_radius(&self, body: &str) -> Result<f64, EphemerisError> {
        let name = key(body);
        let table = self
            .bodies
            .get(&name)
            .ok_or_else(|| EphemerisError::UnknownBody(name.clone()))?;
        let radii = table.radii.ok_or(EphemerisError::NoRadii(name))?;
        Ok(radii.iter().sum::<f64>() / 3.0)
    }
}
