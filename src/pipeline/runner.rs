use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{collect_labels, ObservationError, RunError};
use crate::catalog::{self, Catalog};
use crate::ephemeris::{Ephemeris, ResourceManager, TabulatedEphemeris};
use crate::filter::{probe_image, resolution_override, ObservationFilter};
use crate::geometry::{GeometryEngine, GeometryError, SampleTime};
use crate::label::{self, ObservationRecord};
use crate::mission::MissionProfile;

/// Per-run options layered on top of a mission profile.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory tree of labels, or a single label.
    pub input: PathBuf,
    /// Resources loaded for every window.
    pub kernels: Vec<PathBuf>,
    /// Root for relative window resources. Defaults to the directory of the
    /// first kernel.
    pub kernel_root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub target_frame: Option<String>,
    pub sidecar: bool,
    pub target_filter: bool,
    pub min_px: Option<f64>,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>, kernels: Vec<PathBuf>) -> Self {
        Self {
            input: input.into(),
            kernels,
            kernel_root: None,
            output: None,
            target_frame: None,
            sidecar: false,
            target_filter: true,
            min_px: None,
        }
    }

    fn window_root(&self) -> PathBuf {
        self.kernel_root
            .clone()
            .or_else(|| {
                self.kernels
                    .first()
                    .and_then(|k| k.parent())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub accepted: usize,
    pub skipped: usize,
    /// Skip counts keyed by reason.
    pub reasons: BTreeMap<&'static str, usize>,
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl RunSummary {
    fn skip(&mut self, reason: &'static str) {
        self.skipped += 1;
        *self.reasons.entry(reason).or_default() += 1;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        write!(
            f,
            "{} processed, {} accepted, {} skipped -> {} in {}",
            self.processed,
            self.accepted,
            self.skipped,
            self.output.display(),
            humantime::format_duration(elapsed)
        )?;
        if !self.reasons.is_empty() {
            let reasons: Vec<String> = self
                .reasons
                .iter()
                .map(|(reason, count)| format!("{}={}", reason, count))
                .collect();
            write!(f, " ({})", reasons.join(", "))?;
        }
        Ok(())
    }
}

/// Run the whole pipeline against the tabulated ephemeris backend.
pub fn run(profile: &MissionProfile, options: &RunOptions) -> Result<RunSummary, RunError> {
    run_with(TabulatedEphemeris::new(), profile, options)
}

pub fn run_with<E: Ephemeris>(
    ephemeris: E,
    profile: &MissionProfile,
    options: &RunOptions,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let labels = collect_labels(&options.input, &profile.label)?;
    log::info!(
        "Found {} {} labels under {}",
        labels.len(),
        profile.label.format,
        options.input.display()
    );

    let windows = profile.windows_under(&options.window_root());
    let manager = ResourceManager::new(ephemeris, options.kernels.clone(), windows)?;
    let target_frame = options
        .target_frame
        .as_deref()
        .unwrap_or(&profile.target.frame);
    let mut engine = GeometryEngine::new(manager, profile, target_frame);
    let filter = ObservationFilter::new(profile, options.target_filter, options.min_px);

    let mut summary = RunSummary {
        processed: labels.len(),
        accepted: 0,
        skipped: 0,
        reasons: BTreeMap::new(),
        output: options
            .output
            .clone()
            .unwrap_or_else(|| profile.default_output.clone()),
        elapsed: Duration::ZERO,
    };

    // Windows only move forward, so observations are processed in sample order.
    let mut queue = Vec::with_capacity(labels.len());
    for path in &labels {
        let prepared = label::parse(path, &profile.label)
            .map_err(ObservationError::from)
            .and_then(|obs| {
                let sample = engine.policy().sample(&obs)?;
                Ok((obs, sample))
            });
        match prepared {
            Ok(entry) => queue.push(entry),
            Err(e) => {
                log::warn!("[SKIP] {}: {}", path.display(), e);
                summary.skip(e.kind());
            }
        }
    }
    queue.sort_by(|a, b| a.1.instant.cmp(&b.1.instant));

    let mut catalog = Catalog::new();
    for (obs, sample) in &queue {
        match process(&mut engine, &filter, profile, obs, sample, &mut catalog) {
            Ok(resolution) => {
                summary.accepted += 1;
                log::info!(
                    "[OK {}] {} {} {}",
                    summary.accepted,
                    obs.name,
                    sample.ti,
                    resolution.map_or_else(|| "-".to_string(), |r| format!("{}x{}", r, r))
                );
                if options.sidecar {
                    if let Some(view) = catalog.last() {
                        match catalog::write_sidecar(view, &obs.label_path) {
                            Ok(path) => log::debug!("Wrote {}", path.display()),
                            Err(e) => log::warn!("{}: {}", obs.name, e),
                        }
                    }
                }
            }
            Err(ObservationError::Geometry(GeometryError::Ephemeris(e))) if e.is_fatal() => {
                log::error!("{}: {}", obs.name, e);
                engine.release();
                return Err(RunError::Ephemeris(e));
            }
            Err(ObservationError::Filtered(reason)) => {
                log::info!("[SKIP] {} {}", obs.name, reason);
                summary.skip(reason.kind());
            }
            Err(e) => {
                log::warn!("[SKIP] {} at {}: {}", obs.name, sample.ti, e);
                summary.skip(e.kind());
            }
        }
    }

    engine.release();
    let written = catalog.write(&summary.output)?;
    log::debug!("Wrote {} views to {}", written, summary.output.display());
    summary.elapsed = started.elapsed();
    log::info!("{}", summary);
    Ok(summary)
}

/// Filter and compute one observation. Returns the image resolution when an
/// image was checked.
fn process<E: Ephemeris>(
    engine: &mut GeometryEngine<E>,
    filter: &ObservationFilter,
    profile: &MissionProfile,
    obs: &ObservationRecord,
    sample: &SampleTime,
    catalog: &mut Catalog,
) -> Result<Option<u32>, ObservationError> {
    filter.check_exclusions(obs, &sample.start)?;

    let resolution = match &obs.image_reference {
        Some(image) => Some(filter.check_square(probe_image(image)?)?),
        None => None,
    };

    filter.check_target(obs)?;

    let prepared = engine.prepare(obs)?;

    if filter.min_px().is_some() {
        let res = resolution.unwrap_or(profile.nominal_resolution);
        match engine.apparent_size_px(&prepared, res) {
            Ok(px) => filter.check_apparent_size(px)?,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => log::warn!("{}: apparent size unknown, keeping: {}", obs.name, e),
        }
    }

    let mut view = engine.view(obs, &prepared)?;
    view.resolution_override = resolution.and_then(|r| resolution_override(r, profile.nominal_resolution));
    catalog.push(view)?;
    Ok(resolution)
}
