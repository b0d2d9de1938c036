use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use strum_macros::Display;

use super::{Ephemeris, EphemerisError};

/// One resource file of a window. Optional resources are loaded best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Resource {
    pub path: PathBuf,
    #[serde(default)]
    pub required: bool,
}

/// Time-bounded set of resources, active from `starts_at` until the next
/// window begins. A window without `starts_at` covers all earlier time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Window {
    pub name: String,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceWindow {
    None,
    Active { index: usize, name: String },
}

impl fmt::Display for ResourceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceWindow::None => write!(f, "none"),
            ResourceWindow::Active { name, .. } => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LoadOutcome {
    Loaded,
    Missing,
    Failed(String),
}

/// What happened to each resource during the last window transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub window: String,
    pub outcomes: Vec<(PathBuf, LoadOutcome)>,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == LoadOutcome::Loaded)
            .count()
    }
}

/// Owns the ephemeris service and keeps exactly one resource window loaded.
///
/// Windows only move forward in time; callers feed observations in
/// non-decreasing time order and an earlier window is refused.
pub struct ResourceManager<E: Ephemeris> {
    ephemeris: E,
    base: Vec<PathBuf>,
    windows: Vec<Window>,
    active: ResourceWindow,
    last_report: Option<LoadReport>,
}

impl<E: Ephemeris> ResourceManager<E> {
    /// Base resources and required window resources must exist up front.
    pub fn new(ephemeris: E, base: Vec<PathBuf>, mut windows: Vec<Window>) -> Result<Self, EphemerisError> {
        let required = windows
            .iter()
            .flat_map(|w| w.resources.iter())
            .filter(|r| r.required)
            .map(|r| r.path.as_path());
        if let Some(missing) = base.iter().map(PathBuf::as_path).chain(required).find(|p| !p.exists()) {
            return Err(EphemerisError::MissingResource(missing.to_path_buf()));
        }

        if windows.is_empty() {
            windows.push(Window {
                name: "all".to_string(),
                starts_at: None,
                resources: Vec::new(),
            });
        }
        // Open-start windows sort first.
        windows.sort_by_key(|w| w.starts_at);

        Ok(Self {
            ephemeris,
            base,
            windows,
            active: ResourceWindow::None,
            last_report: None,
        })
    }

    /// Index of the last window starting at or before `at`.
    pub fn window_for(&self, at: &DateTime<Utc>) -> usize {
        self.windows
            .iter()
            .rposition(|w| w.starts_at.map_or(true, |start| start <= *at))
            .unwrap_or(0)
    }

    pub fn ensure_window(&mut self, at: &DateTime<Utc>) -> Result<ResourceWindow, EphemerisError> {
        let index = self.window_for(at);
        if let ResourceWindow::Active { index: current, name } = &self.active {
            if *current == index {
                return Ok(self.active.clone());
            }
            if *current > index {
                return Err(EphemerisError::WindowRegression {
                    active: name.clone(),
                    requested: self.windows[index].name.clone(),
                });
            }
        }

        let previous = std::mem::replace(&mut self.active, ResourceWindow::None);
        self.ephemeris.unload_all();

        let window = &self.windows[index];
        let mut outcomes = Vec::new();

        for path in &self.base {
            load_mandatory(&mut self.ephemeris, path)?;
            outcomes.push((path.clone(), LoadOutcome::Loaded));
        }

        for resource in &window.resources {
            if resource.required {
                load_mandatory(&mut self.ephemeris, &resource.path)?;
                outcomes.push((resource.path.clone(), LoadOutcome::Loaded));
                continue;
            }
            let outcome = match self.ephemeris.load(&resource.path) {
                Ok(()) => LoadOutcome::Loaded,
                Err(EphemerisError::MissingResource(_)) => LoadOutcome::Missing,
                Err(e) => LoadOutcome::Failed(e.to_string()),
            };
            match &outcome {
                LoadOutcome::Loaded => {}
                LoadOutcome::Missing => {
                    log::debug!("Optional resource {} not found", resource.path.display())
                }
                LoadOutcome::Failed(reason) => {
                    log::debug!("Optional resource {} failed: {}", resource.path.display(), reason)
                }
            }
            outcomes.push((resource.path.clone(), outcome));
        }

        let report = LoadReport {
            window: window.name.clone(),
            outcomes,
        };
        log::debug!(
            "Resource window {} -> {} ({}/{} resources loaded)",
            previous,
            window.name,
            report.loaded(),
            report.outcomes.len()
        );

        self.active = ResourceWindow::Active {
            index,
            name: window.name.clone(),
        };
        self.last_report = Some(report);
        Ok(self.active.clone())
    }

    pub fn active(&self) -> &ResourceWindow {
        &self.active
    }

    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    pub fn last_report(&self) -> Option<&LoadReport> {
        self.last_report.as_ref()
    }

    /// Release everything so a new run can start from the earliest window.
    pub fn reset(&mut self) {
        self.ephemeris.unload_all();
        self.active = ResourceWindow::None;
        self.last_report = None;
    }
}

fn load_mandatory<E: Ephemeris>(ephemeris: &mut E, path: &Path) -> Result<(), EphemerisError> {
    ephemeris
        .load(path)
        .map_err(|e| EphemerisError::MandatoryResource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{TabulatedEphemeris, SCENE};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        base: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let base = dir.path().join("base.yaml");
            fs::write(&base, SCENE).unwrap();
            Self { dir, base }
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn manager(&self, windows: Vec<Window>) -> ResourceManager<TabulatedEphemeris> {
            ResourceManager::new(TabulatedEphemeris::new(), vec![self.base.clone()], windows).unwrap()
        }
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn split_windows(late: Vec<Resource>) -> Vec<Window> {
        vec![
            Window {
                name: "late".into(),
                starts_at: Some(utc(2016, 6, 1)),
                resources: late,
            },
            Window {
                name: "early".into(),
                starts_at: None,
                resources: Vec::new(),
            },
        ]
    }

    #[test]
    fn no_windows_means_one_implicit_window() {
        let fx = Fixture::new();
        let mut manager = fx.manager(Vec::new());
        assert_eq!(*manager.active(), ResourceWindow::None);

        let window = manager.ensure_window(&utc(2020, 1, 1)).unwrap();
        assert_eq!(window.to_string(), "all");
        assert_eq!(manager.ephemeris().loaded_resources(), &[fx.base.clone()]);

        // Same window again is a no-op.
        manager.ensure_window(&utc(2030, 1, 1)).unwrap();
        assert_eq!(manager.ephemeris().loaded_resources().len(), 1);
    }

    #[test]
    fn windows_advance_and_never_regress() {
        let fx = Fixture::new();
        let extra = fx.file("late.yaml", "bodies:\n  - name: EXTRA\n    id: 77\n");
        let mut manager = fx.manager(split_windows(vec![Resource {
            path: extra.clone(),
            required: false,
        }]));

        assert_eq!(manager.ensure_window(&utc(2015, 1, 1)).unwrap().to_string(), "early");
        assert!(manager.ephemeris().frame_name_to_id("EXTRA").is_err());

        assert_eq!(manager.ensure_window(&utc(2016, 6, 1)).unwrap().to_string(), "late");
        assert_eq!(manager.ephemeris().frame_name_to_id("EXTRA").unwrap(), 77);
        assert_eq!(manager.ephemeris().loaded_resources(), &[fx.base.clone(), extra]);

        let err = manager.ensure_window(&utc(2015, 1, 1)).unwrap_err();
        assert!(matches!(err, EphemerisError::WindowRegression { .. }));

        manager.reset();
        assert_eq!(manager.ensure_window(&utc(2015, 1, 1)).unwrap().to_string(), "early");
    }

    #[test]
    fn optional_resources_are_reported_not_fatal() {
        let fx = Fixture::new();
        let broken = fx.file("broken.yaml", "frames: 12\n");
        let absent = fx.dir.path().join("absent.yaml");
        let mut manager = fx.manager(split_windows(vec![
            Resource {
                path: absent.clone(),
                required: false,
            },
            Resource {
                path: broken.clone(),
                required: false,
            },
        ]));

        manager.ensure_window(&utc(2017, 1, 1)).unwrap();
        let report = manager.last_report().unwrap();
        assert_eq!(report.window, "late");
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.outcomes[1], (absent, LoadOutcome::Missing));
        assert!(matches!(report.outcomes[2].1, LoadOutcome::Failed(_)));
    }

    #[test]
    fn missing_mandatory_resources_fail_up_front() {
        let fx = Fixture::new();
        let absent = fx.dir.path().join("absent.yaml");

        let err = ResourceManager::new(TabulatedEphemeris::new(), vec![absent.clone()], Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, EphemerisError::MissingResource(p) if p == absent));

        let windows = split_windows(vec![Resource {
            path: absent,
            required: true,
        }]);
        assert!(ResourceManager::new(TabulatedEphemeris::new(), vec![fx.base.clone()], windows).is_err());
    }

    #[test]
    fn malformed_mandatory_resource_is_fatal() {
        let fx = Fixture::new();
        let broken = fx.file("broken.yaml", "frames: 12\n");
        let mut manager =
            ResourceManager::new(TabulatedEphemeris::new(), vec![broken], Vec::new()).unwrap();

        let err = manager.ensure_window(&utc(2020, 1, 1)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(*manager.active(), ResourceWindow::None);
    }
}
