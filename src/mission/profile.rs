use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{MissionError, TimeRanges};
use crate::ephemeris::Window;
use crate::label::LabelConfig;

/// Everything mission-specific the pipeline needs: where labels keep their
/// fields, which body is observed from where, and the curated tables.
#[derive(Debug, Clone, Deserialize)]
pub struct MissionProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub label: LabelConfig,
    pub target: TargetConfig,
    /// Spacecraft body name.
    pub observer: String,
    pub nominal_resolution: u32,
    pub default_output: PathBuf,
    #[serde(default)]
    pub instruments: InstrumentTables,
    #[serde(default)]
    pub windows: Vec<Window>,
    #[serde(default)]
    pub end_of_exposure: Option<EndOfExposure>,
    #[serde(default)]
    pub exclude: Exclusions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub body: String,
    /// Default body-fixed output frame.
    pub frame: String,
    /// Case-insensitive substring the label's target name must contain.
    pub name_contains: String,
    #[serde(default)]
    pub required_type: Option<String>,
}

/// Fallback tables from label instrument codes to frame names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstrumentTables {
    #[serde(default)]
    pub codes: BTreeMap<String, String>,
    #[serde(default)]
    pub categories: BTreeMap<i64, String>,
}

impl InstrumentTables {
    pub fn frame_for_code(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        self.codes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(code))
            .map(|(_, frame)| frame.as_str())
    }

    pub fn frame_for_category(&self, category: i64) -> Option<&str> {
        self.categories.get(&category).map(String::as_str)
    }
}

/// Frames whose name contains `name_pattern` (case-insensitive) and whose
/// start falls in `ranges` are sampled at the end of the exposure.
#[derive(Debug, Clone, Deserialize)]
pub struct EndOfExposure {
    pub name_pattern: String,
    #[serde(default)]
    pub ranges: TimeRanges,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub names: BTreeSet<String>,
    #[serde(default)]
    pub date_ranges: TimeRanges,
}

impl MissionProfile {
    pub fn from_file(path: &Path) -> Result<Self, MissionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, MissionError> {
        let profile: MissionProfile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), MissionError> {
        let invalid = |reason: &str| MissionError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("empty mission name"));
        }
        if self.label.extensions.is_empty() {
            return Err(invalid("no label extensions"));
        }
        if self.nominal_resolution == 0 {
            return Err(invalid("nominal_resolution must be positive"));
        }
        if self.target.name_contains.trim().is_empty() {
            return Err(invalid("empty target name substring"));
        }
        if let Some(eoe) = &self.end_of_exposure {
            if eoe.name_pattern.trim().is_empty() {
                return Err(invalid("empty end-of-exposure name pattern"));
            }
        }

        let mut seen = HashSet::new();
        for window in &self.windows {
            if !seen.insert(window.name.as_str()) {
                return Err(invalid(&format!("duplicate window '{}'", window.name)));
            }
        }
        if self.windows.iter().filter(|w| w.starts_at.is_none()).count() > 1 {
            return Err(invalid("more than one window without starts_at"));
        }
        Ok(())
    }

    /// Windows with relative resource paths resolved against `root`.
    pub fn windows_under(&self, root: &Path) -> Vec<Window> {
        self.windows
            .iter()
            .cloned()
            .map(|mut w| {
                for resource in &mut w.resources {
                    if resource.path.is_relative() {
                        resource.path = root.join(&resource.path);
                    }
                }
                w
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Profile matching the tabulated test scene: a small body observed by
    /// `PROBE` through `PROBE_CAM`.
    pub(crate) const SCENE_PROFILE: &str = r#"
name: scene
label:
  format: pds4
  extensions: [xml]
  frame_name_field: Observation_Information/naif_instrument_name
  exposure_field: Exposure/exposure_duration
target:
  body: TARGET
  frame: TARGET_FIXED
  name_contains: 67P
observer: PROBE
nominal_resolution: 1024
default_output: views.json
instruments:
  codes:
    CAM: PROBE_CAM
end_of_exposure:
  name_pattern: tvf
  ranges:
    - ["2020-01-01T00:00:00Z", "2020-01-01T00:00:30Z"]
exclude:
  names: [excluded_frame]
  date_ranges:
    - ["2020-01-01T00:01:35Z", "2020-01-01T00:01:30Z"]
"#;

    const MINIMAL: &str = r#"
name: test-mission
label:
  format: pds4
  extensions: [xml]
target:
  body: RYUGU
  frame: RYUGU_FIXED
  name_contains: RYUGU
observer: HAYABUSA2
nominal_resolution: 1024
default_output: out.json
instruments:
  codes:
    ONC-T: HAYABUSA2_ONC-T
  categories:
    2: ORX_OCAMS_POLYCAM
windows:
  - name: late
    starts_at: 2016-06-01T00:00:00Z
    resources:
      - path: late.yaml
      - path: /abs/required.yaml
        required: true
"#;

    #[test]
    fn minimal_profile_uses_defaults() {
        let profile = MissionProfile::from_str(MINIMAL).unwrap();
        assert_eq!(profile.label.image_extension, "fits");
        assert_eq!(profile.label.instrument_fields, vec!["instrument_id"]);
        assert!(profile.end_of_exposure.is_none());
        assert!(profile.exclude.names.is_empty());
        assert_eq!(profile.instruments.frame_for_code(" onc-t "), Some("HAYABUSA2_ONC-T"));
        assert_eq!(profile.instruments.frame_for_category(2), Some("ORX_OCAMS_POLYCAM"));
        assert_eq!(profile.instruments.frame_for_category(0), None);
    }

    #[test]
    fn relative_window_resources_resolve_against_root() {
        let profile = MissionProfile::from_str(MINIMAL).unwrap();
        let windows = profile.windows_under(Path::new("/kernels"));
        assert_eq!(windows[0].resources[0].path, PathBuf::from("/kernels/late.yaml"));
        assert_eq!(windows[0].resources[1].path, PathBuf::from("/abs/required.yaml"));
        assert!(windows[0].resources[1].required);
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        let zero = MINIMAL.replace("nominal_resolution: 1024", "nominal_resolution: 0");
        assert!(matches!(
            MissionProfile::from_str(&zero),
            Err(MissionError::Invalid { .. })
        ));

        let bad_range = format!(
            "{}exclude:\n  date_ranges:\n    - [\"2019-01-01\", \"soon\"]\n",
            MINIMAL
        );
        assert!(matches!(
            MissionProfile::from_str(&bad_range),
            Err(MissionError::Yaml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mission.yaml");
        fs::write(&path, MINIMAL).unwrap();
        assert_eq!(MissionProfile::from_file(&path).unwrap().name, "test-mission");
        assert!(matches!(
            MissionProfile::from_file(&dir.path().join("nope.yaml")),
            Err(MissionError::Io(_))
        ));
    }
}
