use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LabelFormat {
    Pds3,
    Pds4,
}

/// Where a mission keeps the fields of an observation in its labels.
///
/// For PDS4 the names are element paths matched by local-name suffix
/// (`Target_Identification/name`); for PDS3 they are keywords.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelConfig {
    pub format: LabelFormat,
    /// Label file extensions to collect, without the dot.
    pub extensions: Vec<String>,
    /// Extension assumed for the image when a PDS4 label names no file.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default)]
    pub frame_name_field: Option<String>,
    #[serde(default)]
    pub instrument_number_field: Option<String>,
    /// Tried in order; the first present value becomes the instrument code.
    #[serde(default = "default_instrument_fields")]
    pub instrument_fields: Vec<String>,
    /// Only consulted when none of `instrument_fields` is present.
    #[serde(default)]
    pub category_field: Option<String>,
    #[serde(default)]
    pub exposure_field: Option<String>,
}

fn default_image_extension() -> String {
    "fits".to_string()
}

fn default_instrument_fields() -> Vec<String> {
    vec!["instrument_id".to_string()]
}

impl LabelConfig {
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Instrument identity as declared by a label. At least one field is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentIdentity {
    pub frame_name: Option<String>,
    pub number: Option<i32>,
    pub code: Option<String>,
    pub category: Option<i64>,
}

impl InstrumentIdentity {
    pub fn is_empty(&self) -> bool {
        self.frame_name.is_none()
            && self.number.is_none()
            && self.code.is_none()
            && self.category.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Image file base name without extension; unique within a run.
    pub name: String,
    pub label_path: PathBuf,
    pub start_time: String,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
    pub instrument: InstrumentIdentity,
    /// Seconds.
    pub exposure_duration: Option<f64>,
    pub image_reference: Option<PathBuf>,
}
