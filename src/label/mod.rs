mod error;
pub mod pds3;
mod pds4;
mod types;

use std::path::Path;

pub use error::ParseError;
pub use types::{InstrumentIdentity, LabelConfig, LabelFormat, ObservationRecord};

/// Parse one label into an observation record.
pub fn parse(path: &Path, config: &LabelConfig) -> Result<ObservationRecord, ParseError> {
    let record = match config.format {
        LabelFormat::Pds3 => pds3::parse(path, config)?,
        LabelFormat::Pds4 => pds4::parse(path, config)?,
    };

    if record.instrument.is_empty() {
        return Err(ParseError::MissingField {
            path: path.to_path_buf(),
            field: "instrument identity",
        });
    }
    Ok(record)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
