//! Mission profiles: the per-mission data the pipeline is parameterised by.

mod builtin;
mod profile;
mod ranges;

use thiserror::Error;

pub use builtin::{builtin, builtin_names};
pub use profile::{EndOfExposure, Exclusions, InstrumentTables, MissionProfile, TargetConfig};
pub use ranges::TimeRanges;

#[cfg(test)]
pub(crate) use profile::tests::SCENE_PROFILE;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid mission profile {name}: {reason}")]
    Invalid { name: String, reason: String },
    #[error("unknown mission '{0}'")]
    Unknown(String),
}
