//! Drives labels through filtering and geometry into the catalog.

mod error;
mod inputs;
mod runner;

pub use error::{ObservationError, RunError};
pub use inputs::collect_labels;
pub use runner::{run, run_with, RunOptions, RunSummary};
