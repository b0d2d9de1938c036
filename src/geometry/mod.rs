//! View geometry: when to sample, which instrument, and the vectors.

mod apparent_size;
mod engine;
mod error;
mod instrument;
mod sampling;

pub use engine::{GeometryEngine, Prepared};
pub use error::GeometryError;
pub use instrument::ResolvedInstrument;
pub use sampling::{SamplePolicy, SampleTime};
