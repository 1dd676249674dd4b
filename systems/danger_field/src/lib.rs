#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-category danger fields built by chunked multi-source breadth-first search.
//!
//! Every rebuild measures, for each category present in the registry, how many
//! 8-connected steps separate each reachable cell from the nearest entity of a
//! different category. The work is split into bounded steps so a host loop can
//! interleave it with other simulation work, and results are published as an
//! immutable [`DangerFieldSet`] only once every category has finished.

mod builder;
mod field;
mod service;
mod tuning;

pub use builder::{BuildProgress, DangerFieldBuilder, RebuildRequest};
pub use field::{DangerField, DangerFieldSet};
pub use service::{DangerFieldService, ScoreLookup};
pub use tuning::{DangerFieldTuning, TuningError};
