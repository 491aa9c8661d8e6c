//! Space-colonization growth core.
//!
//! Main components:
//! - [`octree`]: point octree with tombstone removal, nearest and radius queries.
//! - [`field`]: [`GrowthField`], which owns attractors, tips and the index
//!   and advances them one step at a time.
//! - [`phases`]: the attraction, growth and index phases of a step.
//! - [`attractor`] / [`tree`]: attractor points and the append-only tip arena.
//! - [`influence_buffer`]: per-step attractor assignments.
//! - [`config`]: growth parameters and their validation.
//! - [`snapshot`] / [`persist`]: what renderers and persistence layers see.
//! - [`error`]: error types.
//! - [`types`]: shared ids.

pub mod attractor;
pub mod config;
pub mod error;
pub mod field;
pub mod influence_buffer;
pub mod octree;
pub mod persist;
pub mod phases;
pub mod snapshot;
pub mod tree;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, Error, ImportError, IndexError, Result};
pub use field::GrowthField;
pub use persist::{AttractorRecord, FieldRecord, TipRecord};
pub use phases::StepStats;
pub use snapshot::{AttractorSnapshot, StepSnapshot, TipSnapshot};
