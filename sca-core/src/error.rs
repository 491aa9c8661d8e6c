//! Error types for the growth core.

use glam::Vec3;
use thiserror::Error;

/// Rejected configuration. Raised by validation, never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("seed_count must be at least 1")]
    ZeroSeeds,

    #[error("attractor_count must be at least 1")]
    ZeroAttractors,

    #[error("invalid {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },
}

/// Spatial index failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("point {point} lies outside the index bounds")]
    OutOfBounds { point: Vec3 },
}

/// A saved forest that cannot be rebuilt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("tip {index} has parent index {parent}, expected -1 or an earlier tip")]
    InvalidParent { index: usize, parent: i64 },
}

/// Main error type for the growth core
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("import error: {0}")]
    Import(#[from] ImportError),
}

pub type Result<T> = std::result::Result<T, Error>;
