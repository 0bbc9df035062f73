//! Error types for malformed external input.
//!
//! Numerically degenerate input is never an error; it yields limiting values.
//! Only layouts and snapshots coming from outside the engine can fail.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("layout has no components")]
    Empty,

    #[error("duplicate component id `{0}`")]
    DuplicateId(String),

    #[error("component `{from}` points to unknown component `{to}`")]
    DanglingTarget { from: String, to: String },

    #[error("component `{from}` points into emitter `{to}`")]
    EdgeIntoEmitter { from: String, to: String },

    #[error("component `{id}`: `{field}` must be finite")]
    NonFinite { id: String, field: &'static str },

    #[error("component `{id}`: `{field}` = {value} is outside [0, 1]")]
    OutOfRange {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("sensor `{id}`: angular tolerance {value} is outside [0, 90] degrees")]
    ToleranceOutOfRange { id: String, value: f64 },

    #[error("component `{id}`: `{field}` = {value} must not be negative")]
    Negative {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("component `{id}` ({kind}) has more outputs than it can drive")]
    UnexpectedOutput { id: String, kind: &'static str },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid layout in snapshot: {0}")]
    Layout(#[from] LayoutError),
}
