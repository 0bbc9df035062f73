use serde::{Deserialize, Serialize};

use crate::state::PolarizationState;

/// Where a traced segment ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum SegmentEnd {
    /// Arrives at the component with this id.
    Node(String),
    /// Leaves the bench through an unconnected output.
    Escaped,
    /// Dropped below the minimum trace intensity.
    Extinguished,
    /// Truncated by the maximum trace depth.
    DepthExceeded,
}

/// One edge of the traced light path. Produced once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSegment {
    pub index: usize,
    pub origin: String,
    pub end: SegmentEnd,
    pub state: PolarizationState,
    pub intensity: f64,
    /// Number of components traversed before this segment.
    pub depth: usize,
}

impl LightSegment {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.end, SegmentEnd::Node(_))
    }
}
