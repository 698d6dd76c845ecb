use crate::data_types::BucketCoord;
use crate::pipeline::LayerId;

/// Why a data replacement was rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InvalidDataReason {
    #[error("coordinate count {coords} does not match value count {values}")]
    LengthMismatch { coords: usize, values: usize },
    #[error("no-data value at sorted index {index}")]
    NoDataValue { index: usize },
    #[error("values are not sorted ascending at index {index}")]
    Unsorted { index: usize },
    #[error("bucket {coord:?} lies outside the division grid")]
    CoordinateOutOfRange { coord: BucketCoord },
    #[error("grid row {row} has {len} entries, expected {expected}")]
    RaggedGrid { row: usize, len: usize, expected: usize },
    #[error("grid has {len} values, expected {expected}")]
    WrongLength { len: usize, expected: usize },
    #[error("grid has a zero division count")]
    EmptyDivisions,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum HeatmapError {
    #[error("invalid heatmap data: {0}")]
    InvalidData(#[from] InvalidDataReason),
    #[error("background task failed for layer {layer:?}: {message}")]
    TaskFailed { layer: LayerId, message: String },
    #[error("pipeline for layer {layer:?} has failed and accepts no more work")]
    PipelineFailed { layer: LayerId },
    #[error("update pipeline is shut down")]
    PipelineClosed,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("data frame error: {0}")]
    DataFrame(String),
}

pub type Result<T, E = HeatmapError> = std::result::Result<T, E>;
