#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("landmark coordinate is infinite: {0}")]
    InfiniteCoordinate(f32),

    #[error("failed to convert usize value to landmark kind: {0}")]
    ConvertUSizeToLandmarkKind(usize),

    #[error("failed to convert landmark variant to usize: {0:?}")]
    LandmarkVariantToUSize(crate::landmark::LandmarkKind),

    #[error("history of {capacity} frames can never exceed {bad_limit} bad frames")]
    InvalidHistoryLimits { capacity: usize, bad_limit: usize },

    #[error("failed to open landmark replay: {1:?}")]
    OpenReplay(#[source] std::io::Error, std::path::PathBuf),

    #[error("failed to read landmark replay at line {1}")]
    ReadReplay(#[source] std::io::Error, usize),

    #[error("failed to parse landmark replay at line {1}")]
    ParseReplayLine(#[source] serde_json::Error, usize),

    #[error("failed to serialize diagnostics")]
    SerializeDiagnostics(#[source] serde_json::Error),

    #[error("failed to spawn capture thread")]
    SpawnCapture(#[source] std::io::Error),

    #[error("capture thread panicked")]
    CapturePanicked,

    #[error("pose estimator has no result callback registered")]
    MissingResultCallback,
}
