use thiserror::Error;

/// Errors returned by fee estimation queries.
///
/// All variants are recoverable by the caller: a smaller confirmation target,
/// a lower success percentage, or simply waiting for more data to accumulate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimatorError {
    /// The requested confirmation window is larger than the range of
    /// confirmation delays the estimator tracks.
    #[error(
        "target confirmation requested ({req_confirms}) higher than maximum \
         confirmation range tracked by estimator ({max_confirms})"
    )]
    TargetConfTooLarge {
        /// Largest confirmation window the estimator can answer for.
        max_confirms: u32,
        /// Confirmation window the caller asked for.
        req_confirms: u32,
    },

    /// Even the highest tracked fee bucket fails the required success
    /// percentage, so no fee rate can be promised at this confidence.
    #[error("no bucket with the minimum required success percentage found")]
    NoSuccessPctBucket,

    /// The selected bucket range holds no confirmed transactions yet.
    #[error("not enough transactions seen for estimation")]
    NotEnoughTxs,
}

/// Type alias for Results in this library.
pub type Result<T> = std::result::Result<T, EstimatorError>;
