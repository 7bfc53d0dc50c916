use serde::{Deserialize, Serialize};

/// Construction parameters for a [`FeeEstimator`](crate::FeeEstimator).
///
/// The configuration is fixed for the lifetime of an estimator: it determines
/// the fee-rate bucket boundaries and the number of confirmation ranges the
/// statistics tables are sized for.
///
/// Fee rates are expressed in atoms per kilobyte, where an atom is the
/// smallest unit of the underlying currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Maximum number of confirmation ranges to track. The final range is a
    /// catch-all for transactions confirming at or beyond this horizon.
    /// Must be at least 2.
    pub max_confirms: u32,

    /// Fee rate of the lowest bucket for which estimation is tracked.
    /// Transactions paying strictly less than this are not recorded.
    /// Must be positive.
    pub min_bucket_fee: u32,

    /// Fee rate bounding bucket generation: buckets are generated while their
    /// upper bound stays below this value. Must be greater than
    /// `min_bucket_fee`.
    pub max_bucket_fee: u32,

    /// Multiplier between consecutive fee rate buckets (each bucket bound is
    /// higher than the previous one by this factor). Must be greater than 1.
    pub fee_rate_step: f64,
}

impl Default for EstimatorConfig {
    /// 32 confirmation ranges and 39 geometric buckets between 10,000 and
    /// 400,000 atoms/kB, plus the unbounded catch-all.
    fn default() -> Self {
        Self {
            max_confirms: 32,
            min_bucket_fee: 10_000,
            max_bucket_fee: 400_000,
            fee_rate_step: 1.1,
        }
    }
}
