use crate::config::EstimatorConfig;

/// Coordinate space of the statistics tables: geometrically spaced fee-rate
/// bucket bounds on one axis, a fixed number of confirmation slots on the
/// other.
///
/// Slot `s` represents a confirmation delay of `s + 1` blocks; the final slot
/// catches all larger delays.
#[derive(Debug, Clone)]
pub(crate) struct BucketGrid {
    /// Ascending bucket upper bounds. The final bound is +inf so that every
    /// rate falls in some bucket.
    bounds: Vec<f64>,
    max_confirms: usize,
}

impl BucketGrid {
    /// Builds the grid for the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration cannot produce a finite, non-empty
    /// geometric series of buckets: `max_confirms < 2`, `min_bucket_fee == 0`,
    /// `max_bucket_fee <= min_bucket_fee`, or `fee_rate_step <= 1`.
    pub fn new(config: &EstimatorConfig) -> Self {
        assert!(
            config.max_confirms >= 2,
            "max_confirms must be at least 2, got {}",
            config.max_confirms
        );
        assert!(config.min_bucket_fee > 0, "min_bucket_fee must be positive");
        assert!(
            config.max_bucket_fee > config.min_bucket_fee,
            "max_bucket_fee ({}) must be greater than min_bucket_fee ({})",
            config.max_bucket_fee,
            config.min_bucket_fee
        );
        assert!(
            config.fee_rate_step > 1.0,
            "fee_rate_step must be greater than 1, got {}",
            config.fee_rate_step
        );

        let max = f64::from(config.max_bucket_fee);
        let mut bounds = Vec::new();
        let mut bound = f64::from(config.min_bucket_fee);
        while bound < max {
            bounds.push(bound);
            bound *= config.fee_rate_step;
        }

        // The last bucket catches everything else, so it uses an upper bound
        // of +inf which any rate compares below.
        bounds.push(f64::INFINITY);

        Self {
            bounds,
            max_confirms: config.max_confirms as usize,
        }
    }

    /// Number of fee buckets, including the unbounded catch-all.
    pub fn bucket_count(&self) -> usize {
        self.bounds.len()
    }

    /// Number of confirmation slots.
    pub fn max_confirms(&self) -> usize {
        self.max_confirms
    }

    /// Upper bound of the given bucket, in atoms/kB.
    pub fn bound(&self, bucket: usize) -> f64 {
        self.bounds[bucket]
    }

    /// Lowest tracked fee rate. Rates strictly below this are not recorded.
    pub fn min_tracked_rate(&self) -> f64 {
        self.bounds[0]
    }

    /// Returns the bucket with the smallest upper bound at or above `rate`.
    ///
    /// Rates below the first bound map to bucket 0 and rates above every
    /// finite bound map to the catch-all; callers filter untracked rates
    /// before recording them.
    pub fn lower_bucket(&self, rate: f64) -> usize {
        self.bounds.partition_point(|&bound| bound < rate)
    }

    /// Confirmation slot for a transaction that took `blocks_to_confirm`
    /// blocks to be mined. Delays at or beyond the tracked horizon collapse
    /// into the final slot. `blocks_to_confirm` must be positive.
    pub fn confirm_slot(&self, blocks_to_confirm: i64) -> usize {
        debug_assert!(blocks_to_confirm >= 1);
        usize::min(blocks_to_confirm as usize - 1, self.max_confirms - 1)
    }
}
