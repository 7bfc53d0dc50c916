use crate::{
    error::{EstimatorError, Result},
    internal::ConfirmStats,
};

/// Buckets are accumulated together until at least this many observations
/// are in play, so sparsely populated buckets cannot decide a success rate
/// on their own.
const MIN_TX_COUNT: f64 = 1.0;

impl ConfirmStats {
    /// Estimates the median fee rate such that at least `success_pct` of the
    /// recorded transactions have been mined, within `target_confirms`
    /// blocks, across every tracked fee bucket paying at least that rate.
    ///
    /// The scan walks fee buckets from the highest to the lowest, growing a
    /// window of buckets and promoting it whenever it meets the success
    /// threshold; the answer is the weighted median fee of the last window
    /// that passed. This picks the cheapest rate that still clears the
    /// threshold. Unconfirmed transactions count against a bucket's total: a
    /// large unmined backlog at a rate is evidence the rate is insufficient.
    pub(crate) fn estimate_median_fee(&self, target_confirms: u32, success_pct: f64) -> Result<f64> {
        assert!(target_confirms >= 1, "target_confirms must be at least 1");

        let max_confirms = self.grid.max_confirms() as u32;
        if target_confirms - 1 >= max_confirms {
            return Err(EstimatorError::TargetConfTooLarge {
                max_confirms,
                req_confirms: target_confirms,
            });
        }

        let slot = self.grid.confirm_slot(i64::from(target_confirms));
        let start = (self.grid.bucket_count() - 1) as isize;

        let mut total_txs = 0.0;
        let mut confirmed_txs = 0.0;
        let mut best_start = start;
        let mut best_end = start;
        let mut cur_end = start;

        let mut b = start;
        while b >= 0 {
            let bucket = b as usize;
            total_txs += self.confirm_count[bucket] + self.mempool.tx_count[[bucket, slot]];
            confirmed_txs += self.confirmed.tx_count[[bucket, slot]];

            if total_txs > MIN_TX_COUNT {
                if confirmed_txs / total_txs < success_pct {
                    if cur_end == start {
                        // Even the highest fee bucket misses the threshold.
                        return Err(EstimatorError::NoSuccessPctBucket);
                    }
                    break;
                }

                best_start = b;
                best_end = cur_end;
                cur_end = b - 1;
                total_txs = 0.0;
                confirmed_txs = 0.0;
            }
            b -= 1;
        }

        self.median_fee_of_range(best_start as usize, best_end as usize)
    }

    /// Size-weighted median fee over a contiguous bucket range, scanning from
    /// the lowest fee bucket up until half the range's transaction weight has
    /// been passed.
    fn median_fee_of_range(&self, lo: usize, hi: usize) -> Result<f64> {
        let mut tx_count: f64 = (lo..=hi).map(|b| self.confirm_count[b]).sum();
        if tx_count <= 0.0 {
            return Err(EstimatorError::NotEnoughTxs);
        }

        tx_count /= 2.0;
        for bucket in lo..=hi {
            if self.confirm_count[bucket] < tx_count {
                tx_count -= self.confirm_count[bucket];
            } else {
                return Ok(self.confirm_fee_sum[bucket] / self.confirm_count[bucket]);
            }
        }

        unreachable!("half the bucket range's weight is always reached before its last bucket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EstimatorConfig, internal::BucketGrid};

    fn stats() -> ConfirmStats {
        ConfirmStats::new(BucketGrid::new(&EstimatorConfig {
            max_confirms: 4,
            min_bucket_fee: 100,
            max_bucket_fee: 400,
            fee_rate_step: 2.0,
        }))
    }

    #[test]
    fn test_target_above_horizon_is_rejected() {
        let stats = stats();
        assert_eq!(
            stats.estimate_median_fee(5, 0.95),
            Err(EstimatorError::TargetConfTooLarge {
                max_confirms: 4,
                req_confirms: 5,
            })
        );
        // The final catch-all slot is still a valid target.
        assert!(matches!(
            stats.estimate_median_fee(4, 0.95),
            Err(EstimatorError::NotEnoughTxs)
        ));
    }

    #[test]
    fn test_empty_tables_have_no_estimate() {
        let stats = stats();
        assert_eq!(
            stats.estimate_median_fee(1, 0.95),
            Err(EstimatorError::NotEnoughTxs)
        );
    }

    #[test]
    fn test_single_bucket_median_is_its_average() {
        let mut stats = stats();
        stats.record_confirmed_tx(1, 250.0);
        stats.record_confirmed_tx(1, 350.0);
        let fee = stats.estimate_median_fee(1, 0.5).unwrap();
        assert_eq!(fee, 300.0);
    }

    #[test]
    fn test_slow_confirmations_fail_fast_targets() {
        let mut stats = stats();
        for _ in 0..5 {
            stats.record_confirmed_tx(4, 250.0);
        }
        assert_eq!(
            stats.estimate_median_fee(1, 0.95),
            Err(EstimatorError::NoSuccessPctBucket)
        );
        // The same data satisfies the horizon it actually confirmed at.
        assert_eq!(stats.estimate_median_fee(4, 0.95).unwrap(), 250.0);
    }

    #[test]
    fn test_mempool_backlog_counts_against_bucket() {
        let mut stats = stats();
        // One confirmed transaction at the top bucket, but a large unmined
        // backlog waiting at the same rate.
        stats.record_confirmed_tx(1, 250.0);
        stats.record_confirmed_tx(1, 250.0);
        for _ in 0..8 {
            stats.record_mempool_tx(2, 250.0);
        }
        stats.advance_block();
        assert_eq!(
            stats.estimate_median_fee(2, 0.95),
            Err(EstimatorError::NoSuccessPctBucket)
        );
    }
}
