use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    config::EstimatorConfig,
    error::Result,
    internal::{BucketGrid, ConfirmStats},
    txid::TxId,
};

/// Tracks historical data for published and mined transactions in order to
/// estimate the fee rate needed for confirmation within a target block
/// window.
///
/// The estimator is fed by two event streams from the host node: transactions
/// entering the mempool
/// ([`add_mempool_transaction`](Self::add_mempool_transaction)) and blocks
/// being mined ([`process_block`](Self::process_block)).
/// [`estimate_median_fee`](Self::estimate_median_fee) is a read-only query
/// over the accumulated statistics.
///
/// All state lives in memory and every operation is synchronous; the host is
/// expected to serialize calls on one logical thread or wrap the estimator in
/// a lock of its choice.
///
/// # Example
/// ```
/// use fee_oracle::{FeeEstimator, TxId};
///
/// let mut estimator = FeeEstimator::new();
///
/// // Fed by the host's mempool and block events:
/// let txid = TxId::new([1; 32]);
/// estimator.add_mempool_transaction(txid, 50_000, 500); // 100,000 atoms/kB
/// estimator.process_block(1, &[txid]);
///
/// // Fee rate expected to confirm within 2 blocks, 95% of the time.
/// match estimator.estimate_median_fee(2, 0.95) {
///     Ok(rate) => println!("pay {rate} atoms/kB"),
///     Err(err) => println!("no estimate available: {err}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FeeEstimator {
    stats: ConfirmStats,
    mempool_txs: HashMap<TxId, MempoolTxDesc>,
    best_height: i64,
}

/// Coordinates remembered for each tracked mempool transaction so the
/// matching cell can be decremented once it is mined or evicted.
#[derive(Debug, Clone, Copy)]
struct MempoolTxDesc {
    added_height: i64,
    bucket_index: usize,
    fee_rate: f64,
}

impl FeeEstimator {
    /// Creates an empty estimator with the default configuration
    /// ([`EstimatorConfig::default`]).
    pub fn new() -> Self {
        Self::with_config(&EstimatorConfig::default())
    }

    /// Creates an empty estimator with the given configuration. It needs to
    /// be fed mempool and mined-block data before it can estimate fees.
    ///
    /// # Panics
    ///
    /// Panics if the configuration cannot produce a valid bucket grid; see
    /// the [`EstimatorConfig`] field requirements.
    pub fn with_config(config: &EstimatorConfig) -> Self {
        Self {
            stats: ConfirmStats::new(BucketGrid::new(config)),
            mempool_txs: HashMap::new(),
            best_height: 0,
        }
    }

    /// Height of the last processed block.
    pub fn best_height(&self) -> i64 {
        self.best_height
    }

    /// Number of mempool transactions currently tracked.
    pub fn mempool_size(&self) -> usize {
        self.mempool_txs.len()
    }

    /// Accounts for a transaction entering the mempool at the current best
    /// height, with the given total fee in atoms and serialized size in
    /// bytes.
    ///
    /// Transactions paying less than the lowest tracked bucket bound are
    /// ignored: they can only be mined through priority or zero-fee block
    /// space, which this model does not cover. The comparison is strict so
    /// transactions paying exactly the minimum are still tracked. Ids already
    /// being tracked are ignored so nothing is double counted.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn add_mempool_transaction(&mut self, txid: TxId, fee: u64, size: u64) {
        assert!(size > 0, "transaction size must be positive");

        if self.mempool_txs.contains_key(&txid) {
            return;
        }

        let rate = fee as f64 * 1000.0 / size as f64;
        if rate < self.stats.grid.min_tracked_rate() {
            trace!(%txid, rate, "fee rate below lowest tracked bucket, ignoring");
            return;
        }

        let desc = MempoolTxDesc {
            added_height: self.best_height,
            bucket_index: self.stats.grid.lower_bucket(rate),
            fee_rate: rate,
        };
        self.mempool_txs.insert(txid, desc);
        self.stats.record_mempool_tx(desc.bucket_index, desc.fee_rate);
        trace!(%txid, rate, bucket = desc.bucket_index, "tracking mempool transaction");
    }

    /// Stops tracking a mempool transaction that was evicted without being
    /// mined. Unknown ids are ignored, so eviction notifications may be
    /// delivered more than once.
    pub fn remove_mempool_transaction(&mut self, txid: TxId) {
        let Some(desc) = self.mempool_txs.remove(&txid) else {
            return;
        };
        self.stats.remove_mempool_tx(
            self.best_height - desc.added_height,
            desc.bucket_index,
            desc.fee_rate,
        );
        trace!(%txid, "dropped evicted mempool transaction");
    }

    /// Processes a newly mined block: advances the moving averages, then
    /// moves every previously tracked transaction in `mined` from the mempool
    /// statistics into the confirmed statistics.
    ///
    /// Blocks at or below the current best height are ignored; chain
    /// reorganizations are not modeled. Mined ids that were never tracked are
    /// skipped: counting transactions that never hit the public mempool would
    /// let miners inflate estimates with dummy high-fee transactions of their
    /// own.
    pub fn process_block(&mut self, height: i64, mined: &[TxId]) {
        if height <= self.best_height {
            trace!(height, best_height = self.best_height, "stale block height, ignoring");
            return;
        }

        self.stats.advance_block();
        self.best_height = height;

        let mut confirmed = 0usize;
        for txid in mined {
            let Some(desc) = self.mempool_txs.remove(txid) else {
                continue;
            };

            let blocks_to_confirm = height - desc.added_height;
            self.stats
                .remove_mempool_tx(blocks_to_confirm, desc.bucket_index, desc.fee_rate);

            if blocks_to_confirm <= 0 {
                // Non-positive delays are not representable in the confirmed
                // table.
                continue;
            }
            self.stats.record_confirmed_tx(blocks_to_confirm, desc.fee_rate);
            confirmed += 1;
        }

        debug!(
            height,
            mined = mined.len(),
            confirmed,
            mempool = self.mempool_txs.len(),
            "processed block"
        );
    }

    /// Estimates the median fee rate (atoms/kB) such that at least
    /// `success_pct` of recorded transactions were mined within
    /// `target_confirms` blocks across all tracked buckets paying at least
    /// that rate.
    ///
    /// Sometimes the requested combination is not achievable (for example,
    /// asking for 95% confirmation within 1 block when nothing confirms that
    /// fast) or too little history has been recorded; the corresponding
    /// [`EstimatorError`](crate::EstimatorError) is returned and the caller
    /// can retry with a looser target or after more blocks.
    ///
    /// # Panics
    ///
    /// Panics if `target_confirms` is zero. `success_pct` is expected in
    /// `(0, 1]`.
    pub fn estimate_median_fee(&self, target_confirms: u32, success_pct: f64) -> Result<f64> {
        self.stats.estimate_median_fee(target_confirms, success_pct)
    }

    /// Read-only textual rendering of the confirmed statistics table, one row
    /// per fee bucket with per-slot average fee rates and decayed counts.
    /// Intended for diagnostics; the exact formatting is not part of the API
    /// contract.
    pub fn dump_buckets(&self) -> String {
        self.stats.dump_buckets()
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(n: u8) -> TxId {
        TxId::new([n; 32])
    }

    fn small_estimator() -> FeeEstimator {
        FeeEstimator::with_config(&EstimatorConfig {
            max_confirms: 4,
            min_bucket_fee: 100,
            max_bucket_fee: 400,
            fee_rate_step: 2.0,
        })
    }

    #[test]
    fn test_add_records_first_slot_of_bucket() {
        let mut estimator = small_estimator();
        // 300 atoms over 1 byte: 300,000 atoms/kB, the catch-all bucket.
        estimator.add_mempool_transaction(txid(1), 300, 1);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 0]], 1.0);
        assert_eq!(estimator.stats.mempool.fee_sum[[2, 0]], 300_000.0);
        assert_eq!(estimator.mempool_size(), 1);
    }

    #[test]
    fn test_duplicate_add_is_counted_once() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 1);
        estimator.add_mempool_transaction(txid(1), 300, 1);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 0]], 1.0);
        assert_eq!(estimator.mempool_size(), 1);
    }

    #[test]
    fn test_add_remove_round_trip_restores_cells() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 1);
        estimator.remove_mempool_transaction(txid(1));
        assert_eq!(estimator.mempool_size(), 0);
        for bucket in 0..estimator.stats.grid.bucket_count() {
            for slot in 0..estimator.stats.grid.max_confirms() {
                assert_eq!(estimator.stats.mempool.tx_count[[bucket, slot]], 0.0);
                assert_eq!(estimator.stats.mempool.fee_sum[[bucket, slot]], 0.0);
            }
        }
    }

    #[test]
    fn test_unmined_transactions_climb_slots() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 1);

        estimator.process_block(1, &[]);
        estimator.process_block(2, &[]);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 2]], 1.0);

        estimator.process_block(3, &[]);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 3]], 1.0);

        // Removal after the climb still finds the right cell.
        estimator.remove_mempool_transaction(txid(1));
        assert_eq!(estimator.stats.mempool.tx_count[[2, 3]], 0.0);
    }

    #[test]
    fn test_mined_transaction_moves_to_confirmed() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 1);
        estimator.process_block(1, &[txid(1)]);

        assert_eq!(estimator.mempool_size(), 0);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 1]], 0.0);
        assert_eq!(estimator.stats.confirmed.tx_count[[2, 0]], 1.0);
        assert_eq!(estimator.stats.confirm_count[2], 1.0);
    }

    #[test]
    fn test_mempool_table_mass_matches_index() {
        let mut estimator = small_estimator();
        for n in 0..6 {
            estimator.add_mempool_transaction(txid(n), 100 + u64::from(n) * 40, 1000);
        }
        estimator.process_block(1, &[txid(0), txid(3)]);
        estimator.remove_mempool_transaction(txid(5));

        for bucket in 0..estimator.stats.grid.bucket_count() {
            let table_mass: f64 = (0..estimator.stats.grid.max_confirms())
                .map(|slot| estimator.stats.mempool.tx_count[[bucket, slot]])
                .sum();
            let tracked = estimator
                .mempool_txs
                .values()
                .filter(|desc| desc.bucket_index == bucket)
                .count();
            assert_eq!(table_mass, tracked as f64);
        }
    }

    #[test]
    fn test_unknown_mined_ids_are_ignored() {
        let mut estimator = small_estimator();
        estimator.process_block(1, &[txid(9)]);
        assert_eq!(estimator.stats.confirm_count[2], 0.0);
        assert_eq!(estimator.best_height(), 1);
    }

    #[test]
    fn test_stale_heights_are_ignored() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 1);
        estimator.process_block(2, &[]);

        estimator.process_block(2, &[txid(1)]);
        estimator.process_block(1, &[txid(1)]);
        assert_eq!(estimator.best_height(), 2);
        assert_eq!(estimator.mempool_size(), 1);
        assert_eq!(estimator.stats.mempool.tx_count[[2, 1]], 1.0);
    }

    #[test]
    #[should_panic(expected = "size must be positive")]
    fn test_zero_size_panics() {
        let mut estimator = small_estimator();
        estimator.add_mempool_transaction(txid(1), 300, 0);
    }
}
