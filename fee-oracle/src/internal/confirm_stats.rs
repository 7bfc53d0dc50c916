use std::fmt::Write as _;

use ndarray::{Array1, Array2};

use crate::internal::BucketGrid;

/// Decay applied to the confirmed statistics on every new block. Gives
/// roughly half weight to observations around 350 blocks old.
const DECAY: f64 = 0.998;

/// The two (fee bucket x confirmation slot) statistics tables, plus the
/// per-bucket totals the estimator divides by.
///
/// The confirmed table is cumulative across confirmation slots: the cell at
/// `(bucket, slot)` counts transactions in that fee bucket that confirmed
/// within `slot + 1` blocks, so a single cell answers a target-window query
/// without summing a range. It is decayed geometrically on every block.
///
/// The mempool table is pointwise: the cell at `(bucket, slot)` holds the
/// current mempool population of that fee bucket that has been waiting
/// `slot + 1` blocks. It is shifted up one slot per block and never decayed.
#[derive(Debug, Clone)]
pub(crate) struct ConfirmStats {
    pub(crate) grid: BucketGrid,
    pub(crate) confirmed: StatTable,
    pub(crate) mempool: StatTable,
    /// Per-bucket confirmed totals across all slots.
    pub(crate) confirm_count: Array1<f64>,
    pub(crate) confirm_fee_sum: Array1<f64>,
    decay: f64,
}

/// A pair of parallel (bucket x slot) accumulator planes.
#[derive(Debug, Clone)]
pub(crate) struct StatTable {
    pub(crate) tx_count: Array2<f64>,
    pub(crate) fee_sum: Array2<f64>,
}

impl StatTable {
    fn new(buckets: usize, slots: usize) -> Self {
        Self {
            tx_count: Array2::zeros((buckets, slots)),
            fee_sum: Array2::zeros((buckets, slots)),
        }
    }
}

impl ConfirmStats {
    pub fn new(grid: BucketGrid) -> Self {
        let buckets = grid.bucket_count();
        let slots = grid.max_confirms();
        Self {
            confirmed: StatTable::new(buckets, slots),
            mempool: StatTable::new(buckets, slots),
            confirm_count: Array1::zeros(buckets),
            confirm_fee_sum: Array1::zeros(buckets),
            decay: DECAY,
            grid,
        }
    }

    /// Records a brand new mempool transaction. It has been waiting for less
    /// than one full block, so it enters the first confirmation slot of its
    /// fee bucket.
    pub fn record_mempool_tx(&mut self, bucket: usize, rate: f64) {
        self.mempool.tx_count[[bucket, 0]] += 1.0;
        self.mempool.fee_sum[[bucket, 0]] += rate;
    }

    /// Removes from the mempool table a transaction that has spent
    /// `blocks_in_mempool` whole blocks in the pool. A transaction removed at
    /// the height it was added has still spent one partial block waiting, so
    /// the slot is derived from `blocks_in_mempool + 1`.
    ///
    /// # Panics
    ///
    /// Panics if the targeted cell count goes negative: the removal was never
    /// paired with a matching [`record_mempool_tx`](Self::record_mempool_tx).
    pub fn remove_mempool_tx(&mut self, blocks_in_mempool: i64, bucket: usize, rate: f64) {
        let slot = self.grid.confirm_slot(blocks_in_mempool + 1);
        self.mempool.tx_count[[bucket, slot]] -= 1.0;
        self.mempool.fee_sum[[bucket, slot]] -= rate;
        if self.mempool.tx_count[[bucket, slot]] < 0.0 {
            panic!(
                "mempool cell (bucket {bucket}, slot {slot}) went negative after {blocks_in_mempool} \
                 blocks in pool: transaction removed without a matching mempool record"
            );
        }
    }

    /// Moves a mined transaction into the confirmed statistics.
    ///
    /// The counts are raised for every slot from the one matching
    /// `blocks_to_confirm` through the last, keeping each cell a cumulative
    /// "confirmed within this many blocks" count. The per-bucket totals are
    /// raised exactly once.
    pub fn record_confirmed_tx(&mut self, blocks_to_confirm: i64, rate: f64) {
        let bucket = self.grid.lower_bucket(rate);
        let slot = self.grid.confirm_slot(blocks_to_confirm);
        for s in slot..self.grid.max_confirms() {
            self.confirmed.tx_count[[bucket, s]] += 1.0;
            self.confirmed.fee_sum[[bucket, s]] += rate;
        }
        self.confirm_count[bucket] += 1.0;
        self.confirm_fee_sum[bucket] += rate;
    }

    /// Advances the statistics by one block.
    ///
    /// The confirmed stats are decayed so that, over time, estimates rely on
    /// the most recent fee information. Every unconfirmed transaction now
    /// takes at least one additional block to confirm, so each fee bucket's
    /// mempool slots move up by one; the final slot represents all waits at
    /// or beyond the horizon and absorbs the second-to-last slot instead of
    /// being overwritten.
    pub fn advance_block(&mut self) {
        self.confirmed.tx_count *= self.decay;
        self.confirmed.fee_sum *= self.decay;
        self.confirm_count *= self.decay;
        self.confirm_fee_sum *= self.decay;

        let last = self.grid.max_confirms() - 1;
        for bucket in 0..self.grid.bucket_count() {
            self.mempool.tx_count[[bucket, last]] += self.mempool.tx_count[[bucket, last - 1]];
            self.mempool.fee_sum[[bucket, last]] += self.mempool.fee_sum[[bucket, last - 1]];
            for slot in (1..last).rev() {
                self.mempool.tx_count[[bucket, slot]] = self.mempool.tx_count[[bucket, slot - 1]];
                self.mempool.fee_sum[[bucket, slot]] = self.mempool.fee_sum[[bucket, slot - 1]];
            }
            // Slot 0 starts fresh for transactions arriving after this block.
            self.mempool.tx_count[[bucket, 0]] = 0.0;
            self.mempool.fee_sum[[bucket, 0]] = 0.0;
        }
    }

    /// Renders the confirmed table as text: one row per fee bucket (bound
    /// scaled to whole coins), one column per confirmation slot, each cell
    /// showing the average fee rate and the decayed transaction count.
    pub fn dump_buckets(&self) -> String {
        let slots = self.grid.max_confirms();
        let mut out = String::new();

        out.push_str("          |");
        for slot in 0..slots {
            if slot == slots - 1 {
                let _ = write!(out, "   {:>14}", "+Inf");
            } else {
                let _ = write!(out, "   {:>14}|", slot + 1);
            }
        }
        out.push('\n');

        for bucket in 0..self.grid.bucket_count() {
            let _ = write!(out, "{:10.8}", self.grid.bound(bucket) / 1e8);
            for slot in 0..slots {
                let count = self.confirmed.tx_count[[bucket, slot]];
                let avg = if count > 0.0 {
                    self.confirmed.fee_sum[[bucket, slot]] / count / 1e8
                } else {
                    0.0
                };
                let _ = write!(out, "| {:.8} {:5.0}", avg, count);
            }
            out.push('\n');
        }

        out
    }
}
