#![no_main]

use fee_oracle::{FeeEstimator, TxId};
use libfuzzer_sys::fuzz_target;

fn txid(n: u8) -> TxId {
    TxId::new([n; 32])
}

fuzz_target!(|data: &[u8]| {
    // Interpret the fuzzer input as a stream of estimator operations. None of
    // them should panic, no matter the order or arguments.
    let mut estimator = FeeEstimator::new();

    for chunk in data.chunks_exact(4) {
        let id = chunk[1];
        match chunk[0] % 4 {
            0 => {
                // Fee and size spread over several orders of magnitude so
                // both tracked and sub-minimum rates are exercised.
                let fee = u64::from(chunk[2]) << (chunk[3] % 16);
                let size = u64::from(chunk[3]).max(1);
                estimator.add_mempool_transaction(txid(id), fee, size);
            }
            1 => {
                estimator.remove_mempool_transaction(txid(id));
            }
            2 => {
                let height = estimator.best_height() + i64::from(chunk[2] % 3);
                let mined: Vec<TxId> = chunk[3..].iter().copied().map(txid).collect();
                estimator.process_block(height, &mined);
            }
            _ => {
                let target = u32::from(chunk[2]).max(1);
                let success_pct = f64::from(chunk[3].max(1)) / 255.0;
                let _ = estimator.estimate_median_fee(target, success_pct);
            }
        }
    }

    let _ = estimator.dump_buckets();
});
