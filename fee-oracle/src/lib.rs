//! Smart fee estimation for UTXO-based nodes.
//!
//! The estimator lives inside a node's mempool subsystem and watches two
//! event streams: transactions entering the mempool and blocks being mined.
//! From those it maintains a decaying two-dimensional histogram over
//! (fee-rate bucket x confirmation delay) and answers queries of the form
//! "what fee rate, in atoms per kilobyte, gets a transaction mined within N
//! blocks with probability p?".
//!
//! # Example
//! ```
//! use fee_oracle::{EstimatorConfig, FeeEstimator, TxId};
//!
//! let mut estimator = FeeEstimator::with_config(&EstimatorConfig::default());
//!
//! // The host feeds mempool arrivals and mined blocks as they happen.
//! let txid = TxId::new([0x11; 32]);
//! estimator.add_mempool_transaction(txid, 25_000, 250); // 100,000 atoms/kB
//! estimator.process_block(1, &[txid]);
//!
//! // Queries are read-only and answered from the accumulated statistics.
//! match estimator.estimate_median_fee(6, 0.95) {
//!     Ok(rate) => println!("pay at least {rate:.0} atoms/kB"),
//!     Err(err) => println!("no estimate yet: {err}"),
//! }
//! ```

// Public modules
pub mod error;

// Data structures
mod config;
mod fee_estimator;
mod txid;

// Internal implementation modules
pub(crate) mod internal;

// Public exports
pub use config::EstimatorConfig;
pub use error::{EstimatorError, Result};
pub use fee_estimator::FeeEstimator;
pub use txid::TxId;
