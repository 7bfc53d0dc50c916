/// Internal modules for the fee-oracle library.
/// These are implementation details and should not be used directly by
/// library consumers.
pub(crate) mod bucket_grid;
pub(crate) mod confirm_stats;
pub(crate) mod median;

pub(crate) use bucket_grid::BucketGrid;
pub(crate) use confirm_stats::ConfirmStats;
