//! Services for normalizing, aggregating, storing and fetching purchase data

pub mod aggregator;
pub mod buckets;
pub mod formatter;
pub mod normalizer;
pub mod store;
pub mod upstream;

pub use aggregator::Aggregator;
pub use buckets::{BucketKey, PeriodWindow};
pub use formatter::ReportFormatter;
pub use normalizer::{local_now, local_tz, normalize_timestamp};
pub use store::{validate_meter, BillStore};
pub use upstream::KplcClient;
