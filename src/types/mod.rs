//! Type definitions for token-analyzer

mod analytics;
mod error;
mod transaction;

pub use analytics::*;
pub use error::*;
pub use transaction::*;

/// Store loading warning types
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWarning {
    /// A line could not be decoded and was skipped
    Corrupted { line: usize, reason: String },
}
