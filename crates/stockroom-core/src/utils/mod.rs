//! Utility functions for parsing and formatting inventory values.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{parse_decimal, parse_quantity, truncate_string};
