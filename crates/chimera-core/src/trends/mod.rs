//! Trend discovery access.

pub mod cache;

pub use cache::TrendCache;
