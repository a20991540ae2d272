//! Time-ordered indices for events and spans.
//!
//! This crate contains:
//! - [`PointIndex`]: timestamps with attached payloads, supporting exact and
//!   tolerance-bounded nearest lookups
//! - [`IntervalIndex`]: `(from, to)` spans with attached payloads, supporting
//!   "which spans contain this instant" queries
//! - [`lower_bound`]: the binary search both indices are built on
//!
//! Indices are plain single-owner values. Queries report matches through a
//! visitor callback; a visitor must not try to modify the index it is
//! visiting, which the borrow checker already forbids.

mod config;
mod distance;
mod error;
pub mod interval;
pub mod point;
mod search;

pub use config::IndexConfig;
pub use distance::{Timestamp, absolute_distance};
pub use error::{BoxError, IndexError, IndexResult};
pub use interval::{InsertLocation, IntervalEntry, IntervalIndex};
pub use point::{PointEntry, PointIndex};
pub use search::lower_bound;
