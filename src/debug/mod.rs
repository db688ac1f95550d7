//! Debug utilities for tracking native objects.
//!
//! The tracker is always compiled; backtrace capture needs the `debug` feature.

pub mod backtrace;

pub use backtrace::{ImageTrace, ImageTracker};
