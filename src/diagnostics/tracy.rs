//! Tracy profiler integration for arena residency.
//!
//! When the `tracy` feature is enabled, resident statistics are plotted once per frame.
//! Without it these calls compile to nothing.

use crate::api::stats::FrameArenaResidentStats;

/// Plot resident byte counts for the current frame.
#[inline]
pub fn plot_resident(stats: &FrameArenaResidentStats) {
    #[cfg(feature = "tracy")]
    {
        tracy_client::plot!("framearena resident buffer bytes", stats.buffer_bytes as f64);
        tracy_client::plot!("framearena resident image bytes", stats.image_bytes as f64);
        tracy_client::plot!("framearena alias blocks", stats.alias_block_count as f64);
    }

    #[cfg(not(feature = "tracy"))]
    let _ = stats;
}
