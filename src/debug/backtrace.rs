//! Image creation tracking.
//!
//! Records every native image the arena creates, keyed by the native handle rather
//! than the slot index, so the leak sweep can find images whose slot bookkeeping was
//! lost. With the `debug` feature a backtrace is captured at creation.

use std::collections::HashMap;

use crate::gpu::traits::{DeviceAllocation, RawImage, RawImageView};

/// What the arena created for one image.
#[derive(Debug, Clone)]
pub struct ImageTrace {
    /// The native image
    pub image: RawImage,

    /// Its view (null until the view is created)
    pub view: RawImageView,

    /// Dedicated memory, if the image does not live in an alias block
    pub dedicated: Option<DeviceAllocation>,

    /// Frame counter at creation
    pub frame: u64,

    /// Captured backtrace (only with the `debug` feature)
    pub backtrace: Option<String>,
}

/// Side-table of created images that have not been torn down.
#[derive(Default)]
pub struct ImageTracker {
    traces: HashMap<RawImage, ImageTrace>,
    frame_counter: u64,
}

impl ImageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created image.
    pub fn record_create(&mut self, image: RawImage, view: RawImageView, dedicated: Option<DeviceAllocation>) {
        let trace = ImageTrace {
            image,
            view,
            dedicated,
            frame: self.frame_counter,
            backtrace: capture(),
        };
        self.traces.insert(image, trace);
    }

    /// Remove an image record. Called on every teardown path.
    pub fn record_destroy(&mut self, image: RawImage) -> Option<ImageTrace> {
        self.traces.remove(&image)
    }

    /// Get the trace for an image (if tracked).
    pub fn get_trace(&self, image: RawImage) -> Option<&ImageTrace> {
        self.traces.get(&image)
    }

    /// Number of tracked images.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Increment the frame counter.
    pub fn next_frame(&mut self) {
        self.frame_counter += 1;
    }

    /// Remove and return every remaining record.
    pub fn drain(&mut self) -> Vec<ImageTrace> {
        self.traces.drain().map(|(_, trace)| trace).collect()
    }

    /// Forget everything and restart the frame counter.
    pub fn clear(&mut self) {
        self.traces.clear();
        self.frame_counter = 0;
    }
}

#[cfg(feature = "debug")]
fn capture() -> Option<String> {
    Some(format!("{:?}", ::backtrace::Backtrace::new()))
}

#[cfg(not(feature = "debug"))]
fn capture() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_destroy() {
        let mut tracker = ImageTracker::new();
        tracker.next_frame();
        tracker.record_create(RawImage(5), RawImageView(6), None);

        let trace = tracker.get_trace(RawImage(5)).unwrap();
        assert_eq!(trace.frame, 1);
        assert_eq!(trace.view, RawImageView(6));
        assert_eq!(trace.backtrace.is_some(), cfg!(feature = "debug"));

        assert!(tracker.record_destroy(RawImage(5)).is_some());
        assert!(tracker.record_destroy(RawImage(5)).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_drain() {
        let mut tracker = ImageTracker::new();
        tracker.record_create(RawImage(1), RawImageView::NULL, None);
        tracker.record_create(RawImage(2), RawImageView::NULL, None);

        assert_eq!(tracker.drain().len(), 2);
        assert_eq!(tracker.len(), 0);
    }
}
