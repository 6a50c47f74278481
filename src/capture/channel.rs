//! Single-slot "latest value" handoff between a capture thread and the render loop.
//!
//! The slot holds at most one frame. Publishing overwrites whatever is there,
//! reading never removes it, and neither side ever blocks the other. Frames the
//! render loop did not get to are simply lost.

use super::frame::WaveformFrame;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared slot holding the most recent waveform snapshot, if any.
#[derive(Clone, Default)]
pub struct LatestFrame {
    slot: Arc<ArcSwapOption<WaveformFrame>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame.
    pub fn publish(&self, frame: WaveformFrame) {
        self.slot.store(Some(Arc::new(frame)));
    }

    /// Returns the most recent frame without consuming it.
    pub fn latest(&self) -> Option<Arc<WaveformFrame>> {
        self.slot.load_full()
    }

    /// Empties the slot so readers observe "no data".
    pub fn clear(&self) {
        self.slot.store(None);
    }
}

/// Capture-side handle that can be switched off.
///
/// While disabled, `publish` is a no-op and the slot stays empty.
#[derive(Clone)]
pub struct FramePublisher {
    slot: LatestFrame,
    enabled: Arc<AtomicBool>,
}

impl FramePublisher {
    /// Creates a publisher writing into `slot`, initially enabled.
    pub fn new(slot: LatestFrame) -> Self {
        Self {
            slot,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn publish(&self, frame: WaveformFrame) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        self.slot.publish(frame);
        // A concurrent disable may have cleared the slot between the check
        // and the store; clear again so the stopped state always wins.
        if !self.enabled.load(Ordering::Acquire) {
            self.slot.clear();
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Stops publishing and clears the slot.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.slot.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
