//! Waveform capture and the handoff to the render loop.
//!
//! Sources run on their own threads and publish snapshots into a
//! [`LatestFrame`] slot; the render loop reads whatever is newest on each tick.

pub mod channel;
pub mod file;
pub mod frame;
pub mod input;

pub use channel::LatestFrame;
pub use file::{FileCapture, MonoPcm};
pub use frame::WaveformFrame;
pub use input::InputCapture;

/// A producer of waveform snapshots that can be started and stopped.
///
/// Stopping must leave the shared slot empty so the renderer sees "no data"
/// rather than the last snapshot forever.
pub trait WaveformSource {
    /// Starts or resumes publishing.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Stops publishing and clears the slot.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Short label for the footer and logs.
    fn describe(&self) -> String;

    /// Flips between running and stopped.
    fn toggle(&mut self) -> anyhow::Result<()> {
        if self.is_running() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }
}
