//! Counting objects crossing a line in a video stream.
//!
//! Per-frame detections are linked into persistent tracks by a two-tier IoU
//! tracker ([`ByteTracker`]); a [`LineCounter`] watches which side of the
//! counting line every track's anchor is on and emits IN/OUT events when it
//! changes. [`Pipeline`] wires both together behind pluggable
//! [`Detector`](pipeline::Detector) and [`Overlay`](pipeline::Overlay)
//! collaborators.
//!
//! Processing is strictly frame-sequential: both the motion model and the
//! side memory depend on the order frames arrive in.

pub mod association;
pub mod bbox;
pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod track;
pub mod tracker;

mod kalman;

pub use config::{CounterConfig, TrackerConfig};
pub use counter::{CountReport, CrossingEvent, Direction, LineCounter, Polarity};
pub use detection::Detection;
pub use error::Error;
pub use pipeline::{FrameReport, Pipeline};
pub use track::{Track, TrackedObject};
pub use tracker::ByteTracker;

pub trait Tracking {
    /// Ingests one frame and returns the confirmed tracks seen in it.
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject>;

    /// Ids removed for good during the last `update`.
    fn evicted(&self) -> &[u32];
}
