use crate::config::{CounterConfig, TrackerConfig};
use crate::counter::{CountReport, Counts, CrossingEvent, LineCounter};
use crate::error::{Error, Result};
use crate::geometry::Line;
use crate::track::TrackedObject;
use crate::tracker::ByteTracker;
use crate::{Detection, Tracking};
use serde_derive::Serialize;

/// Produces the detections of a frame, in a stable order.
pub trait Detector<F> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &F) -> std::result::Result<Vec<Detection>, Self::Error>;
}

/// Draws (or otherwise consumes) the outcome of a frame.
pub trait Overlay<F> {
    fn annotate(&mut self, frame: &mut F, report: &FrameReport, line: &Line);
}

/// Overlay that does nothing; handy as the `O` of `Pipeline::run` when no
/// overlay is passed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl<F> Overlay<F> for NoOverlay {
    #[inline]
    fn annotate(&mut self, _frame: &mut F, _report: &FrameReport, _line: &Line) {}
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub tracks: Vec<TrackedObject>,
    pub events: Vec<CrossingEvent>,
    pub counts: Counts,
}

/// Tracker followed by a line counter, fed one frame at a time.
pub struct Pipeline<T: Tracking = ByteTracker> {
    tracker: T,
    counter: LineCounter,
    frame_index: u64,
}

impl Pipeline<ByteTracker> {
    pub fn new(tracker: TrackerConfig, counter: CounterConfig) -> Result<Self> {
        Ok(Self::with_tracker(
            ByteTracker::new(tracker)?,
            LineCounter::new(counter)?,
        ))
    }
}

impl<T: Tracking> Pipeline<T> {
    pub fn with_tracker(tracker: T, counter: LineCounter) -> Self {
        Self {
            tracker,
            counter,
            frame_index: 0,
        }
    }

    pub fn process(&mut self, detections: &[Detection]) -> FrameReport {
        let tracks = self.tracker.update(detections);
        self.counter.remove(self.tracker.evicted());
        let events = self.counter.update(&tracks);

        let report = FrameReport {
            frame_index: self.frame_index,
            tracks,
            events,
            counts: self.counter.counts(),
        };
        self.frame_index += 1;

        report
    }

    /// Runs every frame through `detector`, the tracker, the counter and
    /// `overlay`, then returns the totals.
    pub fn run<F, I, D, O>(
        &mut self,
        frames: I,
        detector: &mut D,
        mut overlay: Option<&mut O>,
    ) -> Result<CountReport>
    where
        I: IntoIterator<Item = F>,
        D: Detector<F>,
        O: Overlay<F>,
    {
        for mut frame in frames {
            let detections = detector
                .detect(&frame)
                .map_err(|err| Error::Detector(Box::new(err)))?;

            let report = self.process(&detections);

            if let Some(overlay) = overlay.as_deref_mut() {
                overlay.annotate(&mut frame, &report, self.counter.line());
            }
        }

        Ok(self.final_report())
    }

    #[inline]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    #[inline]
    pub fn counter(&self) -> &LineCounter {
        &self.counter
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn final_report(&self) -> CountReport {
        self.counter.final_report()
    }
}
