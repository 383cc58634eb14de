use crate::association::{associate, IndexedSlice};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::track::{Track, TrackedObject};
use crate::{Detection, Tracking};
use log::debug;

/// Two-tier (ByteTrack style) IoU tracker.
///
/// Every frame the tracks are first matched against confident detections,
/// then the leftovers get a second chance against the low confidence band.
/// Only unmatched confident detections start new tracks.
#[derive(Debug, Clone)]
pub struct ByteTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u32,
    frame_count: u64,
    evicted: Vec<u32>,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            tracks: Vec::with_capacity(64),
            next_id: 1,
            frame_count: 0,
            evicted: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// All live tracks, including tentative and lost ones, by ascending id.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        let frame = self.frame_count;
        self.frame_count += 1;
        self.evicted.clear();

        let (high, low) = self.split_detections(detections);

        for t in &mut self.tracks {
            t.predict();
        }

        let first = associate(
            &IndexedSlice::new(&self.tracks),
            &IndexedSlice::new_with_indexes(detections, high),
            self.config.iou_threshold,
            self.config.method,
        );

        let second = associate(
            &IndexedSlice::new_with_indexes(&self.tracks, first.unmatched_tracks),
            &IndexedSlice::new_with_indexes(detections, low),
            self.config.iou_threshold,
            self.config.method,
        );

        for &(t, d, _) in first.matches.iter().chain(second.matches.iter()) {
            self.tracks[t].update(frame, &detections[d], self.config.min_hits);
        }

        for &t in &second.unmatched_tracks {
            self.tracks[t].mark_missed();
        }

        self.remove_expired();

        for &d in &first.unmatched_detections {
            self.spawn(frame, &detections[d]);
        }

        self.tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(Into::into)
            .collect()
    }

    /// Ids of the tracks evicted by the last `update`.
    #[inline]
    pub fn evicted(&self) -> &[u32] {
        &self.evicted
    }

    fn split_detections(&self, detections: &[Detection]) -> (Vec<usize>, Vec<usize>) {
        let mut high = Vec::new();
        let mut low = Vec::new();

        for (idx, det) in detections.iter().enumerate() {
            if !det.is_well_formed() {
                debug!("dropping malformed detection #{}: {:?}", idx, det);
                continue;
            }

            if det.confidence >= self.config.high_threshold {
                high.push(idx);
            } else if det.confidence >= self.config.low_threshold {
                low.push(idx);
            }
        }

        (high, low)
    }

    fn remove_expired(&mut self) {
        let max_age = self.config.max_age;
        let evicted = &mut self.evicted;

        self.tracks.retain(|t| {
            if t.is_expired(max_age) {
                debug!("track {} evicted after {} misses", t.id, t.misses);
                evicted.push(t.id);
                false
            } else {
                true
            }
        });
    }

    fn spawn(&mut self, frame: u64, det: &Detection) {
        let id = self.next_id;
        self.next_id += 1;

        let mut track = Track::new(id, frame, det);
        if frame == 0 && self.config.activate_first_frame {
            track.confirm();
        }

        debug!(
            "track {} spawned at {:?} ({:?})",
            id,
            det.bbox(),
            track.status
        );

        self.tracks.push(track);
    }
}

impl Tracking for ByteTracker {
    #[inline]
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        ByteTracker::update(self, detections)
    }

    #[inline]
    fn evicted(&self) -> &[u32] {
        ByteTracker::evicted(self)
    }
}
