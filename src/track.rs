use crate::bbox::{BBox, Ltrb};
use crate::kalman::KalmanFilter;
use crate::Detection;
use log::warn;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    Tentative,
    Confirmed,
    Lost,
}

/// Confirmed track reported for a frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackedObject {
    pub track_id: u32,
    // detection box matched this frame
    pub bbox: BBox<Ltrb>,
    /// Box the track was started from.
    pub origin: BBox<Ltrb>,
    pub class: i32,
    pub confidence: f32,
    pub hits: u32,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: u32,
    pub status: TrackStatus,
    pub hits: u32,
    pub misses: u32,
    pub class: i32,
    pub confidence: f32,
    pub created_at: u64,
    pub updated_at: u64,
    origin: BBox<Ltrb>,
    last_bbox: BBox<Ltrb>,
    filter: KalmanFilter,
    ever_confirmed: bool,
}

impl Track {
    pub fn new(id: u32, frame: u64, det: &Detection) -> Self {
        let bbox = det.bbox();

        Self {
            id,
            status: TrackStatus::Tentative,
            hits: 1,
            misses: 0,
            class: det.class,
            confidence: det.confidence,
            created_at: frame,
            updated_at: frame,
            origin: bbox,
            last_bbox: bbox,
            filter: KalmanFilter::new(&bbox.as_xyah()),
            ever_confirmed: false,
        }
    }

    /// Advances the motion estimate by one frame without new evidence.
    #[inline]
    pub fn predict(&mut self) {
        self.filter.predict();
    }

    pub fn update(&mut self, frame: u64, det: &Detection, min_hits: u32) {
        let bbox = det.bbox();

        if !self.filter.update(&bbox.as_xyah()) {
            warn!(
                "track {}: singular innovation covariance, filter reset at {:?}",
                self.id, bbox
            );
            self.filter = KalmanFilter::new(&bbox.as_xyah());
        }

        self.last_bbox = bbox;
        self.class = det.class;
        self.confidence = det.confidence;
        self.hits += 1;
        self.misses = 0;
        self.updated_at = frame;

        if self.ever_confirmed || self.hits >= min_hits {
            self.confirm();
        } else {
            self.status = TrackStatus::Tentative;
        }
    }

    #[inline]
    pub fn mark_missed(&mut self) {
        self.misses += 1;
        self.status = TrackStatus::Lost;
    }

    #[inline]
    pub fn confirm(&mut self) {
        self.status = TrackStatus::Confirmed;
        self.ever_confirmed = true;
    }

    #[inline]
    pub fn is_expired(&self, max_age: u32) -> bool {
        self.status == TrackStatus::Lost && self.misses > max_age
    }

    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.status == TrackStatus::Confirmed
    }

    /// Box predicted by the motion model for the current frame.
    #[inline]
    pub fn predicted_bbox(&self) -> BBox<Ltrb> {
        self.filter.bbox().as_ltrb()
    }
}

impl From<&Track> for TrackedObject {
    fn from(t: &Track) -> TrackedObject {
        TrackedObject {
            track_id: t.id,
            bbox: t.last_bbox,
            origin: t.origin,
            class: t.class,
            confidence: t.confidence,
            hits: t.hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(y: f32) -> Detection {
        Detection::new(BBox::ltrb(100.0, y, 140.0, y + 80.0), 0.9, 0)
    }

    #[test]
    fn test_promotion_after_min_hits() {
        let mut t = Track::new(1, 0, &det(0.0));
        assert_eq!(t.status, TrackStatus::Tentative);

        t.predict();
        t.update(1, &det(2.0), 3);
        assert_eq!(t.status, TrackStatus::Tentative);
        assert_eq!(t.hits, 2);

        t.predict();
        t.update(2, &det(4.0), 3);
        assert_eq!(t.status, TrackStatus::Confirmed);
        assert_eq!(t.hits, 3);
    }

    #[test]
    fn test_lost_and_recovered() {
        let mut t = Track::new(7, 0, &det(0.0));
        t.update(1, &det(0.0), 2);
        assert!(t.is_confirmed());

        t.predict();
        t.mark_missed();
        t.predict();
        t.mark_missed();
        assert_eq!(t.status, TrackStatus::Lost);
        assert_eq!(t.misses, 2);
        assert!(!t.is_expired(2));
        t.mark_missed();
        assert!(t.is_expired(2));

        t.update(4, &det(0.0), 10);
        assert_eq!(t.status, TrackStatus::Confirmed);
        assert_eq!(t.misses, 0);
    }

    #[test]
    fn test_unconfirmed_track_returns_to_tentative() {
        let mut t = Track::new(3, 0, &det(0.0));
        t.mark_missed();
        assert_eq!(t.status, TrackStatus::Lost);

        t.update(2, &det(0.0), 3);
        assert_eq!(t.status, TrackStatus::Tentative);
    }

    #[test]
    fn test_snapshot_uses_observed_box() {
        let mut t = Track::new(5, 0, &det(0.0));
        t.confirm();
        t.predict();
        t.update(1, &det(10.0), 1);

        let obj = TrackedObject::from(&t);
        assert_eq!(obj.track_id, 5);
        assert_eq!(obj.bbox, det(10.0).bbox());
        assert_eq!(obj.origin, det(0.0).bbox());
        assert_eq!(obj.hits, 2);
    }
}
