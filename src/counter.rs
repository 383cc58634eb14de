use crate::config::CounterConfig;
use crate::error::Result;
use crate::geometry::{Anchor, Line, Side};
use crate::track::TrackedObject;
use log::info;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Which side change of the line counts as IN; the other one is OUT.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    RightToLeftIsIn,
    LeftToRightIsIn,
}

impl Polarity {
    #[inline]
    pub fn direction(self, from: Side, to: Side) -> Direction {
        match (self, from, to) {
            (Polarity::RightToLeftIsIn, Side::Right, Side::Left)
            | (Polarity::LeftToRightIsIn, Side::Left, Side::Right) => Direction::In,
            _ => Direction::Out,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct CrossingEvent {
    pub track_id: u32,
    pub direction: Direction,
    pub class: i32,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Counts {
    pub in_count: u64,
    pub out_count: u64,
}

impl Counts {
    #[inline]
    fn record(&mut self, direction: Direction) {
        match direction {
            Direction::In => self.in_count += 1,
            Direction::Out => self.out_count += 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CountReport {
    pub in_count: u64,
    pub out_count: u64,
    pub per_class: BTreeMap<i32, Counts>,
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "in_count: {}", self.in_count)?;
        write!(f, "out_count: {}", self.out_count)
    }
}

#[derive(Debug, Clone)]
struct CrossingState {
    // `None` until the track or its origin box is seen off the line
    side: Option<Side>,
    pending: Option<(Side, u32)>,
    // reported through `LineCounter::last_direction` only
    last_direction: Option<Direction>,
    crossings: u32,
}

impl CrossingState {
    fn new(side: Option<Side>) -> Self {
        Self {
            side,
            pending: None,
            last_direction: None,
            crossings: 0,
        }
    }
}

/// Counts tracks changing side of a line.
#[derive(Debug, Clone)]
pub struct LineCounter {
    line: Line,
    anchor: Anchor,
    polarity: Polarity,
    min_frames_on_side: u32,
    states: HashMap<u32, CrossingState>,
    counts: Counts,
    per_class: BTreeMap<i32, Counts>,
}

impl LineCounter {
    pub fn new(config: CounterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            line: config.line()?,
            anchor: config.anchor,
            polarity: config.polarity,
            min_frames_on_side: config.min_frames_on_side,
            states: HashMap::new(),
            counts: Counts::default(),
            per_class: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn line(&self) -> &Line {
        &self.line
    }

    /// Feeds one frame of tracks and returns the crossings committed in it,
    /// in the order of `tracks`.
    ///
    /// A track seen for the first time starts from the side of its origin
    /// box, so a crossing made before the track was confirmed still counts.
    pub fn update(&mut self, tracks: &[TrackedObject]) -> Vec<CrossingEvent> {
        let mut events = Vec::new();

        for t in tracks {
            let point = t.bbox.anchor(self.anchor);
            let origin_side = self.line.side_of(&t.origin.anchor(self.anchor));
            let state = self
                .states
                .entry(t.track_id)
                .or_insert_with(|| CrossingState::new(origin_side));

            // exactly on the line: keep whatever was recorded
            let observed = match self.line.side_of(&point) {
                Some(side) => side,
                None => continue,
            };

            let committed = match state.side {
                Some(side) => side,
                None => {
                    state.side = Some(observed);
                    continue;
                }
            };

            if observed == committed {
                state.pending = None;
                continue;
            }

            let seen = match state.pending {
                Some((side, n)) if side == observed => n + 1,
                _ => 1,
            };

            if seen < self.min_frames_on_side {
                state.pending = Some((observed, seen));
                continue;
            }

            let direction = self.polarity.direction(committed, observed);

            state.side = Some(observed);
            state.pending = None;
            state.last_direction = Some(direction);
            state.crossings += 1;

            self.counts.record(direction);
            self.per_class.entry(t.class).or_default().record(direction);

            info!(
                "track {} crossed {:?} -> {:?}: {:?} (in {}, out {})",
                t.track_id,
                committed,
                observed,
                direction,
                self.counts.in_count,
                self.counts.out_count
            );

            events.push(CrossingEvent {
                track_id: t.track_id,
                direction,
                class: t.class,
            });
        }

        events
    }

    /// Forgets the crossing state of evicted tracks.
    pub fn remove(&mut self, track_ids: &[u32]) {
        for id in track_ids {
            self.states.remove(id);
        }
    }

    #[inline]
    pub fn in_count(&self) -> u64 {
        self.counts.in_count
    }

    #[inline]
    pub fn out_count(&self) -> u64 {
        self.counts.out_count
    }

    #[inline]
    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn class_counts(&self, class: i32) -> Counts {
        self.per_class.get(&class).copied().unwrap_or_default()
    }

    /// Committed side of a track, `None` for unknown tracks or tracks not
    /// yet seen off the line.
    pub fn side_of(&self, track_id: u32) -> Option<Side> {
        self.states.get(&track_id).and_then(|s| s.side)
    }

    /// Direction of the last crossing counted for a track.
    pub fn last_direction(&self, track_id: u32) -> Option<Direction> {
        self.states.get(&track_id).and_then(|s| s.last_direction)
    }

    pub fn crossings(&self, track_id: u32) -> u32 {
        self.states.get(&track_id).map_or(0, |s| s.crossings)
    }

    #[inline]
    pub fn tracked_len(&self) -> usize {
        self.states.len()
    }

    pub fn final_report(&self) -> CountReport {
        CountReport {
            in_count: self.counts.in_count,
            out_count: self.counts.out_count,
            per_class: self.per_class.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    // 20x20 box centered at (x, y)
    fn at(id: u32, x: f32, y: f32) -> TrackedObject {
        let bbox = BBox::ltrb(x - 10.0, y - 10.0, x + 10.0, y + 10.0);

        TrackedObject {
            track_id: id,
            bbox,
            origin: bbox,
            class: 0,
            confidence: 0.9,
            hits: 1,
        }
    }

    fn counter() -> LineCounter {
        LineCounter::new(CounterConfig::new((0, 100), (640, 100))).unwrap()
    }

    #[test]
    fn test_first_sighting_is_silent() {
        let mut c = counter();

        assert!(c.update(&[at(1, 320.0, 150.0)]).is_empty());
        assert_eq!(c.side_of(1), Some(Side::Right));
        assert_eq!(c.counts(), Counts::default());
    }

    #[test]
    fn test_crossing_directions() {
        let mut c = counter();

        c.update(&[at(1, 320.0, 50.0)]);
        let events = c.update(&[at(1, 320.0, 150.0)]);
        assert_eq!(
            events,
            vec![CrossingEvent {
                track_id: 1,
                direction: Direction::Out,
                class: 0
            }]
        );

        let events = c.update(&[at(1, 320.0, 60.0)]);
        assert_eq!(events[0].direction, Direction::In);
        assert_eq!(c.in_count(), 1);
        assert_eq!(c.out_count(), 1);
        assert_eq!(c.crossings(1), 2);
        assert_eq!(c.last_direction(1), Some(Direction::In));
    }

    #[test]
    fn test_inverse_polarity() {
        let config = CounterConfig {
            polarity: Polarity::LeftToRightIsIn,
            ..CounterConfig::new((0, 100), (640, 100))
        };
        let mut c = LineCounter::new(config).unwrap();

        c.update(&[at(1, 320.0, 50.0)]);
        let events = c.update(&[at(1, 320.0, 150.0)]);

        assert_eq!(events[0].direction, Direction::In);
        assert_eq!(c.in_count(), 1);
    }

    #[test]
    fn test_same_side_does_not_count() {
        let mut c = counter();

        for y in [10.0, 40.0, 80.0, 99.0, 30.0] {
            assert!(c.update(&[at(1, 320.0, y)]).is_empty());
        }
    }

    #[test]
    fn test_on_line_keeps_previous_side() {
        let mut c = counter();

        c.update(&[at(1, 320.0, 50.0)]);
        for _ in 0..5 {
            assert!(c.update(&[at(1, 320.0, 100.0)]).is_empty());
            assert!(c.update(&[at(1, 320.0, 90.0)]).is_empty());
        }
        assert_eq!(c.side_of(1), Some(Side::Left));

        // first sighting on the line leaves the side unknown
        c.update(&[at(2, 10.0, 100.0)]);
        assert_eq!(c.side_of(2), None);
        assert!(c.update(&[at(2, 10.0, 120.0)]).is_empty());
        assert_eq!(c.side_of(2), Some(Side::Right));
    }

    #[test]
    fn test_min_frames_on_side_debounce() {
        let config = CounterConfig {
            min_frames_on_side: 3,
            ..CounterConfig::new((0, 100), (640, 100))
        };
        let mut c = LineCounter::new(config).unwrap();

        c.update(&[at(1, 320.0, 50.0)]);
        // flicker across and back is ignored
        assert!(c.update(&[at(1, 320.0, 110.0)]).is_empty());
        assert!(c.update(&[at(1, 320.0, 110.0)]).is_empty());
        assert!(c.update(&[at(1, 320.0, 90.0)]).is_empty());
        assert!(c.update(&[at(1, 320.0, 110.0)]).is_empty());
        assert!(c.update(&[at(1, 320.0, 110.0)]).is_empty());

        let events = c.update(&[at(1, 320.0, 110.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(c.out_count(), 1);
    }

    #[test]
    fn test_per_class_counts() {
        let mut c = counter();
        let mut car = at(2, 100.0, 50.0);
        car.class = 2;

        c.update(&[at(1, 320.0, 50.0), car]);
        car.bbox = at(2, 100.0, 150.0).bbox;
        c.update(&[at(1, 320.0, 150.0), car]);

        assert_eq!(c.out_count(), 2);
        assert_eq!(c.class_counts(0).out_count, 1);
        assert_eq!(c.class_counts(2).out_count, 1);
        assert_eq!(c.class_counts(7), Counts::default());

        let report = c.final_report();
        assert_eq!(report.per_class.len(), 2);
        assert_eq!(report.to_string(), "in_count: 0\nout_count: 2");
    }

    #[test]
    fn test_removed_track_starts_over() {
        let mut c = counter();

        c.update(&[at(1, 320.0, 50.0)]);
        c.remove(&[1]);
        assert_eq!(c.tracked_len(), 0);

        assert!(c.update(&[at(1, 320.0, 150.0)]).is_empty());
        assert_eq!(c.counts(), Counts::default());
    }

    #[test]
    fn test_first_sighting_compares_with_origin() {
        let mut c = counter();

        // confirmed only after it got across
        let mut late = at(1, 320.0, 150.0);
        late.origin = at(1, 320.0, 50.0).bbox;

        let events = c.update(&[late]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Out);
        assert_eq!(c.last_direction(1), Some(Direction::Out));

        // origin on the line gives no side to compare with
        let mut on_line = at(2, 320.0, 150.0);
        on_line.origin = at(2, 320.0, 100.0).bbox;
        assert!(c.update(&[on_line]).is_empty());
        assert_eq!(c.side_of(2), Some(Side::Right));

        // confirmed on the line, origin side kept until it leaves
        let mut pending = at(3, 320.0, 100.0);
        pending.origin = at(3, 320.0, 60.0).bbox;
        assert!(c.update(&[pending]).is_empty());
        assert_eq!(c.side_of(3), Some(Side::Left));
        assert_eq!(c.update(&[at(3, 320.0, 125.0)]).len(), 1);
        assert_eq!(c.out_count(), 2);
    }

    #[test]
    fn test_anchor_choice() {
        let config = CounterConfig {
            anchor: Anchor::BottomCenter,
            ..CounterConfig::new((0, 100), (640, 100))
        };
        let mut c = LineCounter::new(config).unwrap();

        // center above the line, bottom edge below it
        c.update(&[at(1, 320.0, 95.0)]);
        assert_eq!(c.side_of(1), Some(Side::Right));
    }
}
