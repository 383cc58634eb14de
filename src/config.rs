use crate::association::AssociationMethod;
use crate::counter::Polarity;
use crate::error::{Error, Result};
use crate::geometry::{Anchor, Line};
use serde_derive::{Deserialize, Serialize};

const BASELINE_FRAME_RATE: f32 = 30.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Detections at or above this confidence take part in the first
    /// association pass and may start new tracks.
    pub high_threshold: f32,
    /// Detections in `[low_threshold, high_threshold)` may only rescue
    /// tracks left over by the first pass.
    pub low_threshold: f32,
    pub iou_threshold: f32,
    pub min_hits: u32,
    /// Frames a lost track is kept before eviction.
    pub max_age: u32,
    pub method: AssociationMethod,
    /// Tracks spawned on the first processed frame are confirmed right away.
    pub activate_first_frame: bool,
}

// ByteTrack's reference settings (`track_thresh` 0.5, `match_thresh` 0.8 as
// a `1 - iou` cost, `track_buffer` 30) with SORT's `min_hits`.
impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.5,
            low_threshold: 0.1,
            iou_threshold: 0.2,
            min_hits: 3,
            max_age: 30,
            method: AssociationMethod::Hungarian,
            activate_first_frame: true,
        }
    }
}

impl TrackerConfig {
    /// Scales `max_age`, given in frames of a 30 fps stream, to `fps`.
    pub fn with_frame_rate(mut self, fps: f32) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "frame_rate",
                reason: format!("{} is not a positive frame rate", fps),
            });
        }

        self.max_age = (self.max_age as f32 * fps / BASELINE_FRAME_RATE).round() as u32;

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("high_threshold", self.high_threshold)?;
        check_unit("low_threshold", self.low_threshold)?;
        check_unit("iou_threshold", self.iou_threshold)?;

        if self.low_threshold > self.high_threshold {
            return Err(Error::InvalidParameter {
                name: "low_threshold",
                reason: format!(
                    "{} is above high_threshold {}",
                    self.low_threshold, self.high_threshold
                ),
            });
        }

        if self.min_hits == 0 {
            return Err(Error::InvalidParameter {
                name: "min_hits",
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CounterConfig {
    pub line_start: (i32, i32),
    pub line_end: (i32, i32),
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub polarity: Polarity,
    /// Consecutive frames a track has to be seen on the new side before the
    /// crossing is counted.
    #[serde(default = "default_min_frames_on_side")]
    pub min_frames_on_side: u32,
}

fn default_min_frames_on_side() -> u32 {
    1
}

impl CounterConfig {
    pub fn new(line_start: (i32, i32), line_end: (i32, i32)) -> Self {
        Self {
            line_start,
            line_end,
            anchor: Anchor::default(),
            polarity: Polarity::default(),
            min_frames_on_side: default_min_frames_on_side(),
        }
    }

    pub fn line(&self) -> Result<Line> {
        Line::new(self.line_start, self.line_end)
    }

    pub fn validate(&self) -> Result<()> {
        self.line()?;

        if self.min_frames_on_side == 0 {
            return Err(Error::InvalidParameter {
                name: "min_frames_on_side",
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidThreshold { name, value })
    }
}
