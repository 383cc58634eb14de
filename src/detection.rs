use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// Contains left-top and right-bottom corners of bbox in pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, confidence: f32, class: i32) -> Self {
        Self {
            x1: bbox.left(),
            y1: bbox.top(),
            x2: bbox.right(),
            y2: bbox.bottom(),
            confidence,
            class,
        }
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Ltrb> {
        BBox::ltrb(self.x1, self.y1, self.x2, self.y2)
    }

    /// A detection the tracker is willing to consume: a non-degenerate finite
    /// box and a confidence in `[0, 1]`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.bbox().is_valid() && (0.0..=1.0).contains(&self.confidence)
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox().iou(&other.bbox())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        let det = Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 10.0), 0.5, 0);
        assert!(det.is_well_formed());

        let flipped = Detection::new(BBox::ltrb(10.0, 0.0, 0.0, 10.0), 0.5, 0);
        assert!(!flipped.is_well_formed());

        let overconfident = Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 10.0), 1.5, 0);
        assert!(!overconfident.is_well_formed());

        let nan = Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 10.0), f32::NAN, 0);
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn test_wire_names() {
        let det: Detection =
            serde_json::from_str(r#"{"x1":1.0,"y1":2.0,"x2":3.0,"y2":4.0,"p":0.75,"c":2}"#)
                .unwrap();

        assert_eq!(det.class, 2);
        assert_eq!(det.confidence, 0.75);
        assert_eq!(det.bbox().right(), 3.0);
    }
}
