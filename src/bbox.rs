use crate::geometry::Anchor;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug + Default + Copy + PartialEq {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-aspect_ratio-height format, contains coordinates of the center of bbox and aspect_ratio-height
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Xyah;
impl BBoxFormat for Xyah {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    #[inline]
    pub fn as_xyah(&self) -> BBox<Xyah> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Finite coordinates with a strictly positive extent on both axes.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.left() < self.right() && self.top() < self.bottom()
    }

    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let iw = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let ih = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let intersection = iw * ih;
        let union = self.area() + other.area() - intersection;

        if union <= f32::EPSILON {
            return 0.0;
        }

        intersection / union
    }

    pub fn anchor(&self, anchor: Anchor) -> na::Point2<f32> {
        let cx = (self.left() + self.right()) * 0.5;
        let cy = (self.top() + self.bottom()) * 0.5;

        match anchor {
            Anchor::Center => na::Point2::new(cx, cy),
            Anchor::TopCenter => na::Point2::new(cx, self.top()),
            Anchor::BottomCenter => na::Point2::new(cx, self.bottom()),
            Anchor::CenterLeft => na::Point2::new(self.left(), cy),
            Anchor::CenterRight => na::Point2::new(self.right(), cy),
            Anchor::TopLeft => na::Point2::new(self.left(), self.top()),
            Anchor::TopRight => na::Point2::new(self.right(), self.top()),
            Anchor::BottomLeft => na::Point2::new(self.left(), self.bottom()),
            Anchor::BottomRight => na::Point2::new(self.right(), self.bottom()),
        }
    }
}

impl BBox<Xyah> {
    #[inline]
    pub fn xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        BBox([cx, cy, aspect_ratio, height], PhantomData)
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn aspect_ratio(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xyah> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let w = v.width();
        let h = v.height().max(f32::EPSILON);

        Self(
            [v.0[0] + w / 2.0, v.0[1] + h / 2.0, w / h, h],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xyah>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xyah>) -> Self {
        let half_w = v.0[2] * v.0[3] / 2.0;
        let half_h = v.0[3] / 2.0;

        Self(
            [
                v.0[0] - half_w,
                v.0[1] - half_h,
                v.0[0] + half_w,
                v.0[1] + half_h,
            ],
            PhantomData,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_iou_identical_boxes() {
        let a = BBox::ltrb(10.0, 10.0, 50.0, 50.0);
        assert_abs_diff_eq!(a.iou(&a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 20.0, 20.0);
        let b = BBox::ltrb(50.0, 50.0, 70.0, 70.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 50.0, 50.0);
        let b = BBox::ltrb(25.0, 25.0, 75.0, 75.0);
        // 625 / (2500 + 2500 - 625)
        assert_abs_diff_eq!(a.iou(&b), 625.0 / 4375.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iou_degenerate_box() {
        let a = BBox::ltrb(10.0, 10.0, 10.0, 10.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_xyah_conversion() {
        let b = BBox::ltrb(100.0, 50.0, 140.0, 130.0);
        let xyah = b.as_xyah();

        assert_abs_diff_eq!(xyah.cx(), 120.0);
        assert_abs_diff_eq!(xyah.cy(), 90.0);
        assert_abs_diff_eq!(xyah.aspect_ratio(), 0.5);
        assert_abs_diff_eq!(xyah.height(), 80.0);

        let back = xyah.as_ltrb();
        assert_abs_diff_eq!(back.left(), 100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(back.bottom(), 130.0, epsilon = 1e-4);
    }

    #[test]
    fn test_validity() {
        assert!(BBox::ltrb(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BBox::ltrb(5.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BBox::ltrb(0.0, 3.0, 1.0, 3.0).is_valid());
        assert!(!BBox::ltrb(f32::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_anchors() {
        let b = BBox::ltrb(0.0, 0.0, 10.0, 20.0);

        assert_eq!(b.anchor(Anchor::Center), na::Point2::new(5.0, 10.0));
        assert_eq!(b.anchor(Anchor::BottomCenter), na::Point2::new(5.0, 20.0));
        assert_eq!(b.anchor(Anchor::TopRight), na::Point2::new(10.0, 0.0));
    }
}
