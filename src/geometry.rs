use crate::error::{Error, Result};
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Point of a box used as the track position for the side test.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Anchor {
    #[default]
    Center,
    TopCenter,
    BottomCenter,
    CenterLeft,
    CenterRight,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Oriented infinite line through two distinct points.
///
/// Sides are named in image coordinates (y grows downwards): walking from
/// `start` to `end`, points with a negative cross product are on the left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Line {
    start: na::Point2<f32>,
    end: na::Point2<f32>,
}

impl Line {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Result<Self> {
        if start == end {
            return Err(Error::InvalidLine { start, end });
        }

        Ok(Self {
            start: na::Point2::new(start.0 as f32, start.1 as f32),
            end: na::Point2::new(end.0 as f32, end.1 as f32),
        })
    }

    #[inline]
    pub fn start(&self) -> na::Point2<f32> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> na::Point2<f32> {
        self.end
    }

    #[inline]
    pub fn direction(&self) -> na::Vector2<f32> {
        self.end - self.start
    }

    /// `(end - start) × (point - start)`
    #[inline]
    pub fn cross(&self, point: &na::Point2<f32>) -> f32 {
        let d = self.direction();
        let v = point - self.start;

        d.x * v.y - d.y * v.x
    }

    /// `None` when the point lies exactly on the line.
    pub fn side_of(&self, point: &na::Point2<f32>) -> Option<Side> {
        let cross = self.cross(point);

        if cross < 0.0 {
            Some(Side::Left)
        } else if cross > 0.0 {
            Some(Side::Right)
        } else {
            None
        }
    }
}
