//! Constant velocity Kalman filter over `(cx, cy, aspect_ratio, height)`.
//!
//! The state is the box followed by its per-frame velocities. Noise is scaled
//! by the current box height, so large (near) objects are allowed to move more
//! pixels per frame than small (far) ones.

use crate::bbox::{BBox, Xyah};
use nalgebra as na;

type StateVector = na::SVector<f32, 8>;
type StateMatrix = na::SMatrix<f32, 8, 8>;
type MeasurementVector = na::SVector<f32, 4>;
type MeasurementMatrix = na::SMatrix<f32, 4, 4>;
type ObservationMatrix = na::SMatrix<f32, 4, 8>;

const STD_WEIGHT_POSITION: f32 = 1.0 / 20.0;
const STD_WEIGHT_VELOCITY: f32 = 1.0 / 160.0;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    mean: StateVector,
    covariance: StateMatrix,
    motion: StateMatrix,
    observation: ObservationMatrix,
}

impl KalmanFilter {
    pub fn new(measurement: &BBox<Xyah>) -> Self {
        let [cx, cy, a, h] = *measurement.as_slice();
        let mean = StateVector::from_row_slice(&[cx, cy, a, h, 0.0, 0.0, 0.0, 0.0]);

        let p = 2.0 * STD_WEIGHT_POSITION * h;
        let v = 10.0 * STD_WEIGHT_VELOCITY * h;
        let covariance = diagonal(&[p, p, 1e-2, p, v, v, 1e-5, v]);

        let mut motion = StateMatrix::identity();
        for i in 0..4 {
            motion[(i, i + 4)] = 1.0;
        }

        let mut observation = ObservationMatrix::zeros();
        for i in 0..4 {
            observation[(i, i)] = 1.0;
        }

        Self {
            mean,
            covariance,
            motion,
            observation,
        }
    }

    pub fn predict(&mut self) {
        let h = self.mean[3];
        let p = STD_WEIGHT_POSITION * h;
        let v = STD_WEIGHT_VELOCITY * h;
        let process_noise = diagonal(&[p, p, 1e-2, p, v, v, 1e-5, v]);

        self.mean = self.motion * self.mean;
        self.covariance = self.motion * self.covariance * self.motion.transpose() + process_noise;
    }

    /// Corrects the state with an observed box.
    ///
    /// Returns `false` and leaves the state untouched when the innovation
    /// covariance is singular.
    pub fn update(&mut self, measurement: &BBox<Xyah>) -> bool {
        let h = self.mean[3];
        let p = STD_WEIGHT_POSITION * h;
        let r = MeasurementMatrix::from_diagonal(&MeasurementVector::from_row_slice(&[
            p * p,
            p * p,
            1e-1 * 1e-1,
            p * p,
        ]));

        let projected_mean = self.observation * self.mean;
        let projected_cov =
            self.observation * self.covariance * self.observation.transpose() + r;

        let inv = match projected_cov.try_inverse() {
            Some(inv) => inv,
            None => return false,
        };

        let gain = self.covariance * self.observation.transpose() * inv;
        let z = MeasurementVector::from_row_slice(measurement.as_slice());
        let innovation = z - projected_mean;

        let mean = self.mean + gain * innovation;
        let covariance = self.covariance - gain * projected_cov * gain.transpose();

        if !mean.iter().all(|x| x.is_finite()) {
            return false;
        }

        self.mean = mean;
        self.covariance = covariance;

        true
    }

    #[inline]
    pub fn bbox(&self) -> BBox<Xyah> {
        BBox::xyah(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }
}

fn diagonal(std: &[f32; 8]) -> StateMatrix {
    StateMatrix::from_diagonal(&StateVector::from_iterator(std.iter().map(|s| s * s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_predict_without_velocity_keeps_box() {
        let mut kf = KalmanFilter::new(&BBox::xyah(100.0, 100.0, 0.5, 80.0));
        kf.predict();

        let b = kf.bbox();
        assert_abs_diff_eq!(b.cx(), 100.0);
        assert_abs_diff_eq!(b.cy(), 100.0);
        assert_abs_diff_eq!(b.height(), 80.0);
    }

    #[test]
    fn test_learns_constant_velocity() {
        let mut kf = KalmanFilter::new(&BBox::xyah(0.0, 0.0, 1.0, 50.0));

        for step in 1..=20 {
            kf.predict();
            assert!(kf.update(&BBox::xyah(step as f32 * 10.0, 0.0, 1.0, 50.0)));
        }

        kf.predict();
        assert_abs_diff_eq!(kf.bbox().cx(), 210.0, epsilon = 5.0);
        assert_abs_diff_eq!(kf.bbox().cy(), 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_update_moves_towards_measurement() {
        let mut kf = KalmanFilter::new(&BBox::xyah(100.0, 100.0, 1.0, 40.0));
        kf.predict();
        assert!(kf.update(&BBox::xyah(110.0, 100.0, 1.0, 40.0)));

        let cx = kf.bbox().cx();
        assert!(cx > 100.0 && cx <= 110.0);
    }
}
