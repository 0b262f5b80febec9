//! Transition (motion) models for target dynamics
//!
//! Describes how the tracked object evolves between two sampling instants.

use nalgebra::RealField;
use num_traits::Float;

use crate::config::{ensure_finite_variance, ensure_positive};
use crate::types::spaces::{AccelerationCovariance, StateCovariance};
use crate::types::transforms::{NoiseGain, TransitionMatrix};

/// Trait for linear transition (motion) models.
///
/// Describes target dynamics in the form:
/// x_{k+1} = F * x_k + w
///
/// where:
/// - F is the state transition matrix
/// - w is zero-mean Gaussian process noise with covariance Q
pub trait TransitionModel<T: RealField, const N: usize> {
    /// Returns the state transition matrix for one sampling interval.
    fn transition_matrix(&self) -> TransitionMatrix<T, N>;

    /// Returns the process noise covariance for one sampling interval.
    fn process_noise(&self) -> StateCovariance<T, N>;
}

/// Constant velocity model in 2D with white-noise acceleration.
///
/// State: [x, y, vx, vy]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantVelocity2D<T: RealField> {
    /// Sampling interval
    pub dt: T,
    /// Acceleration standard deviation
    pub sigma_a: T,
}

impl<T: RealField + Float + Copy> ConstantVelocity2D<T> {
    /// Creates a new constant velocity model.
    ///
    /// # Errors
    /// `InvalidConfig` if `dt` or `sigma_a` is not positive and finite, or
    /// if an entry of the process noise overflows.
    pub fn new(dt: T, sigma_a: T) -> crate::Result<Self> {
        ensure_positive("dt", dt)?;
        ensure_positive("accel_std", sigma_a)?;

        // Largest entry of L
        let half_dt2 = nalgebra::convert::<f64, T>(0.5) * dt * dt;
        let gain = if half_dt2 > dt { half_dt2 } else { dt };
        ensure_finite_variance("accel_std", sigma_a, gain)?;
        Ok(Self { dt, sigma_a })
    }

    /// Returns the noise-mapping matrix L that spreads one interval of
    /// constant acceleration into position and velocity.
    ///
    /// ```text
    /// L = [dt²/2   0   ]
    ///     [0      dt²/2]
    ///     [dt      0   ]
    ///     [0       dt  ]
    /// ```
    pub fn noise_gain(&self) -> NoiseGain<T, 4, 2> {
        let dt = self.dt;
        let half_dt2 = nalgebra::convert::<f64, T>(0.5) * dt * dt;
        let zero = T::zero();

        NoiseGain::from_matrix(nalgebra::matrix![
            half_dt2, zero;
            zero, half_dt2;
            dt, zero;
            zero, dt
        ])
    }

    /// Returns the per-axis acceleration covariance, diag(sigma_a², sigma_a²).
    pub fn acceleration_covariance(&self) -> AccelerationCovariance<T, 2> {
        let var = self.sigma_a * self.sigma_a;
        AccelerationCovariance::from_diagonal(&nalgebra::vector![var, var])
    }
}

impl<T: RealField + Float + Copy> TransitionModel<T, 4> for ConstantVelocity2D<T> {
    fn transition_matrix(&self) -> TransitionMatrix<T, 4> {
        let one = T::one();
        let zero = T::zero();
        let dt = self.dt;

        TransitionMatrix::from_matrix(nalgebra::matrix![
            one, zero, dt, zero;
            zero, one, zero, dt;
            zero, zero, one, zero;
            zero, zero, zero, one
        ])
    }

    // Q = L * q * L^T
    fn process_noise(&self) -> StateCovariance<T, 4> {
        self.noise_gain().project_noise(&self.acceleration_covariance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::spaces::StateVector;
    use crate::TrackError;

    #[test]
    fn test_cv_transition_advances_position() {
        let model = ConstantVelocity2D::new(0.5_f64, 1.0).unwrap();
        let f = model.transition_matrix();

        let state = StateVector::from_array([1.0, 2.0, 4.0, -2.0]);
        let next = f.apply_state(&state);

        assert!((next.index(0) - 3.0).abs() < 1e-12);
        assert!((next.index(1) - 1.0).abs() < 1e-12);
        assert!((next.index(2) - 4.0).abs() < 1e-12);
        assert!((next.index(3) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cv_process_noise_matches_closed_form() {
        let dt = 0.2_f64;
        let sigma = 3.0_f64;
        let model = ConstantVelocity2D::new(dt, sigma).unwrap();
        let q = model.process_noise();
        let m = q.as_matrix();

        let s2 = sigma * sigma;
        let q11 = dt.powi(4) / 4.0 * s2;
        let q13 = dt.powi(3) / 2.0 * s2;
        let q33 = dt * dt * s2;

        assert!((m[(0, 0)] - q11).abs() < 1e-12);
        assert!((m[(1, 1)] - q11).abs() < 1e-12);
        assert!((m[(0, 2)] - q13).abs() < 1e-12);
        assert!((m[(2, 0)] - q13).abs() < 1e-12);
        assert!((m[(1, 3)] - q13).abs() < 1e-12);
        assert!((m[(2, 2)] - q33).abs() < 1e-12);
        assert!((m[(3, 3)] - q33).abs() < 1e-12);
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 3)], 0.0);
        assert_eq!(q.asymmetry(), 0.0);
    }

    #[test]
    fn test_cv_rejects_bad_parameters() {
        assert!(matches!(
            ConstantVelocity2D::new(0.0_f64, 1.0),
            Err(TrackError::InvalidConfig { parameter: "dt", .. })
        ));
        assert!(matches!(
            ConstantVelocity2D::new(1.0_f64, -0.1),
            Err(TrackError::InvalidConfig {
                parameter: "accel_std",
                ..
            })
        ));
    }

    #[test]
    fn test_cv_rejects_overflowing_process_noise() {
        // dt² σa / 2 squared exceeds f64::MAX
        assert!(matches!(
            ConstantVelocity2D::new(1e100_f64, 1e-40),
            Err(TrackError::InvalidConfig {
                parameter: "accel_std",
                ..
            })
        ));

        let model = ConstantVelocity2D::new(1e10_f64, 1.0).unwrap();
        let q = model.process_noise();
        assert!(q.as_matrix().iter().all(|v| v.is_finite()));
    }
}
