//! Observation (sensor) models
//!
//! Describes how position observations relate to the tracked state.

use nalgebra::RealField;
use num_traits::Float;

use crate::config::{ensure_finite_variance, ensure_positive};
use crate::types::spaces::MeasurementCovariance;
use crate::types::transforms::ObservationMatrix;

/// Trait for linear observation models.
///
/// Describes the measurement process:
/// z = H * x + v
///
/// where:
/// - H is the observation matrix
/// - v is zero-mean Gaussian measurement noise with covariance R
pub trait ObservationModel<T: RealField, const N: usize, const M: usize> {
    /// Returns the observation matrix.
    fn observation_matrix(&self) -> ObservationMatrix<T, M, N>;

    /// Returns the measurement noise covariance.
    fn measurement_noise(&self) -> MeasurementCovariance<T, M>;
}

/// Position-only sensor in 2D.
///
/// Observes [x, y] from state [x, y, vx, vy]; velocity is never observed.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSensor2D<T: RealField> {
    /// Position measurement noise standard deviation
    pub sigma_pos: T,
}

impl<T: RealField + Float + Copy> PositionSensor2D<T> {
    /// Creates a new position sensor.
    ///
    /// # Errors
    /// `InvalidConfig` if `sigma_pos` is not positive or its variance overflows.
    pub fn new(sigma_pos: T) -> crate::Result<Self> {
        ensure_positive("meas_pos_std", sigma_pos)?;
        ensure_finite_variance("meas_pos_std", sigma_pos, T::one())?;
        Ok(Self { sigma_pos })
    }
}

impl<T: RealField + Float + Copy> ObservationModel<T, 4, 2> for PositionSensor2D<T> {
    fn observation_matrix(&self) -> ObservationMatrix<T, 2, 4> {
        let one = T::one();
        let zero = T::zero();

        ObservationMatrix::from_matrix(nalgebra::matrix![
            one, zero, zero, zero;
            zero, one, zero, zero
        ])
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, 2> {
        let sigma_sq = self.sigma_pos * self.sigma_pos;
        let zero = T::zero();

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            sigma_sq, zero;
            zero, sigma_sq
        ])
    }
}
