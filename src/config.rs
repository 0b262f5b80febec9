//! Estimator configuration
//!
//! The five scalars that fully determine a constant-velocity estimator, with
//! validation and the tunings used for synthetic and video tracking.

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{Result, TrackError};

/// How the covariance is corrected after a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    /// P = (I - K*H) * P
    #[default]
    Standard,
    /// P = (I - K*H) * P * (I - K*H)^T + K * R * K^T
    Joseph,
}

/// Construction parameters of a [`StateEstimator`](crate::filters::kalman::StateEstimator).
///
/// All standard deviations share the length unit of the observed positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig<T = f64> {
    /// Sampling interval between two steps
    pub dt: T,
    /// Initial position standard deviation (both axes)
    pub init_pos_std: T,
    /// Initial velocity standard deviation (both axes)
    pub init_vel_std: T,
    /// Standard deviation of the unmodeled acceleration
    pub accel_std: T,
    /// Standard deviation of each observed position coordinate
    pub meas_pos_std: T,
    /// Covariance correction form
    #[serde(default)]
    pub covariance_update: CovarianceUpdate,
}

impl<T: Float> EstimatorConfig<T> {
    /// Creates a configuration with the standard covariance update.
    pub fn new(dt: T, init_pos_std: T, init_vel_std: T, accel_std: T, meas_pos_std: T) -> Self {
        Self {
            dt,
            init_pos_std,
            init_vel_std,
            accel_std,
            meas_pos_std,
            covariance_update: CovarianceUpdate::Standard,
        }
    }

    /// Tuning for pixel-space tracking of a detector running on video at `fps`
    /// frames per second: a fast-manoeuvring object and tight measurements.
    pub fn video(fps: T) -> Self {
        let ten = lit(10.0);
        Self::new(T::one() / fps, ten, ten, lit(40.0), T::one())
    }

    pub fn with_dt(mut self, dt: T) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_initial_std(mut self, pos: T, vel: T) -> Self {
        self.init_pos_std = pos;
        self.init_vel_std = vel;
        self
    }

    pub fn with_accel_std(mut self, accel_std: T) -> Self {
        self.accel_std = accel_std;
        self
    }

    pub fn with_meas_pos_std(mut self, meas_pos_std: T) -> Self {
        self.meas_pos_std = meas_pos_std;
        self
    }

    pub fn with_covariance_update(mut self, form: CovarianceUpdate) -> Self {
        self.covariance_update = form;
        self
    }

    /// Checks that `dt` and every standard deviation are positive and finite,
    /// and that the variances they imply stay finite.
    ///
    /// The implied variances are the squared standard deviations, the
    /// entries of Q, the position variance after one prediction and the
    /// innovation variance of the first correction.
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending parameter. When only the
    /// combined innovation variance overflows, the largest contributor is named.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("init_pos_std", self.init_pos_std)?;
        ensure_positive("init_vel_std", self.init_vel_std)?;
        ensure_positive("accel_std", self.accel_std)?;
        ensure_positive("meas_pos_std", self.meas_pos_std)?;

        let dt = self.dt;
        let half_dt2 = lit::<T>(0.5) * dt * dt;
        ensure_finite_variance("init_pos_std", self.init_pos_std, T::one())?;
        ensure_finite_variance("init_vel_std", self.init_vel_std, dt.max(T::one()))?;
        ensure_finite_variance("accel_std", self.accel_std, dt.max(half_dt2))?;
        ensure_finite_variance("meas_pos_std", self.meas_pos_std, T::one())?;

        // S = P_xx + dt² P_vx + (dt²/2)² σa² + σm² on the first correction
        let contributions = [
            ("init_pos_std", self.init_pos_std, T::one()),
            ("init_vel_std", self.init_vel_std, dt),
            ("accel_std", self.accel_std, half_dt2),
            ("meas_pos_std", self.meas_pos_std, T::one()),
        ];
        let variance = |std: T, gain: T| (std * gain) * (std * gain);
        let total = contributions
            .iter()
            .fold(T::zero(), |acc, &(_, std, gain)| acc + variance(std, gain));
        if total.is_finite() {
            return Ok(());
        }

        let (parameter, value, _) = contributions.iter().copied().fold(
            contributions[0],
            |largest, c| {
                if variance(c.1, c.2) > variance(largest.1, largest.2) {
                    c
                } else {
                    largest
                }
            },
        );
        Err(invalid(parameter, value))
    }
}

/// Synthetic car scenario: unit steps, loose prior, smooth motion, noisy fixes.
impl<T: Float> Default for EstimatorConfig<T> {
    fn default() -> Self {
        let ten = lit(10.0);
        Self::new(T::one(), ten, ten, lit(0.1), lit(5.0))
    }
}

/// Rejects zero, negative, NaN and infinite values.
pub(crate) fn ensure_positive<T: Float>(parameter: &'static str, value: T) -> Result<()> {
    if value.is_finite() && value > T::zero() {
        Ok(())
    } else {
        Err(invalid(parameter, value))
    }
}

/// Rejects a standard deviation whose variance, scaled by `gain²`, overflows.
pub(crate) fn ensure_finite_variance<T: Float>(
    parameter: &'static str,
    std: T,
    gain: T,
) -> Result<()> {
    let scaled = std * gain;
    if (scaled * scaled).is_finite() {
        Ok(())
    } else {
        Err(invalid(parameter, std))
    }
}

fn invalid<T: Float>(parameter: &'static str, value: T) -> TrackError {
    TrackError::InvalidConfig {
        parameter,
        value: value.to_f64().unwrap_or(f64::NAN),
    }
}

// Every Float can represent these small constants.
fn lit<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}
