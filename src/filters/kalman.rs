//! Constant-velocity Kalman filter for single-object tracking
//!
//! [`StateEstimator`] owns the belief over `[x, y, vx, vy]` and the fixed model
//! matrices derived from an [`EstimatorConfig`]. Each step the caller runs
//! [`predict`](StateEstimator::predict) unconditionally and, when the detector
//! found the object, [`update`](StateEstimator::update) with its position.
//! Without a detection the prediction stands on its own ("coasting").
//!
//! # Example
//!
//! ```
//! use cvtrack::filters::kalman::StateEstimator;
//! use cvtrack::config::EstimatorConfig;
//! use cvtrack::types::spaces::Measurement;
//!
//! let mut estimator = StateEstimator::new(EstimatorConfig::default()).unwrap();
//!
//! for step in 0..10 {
//!     let t = step as f64;
//!     estimator.predict();
//!     // The detector missed the object on step 4
//!     if step != 4 {
//!         estimator
//!             .update(&Measurement::from_array([3.0 * t, 4.0 * t]))
//!             .unwrap();
//!     }
//! }
//!
//! let [vx, vy] = estimator.velocity();
//! assert!((vx - 3.0).abs() < 1.0 && (vy - 4.0).abs() < 1.0);
//! ```

use nalgebra::RealField;
use num_traits::Float;
use tracing::trace;

use crate::config::{CovarianceUpdate, EstimatorConfig};
use crate::detection::Detection;
use crate::models::{ConstantVelocity2D, ObservationModel, PositionSensor2D, TransitionModel};
use crate::types::spaces::{
    ComputeInnovation, Measurement, MeasurementCovariance, StateCovariance, StateVector,
};
use crate::types::transforms::{
    compute_innovation_covariance, compute_kalman_gain, invert_2x2, joseph_update,
    standard_covariance_update, ObservationMatrix, TransitionMatrix,
};
use crate::{Result, TrackError};

/// Dimension of the state `[x, y, vx, vy]`.
pub const STATE_DIM: usize = 4;
/// Dimension of an observed position `[x, y]`.
pub const MEAS_DIM: usize = 2;

/// Predicted and, when a detection was available, corrected position of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEstimate<T> {
    /// Position after the prediction step
    pub predicted: [T; 2],
    /// Position after the correction step, `None` when coasting
    pub corrected: Option<[T; 2]>,
}

impl<T: Copy> StepEstimate<T> {
    /// Best available position for the step.
    pub fn position(&self) -> [T; 2] {
        self.corrected.unwrap_or(self.predicted)
    }
}

/// Recursive estimator of a single object's 2-D position and velocity.
///
/// The model matrices are fixed at construction and owned by the instance,
/// so independent estimators never share state.
#[derive(Debug, Clone)]
pub struct StateEstimator<T: RealField = f64> {
    config: EstimatorConfig<T>,
    mean: StateVector<T, STATE_DIM>,
    covariance: StateCovariance<T, STATE_DIM>,
    initial_covariance: StateCovariance<T, STATE_DIM>,
    transition: TransitionMatrix<T, STATE_DIM>,
    process_noise: StateCovariance<T, STATE_DIM>,
    observation: ObservationMatrix<T, MEAS_DIM, STATE_DIM>,
    measurement_noise: MeasurementCovariance<T, MEAS_DIM>,
}

impl<T: RealField + Float + Copy> StateEstimator<T> {
    /// Builds an estimator at the origin with the configured initial uncertainty.
    ///
    /// # Errors
    /// `InvalidConfig` if `dt` or any standard deviation is not positive and
    /// finite, or if a variance they imply overflows.
    pub fn new(config: EstimatorConfig<T>) -> Result<Self> {
        config.validate()?;

        let motion = ConstantVelocity2D::new(config.dt, config.accel_std)?;
        let sensor = PositionSensor2D::new(config.meas_pos_std)?;

        let pos_var = config.init_pos_std * config.init_pos_std;
        let vel_var = config.init_vel_std * config.init_vel_std;
        let initial_covariance =
            StateCovariance::from_diagonal(&nalgebra::vector![pos_var, pos_var, vel_var, vel_var]);

        Ok(Self {
            config,
            mean: StateVector::zeros(),
            covariance: initial_covariance,
            initial_covariance,
            transition: motion.transition_matrix(),
            process_noise: motion.process_noise(),
            observation: sensor.observation_matrix(),
            measurement_noise: sensor.measurement_noise(),
        })
    }

    /// Builds an estimator from the five scalar parameters.
    pub fn from_params(
        dt: T,
        init_pos_std: T,
        init_vel_std: T,
        accel_std: T,
        meas_pos_std: T,
    ) -> Result<Self> {
        Self::new(EstimatorConfig::new(
            dt,
            init_pos_std,
            init_vel_std,
            accel_std,
            meas_pos_std,
        ))
    }

    /// Performs the prediction step and returns the predicted position.
    ///
    /// - x = F * x
    /// - P = F * P * F^T + Q
    ///
    /// Can be called any number of times in a row; each call without a
    /// correction grows the uncertainty.
    pub fn predict(&mut self) -> [T; 2] {
        self.mean = self.transition.apply_state(&self.mean);
        self.covariance = self
            .transition
            .propagate_covariance(&self.covariance)
            .add(&self.process_noise);

        trace!(
            x = ?self.mean.index(0),
            y = ?self.mean.index(1),
            trace = ?self.covariance.trace(),
            "predict"
        );
        self.position()
    }

    /// Performs the correction step with an observed position and returns the
    /// corrected position.
    ///
    /// - y = z - H * x (innovation)
    /// - S = H * P * H^T + R (innovation covariance)
    /// - K = P * H^T * S^{-1} (Kalman gain)
    /// - x = x + K * y
    /// - P = (I - K*H) * P, or the Joseph form when configured
    ///
    /// # Errors
    /// `NumericalError` if S cannot be inverted. The belief is left exactly as
    /// it was before the call.
    pub fn update(&mut self, measurement: &Measurement<T, MEAS_DIM>) -> Result<[T; 2]> {
        let predicted_meas = self.observation.observe(&self.mean);
        let innovation = measurement.innovation(predicted_meas);

        let innovation_cov = self.innovation_covariance();
        let gain = compute_kalman_gain(&self.covariance, &self.observation, &innovation_cov)
            .ok_or(TrackError::NumericalError("innovation covariance is singular"))?;

        let mean = self.mean + gain.correct(&innovation);
        let covariance = match self.config.covariance_update {
            CovarianceUpdate::Standard => {
                standard_covariance_update(&self.covariance, &gain, &self.observation)
            }
            CovarianceUpdate::Joseph => joseph_update(
                &self.covariance,
                &gain,
                &self.observation,
                &self.measurement_noise,
            ),
        };

        self.mean = mean;
        self.covariance = covariance;

        trace!(
            x = ?self.mean.index(0),
            y = ?self.mean.index(1),
            trace = ?self.covariance.trace(),
            "update"
        );
        Ok(self.position())
    }

    /// Runs one full step: predict, then correct if the object was detected.
    ///
    /// # Errors
    /// `NumericalError` from the correction; the prediction has been applied.
    pub fn step(&mut self, detection: &Detection<T>) -> Result<StepEstimate<T>> {
        let predicted = self.predict();
        let corrected = match detection.measurement() {
            Some(z) => Some(self.update(z)?),
            None => None,
        };
        Ok(StepEstimate {
            predicted,
            corrected,
        })
    }

    /// Innovation covariance S = H * P * H^T + R for the current belief.
    pub fn innovation_covariance(&self) -> MeasurementCovariance<T, MEAS_DIM> {
        compute_innovation_covariance(&self.covariance, &self.observation, &self.measurement_noise)
    }

    /// Squared Mahalanobis distance of a position from the predicted measurement.
    ///
    /// Useful for rejecting detections that are implausibly far from the track.
    ///
    /// # Errors
    /// `NumericalError` if the innovation covariance is singular.
    pub fn mahalanobis_distance_squared(&self, measurement: &Measurement<T, MEAS_DIM>) -> Result<T> {
        let innovation = measurement.innovation(self.observation.observe(&self.mean));
        let s_inv = invert_2x2(self.innovation_covariance().as_matrix())
            .ok_or(TrackError::NumericalError("innovation covariance is singular"))?;

        let y = innovation.as_svector();
        Ok((y.transpose() * s_inv * y)[(0, 0)])
    }

    /// Forgets everything learned: zero state, initial covariance.
    ///
    /// The model matrices are kept. This is the recovery path after a
    /// `NumericalError`.
    pub fn reset(&mut self) {
        self.mean = StateVector::zeros();
        self.covariance = self.initial_covariance;
    }

    /// Current position estimate `[x, y]`.
    #[inline]
    pub fn position(&self) -> [T; 2] {
        [*self.mean.index(0), *self.mean.index(1)]
    }

    /// Current velocity estimate `[vx, vy]`.
    #[inline]
    pub fn velocity(&self) -> [T; 2] {
        [*self.mean.index(2), *self.mean.index(3)]
    }

    /// Returns the trace of the covariance matrix (sum of variances).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.covariance.trace()
    }

    #[inline]
    pub fn state(&self) -> &StateVector<T, STATE_DIM> {
        &self.mean
    }

    #[inline]
    pub fn covariance(&self) -> &StateCovariance<T, STATE_DIM> {
        &self.covariance
    }

    #[inline]
    pub fn config(&self) -> &EstimatorConfig<T> {
        &self.config
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix<T, STATE_DIM> {
        &self.transition
    }

    pub fn process_noise(&self) -> &StateCovariance<T, STATE_DIM> {
        &self.process_noise
    }

    pub fn observation_matrix(&self) -> &ObservationMatrix<T, MEAS_DIM, STATE_DIM> {
        &self.observation
    }

    pub fn measurement_noise(&self) -> &MeasurementCovariance<T, MEAS_DIM> {
        &self.measurement_noise
    }

    #[cfg(test)]
    pub(crate) fn set_belief(
        &mut self,
        mean: StateVector<T, STATE_DIM>,
        covariance: StateCovariance<T, STATE_DIM>,
    ) {
        self.mean = mean;
        self.covariance = covariance;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn car_estimator() -> StateEstimator {
        StateEstimator::new(EstimatorConfig::default()).unwrap()
    }

    fn min_eigenvalue(cov: &StateCovariance<f64, 4>) -> f64 {
        let m = cov.as_matrix();
        let sym = (m + m.transpose()) * 0.5;
        sym.symmetric_eigenvalues().min()
    }

    #[test]
    fn test_initial_belief() {
        let estimator = car_estimator();

        assert_eq!(estimator.state().to_array(), [0.0; 4]);
        let cov = estimator.covariance().as_matrix();
        assert_eq!(cov[(0, 0)], 100.0);
        assert_eq!(cov[(1, 1)], 100.0);
        assert_eq!(cov[(2, 2)], 100.0);
        assert_eq!(cov[(3, 3)], 100.0);
        assert_eq!(cov[(0, 2)], 0.0);
        assert!((estimator.uncertainty() - 400.0).abs() < 1e-10);
    }

    #[test]
    fn test_model_matrices() {
        let estimator = StateEstimator::from_params(0.5, 1.0, 2.0, 3.0, 4.0).unwrap();

        let f = estimator.transition_matrix().as_matrix();
        assert_eq!(f[(0, 2)], 0.5);
        assert_eq!(f[(1, 3)], 0.5);
        assert_eq!(f[(2, 0)], 0.0);

        let h = estimator.observation_matrix().as_matrix();
        assert_eq!(h[(0, 0)], 1.0);
        assert_eq!(h[(1, 1)], 1.0);
        assert_eq!(h[(0, 2)], 0.0);

        let r = estimator.measurement_noise();
        assert_eq!(r.variance(0), 16.0);

        // Q[0][0] = dt^4 / 4 * sigma^2
        let q = estimator.process_noise();
        assert!((q.variance(0) - 0.0625 / 4.0 * 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = StateEstimator::from_params(1.0, 10.0, 0.0, 0.1, 5.0).unwrap_err();
        assert!(matches!(
            err,
            TrackError::InvalidConfig {
                parameter: "init_vel_std",
                ..
            }
        ));
        assert!(StateEstimator::from_params(-1.0, 10.0, 10.0, 0.1, 5.0).is_err());
        assert!(StateEstimator::from_params(1.0, 10.0, 10.0, f64::NAN, 5.0).is_err());
    }

    #[test]
    fn test_predict_moves_along_velocity() {
        let mut estimator = car_estimator();
        estimator.set_belief(
            StateVector::from_array([1.0, 2.0, 3.0, -1.0]),
            StateCovariance::identity(),
        );

        let before = estimator.uncertainty();
        let [x, y] = estimator.predict();

        assert!((x - 4.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
        assert_eq!(estimator.velocity(), [3.0, -1.0]);
        assert!(estimator.uncertainty() > before);
    }

    #[test]
    fn test_predicted_position_is_first_two_components() {
        let mut estimator = car_estimator();
        estimator.set_belief(
            StateVector::from_array([5.0, 7.0, 1.0, 2.0]),
            StateCovariance::identity(),
        );

        // Same rule on the first call and every later call
        for k in 1..=3 {
            let predicted = estimator.predict();
            assert_eq!(predicted, estimator.position());
            assert!((predicted[1] - (7.0 + 2.0 * k as f64)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let mut estimator = car_estimator();
        estimator.predict();

        let before = estimator.uncertainty();
        let [x, y] = estimator.update(&Measurement::from_array([10.0, 5.0])).unwrap();

        assert!(x > 5.0 && x < 10.0);
        assert!(y > 2.5 && y < 5.0);
        assert!(estimator.uncertainty() < before);
    }

    #[test]
    fn test_zero_innovation_leaves_state_unchanged() {
        let mut estimator = car_estimator();
        estimator.set_belief(
            StateVector::from_array([12.0, -4.0, 1.5, 0.5]),
            StateCovariance::from_diagonal(&nalgebra::vector![30.0, 30.0, 8.0, 8.0]),
        );
        estimator.predict();
        let state_before = *estimator.state();

        let z = estimator.observation_matrix().observe(estimator.state());
        estimator.update(&z).unwrap();

        assert_eq!(*estimator.state(), state_before);
    }

    #[test]
    fn test_corrected_position_between_prediction_and_measurement() {
        let mut estimator = car_estimator();
        let measurements = [[4.0, 1.0], [9.0, -3.0], [11.0, 8.0], [20.0, 2.0], [18.0, 12.0]];

        for z in measurements {
            let [px, py] = estimator.predict();
            let [cx, cy] = estimator.update(&Measurement::from_array(z)).unwrap();

            assert!(cx >= px.min(z[0]) - 1e-9 && cx <= px.max(z[0]) + 1e-9);
            assert!(cy >= py.min(z[1]) - 1e-9 && cy <= py.max(z[1]) + 1e-9);
        }
    }

    #[test]
    fn test_covariance_stays_symmetric_psd() {
        for form in [CovarianceUpdate::Standard, CovarianceUpdate::Joseph] {
            let config = EstimatorConfig::default().with_covariance_update(form);
            let mut estimator = StateEstimator::new(config).unwrap();

            for k in 0..200 {
                estimator.predict();
                if k % 7 != 3 {
                    let t = k as f64;
                    estimator
                        .update(&Measurement::from_array([2.0 * t + (t * 0.7).sin(), t]))
                        .unwrap();
                }

                let cov = estimator.covariance();
                let scale = cov.trace();
                assert!(cov.asymmetry() <= 1e-9 * scale, "step {}: asymmetric", k);
                assert!(min_eigenvalue(cov) >= -1e-9 * scale, "step {}: not PSD", k);
            }
        }
    }

    #[test]
    fn test_singular_innovation_covariance_is_rejected_without_mutation() {
        let mut estimator = car_estimator();
        estimator.predict();

        // A degenerate belief: infinite position variance makes S non-finite
        let mut broken = *estimator.covariance().as_matrix();
        broken[(0, 0)] = f64::INFINITY;
        let mean = *estimator.state();
        estimator.set_belief(mean, StateCovariance::from_matrix(broken));

        let err = estimator
            .update(&Measurement::from_array([1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, TrackError::NumericalError(_)));
        assert_eq!(*estimator.state(), mean);
        assert_eq!(*estimator.covariance().as_matrix(), broken);

        estimator.reset();
        assert_eq!(estimator.state().to_array(), [0.0; 4]);
        assert!((estimator.uncertainty() - 400.0).abs() < 1e-10);
        assert!(estimator.update(&Measurement::from_array([1.0, 1.0])).is_ok());
    }

    #[test]
    fn test_step_with_and_without_detection() {
        let mut estimator = car_estimator();

        let detected = estimator
            .step(&Detection::Detected(Measurement::from_array([3.0, 3.0])))
            .unwrap();
        assert_eq!(detected.predicted, [0.0, 0.0]);
        assert!(detected.corrected.is_some());
        assert_eq!(detected.position(), estimator.position());

        let coasted = estimator.step(&Detection::NotDetected).unwrap();
        assert!(coasted.corrected.is_none());
        assert_eq!(coasted.position(), coasted.predicted);
    }

    #[test]
    fn test_mahalanobis_distance() {
        let mut estimator = car_estimator();
        estimator.set_belief(
            StateVector::from_array([10.0, 5.0, 0.0, 0.0]),
            StateCovariance::identity(),
        );

        let close = estimator
            .mahalanobis_distance_squared(&Measurement::from_array([10.0, 5.0]))
            .unwrap();
        let far = estimator
            .mahalanobis_distance_squared(&Measurement::from_array([40.0, 45.0]))
            .unwrap();

        assert!(close < 1e-12);
        assert!(far > close);
        // S = I + 25 I, d² = (30² + 40²) / 26
        assert!((far - 2500.0 / 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_f32_estimator() {
        let mut estimator = StateEstimator::<f32>::new(EstimatorConfig::default()).unwrap();
        estimator.predict();
        let [x, _] = estimator.update(&Measurement::from_array([2.0_f32, 2.0])).unwrap();
        assert!(x > 0.0 && x < 2.0);
    }

    #[test]
    fn test_independent_instances_share_nothing() {
        let mut a = car_estimator();
        let b = a.clone();

        a.predict();
        a.update(&Measurement::from_array([50.0, 50.0])).unwrap();

        assert_eq!(b.state().to_array(), [0.0; 4]);
        assert!((b.uncertainty() - 400.0).abs() < 1e-10);
    }
}
