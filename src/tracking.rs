//! Per-frame tracking loop
//!
//! [`Tracker`] drives one [`StateEstimator`] through a stream of
//! [`Detection`]s: predict every step, correct only when the detector found
//! the object, and keep a [`TrackPoint`] per step for the consumer.

use nalgebra::RealField;
use num_traits::Float;
use tracing::{debug, trace, warn};

use crate::config::EstimatorConfig;
use crate::detection::Detection;
use crate::filters::kalman::StateEstimator;
use crate::Result;

/// Everything a renderer or logger needs about one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint<T: RealField = f64> {
    /// Zero-based step index
    pub step: usize,
    /// What the detector reported
    pub detection: Detection<T>,
    /// Position after the prediction step
    pub predicted: [T; 2],
    /// Position after the correction step, `None` when coasting
    pub corrected: Option<[T; 2]>,
    /// Covariance trace at the end of the step
    pub uncertainty: T,
}

impl<T: RealField + Copy> TrackPoint<T> {
    /// Best available position: corrected if detected, otherwise predicted.
    pub fn estimate(&self) -> [T; 2] {
        self.corrected.unwrap_or(self.predicted)
    }

    pub fn is_coasting(&self) -> bool {
        self.corrected.is_none()
    }
}

/// Drives a single estimator through a sequence of detections.
#[derive(Debug, Clone)]
pub struct Tracker<T: RealField = f64> {
    estimator: StateEstimator<T>,
    step: usize,
}

impl<T: RealField + Float + Copy> Tracker<T> {
    /// Creates a tracker with a fresh estimator.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration is rejected.
    pub fn new(config: EstimatorConfig<T>) -> Result<Self> {
        Ok(Self::with_estimator(StateEstimator::new(config)?))
    }

    pub fn with_estimator(estimator: StateEstimator<T>) -> Self {
        Self { estimator, step: 0 }
    }

    /// Processes one frame's detection.
    ///
    /// On a `NumericalError` the estimator is reset to its initial belief
    /// before the error is returned, so the next frame starts cleanly.
    pub fn process(&mut self, detection: Detection<T>) -> Result<TrackPoint<T>> {
        let step = self.step;
        self.step += 1;

        let predicted = self.estimator.predict();
        let corrected = match detection.measurement() {
            Some(z) => match self.estimator.update(z) {
                Ok(position) => {
                    debug!(step, predicted = ?predicted, corrected = ?position, "updated");
                    Some(position)
                }
                Err(err) => {
                    warn!(step, error = %err, "correction failed, resetting estimator");
                    self.estimator.reset();
                    return Err(err);
                }
            },
            None => {
                trace!(step, predicted = ?predicted, "coasting");
                None
            }
        };

        Ok(TrackPoint {
            step,
            detection,
            predicted,
            corrected,
            uncertainty: self.estimator.uncertainty(),
        })
    }

    /// Processes a whole sequence, stopping at the first error.
    pub fn run<I>(&mut self, detections: I) -> Result<Vec<TrackPoint<T>>>
    where
        I: IntoIterator<Item = Detection<T>>,
    {
        detections
            .into_iter()
            .map(|detection| self.process(detection))
            .collect()
    }

    /// Number of steps processed so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn estimator(&self) -> &StateEstimator<T> {
        &self.estimator
    }
}
