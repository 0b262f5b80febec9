//! Common test helpers for estimator integration tests

#![allow(dead_code)]

use cvtrack::config::EstimatorConfig;
use cvtrack::filters::kalman::StateEstimator;
use cvtrack::types::spaces::Measurement;

/// Creates a measurement at given position
pub fn make_measurement(x: f64, y: f64) -> Measurement<f64, 2> {
    Measurement::from_array([x, y])
}

/// Estimator with the synthetic car tuning: dt=1, 10/10/0.1/5
pub fn make_car_estimator() -> StateEstimator {
    StateEstimator::new(EstimatorConfig::default()).unwrap()
}

/// Estimator with both noise models driven towards zero
pub fn make_noiseless_estimator(dt: f64) -> StateEstimator {
    StateEstimator::from_params(dt, 10.0, 10.0, 1e-6, 1e-4).unwrap()
}

/// Position of a constant-velocity object at step k
pub fn cv_position(start: [f64; 2], velocity: [f64; 2], dt: f64, k: usize) -> [f64; 2] {
    let t = k as f64 * dt;
    [start[0] + velocity[0] * t, start[1] + velocity[1] * t]
}

/// Smallest eigenvalue of the symmetric part of a 4x4 matrix
pub fn min_eigenvalue(m: &nalgebra::Matrix4<f64>) -> f64 {
    let sym = (m + m.transpose()) * 0.5;
    sym.symmetric_eigenvalues().min()
}
