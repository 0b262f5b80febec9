//! State estimation filters
//!
//! - [`kalman::StateEstimator`]: constant-velocity Kalman filter over `[x, y, vx, vy]`

pub mod kalman;
