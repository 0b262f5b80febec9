//! cvtrack: single-object 2-D position tracking
//!
//! A type-safe constant-velocity Kalman filter for following one object through
//! a sequence of noisy, occasionally missing, position observations.
//!
//! # Features
//!
//! - **Type Safety**: State, measurement and innovation spaces encoded in the type system
//! - **Coasting**: Prediction alone carries the estimate through missed detections
//! - **Closed-Form Update**: The 2x2 innovation covariance is inverted analytically
//!
//! # Example
//!
//! ```
//! use cvtrack::prelude::*;
//!
//! let mut estimator = StateEstimator::new(EstimatorConfig::default()).unwrap();
//!
//! let predicted = estimator.predict();
//! let corrected = estimator.update(&Measurement::from_array([3.5, 3.6])).unwrap();
//! assert_eq!(predicted, [0.0, 0.0]);
//! assert!(corrected[0] > 0.0);
//! ```

pub mod config;
pub mod detection;
pub mod filters;
pub mod models;
pub mod simulation;
pub mod tracking;
pub mod types;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::detection::*;
    pub use crate::filters::kalman::*;
    pub use crate::models::*;
    pub use crate::tracking::*;
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::{Result, TrackError};
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    /// A construction parameter is non-positive or not finite
    #[error("invalid configuration: `{parameter}` must be positive with a finite variance, got {value}")]
    InvalidConfig {
        /// Name of the offending parameter
        parameter: &'static str,
        /// The rejected value
        value: f64,
    },
    /// A matrix required by the correction step could not be inverted
    #[error("numerical error: {0}")]
    NumericalError(&'static str),
}

pub type Result<T> = ::core::result::Result<T, TrackError>;
