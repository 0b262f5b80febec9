//! Model traits for single-object tracking
//!
//! This module defines the traits that describe object dynamics and
//! sensor characteristics, and the constant-velocity / position-sensor
//! implementations used by the estimator.

mod observation;
mod transition;

pub use observation::*;
pub use transition::*;
