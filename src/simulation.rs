//! Synthetic scenarios
//!
//! Ground-truth trajectories and a noisy, lossy stand-in for the detector, for
//! exercising the estimator without video.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::detection::Detection;
use crate::{Result, TrackError};

/// True positions of an object at successive steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub positions: Vec<[f64; 2]>,
    /// Constant velocity `[vx, vy]` the positions were generated with
    pub velocity: [f64; 2],
}

impl Trajectory {
    /// Object starting at `start` and moving at `speed` along `heading_deg`
    /// (degrees counter-clockwise from the +x axis), sampled every `dt`.
    ///
    /// The first sample is `start` itself.
    pub fn constant_heading(
        start: [f64; 2],
        speed: f64,
        heading_deg: f64,
        steps: usize,
        dt: f64,
    ) -> Self {
        let heading = heading_deg.to_radians();
        let velocity = [speed * heading.cos(), speed * heading.sin()];

        let positions = (0..steps)
            .map(|k| {
                let t = k as f64 * dt;
                [start[0] + velocity[0] * t, start[1] + velocity[1] * t]
            })
            .collect();

        Self {
            positions,
            velocity,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Noisy, occasionally blind observer of a trajectory.
#[derive(Debug, Clone)]
pub struct MeasurementSimulator {
    noise: Normal<f64>,
    detection_probability: f64,
    rng: StdRng,
}

impl MeasurementSimulator {
    /// Adds independent Gaussian noise of standard deviation `noise_std` to
    /// each coordinate and always detects.
    ///
    /// # Errors
    /// `InvalidConfig` if `noise_std` is negative or not finite.
    pub fn new(noise_std: f64, seed: u64) -> Result<Self> {
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(TrackError::InvalidConfig {
                parameter: "noise_std",
                value: noise_std,
            });
        }
        let noise = Normal::new(0.0, noise_std).map_err(|_| TrackError::InvalidConfig {
            parameter: "noise_std",
            value: noise_std,
        })?;

        Ok(Self {
            noise,
            detection_probability: 1.0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Sets the chance that any one step produces a detection.
    ///
    /// # Errors
    /// `InvalidConfig` unless `p` lies in `[0, 1]`.
    pub fn with_detection_probability(mut self, p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(TrackError::InvalidConfig {
                parameter: "detection_probability",
                value: p,
            });
        }
        self.detection_probability = p;
        Ok(self)
    }

    /// Observes one true position.
    pub fn observe(&mut self, truth: [f64; 2]) -> Detection<f64> {
        if self.rng.random::<f64>() >= self.detection_probability {
            return Detection::NotDetected;
        }
        let dx = self.noise.sample(&mut self.rng);
        let dy = self.noise.sample(&mut self.rng);
        Detection::at(truth[0] + dx, truth[1] + dy)
    }

    /// Observes every position of a trajectory in order.
    pub fn observe_all(&mut self, trajectory: &Trajectory) -> Vec<Detection<f64>> {
        trajectory
            .positions
            .iter()
            .map(|&p| self.observe(p))
            .collect()
    }
}

/// Mean per-axis absolute error between paired positions.
///
/// Returns `None` when there are no pairs.
pub fn mean_absolute_error<'a, I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (&'a [f64; 2], &'a [f64; 2])>,
{
    let (sum, count) = pairs
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), (estimate, truth)| {
            let err = (estimate[0] - truth[0]).abs() + (estimate[1] - truth[1]).abs();
            (sum + err / 2.0, count + 1)
        });

    (count > 0).then(|| sum / count as f64)
}
