//! Example usage of the cvtrack library
//!
//! Tracks a simulated car driving at constant speed on a 45° heading, with
//! noisy position fixes and a stretch of missed detections.
//!
//! Set `RUST_LOG=cvtrack=debug` to see per-step estimator logs.

use cvtrack::prelude::*;
use cvtrack::simulation::{mean_absolute_error, MeasurementSimulator, Trajectory};
use tracing_subscriber::EnvFilter;

const STEPS: usize = 50;
const SPEED: f64 = 5.0;
const HEADING_DEG: f64 = 45.0;
const MEASUREMENT_NOISE_STD: f64 = 5.0;
const SEED: u64 = 0;

fn main() -> cvtrack::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!("cvtrack: single-object Kalman tracking");
    println!("======================================\n");

    let config = EstimatorConfig::default();
    println!(
        "dt={} init_pos_std={} init_vel_std={} accel_std={} meas_pos_std={}\n",
        config.dt, config.init_pos_std, config.init_vel_std, config.accel_std, config.meas_pos_std
    );

    let truth = Trajectory::constant_heading([0.0, 0.0], SPEED, HEADING_DEG, STEPS, config.dt);
    let mut detections =
        MeasurementSimulator::new(MEASUREMENT_NOISE_STD, SEED)?.observe_all(&truth);

    // Simulate the object being occluded for a few frames
    for d in detections.iter_mut().skip(30).take(5) {
        *d = Detection::NotDetected;
    }

    let mut tracker = Tracker::new(config)?;
    let points = tracker.run(detections.iter().copied())?;

    println!(" step |      truth      |   measurement   |    estimate     | trace");
    for (point, true_pos) in points.iter().zip(&truth.positions) {
        let measured = match point.detection.position() {
            Some([x, y]) => format!("({:6.1}, {:6.1})", x, y),
            None => "  not detected  ".to_string(),
        };
        let [ex, ey] = point.estimate();
        println!(
            " {:4} | ({:6.1}, {:6.1}) | {} | ({:6.1}, {:6.1}) | {:8.2}",
            point.step, true_pos[0], true_pos[1], measured, ex, ey, point.uncertainty
        );
    }

    let tail = STEPS - 20;
    let estimates: Vec<[f64; 2]> = points.iter().map(TrackPoint::estimate).collect();
    let filtered = mean_absolute_error(estimates[tail..].iter().zip(&truth.positions[tail..]));
    let raw_pairs: Vec<([f64; 2], [f64; 2])> = points[tail..]
        .iter()
        .zip(&truth.positions[tail..])
        .filter_map(|(p, t)| p.detection.position().map(|z| (z, *t)))
        .collect();
    let raw = mean_absolute_error(raw_pairs.iter().map(|(z, t)| (z, t)));

    println!();
    if let (Some(filtered), Some(raw)) = (filtered, raw) {
        println!("Mean absolute error over the last 20 steps:");
        println!("  raw measurements: {:.2}", raw);
        println!("  filtered:         {:.2}", filtered);
    }
    let [vx, vy] = tracker.estimator().velocity();
    println!("Final velocity estimate: ({:.2}, {:.2})", vx, vy);

    Ok(())
}
