//! Typed transformation matrices
//!
//! Matrices that transform vectors between spaces, with type-level
//! encoding of source and target spaces, plus the building blocks of the
//! Kalman correction step.

use ::core::marker::PhantomData;
use nalgebra::{Matrix2, RealField, SMatrix, Scalar};

use super::spaces::{
    AccelerationCovariance, AccelerationSpace, Innovation, InnovationSpace, Measurement,
    MeasurementCovariance, MeasurementSpace, StateCovariance, StateSpace, StateVector,
};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A transformation matrix that maps vectors from one space to another.
///
/// # Type Parameters
///
/// - `T`: Scalar type
/// - `ROWS`: Number of rows (dimension of target space)
/// - `COLS`: Number of columns (dimension of source space)
/// - `To`: Target space marker
/// - `From`: Source space marker
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    /// Creates a transform from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where
    SMatrix<T, ROWS, COLS>: Copy,
{
}

/// State transition matrix: StateSpace -> StateSpace
pub type TransitionMatrix<T, const N: usize> = Transform<T, N, N, StateSpace, StateSpace>;

/// Observation matrix: StateSpace -> MeasurementSpace
pub type ObservationMatrix<T, const M: usize, const N: usize> =
    Transform<T, M, N, MeasurementSpace, StateSpace>;

/// Kalman gain: InnovationSpace -> StateSpace
pub type KalmanGain<T, const N: usize, const M: usize> =
    Transform<T, N, M, StateSpace, InnovationSpace>;

/// Noise-mapping matrix: AccelerationSpace -> StateSpace
pub type NoiseGain<T, const N: usize, const K: usize> =
    Transform<T, N, K, StateSpace, AccelerationSpace>;

// ============================================================================
// Specific Transform Applications
// ============================================================================

impl<T: RealField + Copy, const N: usize> TransitionMatrix<T, N> {
    /// Applies the transition to a state vector: F * x
    #[inline]
    pub fn apply_state(&self, state: &StateVector<T, N>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * state.as_svector())
    }

    /// Propagates a covariance matrix: F * P * F^T
    #[inline]
    pub fn propagate_covariance(&self, cov: &StateCovariance<T, N>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const M: usize, const N: usize> ObservationMatrix<T, M, N> {
    /// Applies the observation model to a state vector: H * x
    #[inline]
    pub fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, M> {
        Measurement::from_svector(self.inner * state.as_svector())
    }

    /// Projects state covariance to measurement space: H * P * H^T
    #[inline]
    pub fn project_covariance(&self, cov: &StateCovariance<T, N>) -> MeasurementCovariance<T, M> {
        MeasurementCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize, const M: usize> KalmanGain<T, N, M> {
    /// Applies the Kalman gain to an innovation vector.
    #[inline]
    pub fn correct(&self, innovation: &Innovation<T, M>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * innovation.as_svector())
    }
}

impl<T: RealField + Copy, const N: usize, const K: usize> NoiseGain<T, N, K> {
    /// Maps an acceleration covariance into state space: L * q * L^T
    #[inline]
    pub fn project_noise(&self, q: &AccelerationCovariance<T, K>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * q.as_matrix() * self.inner.transpose())
    }
}

// ============================================================================
// Correction Step
// ============================================================================

/// Inverts a 2x2 matrix in closed form.
///
/// The matrix is normalised by its largest entry first, so very large or
/// very small but regular matrices invert without overflow in the
/// determinant. Returns `None` when the determinant is zero, lost to
/// cancellation (below machine epsilon relative to its terms), or when an
/// entry or the result is not finite.
pub fn invert_2x2<T: RealField + Copy>(m: &Matrix2<T>) -> Option<Matrix2<T>> {
    let scale = m.iter().fold(T::zero(), |acc, v| acc.max(v.abs()));
    if !scale.is_finite() || scale == T::zero() {
        return None;
    }

    let n = m / scale;
    let (a, b, c, d) = (n[(0, 0)], n[(0, 1)], n[(1, 0)], n[(1, 1)]);
    let ad = a * d;
    let bc = b * c;
    let det = ad - bc;

    if !det.is_finite() || det.abs() <= T::default_epsilon() * (ad.abs() + bc.abs()) {
        return None;
    }

    let inv_det = T::one() / det;
    let inverse = Matrix2::new(d * inv_det, -b * inv_det, -c * inv_det, a * inv_det) / scale;
    inverse.iter().all(|v| v.is_finite()).then_some(inverse)
}

/// Computes the innovation covariance.
///
/// S = H * P * H^T + R
pub fn compute_innovation_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> MeasurementCovariance<T, M> {
    obs_matrix.project_covariance(state_cov).add(meas_noise)
}

/// Computes the Kalman gain matrix for a 2-D measurement.
///
/// K = P * H^T * S^{-1}
///
/// Returns `None` if the innovation covariance is singular.
pub fn compute_kalman_gain<T: RealField + Copy, const N: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, 2, N>,
    innovation_cov: &MeasurementCovariance<T, 2>,
) -> Option<KalmanGain<T, N, 2>> {
    let s_inv = invert_2x2(innovation_cov.as_matrix())?;
    let k = state_cov.as_matrix() * obs_matrix.as_matrix().transpose() * s_inv;
    Some(KalmanGain::from_matrix(k))
}

/// Standard covariance update.
///
/// P_updated = (I - K*H) * P
pub fn standard_covariance_update<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    kalman_gain: &KalmanGain<T, N, M>,
    obs_matrix: &ObservationMatrix<T, M, N>,
) -> StateCovariance<T, N> {
    let i_kh = SMatrix::<T, N, N>::identity() - kalman_gain.as_matrix() * obs_matrix.as_matrix();
    StateCovariance::from_matrix(i_kh * state_cov.as_matrix())
}

/// Joseph-form covariance update.
///
/// P_updated = (I - K*H) * P * (I - K*H)^T + K * R * K^T
pub fn joseph_update<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    kalman_gain: &KalmanGain<T, N, M>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> StateCovariance<T, N> {
    let k = kalman_gain.as_matrix();
    let i_kh = SMatrix::<T, N, N>::identity() - k * obs_matrix.as_matrix();

    let term1 = i_kh * state_cov.as_matrix() * i_kh.transpose();
    let term2 = k * meas_noise.as_matrix() * k.transpose();

    StateCovariance::from_matrix(term1 + term2)
}
