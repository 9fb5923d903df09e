//! A constant-jerk 1-D Kalman filter. Two of these, one per axis, back the
//! 2D Kalman predictor. The state transition assumes a single unit step
//! (`Delta t = 1`); the caller (the 2D predictor) tracks real elapsed time
//! separately and rescales the velocity/acceleration/jerk estimates after
//! the fact, so this filter never needs to know the wall-clock step size.
use nalgebra::{SMatrix, SVector};

use crate::params::KalmanPredictorParams;

type State = SVector<f64, 4>;
type Cov = SMatrix<f64, 4, 4>;

#[rustfmt::skip]
fn transition() -> SMatrix<f64, 4, 4> {
    SMatrix::<f64, 4, 4>::new(
        1.0, 1.0, 0.5, 1.0 / 6.0,
        0.0, 1.0, 1.0, 0.5,
        0.0, 0.0, 1.0, 1.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

fn observation() -> SMatrix<f64, 1, 4> {
    SMatrix::<f64, 1, 4>::new(1.0, 0.0, 0.0, 0.0)
}

/// State vector: [position, velocity, acceleration, jerk].
#[derive(Clone)]
pub struct KalmanAxisPredictor {
    state: State,
    covariance: Cov,
    process_noise: f64,
    measurement_noise: f64,
    min_stable_iteration: usize,
    iterations: usize,
}

impl KalmanAxisPredictor {
    pub fn new(params: &KalmanPredictorParams) -> Self {
        let mut p = Self {
            state: State::zeros(),
            covariance: Cov::identity(),
            process_noise: params.process_noise,
            measurement_noise: params.measurement_noise,
            min_stable_iteration: params.min_stable_iteration,
            iterations: 0,
        };
        p.reset(0.0);
        p
    }

    pub fn reset(&mut self, position: f64) {
        self.state = State::new(position, 0.0, 0.0, 0.0);
        // Large initial covariance: the filter has no confidence in its
        // velocity/acceleration/jerk components until a few updates arrive.
        self.covariance = Cov::identity() * 1.0e6;
        self.iterations = 0;
    }

    /// Runs one predict/update step against measurement `z`.
    pub fn update(&mut self, z: f64) {
        let f = transition();
        let predicted_state = f * self.state;
        let q = Cov::identity() * self.process_noise;
        let predicted_covariance = f * self.covariance * f.transpose() + q;

        let h = observation();
        let r = self.measurement_noise;
        let innovation = z - (h * predicted_state)[(0, 0)];
        let innovation_covariance = (h * predicted_covariance * h.transpose())[(0, 0)] + r;
        let kalman_gain = predicted_covariance * h.transpose() / innovation_covariance;

        self.state = predicted_state + kalman_gain * innovation;
        let identity_minus_kh = Cov::identity() - kalman_gain * h;
        // Keep the covariance symmetric by construction rather than relying
        // on float arithmetic to preserve it across many updates.
        let updated = identity_minus_kh * predicted_covariance;
        self.covariance = (updated + updated.transpose()) * 0.5;
        self.iterations += 1;
    }

    pub fn stable(&self) -> bool {
        self.iterations >= self.min_stable_iteration
    }

    pub fn position(&self) -> f64 {
        self.state[0]
    }

    pub fn velocity(&self) -> f64 {
        self.state[1]
    }

    pub fn acceleration(&self) -> f64 {
        self.state[2]
    }

    pub fn jerk(&self) -> f64 {
        self.state[3]
    }
}
