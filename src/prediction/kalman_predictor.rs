//! Two 1-D Kalman axis filters plus a confidence heuristic, producing a
//! short catch-up-then-extrapolate trajectory beyond the last raw input.
use std::collections::VecDeque;

use crate::params::{KalmanPredictorParams, PositionModelerParams, SamplingParams};
use crate::position_modeler::PositionModeler;
use crate::prediction::kalman_axis::KalmanAxisPredictor;
use crate::types::{Duration, Time, TipState, Vec2};
use crate::utils::{clamp01, distance, normalize01};

/// The Kalman predictor's current estimate of tip motion, in the same units
/// as the raw input stream (the axis predictors track a unitless
/// per-update step; this rescales by the mean observed inter-update time).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub jerk: Vec2,
}

#[derive(Clone)]
pub struct KalmanPredictor {
    x_axis: KalmanAxisPredictor,
    y_axis: KalmanAxisPredictor,
    params: KalmanPredictorParams,
    sampling: SamplingParams,
    position_modeler_params: PositionModelerParams,
    recent_times: VecDeque<Time>,
    last_position: Option<Vec2>,
}

impl KalmanPredictor {
    pub fn new(
        params: KalmanPredictorParams,
        sampling: SamplingParams,
        position_modeler_params: PositionModelerParams,
    ) -> Self {
        Self {
            x_axis: KalmanAxisPredictor::new(&params),
            y_axis: KalmanAxisPredictor::new(&params),
            params,
            sampling,
            position_modeler_params,
            recent_times: VecDeque::new(),
            last_position: None,
        }
    }

    pub fn reset(&mut self) {
        self.x_axis.reset(0.0);
        self.y_axis.reset(0.0);
        self.recent_times.clear();
        self.last_position = None;
    }

    pub fn update(&mut self, position: Vec2, time: Time) {
        self.x_axis.update(position.x as f64);
        self.y_axis.update(position.y as f64);
        self.recent_times.push_back(time);
        while self.recent_times.len() > self.params.max_time_samples {
            self.recent_times.pop_front();
        }
        self.last_position = Some(position);
    }

    fn mean_dt(&self) -> f64 {
        if self.recent_times.len() < 2 {
            return 1.0 / self.sampling.min_output_rate;
        }
        let span = self.recent_times.back().unwrap().0 - self.recent_times.front().unwrap().0;
        (span / (self.recent_times.len() - 1) as f64).max(1e-9)
    }

    pub fn stable(&self) -> bool {
        self.x_axis.stable() && self.y_axis.stable()
    }

    /// `None` until both axis filters have seen `min_stable_iteration`
    /// updates.
    pub fn estimated_state(&self) -> Option<EstimatedState> {
        if !self.stable() {
            return None;
        }
        let dt = self.mean_dt();
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        Some(EstimatedState {
            position: Vec2::new(self.x_axis.position() as f32, self.y_axis.position() as f32),
            velocity: Vec2::new(
                (self.x_axis.velocity() / dt) as f32,
                (self.y_axis.velocity() / dt) as f32,
            ),
            acceleration: Vec2::new(
                (self.x_axis.acceleration() / dt2) as f32,
                (self.y_axis.acceleration() / dt2) as f32,
            ),
            jerk: Vec2::new((self.x_axis.jerk() / dt3) as f32, (self.y_axis.jerk() / dt3) as f32),
        })
    }

    fn cubic_position(&self, estimate: EstimatedState, tau: f32) -> Vec2 {
        estimate.position
            + estimate.velocity * tau
            + estimate.acceleration * (self.params.acceleration_weight * tau * tau)
            + estimate.jerk * (self.params.jerk_weight * tau * tau * tau)
    }

    fn confidence(&self, estimate: EstimatedState) -> f32 {
        let sample_count_ratio =
            clamp01(self.recent_times.len() as f32 / self.params.confidence.desired_number_of_samples as f32);

        let last_raw = self.last_position.unwrap_or(estimate.position);
        let estimation_distance_confidence = 1.0
            - clamp01(distance(estimate.position, last_raw) / self.params.confidence.max_estimation_distance);

        let prediction_interval = self.params.prediction_interval as f32;
        let travel_speed = (estimate.velocity * prediction_interval).magnitude();
        let speed_confidence = normalize01(
            self.params.confidence.min_travel_speed,
            self.params.confidence.max_travel_speed,
            travel_speed,
        );

        let cubic_endpoint = self.cubic_position(estimate, prediction_interval);
        let linear_endpoint = estimate.position + estimate.velocity * prediction_interval;
        let deviation = distance(cubic_endpoint, linear_endpoint);
        let linearity_confidence = crate::utils::lerp(
            self.params.confidence.baseline_linearity_confidence,
            1.0,
            1.0 - clamp01(deviation / self.params.confidence.max_linear_deviation),
        );

        sample_count_ratio * estimation_distance_confidence * speed_confidence * linearity_confidence
    }

    /// Produces a catch-up segment from `last_tip` to the current estimate,
    /// followed by a cubic extrapolation out to `confidence *
    /// prediction_interval`. Never mutates `self`.
    pub fn construct_prediction(&self, last_tip: TipState) -> Vec<TipState> {
        let Some(estimate) = self.estimated_state() else {
            return Vec::new();
        };

        let mut modeler = PositionModeler::new(self.position_modeler_params, self.sampling, last_tip);
        let mut out = Vec::new();
        let step_duration = Duration(1.0 / self.sampling.min_output_rate);

        let catchup_distance = distance(last_tip.position, estimate.position);
        if catchup_distance > 0.0 {
            let catchup_duration = (catchup_distance / self.params.min_catchup_velocity.max(1e-6)) as f64;
            let n_steps = ((catchup_duration * self.sampling.min_output_rate).ceil() as usize)
                .clamp(1, self.sampling.max_outputs_per_call);
            let end_time = last_tip.time + Duration(catchup_duration);
            out.extend(modeler.update_along_linear_path(
                last_tip.position,
                last_tip.time,
                estimate.position,
                end_time,
                n_steps,
            ));
        }

        let confidence = self.confidence(estimate);
        let extrapolation_bound = confidence * self.params.prediction_interval as f32;
        let mut tau = 1.0 / self.sampling.min_output_rate as f32;
        while tau <= extrapolation_bound {
            let position = self.cubic_position(estimate, tau);
            let time = last_tip.time + step_duration * (out.len() as f64 + 1.0);
            out.push(modeler.update(position, time));
            tau += 1.0 / self.sampling.min_output_rate as f32;
        }

        out
    }
}
