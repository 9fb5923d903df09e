//! Low-pass filter on raw positions: a time-weighted moving average blended
//! with the raw position by speed, so slow movement (where quantization
//! jitter dominates) gets smoothed and fast movement (where lag would
//! dominate) passes through untouched.
use std::collections::VecDeque;

use crate::params::WobbleSmootherParams;
use crate::types::{Time, Vec2};
use crate::utils::{interp, normalize01};

#[derive(Clone)]
struct Sample {
    position: Vec2,
    weighted_position: Vec2,
    distance: f32,
    duration: f64,
    time: Time,
}

struct SavedState {
    samples: VecDeque<Sample>,
    weighted_position_sum: Vec2,
    distance_sum: f32,
    duration_sum: f64,
}

pub struct WobbleSmoother {
    params: WobbleSmootherParams,
    samples: VecDeque<Sample>,
    weighted_position_sum: Vec2,
    distance_sum: f32,
    duration_sum: f64,
    saved: Option<SavedState>,
}

impl WobbleSmoother {
    pub fn new(params: WobbleSmootherParams) -> Self {
        let mut s = Self {
            params,
            samples: VecDeque::new(),
            weighted_position_sum: Vec2::ZERO,
            distance_sum: 0.0,
            duration_sum: 0.0,
            saved: None,
        };
        s.reset(params, Vec2::ZERO, Time(0.0));
        s
    }

    pub fn reset(&mut self, params: WobbleSmootherParams, position: Vec2, time: Time) {
        self.params = params;
        self.samples.clear();
        self.weighted_position_sum = Vec2::ZERO;
        self.distance_sum = 0.0;
        self.duration_sum = 0.0;
        self.saved = None;
        self.samples.push_back(Sample {
            position,
            weighted_position: Vec2::ZERO,
            distance: 0.0,
            duration: 0.0,
            time,
        });
    }

    /// Feeds a new raw position and returns the corrected one.
    pub fn update(&mut self, position: Vec2, time: Time) -> Vec2 {
        if !self.params.is_enabled {
            return position;
        }

        let last = self.samples.back().expect("reset() always seeds one sample");
        let duration = (time - last.time).seconds();
        let weighted_position = position * (duration as f32);
        let distance = (position - last.position).magnitude();

        self.samples.push_back(Sample {
            position,
            weighted_position,
            distance,
            duration,
            time,
        });
        self.weighted_position_sum = self.weighted_position_sum + weighted_position;
        self.distance_sum += distance;
        self.duration_sum += duration;

        while self
            .samples
            .front()
            .map(|s| s.time.0 < time.0 - self.params.timeout)
            .unwrap_or(false)
        {
            let front = self.samples.pop_front().unwrap();
            self.weighted_position_sum = self.weighted_position_sum - front.weighted_position;
            self.distance_sum -= front.distance;
            self.duration_sum -= front.duration;
        }

        if self.duration_sum <= 0.0 {
            return position;
        }

        let average_position = self.weighted_position_sum / (self.duration_sum as f32);
        let average_speed = self.distance_sum / (self.duration_sum as f32);
        let t = normalize01(self.params.speed_floor, self.params.speed_ceiling, average_speed);
        interp(average_position, position, t)
    }

    pub fn save(&mut self) {
        self.saved = Some(SavedState {
            samples: self.samples.clone(),
            weighted_position_sum: self.weighted_position_sum,
            distance_sum: self.distance_sum,
            duration_sum: self.duration_sum,
        });
    }

    pub fn restore(&mut self) {
        if let Some(saved) = &self.saved {
            self.samples = saved.samples.clone();
            self.weighted_position_sum = saved.weighted_position_sum;
            self.distance_sum = saved.distance_sum;
            self.duration_sum = saved.duration_sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WobbleSmootherParams {
        WobbleSmootherParams::default()
    }

    #[test]
    fn first_sample_passes_through() {
        let mut s = WobbleSmoother::new(params());
        s.reset(params(), Vec2::new(1.0, 2.0), Time(0.0));
        let out = s.update(Vec2::new(1.0, 2.0), Time(0.001));
        assert!((out.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fast_motion_bypasses_smoothing() {
        let mut s = WobbleSmoother::new(params());
        s.reset(params(), Vec2::ZERO, Time(0.0));
        // speed well above speed_ceiling (1.44): segment of length 10 in 0.01s.
        let out = s.update(Vec2::new(10.0, 0.0), Time(0.01));
        assert!((out.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn disabled_smoother_is_identity() {
        let mut p = params();
        p.is_enabled = false;
        let mut s = WobbleSmoother::new(p);
        s.reset(p, Vec2::ZERO, Time(0.0));
        let out = s.update(Vec2::new(0.001, 0.0), Time(0.001));
        assert_eq!(out, Vec2::new(0.001, 0.0));
    }

    #[test]
    fn stale_samples_are_dropped() {
        let mut s = WobbleSmoother::new(params());
        s.reset(params(), Vec2::ZERO, Time(0.0));
        s.update(Vec2::new(0.01, 0.0), Time(0.01));
        // jump far beyond the timeout window: old samples should no longer
        // contribute and the average should track the new position closely.
        let out = s.update(Vec2::new(0.02, 0.0), Time(1.0));
        assert!((out.x - 0.02).abs() < 1e-3);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut s = WobbleSmoother::new(params());
        s.reset(params(), Vec2::ZERO, Time(0.0));
        s.update(Vec2::new(0.001, 0.0), Time(0.001));
        s.save();
        let before = s.duration_sum;

        s.update(Vec2::new(0.5, 0.0), Time(0.5));
        s.restore();
        assert_eq!(s.duration_sum, before);
        // idempotent
        s.restore();
        assert_eq!(s.duration_sum, before);
    }
}
