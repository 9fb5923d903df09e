//! Moving average of tip speed, used by the position modeler to blend its
//! spring-mass output toward the raw input polyline and counteract the
//! tendency of a damped spring to shrink sharp loops.
use std::collections::VecDeque;

use crate::params::LoopContractionMitigationParams;
use crate::types::{Time, Vec2};
use crate::utils::{clamp01, inverse_lerp, lerp};

#[derive(Clone)]
struct SpeedSample {
    speed: f32,
    time: Time,
}

#[derive(Clone)]
pub struct LoopContractionMitigator {
    params: LoopContractionMitigationParams,
    samples: VecDeque<SpeedSample>,
    saved: Option<VecDeque<SpeedSample>>,
}

impl LoopContractionMitigator {
    pub fn new(params: LoopContractionMitigationParams) -> Self {
        Self {
            params,
            samples: VecDeque::new(),
            saved: None,
        }
    }

    pub fn reset(&mut self, params: LoopContractionMitigationParams) {
        self.params = params;
        self.samples.clear();
        self.saved = None;
    }

    /// Records a velocity sample and returns the interpolation strength to
    /// apply this step: 1 means "use the spring model output unaltered".
    pub fn update(&mut self, velocity: Vec2, time: Time) -> f32 {
        if !self.params.is_enabled {
            return 1.0;
        }

        self.samples.push_back(SpeedSample {
            speed: velocity.magnitude(),
            time,
        });

        while self.samples.len() > self.params.min_discrete_speed_samples {
            let window = self
                .samples
                .back()
                .map(|back| back.time.0 - self.samples.front().unwrap().time.0)
                .unwrap_or(0.0);
            if window < self.params.min_speed_sampling_window {
                break;
            }
            self.samples.pop_front();
        }

        self.interpolation_value()
    }

    fn interpolation_value(&self) -> f32 {
        if !self.params.is_enabled || self.samples.is_empty() {
            return 1.0;
        }
        let average_speed: f32 =
            self.samples.iter().map(|s| s.speed).sum::<f32>() / self.samples.len() as f32;
        let ratio = clamp01(inverse_lerp(
            self.params.speed_lower_bound,
            self.params.speed_upper_bound,
            average_speed,
        ));
        lerp(
            self.params.interpolation_strength_at_speed_lower_bound,
            self.params.interpolation_strength_at_speed_upper_bound,
            ratio,
        )
    }

    pub fn save(&mut self) {
        self.saved = Some(self.samples.clone());
    }

    pub fn restore(&mut self) {
        if let Some(saved) = &self.saved {
            self.samples = saved.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_params() -> LoopContractionMitigationParams {
        LoopContractionMitigationParams {
            is_enabled: true,
            speed_lower_bound: 0.1,
            speed_upper_bound: 1.0,
            interpolation_strength_at_speed_lower_bound: 0.0,
            interpolation_strength_at_speed_upper_bound: 1.0,
            min_speed_sampling_window: 0.1,
            min_discrete_speed_samples: 2,
        }
    }

    #[test]
    fn disabled_returns_one() {
        let mut m = LoopContractionMitigator::new(LoopContractionMitigationParams::default());
        assert_eq!(m.update(Vec2::new(5.0, 0.0), Time(0.0)), 1.0);
    }

    #[test]
    fn empty_returns_one() {
        let m = LoopContractionMitigator::new(enabled_params());
        assert_eq!(m.interpolation_value(), 1.0);
    }

    #[test]
    fn low_speed_interpolates_toward_lower_bound_strength() {
        let mut m = LoopContractionMitigator::new(enabled_params());
        let v = m.update(Vec2::new(0.05, 0.0), Time(0.0));
        assert!((v - 0.0).abs() < 1e-3);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut m = LoopContractionMitigator::new(enabled_params());
        m.update(Vec2::new(0.5, 0.0), Time(0.0));
        m.save();
        let before = m.interpolation_value();
        m.update(Vec2::new(5.0, 0.0), Time(1.0));
        m.restore();
        assert_eq!(m.interpolation_value(), before);
        // idempotent
        m.restore();
        assert_eq!(m.interpolation_value(), before);
    }
}
