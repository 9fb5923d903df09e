//! Alternative to the Kalman predictor: rather than extrapolating forward,
//! this just runs the position modeler's end-of-stroke relaxation from
//! wherever the tip currently is toward the last raw input, with no new
//! anchor arriving. Produces no forward extrapolation past that point.
use crate::params::{PositionModelerParams, SamplingParams};
use crate::position_modeler::PositionModeler;
use crate::types::{Duration, Time, TipState, Vec2};

#[derive(Clone)]
pub struct StrokeEndPredictor {
    position_modeler_params: PositionModelerParams,
    sampling: SamplingParams,
    last_position: Option<Vec2>,
}

impl StrokeEndPredictor {
    pub fn new(position_modeler_params: PositionModelerParams, sampling: SamplingParams) -> Self {
        Self {
            position_modeler_params,
            sampling,
            last_position: None,
        }
    }

    pub fn reset(&mut self) {
        self.last_position = None;
    }

    pub fn update(&mut self, position: Vec2, _time: Time) {
        self.last_position = Some(position);
    }

    /// Never mutates `self`; runs a throwaway position modeler seeded at
    /// `last_tip` forward until it settles near the last raw input.
    pub fn construct_prediction(&self, last_tip: TipState) -> Vec<TipState> {
        let Some(final_anchor) = self.last_position else {
            return Vec::new();
        };
        let mut modeler = PositionModeler::new(self.position_modeler_params, self.sampling, last_tip);
        modeler.model_end_of_stroke(
            final_anchor,
            Duration(1.0 / self.sampling.min_output_rate),
            self.sampling.end_of_stroke_max_iterations,
            self.sampling.end_of_stroke_stopping_distance,
        )
    }
}
