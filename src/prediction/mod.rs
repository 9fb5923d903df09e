//! Prediction variants, unified behind one tagged enum. `Predictor::Disabled`
//! exists so a client can turn prediction off entirely; `predict_into` on
//! that variant always fails, since there is nothing to predict.
mod kalman_axis;
mod kalman_predictor;
mod stroke_end;

pub use kalman_predictor::{EstimatedState, KalmanPredictor};
pub use stroke_end::StrokeEndPredictor;

use crate::error::ModelerError;
use crate::params::{PositionModelerParams, PredictionParams, SamplingParams};
use crate::types::{Time, TipState, Vec2};

#[derive(Clone)]
pub enum Predictor {
    Kalman(KalmanPredictor),
    StrokeEnd(StrokeEndPredictor),
    Disabled,
}

impl Predictor {
    pub fn new(
        prediction: PredictionParams,
        sampling: SamplingParams,
        position_modeler_params: PositionModelerParams,
    ) -> Self {
        match prediction {
            PredictionParams::Kalman(params) => {
                Predictor::Kalman(KalmanPredictor::new(params, sampling, position_modeler_params))
            }
            PredictionParams::StrokeEnd(_) => {
                Predictor::StrokeEnd(StrokeEndPredictor::new(position_modeler_params, sampling))
            }
            PredictionParams::Disabled(_) => Predictor::Disabled,
        }
    }

    pub fn reset(&mut self) {
        match self {
            Predictor::Kalman(p) => p.reset(),
            Predictor::StrokeEnd(p) => p.reset(),
            Predictor::Disabled => {}
        }
    }

    pub fn update(&mut self, position: Vec2, time: Time) {
        match self {
            Predictor::Kalman(p) => p.update(position, time),
            Predictor::StrokeEnd(p) => p.update(position, time),
            Predictor::Disabled => {}
        }
    }

    pub fn predict_into(&self, current_tip: TipState) -> Result<Vec<TipState>, ModelerError> {
        match self {
            Predictor::Kalman(p) => Ok(p.construct_prediction(current_tip)),
            Predictor::StrokeEnd(p) => Ok(p.construct_prediction(current_tip)),
            Predictor::Disabled => Err(ModelerError::FailedPrecondition {
                reason: "prediction is disabled",
            }),
        }
    }
}
