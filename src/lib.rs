//! Online stroke modeling: turns a raw stream of stylus/touch events into a
//! smoothed, physically-plausible polyline with optional short-horizon
//! prediction past the last received input.
//!
//! [`StrokeModeler`] is the entry point: configure it with
//! [`StrokeModelParams`], feed it [`Input`] events via `update`, and read
//! back [`Result`] samples.

// Modules
mod engine;
mod error;
mod loop_contraction;
mod params;
mod position_modeler;
mod prediction;
mod stylus_state_modeler;
mod types;
mod utils;
mod wobble_smoother;

#[cfg(test)]
extern crate approx;

// Re-exports: the public modeling surface.
pub use engine::StrokeModeler;
pub use error::{ElementError, ElementOrderError, ModelerError};
pub use params::{
    DisabledPredictorParams, KalmanConfidenceParams, KalmanPredictorParams,
    LoopContractionMitigationParams, PositionModelerParams, PredictionParams, SamplingParams,
    StrokeEndPredictorParams, StrokeModelParams, StylusStateModelerParams, WobbleSmootherParams,
};
pub use prediction::{EstimatedState, KalmanPredictor, Predictor, StrokeEndPredictor};
pub use types::{Duration, Input, InputEventType, Result, StylusState, Time, TipState, Vec2, UNKNOWN};
