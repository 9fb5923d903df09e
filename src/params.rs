//! The full tunable parameter surface. Every sub-struct carries the
//! `suggested()` defaults used throughout the test vectors in `spec.md` and
//! `original_source/ink_stroke_modeler/params.h`, plus a `validate()` that
//! folds every finite/positive/ordered constraint into a single error
//! string on failure.
use crate::error::ModelerError;

/// Low-pass filter that dampens high-frequency quantization noise before
/// the position modeler sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WobbleSmootherParams {
    pub is_enabled: bool,
    /// Width of the moving-average window.
    pub timeout: f64,
    /// Below this average speed, full smoothing is applied.
    pub speed_floor: f32,
    /// Above this average speed, no smoothing is applied.
    pub speed_ceiling: f32,
}

impl Default for WobbleSmootherParams {
    fn default() -> Self {
        Self {
            is_enabled: true,
            timeout: 0.04,
            speed_floor: 1.31,
            speed_ceiling: 1.44,
        }
    }
}

/// Moving average of recent speed, used to blend the spring-mass output
/// toward the raw polyline and counteract loop contraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopContractionMitigationParams {
    pub is_enabled: bool,
    pub speed_lower_bound: f32,
    pub speed_upper_bound: f32,
    pub interpolation_strength_at_speed_lower_bound: f32,
    pub interpolation_strength_at_speed_upper_bound: f32,
    pub min_speed_sampling_window: f64,
    pub min_discrete_speed_samples: usize,
}

impl Default for LoopContractionMitigationParams {
    fn default() -> Self {
        Self {
            is_enabled: false,
            speed_lower_bound: -1.0,
            speed_upper_bound: -1.0,
            interpolation_strength_at_speed_lower_bound: -1.0,
            interpolation_strength_at_speed_upper_bound: -1.0,
            min_speed_sampling_window: -1.0,
            min_discrete_speed_samples: 0,
        }
    }
}

/// The spring-mass integrator's constants plus the loop-contraction
/// mitigator's parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionModelerParams {
    pub spring_mass_constant: f32,
    pub drag_constant: f32,
    pub loop_contraction_mitigation: LoopContractionMitigationParams,
}

impl Default for PositionModelerParams {
    fn default() -> Self {
        Self {
            spring_mass_constant: 11.0 / 32400.0,
            drag_constant: 72.0,
            loop_contraction_mitigation: LoopContractionMitigationParams::default(),
        }
    }
}

/// Governs upsampling between raw inputs and end-of-stroke relaxation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub min_output_rate: f64,
    pub end_of_stroke_stopping_distance: f32,
    pub end_of_stroke_max_iterations: usize,
    pub max_outputs_per_call: usize,
    /// When in `(0, pi)`, upsampling doubles the step count if the
    /// estimated turn angle between consecutive steps would exceed this
    /// bound. A negative value disables the rule.
    pub max_estimated_angle_to_traverse_per_input: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            min_output_rate: 180.0,
            end_of_stroke_stopping_distance: 0.001,
            end_of_stroke_max_iterations: 20,
            max_outputs_per_call: 20,
            max_estimated_angle_to_traverse_per_input: -1.0,
        }
    }
}

/// Controls how the pressure/tilt/orientation polyline is retained and
/// queried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylusStateModelerParams {
    pub max_input_samples: usize,
    pub use_stroke_normal_projection: bool,
    /// Only used in stroke-normal mode: minimal retained sample count.
    pub min_input_samples: usize,
    /// Only used in stroke-normal mode: minimal retained time span.
    pub min_sample_duration: f64,
}

impl Default for StylusStateModelerParams {
    fn default() -> Self {
        Self {
            max_input_samples: 10,
            use_stroke_normal_projection: false,
            min_input_samples: 0,
            min_sample_duration: 0.0,
        }
    }
}

/// Confidence heuristics for the Kalman 2D predictor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanConfidenceParams {
    pub desired_number_of_samples: usize,
    pub max_estimation_distance: f32,
    pub min_travel_speed: f32,
    pub max_travel_speed: f32,
    pub max_linear_deviation: f32,
    pub baseline_linearity_confidence: f32,
}

impl Default for KalmanConfidenceParams {
    fn default() -> Self {
        Self {
            desired_number_of_samples: 20,
            max_estimation_distance: 1.5,
            min_travel_speed: 1.0,
            max_travel_speed: 1.5,
            max_linear_deviation: 10.0,
            baseline_linearity_confidence: 0.4,
        }
    }
}

/// Parameters for the Kalman-filter-based predictor (`§4.6`/`§4.7`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanPredictorParams {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub min_stable_iteration: usize,
    pub max_time_samples: usize,
    pub min_catchup_velocity: f32,
    pub acceleration_weight: f32,
    pub jerk_weight: f32,
    pub prediction_interval: f64,
    pub confidence: KalmanConfidenceParams,
}

impl Default for KalmanPredictorParams {
    fn default() -> Self {
        Self {
            process_noise: 1.0,
            measurement_noise: 1.0,
            min_stable_iteration: 4,
            max_time_samples: 20,
            min_catchup_velocity: 0.02,
            acceleration_weight: 0.5,
            jerk_weight: 0.1,
            prediction_interval: 0.02,
            confidence: KalmanConfidenceParams::default(),
        }
    }
}

/// Marker: no tunables, the stroke-end predictor only uses
/// `SamplingParams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrokeEndPredictorParams;

/// Marker: prediction is turned off; `predict()` always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisabledPredictorParams;

/// Which predictor flavor is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictionParams {
    StrokeEnd(StrokeEndPredictorParams),
    Kalman(KalmanPredictorParams),
    Disabled(DisabledPredictorParams),
}

impl Default for PredictionParams {
    fn default() -> Self {
        PredictionParams::StrokeEnd(StrokeEndPredictorParams)
    }
}

/// The full configuration for one `StrokeModeler`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrokeModelParams {
    pub wobble_smoother: WobbleSmootherParams,
    pub position_modeler: PositionModelerParams,
    pub sampling: SamplingParams,
    pub stylus_state_modeler: StylusStateModelerParams,
    pub prediction: PredictionParams,
}

impl StrokeModelParams {
    /// Reasonable defaults, matching `spec.md`'s representative scenarios.
    pub fn suggested() -> Self {
        Self::default()
    }

    /// Validates every finite/positive/ordered constraint. Collects every
    /// violation into a single descriptive string rather than failing on
    /// the first one, mirroring the source library's param validators.
    pub fn validate(self) -> std::result::Result<Self, String> {
        let mut checks: Vec<(bool, &str)> = vec![
            (
                self.position_modeler.spring_mass_constant > 0.0,
                "position_modeler.spring_mass_constant must be positive",
            ),
            (
                self.position_modeler.drag_constant > 0.0,
                "position_modeler.drag_constant must be positive",
            ),
            (
                self.sampling.min_output_rate > 0.0,
                "sampling.min_output_rate must be positive",
            ),
            (
                self.sampling.end_of_stroke_stopping_distance > 0.0,
                "sampling.end_of_stroke_stopping_distance must be positive",
            ),
            (
                self.sampling.end_of_stroke_max_iterations > 0
                    && self.sampling.end_of_stroke_max_iterations < 1000,
                "sampling.end_of_stroke_max_iterations must be in (0, 1000)",
            ),
            (
                self.sampling.max_outputs_per_call > 0,
                "sampling.max_outputs_per_call must be positive",
            ),
            (
                self.stylus_state_modeler.max_input_samples > 0,
                "stylus_state_modeler.max_input_samples must be positive",
            ),
        ];

        if self.wobble_smoother.is_enabled {
            checks.push((
                self.wobble_smoother.timeout > 0.0,
                "wobble_smoother.timeout must be positive",
            ));
            checks.push((
                self.wobble_smoother.speed_floor > 0.0,
                "wobble_smoother.speed_floor must be positive",
            ));
            checks.push((
                self.wobble_smoother.speed_ceiling > 0.0,
                "wobble_smoother.speed_ceiling must be positive",
            ));
            checks.push((
                self.wobble_smoother.speed_floor < self.wobble_smoother.speed_ceiling,
                "wobble_smoother.speed_floor must be strictly less than speed_ceiling",
            ));
        }

        let lc = self.position_modeler.loop_contraction_mitigation;
        if lc.is_enabled {
            checks.push((
                self.stylus_state_modeler.use_stroke_normal_projection,
                "loop_contraction_mitigation requires stylus_state_modeler.use_stroke_normal_projection",
            ));
            checks.push((
                lc.speed_lower_bound >= 0.0,
                "loop_contraction_mitigation.speed_lower_bound must be non-negative",
            ));
            checks.push((
                lc.speed_lower_bound < lc.speed_upper_bound,
                "loop_contraction_mitigation.speed_lower_bound must be less than speed_upper_bound",
            ));
            checks.push((
                (0.0..=1.0).contains(&lc.interpolation_strength_at_speed_lower_bound),
                "loop_contraction_mitigation.interpolation_strength_at_speed_lower_bound must be in [0, 1]",
            ));
            checks.push((
                (0.0..=1.0).contains(&lc.interpolation_strength_at_speed_upper_bound),
                "loop_contraction_mitigation.interpolation_strength_at_speed_upper_bound must be in [0, 1]",
            ));
            checks.push((
                lc.min_speed_sampling_window >= 0.0,
                "loop_contraction_mitigation.min_speed_sampling_window must be non-negative",
            ));
        }

        if self.sampling.max_estimated_angle_to_traverse_per_input >= 0.0 {
            checks.push((
                self.sampling.max_estimated_angle_to_traverse_per_input > 0.0
                    && self.sampling.max_estimated_angle_to_traverse_per_input
                        < std::f32::consts::PI,
                "sampling.max_estimated_angle_to_traverse_per_input must be in (0, pi)",
            ));
        }

        if self.stylus_state_modeler.use_stroke_normal_projection {
            checks.push((
                self.stylus_state_modeler.min_input_samples > 0,
                "stylus_state_modeler.min_input_samples must be positive in stroke-normal mode",
            ));
            checks.push((
                self.stylus_state_modeler.min_sample_duration > 0.0,
                "stylus_state_modeler.min_sample_duration must be positive in stroke-normal mode",
            ));
        }

        if let PredictionParams::Kalman(k) = self.prediction {
            checks.push((k.process_noise > 0.0, "kalman.process_noise must be positive"));
            checks.push((
                k.measurement_noise > 0.0,
                "kalman.measurement_noise must be positive",
            ));
            checks.push((
                k.min_stable_iteration > 0,
                "kalman.min_stable_iteration must be positive",
            ));
            checks.push((k.max_time_samples > 0, "kalman.max_time_samples must be positive"));
            checks.push((
                k.min_catchup_velocity >= 0.0,
                "kalman.min_catchup_velocity must be non-negative",
            ));
            checks.push((k.prediction_interval > 0.0, "kalman.prediction_interval must be positive"));
            checks.push((
                k.confidence.desired_number_of_samples > 0,
                "kalman.confidence.desired_number_of_samples must be positive",
            ));
            checks.push((
                k.confidence.max_estimation_distance > 0.0,
                "kalman.confidence.max_estimation_distance must be positive",
            ));
            checks.push((
                k.confidence.min_travel_speed >= 0.0,
                "kalman.confidence.min_travel_speed must be non-negative",
            ));
            checks.push((
                k.confidence.min_travel_speed < k.confidence.max_travel_speed,
                "kalman.confidence.min_travel_speed must be less than max_travel_speed",
            ));
            checks.push((
                k.confidence.max_linear_deviation > 0.0,
                "kalman.confidence.max_linear_deviation must be positive",
            ));
            checks.push((
                (0.0..=1.0).contains(&k.confidence.baseline_linearity_confidence),
                "kalman.confidence.baseline_linearity_confidence must be in [0, 1]",
            ));
        }

        let failures: Vec<&str> = checks.into_iter().filter(|(ok, _)| !ok).map(|(_, msg)| msg).collect();

        if failures.is_empty() {
            Ok(self)
        } else {
            Err(format!("invalid StrokeModelParams: {}", failures.join("; ")))
        }
    }

    pub(crate) fn validate_to_error(self) -> std::result::Result<Self, ModelerError> {
        self.validate().map_err(|reason| ModelerError::InvalidParams { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_params_are_valid() {
        assert!(StrokeModelParams::suggested().validate().is_ok());
    }

    #[test]
    fn invalid_position_modeler_params_rejected() {
        let mut params = StrokeModelParams::suggested();
        params.position_modeler.spring_mass_constant = -1.0;
        params.position_modeler.drag_constant = -1.0;
        let err = params.validate().unwrap_err();
        assert!(err.contains("spring_mass_constant"));
        assert!(err.contains("drag_constant"));
    }

    #[test]
    fn invalid_sampling_params_rejected() {
        let mut params = StrokeModelParams::suggested();
        params.sampling.min_output_rate = 0.0;
        params.sampling.end_of_stroke_max_iterations = 0;
        params.sampling.max_outputs_per_call = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn invalid_wobble_smoother_params_rejected() {
        let mut params = StrokeModelParams::suggested();
        params.wobble_smoother.speed_floor = 10.0;
        params.wobble_smoother.speed_ceiling = 1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn loop_contraction_requires_stroke_normal_projection() {
        let mut params = StrokeModelParams::suggested();
        params.position_modeler.loop_contraction_mitigation = LoopContractionMitigationParams {
            is_enabled: true,
            speed_lower_bound: 0.1,
            speed_upper_bound: 1.0,
            interpolation_strength_at_speed_lower_bound: 0.2,
            interpolation_strength_at_speed_upper_bound: 1.0,
            min_speed_sampling_window: 0.1,
            min_discrete_speed_samples: 3,
        };
        assert!(params.validate().is_err());

        params.stylus_state_modeler.use_stroke_normal_projection = true;
        params.stylus_state_modeler.min_input_samples = 2;
        params.stylus_state_modeler.min_sample_duration = 0.01;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn invalid_kalman_predictor_params_rejected() {
        let mut params = StrokeModelParams::suggested();
        params.prediction = PredictionParams::Kalman(KalmanPredictorParams {
            process_noise: -1.0,
            ..KalmanPredictorParams::default()
        });
        assert!(params.validate().is_err());

        params.prediction = PredictionParams::Kalman(KalmanPredictorParams::default());
        assert!(params.validate().is_ok());
    }
}
