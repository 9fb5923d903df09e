//! The orchestrator: a small event state machine (`Uninitialized` ->
//! `Idle` -> `InStroke`) that routes Down/Move/Up input through the
//! wobble smoother, position modeler, stylus-state modeler and predictor,
//! and assembles their outputs into `Result`s.
use crate::error::{ElementError, ElementOrderError, ModelerError};
use crate::params::StrokeModelParams;
use crate::position_modeler::{steps_between_inputs, PositionModeler};
use crate::prediction::Predictor;
use crate::stylus_state_modeler::StylusStateModeler;
use crate::types::{Duration, Input, InputEventType, Result, StylusState, TipState, Vec2};
use crate::utils::stroke_normal;
use crate::wobble_smoother::WobbleSmoother;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Idle,
    InStroke,
}

/// The raw input last handed to `update`, plus the wobble-corrected
/// position it produced. Tracked so the next event can validate ordering
/// and resume the linear path from the right anchor.
#[derive(Debug, Clone, Copy)]
struct LastInput {
    input: Input,
    corrected_position: Vec2,
}

#[derive(Clone, Copy)]
struct SavedState {
    last_input: Option<LastInput>,
    phase: Phase,
}

/// Models a single in-progress (or not yet started) stroke. Not
/// `Send`/`Sync` by accident of having no such bounds declared; the
/// intended usage is one modeler per concurrently-drawn stroke, driven
/// synchronously from a single thread.
pub struct StrokeModeler {
    phase: Phase,
    params: Option<StrokeModelParams>,
    wobble: WobbleSmoother,
    position: PositionModeler,
    stylus: StylusStateModeler,
    predictor: Predictor,
    last_input: Option<LastInput>,
    saved: Option<SavedState>,
}

impl Default for StrokeModeler {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeModeler {
    /// Constructs a modeler in the `Uninitialized` state. Every stateful
    /// field below is seeded with placeholder defaults; `reset(params)`
    /// must be called before `update`/`predict` will do anything.
    pub fn new() -> Self {
        let params = StrokeModelParams::default();
        Self {
            phase: Phase::Uninitialized,
            params: None,
            wobble: WobbleSmoother::new(params.wobble_smoother),
            position: PositionModeler::new(params.position_modeler, params.sampling, TipState::default()),
            stylus: StylusStateModeler::new(params.stylus_state_modeler),
            predictor: Predictor::new(params.prediction, params.sampling, params.position_modeler),
            last_input: None,
            saved: None,
        }
    }

    /// Validates `params`, installs them, and transitions
    /// `Uninitialized`/`Idle` -> `Idle`. Aborts any in-progress stroke.
    pub fn reset_with_params(&mut self, params: StrokeModelParams) -> Result_<()> {
        let params = params.validate_to_error()?;
        self.params = Some(params);
        self.predictor = Predictor::new(params.prediction, params.sampling, params.position_modeler);
        self.phase = Phase::Idle;
        self.last_input = None;
        self.saved = None;
        Ok(())
    }

    /// Clears any in-progress stroke, keeping the installed params.
    /// `FailedPrecondition` if `reset_with_params` was never called.
    pub fn reset(&mut self) -> Result_<()> {
        if self.params.is_none() {
            return Err(ModelerError::FailedPrecondition {
                reason: "reset() called before reset_with_params()",
            });
        }
        self.phase = Phase::Idle;
        self.last_input = None;
        self.saved = None;
        Ok(())
    }

    /// Feeds one raw input through the pipeline, returning the `Result`s
    /// it produces. On error the modeler's state is left exactly as it
    /// was before the call.
    pub fn update(&mut self, input: Input) -> Result_<Vec<Result>> {
        let params = self.params.ok_or(ModelerError::FailedPrecondition {
            reason: "update() called before reset_with_params()",
        })?;

        if !input.is_valid() {
            return Err(ElementError::NonFinite.into());
        }

        match input.event_type {
            InputEventType::Down => self.process_down(input, &params),
            InputEventType::Move => self.process_move(input, &params),
            InputEventType::Up => self.process_up(input, &params),
        }
    }

    /// Extrapolates beyond the last input without mutating any state.
    /// Requires `InStroke`; fails if the active predictor is disabled.
    pub fn predict(&self) -> Result_<Vec<Result>> {
        let params = self.params.ok_or(ModelerError::FailedPrecondition {
            reason: "predict() called before reset_with_params()",
        })?;
        if self.phase != Phase::InStroke {
            return Err(ModelerError::FailedPrecondition {
                reason: "predict() called while not in a stroke",
            });
        }

        let tips = self.predictor.predict_into(self.position.current_state())?;
        Ok(tips.into_iter().map(|tip| self.assemble_result(tip, &params)).collect())
    }

    /// Snapshots the wobble smoother, position modeler (including its
    /// loop-contraction mitigator), stylus-state modeler, and last-input
    /// bookkeeping. Overwrites any prior save. The predictor is untouched.
    pub fn save(&mut self) {
        self.wobble.save();
        self.position.save();
        self.stylus.save();
        self.saved = Some(SavedState {
            last_input: self.last_input,
            phase: self.phase,
        });
    }

    /// Restores the last `save()`d snapshot. A no-op if none exists.
    pub fn restore(&mut self) {
        if let Some(saved) = self.saved {
            self.wobble.restore();
            self.position.restore();
            self.stylus.restore();
            self.last_input = saved.last_input;
            self.phase = saved.phase;
        }
    }

    fn process_down(&mut self, input: Input, params: &StrokeModelParams) -> Result_<Vec<Result>> {
        if self.phase == Phase::InStroke {
            return Err(ElementOrderError::UnexpectedDown.into());
        }

        self.wobble.reset(params.wobble_smoother, input.position, input.time);
        let first_tip = TipState {
            position: input.position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            time: input.time,
        };
        self.position.reset(params.position_modeler, params.sampling, first_tip);
        self.stylus.reset(params.stylus_state_modeler);
        self.stylus.update(input.position, input.time, stylus_axes(input));
        self.predictor.reset();
        self.predictor.update(input.position, input.time);

        self.phase = Phase::InStroke;
        self.last_input = Some(LastInput {
            input,
            corrected_position: input.position,
        });

        Ok(vec![self.assemble_result(first_tip, params)])
    }

    fn process_move(&mut self, input: Input, params: &StrokeModelParams) -> Result_<Vec<Result>> {
        if self.phase != Phase::InStroke {
            return Err(ElementOrderError::UnexpectedMove.into());
        }
        let last = self.last_input.expect("InStroke always carries a last input");
        check_ordering(last, input)?;
        let n_steps = steps_between_inputs(input.time - last.input.time, &params.sampling)?;

        let corrected = self.wobble.update(input.position, input.time);
        self.stylus.update(corrected, input.time, stylus_axes(input));
        let tips = self.position.update_along_linear_path(
            last.corrected_position,
            last.input.time,
            corrected,
            input.time,
            n_steps,
        );
        self.predictor.update(corrected, input.time);
        self.last_input = Some(LastInput {
            input,
            corrected_position: corrected,
        });

        Ok(tips.into_iter().map(|tip| self.assemble_result(tip, params)).collect())
    }

    fn process_up(&mut self, input: Input, params: &StrokeModelParams) -> Result_<Vec<Result>> {
        if self.phase != Phase::InStroke {
            return Err(ElementOrderError::UnexpectedUp.into());
        }
        let last = self.last_input.expect("InStroke always carries a last input");
        check_ordering(last, input)?;
        let n_steps = steps_between_inputs(input.time - last.input.time, &params.sampling)?;

        let corrected = self.wobble.update(input.position, input.time);
        self.stylus.update(corrected, input.time, stylus_axes(input));
        let mut tips = self.position.update_along_linear_path(
            last.corrected_position,
            last.input.time,
            corrected,
            input.time,
            n_steps,
        );
        self.predictor.update(corrected, input.time);

        let tail = self.position.model_end_of_stroke(
            corrected,
            Duration(1.0 / params.sampling.min_output_rate),
            params.sampling.end_of_stroke_max_iterations,
            params.sampling.end_of_stroke_stopping_distance,
        );
        tips.extend(tail);
        if tips.is_empty() {
            tips.push(self.position.current_state());
        }

        self.phase = Phase::Idle;
        self.last_input = None;

        Ok(tips.into_iter().map(|tip| self.assemble_result(tip, params)).collect())
    }

    fn assemble_result(&self, tip: TipState, params: &StrokeModelParams) -> Result {
        let normal = if params.stylus_state_modeler.use_stroke_normal_projection {
            stroke_normal(tip.velocity, tip.acceleration, Duration(1.0 / params.sampling.min_output_rate))
        } else {
            None
        };
        let stylus_state = self.stylus.query(tip.position, normal);
        Result {
            position: tip.position,
            velocity: tip.velocity,
            acceleration: tip.acceleration,
            time: tip.time,
            pressure: stylus_state.pressure,
            tilt: stylus_state.tilt,
            orientation: stylus_state.orientation,
        }
    }
}

/// `InvalidArgument` on a duplicate input or a non-increasing timestamp.
/// The one asymmetry: an `Up` sharing a timestamp with the immediately
/// preceding input is accepted (it later falls back to a single
/// current-tip-state `Result`, since the linear path and the
/// end-of-stroke relaxation both have zero duration to work with).
fn check_ordering(last: LastInput, input: Input) -> Result_<()> {
    if last.input == input {
        return Err(ElementError::Duplicate.into());
    }
    if input.time.0 < last.input.time.0 {
        return Err(ElementError::NegativeTimeDelta.into());
    }
    if input.time.0 == last.input.time.0 && input.event_type != InputEventType::Up {
        return Err(ElementError::NegativeTimeDelta.into());
    }
    Ok(())
}

fn stylus_axes(input: Input) -> StylusState {
    StylusState {
        pressure: input.pressure,
        tilt: input.tilt,
        orientation: input.orientation,
    }
}

type Result_<T> = std::result::Result<T, ModelerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputEventType;

    fn down(x: f32, y: f32, t: f64) -> Input {
        Input {
            event_type: InputEventType::Down,
            position: Vec2::new(x, y),
            time: crate::types::Time(t),
            pressure: 0.2,
            tilt: 0.3,
            orientation: 0.4,
        }
    }

    fn mv(x: f32, y: f32, t: f64) -> Input {
        Input {
            event_type: InputEventType::Move,
            ..down(x, y, t)
        }
    }

    fn up(x: f32, y: f32, t: f64) -> Input {
        Input {
            event_type: InputEventType::Up,
            ..down(x, y, t)
        }
    }

    fn modeler() -> StrokeModeler {
        let mut m = StrokeModeler::new();
        m.reset_with_params(StrokeModelParams::suggested()).unwrap();
        m
    }

    #[test]
    fn update_before_reset_is_failed_precondition() {
        let mut m = StrokeModeler::new();
        assert_eq!(
            m.update(down(0.0, 0.0, 0.0)),
            Err(ModelerError::FailedPrecondition {
                reason: "update() called before reset_with_params()"
            })
        );
    }

    #[test]
    fn down_emits_exactly_one_result_s1() {
        let mut m = modeler();
        let results = m.update(down(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, Vec2::ZERO);
        assert_eq!(results[0].pressure, 0.2);
    }

    #[test]
    fn move_before_down_is_failed_precondition() {
        let mut m = modeler();
        assert_eq!(
            m.update(mv(1.0, 1.0, 0.01)),
            Err(ElementOrderError::UnexpectedMove.into())
        );
    }

    #[test]
    fn up_before_down_is_failed_precondition() {
        let mut m = modeler();
        assert_eq!(m.update(up(1.0, 1.0, 0.01)), Err(ElementOrderError::UnexpectedUp.into()));
    }

    #[test]
    fn down_while_in_stroke_is_failed_precondition() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(
            m.update(down(1.0, 1.0, 0.01)),
            Err(ElementOrderError::UnexpectedDown.into())
        );
    }

    #[test]
    fn duplicate_input_is_rejected_s6() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        let first_move = mv(1.0, 0.0, 0.01);
        m.update(first_move).unwrap();
        assert_eq!(m.update(first_move), Err(ElementError::Duplicate.into()));
    }

    #[test]
    fn non_increasing_time_is_rejected() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        assert_eq!(
            m.update(mv(2.0, 0.0, 0.005)),
            Err(ElementError::NegativeTimeDelta.into())
        );
    }

    #[test]
    fn up_sharing_last_move_timestamp_emits_one_result() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        let results = m.update(up(1.0, 0.0, 0.01)).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn move_upsamples_to_slow_input_s2() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        // one second between inputs at 180Hz should produce 180 steps.
        let results = m.update(mv(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(results.len(), 180);
    }

    #[test]
    fn move_upsamples_exact_s2_timing() {
        let mut m = modeler();
        m.update(down(3.0, 4.0, 0.0)).unwrap();
        // spec.md S2's exact timing: t=1/30 isn't exactly representable in
        // f32, so 1/30 * 180 ceils to 7, not the f64 value of exactly 6.
        let results = m.update(mv(3.2, 4.2, 1.0 / 30.0)).unwrap();
        assert_eq!(results.len(), 7);
    }

    #[test]
    fn up_transitions_back_to_idle_and_allows_new_stroke() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        m.update(up(1.0, 0.0, 0.02)).unwrap();
        assert_eq!(
            m.update(mv(1.0, 0.0, 0.03)),
            Err(ElementOrderError::UnexpectedMove.into())
        );
        // Idle accepts a fresh Down.
        assert_eq!(m.update(down(5.0, 5.0, 0.03)).unwrap().len(), 1);
    }

    #[test]
    fn reset_aborts_stroke_silently() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        m.reset().unwrap();
        assert_eq!(
            m.update(mv(2.0, 0.0, 0.02)),
            Err(ElementOrderError::UnexpectedMove.into())
        );
        assert_eq!(m.update(down(0.0, 0.0, 0.02)).unwrap().len(), 1);
    }

    #[test]
    fn reset_before_reset_with_params_is_failed_precondition() {
        let mut m = StrokeModeler::new();
        assert_eq!(
            m.reset(),
            Err(ModelerError::FailedPrecondition {
                reason: "reset() called before reset_with_params()"
            })
        );
    }

    #[test]
    fn invalid_params_rejected() {
        let mut m = StrokeModeler::new();
        let mut params = StrokeModelParams::suggested();
        params.sampling.min_output_rate = 0.0;
        assert!(m.reset_with_params(params).is_err());
    }

    #[test]
    fn predict_requires_in_stroke() {
        let m = modeler();
        assert_eq!(
            m.predict(),
            Err(ModelerError::FailedPrecondition {
                reason: "predict() called while not in a stroke"
            })
        );
    }

    #[test]
    fn predict_fails_when_predictor_disabled() {
        let mut m = StrokeModeler::new();
        let mut params = StrokeModelParams::suggested();
        params.prediction = crate::params::PredictionParams::Disabled(crate::params::DisabledPredictorParams);
        m.reset_with_params(params).unwrap();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(
            m.predict(),
            Err(ModelerError::FailedPrecondition {
                reason: "prediction is disabled"
            })
        );
    }

    #[test]
    fn predict_with_stroke_end_predictor_relaxes_toward_last_input() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        let prediction = m.predict().unwrap();
        assert!(!prediction.is_empty());
    }

    #[test]
    fn save_restore_round_trip() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.update(mv(1.0, 0.0, 0.01)).unwrap();
        m.save();

        m.update(up(1.0, 0.0, 0.02)).unwrap();
        assert_eq!(
            m.update(mv(2.0, 0.0, 0.03)),
            Err(ElementOrderError::UnexpectedMove.into())
        );

        m.restore();
        // back InStroke, can continue the original stroke.
        assert!(m.update(mv(2.0, 0.0, 0.03)).is_ok());
        // idempotent: restoring again just reapplies the same snapshot.
        m.restore();
    }

    #[test]
    fn restore_without_save_is_noop() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        m.restore();
        assert!(m.update(mv(1.0, 0.0, 0.01)).is_ok());
    }

    #[test]
    fn sticky_unknown_axis_propagates_to_results_s_property_3() {
        let mut m = modeler();
        m.update(down(0.0, 0.0, 0.0)).unwrap();
        let mut unknown_pressure = mv(1.0, 0.0, 0.01);
        unknown_pressure.pressure = -1.0;
        m.update(unknown_pressure).unwrap();
        let results = m.update(mv(2.0, 0.0, 0.02)).unwrap();
        assert!(results.iter().all(|r| r.pressure == -1.0));
    }
}
