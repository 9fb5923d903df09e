//! Models the pen tip as a mass, connected by a spring, to a moving anchor;
//! as the anchor moves it drags the tip along behind it. Integrated with
//! semi-implicit (symplectic) Euler, which is what makes the numeric output
//! match a physical damped spring rather than drift.
use crate::error::{ElementError, ModelerError};
use crate::loop_contraction::LoopContractionMitigator;
use crate::params::{PositionModelerParams, SamplingParams};
use crate::types::{Duration, Time, TipState, Vec2};
use crate::utils::{distance, lerp, nearest_point_on_segment};

/// Computes how many upsampled steps belong between two consecutive inputs
/// `delta_time` apart, given `min_output_rate`. Enforces
/// `max_outputs_per_call`, which is the single place this crate applies
/// that clamp (see the "Max outputs clamp" design note).
pub fn steps_between_inputs(
    delta_time: Duration,
    sampling: &SamplingParams,
) -> Result<usize, ModelerError> {
    // The reference computes the elapsed time in `float` before multiplying
    // by the (double) rate, so its rounding error survives into the `ceil`.
    // Matching that `f32` truncation, rather than doing the whole
    // computation in `f64`, is required to reproduce its step counts
    // (spec.md S2: t=1/30 at 180Hz ceils to 7 steps in `float`, not 6).
    let n_steps = (delta_time.seconds() as f32 * sampling.min_output_rate as f32).ceil() as f64;
    if n_steps < 0.0 || !n_steps.is_finite() {
        return Err(ElementError::NegativeTimeDelta.into());
    }
    let n_steps = n_steps as usize;
    if n_steps > sampling.max_outputs_per_call {
        return Err(ElementError::TooManyOutputs.into());
    }
    Ok(n_steps)
}

#[derive(Clone)]
pub struct PositionModeler {
    spring_mass_constant: f32,
    drag_constant: f32,
    sampling: SamplingParams,
    state: TipState,
    last_anchor: Vec2,
    mitigator: LoopContractionMitigator,
    saved: Option<(TipState, Vec2)>,
}

impl PositionModeler {
    pub fn new(params: PositionModelerParams, sampling: SamplingParams, first_tip: TipState) -> Self {
        Self {
            spring_mass_constant: params.spring_mass_constant,
            drag_constant: params.drag_constant,
            sampling,
            state: first_tip,
            last_anchor: first_tip.position,
            mitigator: LoopContractionMitigator::new(params.loop_contraction_mitigation),
            saved: None,
        }
    }

    pub fn reset(&mut self, params: PositionModelerParams, sampling: SamplingParams, first_tip: TipState) {
        self.spring_mass_constant = params.spring_mass_constant;
        self.drag_constant = params.drag_constant;
        self.sampling = sampling;
        self.state = first_tip;
        self.last_anchor = first_tip.position;
        self.mitigator.reset(params.loop_contraction_mitigation);
        self.saved = None;
    }

    pub fn current_state(&self) -> TipState {
        self.state
    }

    /// Advances the spring-mass integrator one step toward `anchor`,
    /// arriving at `time`. Step order matters: acceleration uses the
    /// pre-step velocity, velocity is updated before position.
    pub fn update(&mut self, anchor: Vec2, time: Time) -> TipState {
        let delta_time = (time - self.state.time).seconds() as f32;

        let acceleration = (anchor - self.state.position) / self.spring_mass_constant
            - self.state.velocity * self.drag_constant;
        let velocity = self.state.velocity + acceleration * delta_time;
        let spring_position = self.state.position + velocity * delta_time;

        let alpha = self.mitigator.update(velocity, time);
        let nearest_u = nearest_point_on_segment(self.last_anchor, anchor, spring_position);
        let nearest_on_raw_polyline = lerp(self.last_anchor, anchor, nearest_u);
        let position = lerp(nearest_on_raw_polyline, spring_position, alpha);

        self.state = TipState {
            position,
            velocity,
            acceleration,
            time,
        };
        self.last_anchor = anchor;

        self.state
    }

    /// Emits exactly `n_steps` TipStates at evenly spaced times between
    /// `start_time` and `end_time`, with the anchor linearly interpolated
    /// between `start_anchor` and `end_anchor`. When
    /// `max_estimated_angle_to_traverse_per_input` is enabled, the step
    /// count is doubled until a probe step's velocity doesn't turn by more
    /// than that bound. `n_steps == 0` is valid and yields no output (the
    /// zero-duration Up-at-same-timestamp-as-last-Move case).
    pub fn update_along_linear_path(
        &mut self,
        start_anchor: Vec2,
        start_time: Time,
        end_anchor: Vec2,
        end_time: Time,
        n_steps: usize,
    ) -> Vec<TipState> {
        let n_steps = self.resolve_step_count(start_anchor, start_time, end_anchor, end_time, n_steps);
        (1..=n_steps)
            .map(|i| {
                let frac = i as f32 / n_steps as f32;
                let anchor = lerp(start_anchor, end_anchor, frac);
                let time = start_time + (end_time - start_time) * (frac as f64);
                self.update(anchor, time)
            })
            .collect()
    }

    fn resolve_step_count(
        &self,
        start_anchor: Vec2,
        start_time: Time,
        end_anchor: Vec2,
        end_time: Time,
        n_steps: usize,
    ) -> usize {
        let bound = self.sampling.max_estimated_angle_to_traverse_per_input;
        if !(bound > 0.0 && bound < std::f32::consts::PI) || n_steps == 0 {
            return n_steps;
        }

        let mut n = n_steps;
        // Cap the doubling so a pathological input can't spin this forever;
        // 10 doublings already means 1024x the originally requested steps.
        for _ in 0..10 {
            let dt = Time(start_time.0 + (end_time.0 - start_time.0) / n as f64);
            let mut probe = self.clone();
            let before_velocity = probe.state.velocity;
            let after = probe.update(end_anchor, dt);

            let v1 = before_velocity.unit();
            let v2 = after.velocity.unit();
            if v1 == Vec2::ZERO || v2 == Vec2::ZERO {
                break;
            }
            let angle = v1.dot(v2).clamp(-1.0, 1.0).acos();
            if angle <= bound {
                break;
            }
            n *= 2;
        }
        n
    }

    /// Runs the integrator with a fixed `final_anchor` until it settles:
    /// stop as soon as the last step's displacement is below
    /// `stop_distance`, or after `max_iterations`. Restores state before
    /// returning either way (this never mutates the modeler's current tip
    /// state; it's used to produce a tail/prediction only).
    pub fn model_end_of_stroke(
        &mut self,
        final_anchor: Vec2,
        delta_time: Duration,
        max_iterations: usize,
        stop_distance: f32,
    ) -> Vec<TipState> {
        let initial_state = self.state;
        let initial_last_anchor = self.last_anchor;
        let mut delta_time = delta_time;

        let mut out = Vec::with_capacity(max_iterations);
        for _ in 0..max_iterations {
            let previous = self.state;
            let candidate = self.update(final_anchor, previous.time + delta_time);

            if distance(previous.position, candidate.position) < stop_distance {
                self.state = initial_state;
                self.last_anchor = initial_last_anchor;
                return out;
            }

            if nearest_point_on_segment(previous.position, candidate.position, final_anchor) < 1.0 {
                // Overshoot: the anchor lies before the end of this step's
                // segment. Halve the step and retry from the pre-step state.
                delta_time = delta_time * 0.5;
                self.state = previous;
                continue;
            }

            out.push(candidate);

            if distance(candidate.position, final_anchor) < stop_distance {
                self.state = initial_state;
                self.last_anchor = initial_last_anchor;
                return out;
            }
        }

        self.state = initial_state;
        self.last_anchor = initial_last_anchor;
        out
    }

    pub fn save(&mut self) {
        self.saved = Some((self.state, self.last_anchor));
        self.mitigator.save();
    }

    pub fn restore(&mut self) {
        if let Some((state, anchor)) = self.saved {
            self.state = state;
            self.last_anchor = anchor;
        }
        self.mitigator.restore();
    }
}
