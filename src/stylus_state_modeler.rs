//! Tracks pressure/tilt/orientation over the raw input polyline and
//! interpolates them onto the modeled tip position. These axes aren't part
//! of the spring-mass simulation, so they're queried after the fact against
//! whichever raw segment is closest to the query point.
use std::collections::VecDeque;

use crate::params::StylusStateModelerParams;
use crate::types::{StylusState, Time, Vec2};
use crate::utils::{distance, interp, lerp, nearest_point_on_segment, project_along_normal};

#[derive(Clone, Copy)]
struct Sample {
    position: Vec2,
    time: Time,
    state: StylusState,
}

#[derive(Clone, Copy, Default)]
struct StickyFlags {
    pressure: bool,
    tilt: bool,
    orientation: bool,
}

impl StickyFlags {
    fn all(&self) -> bool {
        self.pressure && self.tilt && self.orientation
    }
}

pub struct StylusStateModeler {
    params: StylusStateModelerParams,
    samples: VecDeque<Sample>,
    sticky: StickyFlags,
    saved: Option<(VecDeque<Sample>, StickyFlags)>,
}

impl StylusStateModeler {
    pub fn new(params: StylusStateModelerParams) -> Self {
        Self {
            params,
            samples: VecDeque::new(),
            sticky: StickyFlags::default(),
            saved: None,
        }
    }

    pub fn reset(&mut self, params: StylusStateModelerParams) {
        self.params = params;
        self.samples.clear();
        self.sticky = StickyFlags::default();
        self.saved = None;
    }

    /// Records a raw sample. A negative or NaN value on any of
    /// pressure/tilt/orientation latches that axis "unknown" for the rest
    /// of the stroke (queries return -1 for it regardless of what later
    /// samples supply). Once all three axes are latched, the buffer is
    /// cleared and no further samples are retained.
    ///
    /// Capacity is governed by `max_input_samples` (simple mode) or
    /// additionally by `min_input_samples` / `min_sample_duration`
    /// (stroke-normal mode, which needs a longer tail to have a segment to
    /// project onto).
    pub fn update(&mut self, position: Vec2, time: Time, state: StylusState) {
        let is_unknown = |x: f32| x < 0.0 || x.is_nan();
        self.sticky.pressure |= is_unknown(state.pressure);
        self.sticky.tilt |= is_unknown(state.tilt);
        self.sticky.orientation |= is_unknown(state.orientation);

        if self.sticky.all() {
            self.samples.clear();
            return;
        }

        self.samples.push_back(Sample { position, time, state });

        while self.samples.len() > self.params.max_input_samples {
            if self.params.use_stroke_normal_projection && self.samples.len() <= self.params.min_input_samples
            {
                break;
            }
            if self.params.use_stroke_normal_projection {
                let window = self
                    .samples
                    .back()
                    .map(|back| back.time.0 - self.samples.front().unwrap().time.0)
                    .unwrap_or(0.0);
                if window < self.params.min_sample_duration {
                    break;
                }
            }
            self.samples.pop_front();
        }
    }

    /// Queries the pressure/tilt/orientation at `position`, optionally
    /// projecting along `normal` (stroke-normal mode) instead of taking the
    /// plain nearest point on the polyline. Falls back to nearest-point
    /// whenever no segment admits a normal-line intersection.
    pub fn query(&self, position: Vec2, normal: Option<Vec2>) -> StylusState {
        let raw = match self.samples.len() {
            0 => StylusState::default(),
            1 => self.samples[0].state,
            _ => {
                if let Some(normal) = normal {
                    if let Some(state) = self.query_along_normal(position, normal) {
                        state
                    } else {
                        self.query_nearest(position)
                    }
                } else {
                    self.query_nearest(position)
                }
            }
        };
        self.pin_sticky_axes(raw)
    }

    fn pin_sticky_axes(&self, state: StylusState) -> StylusState {
        StylusState {
            pressure: if self.sticky.pressure { -1.0 } else { state.pressure },
            tilt: if self.sticky.tilt { -1.0 } else { state.tilt },
            orientation: if self.sticky.orientation { -1.0 } else { state.orientation },
        }
    }

    fn query_nearest(&self, position: Vec2) -> StylusState {
        let mut best_distance = f32::INFINITY;
        let mut best_state = self.samples.back().unwrap().state;

        for i in 0..self.samples.len() - 1 {
            let a = self.samples[i];
            let b = self.samples[i + 1];
            let u = nearest_point_on_segment(a.position, b.position, position);
            let closest = lerp(a.position, b.position, u);
            let d = distance(position, closest);
            // ties favor the later segment: use <=, not <.
            if d <= best_distance {
                best_distance = d;
                best_state = interp_state(a.state, b.state, u);
            }
        }

        best_state
    }

    fn query_along_normal(&self, position: Vec2, normal: Vec2) -> Option<StylusState> {
        let mut best: Option<(f32, StylusState)> = None;

        for i in 0..self.samples.len() - 1 {
            let a = self.samples[i];
            let b = self.samples[i + 1];
            if let Some(u) = project_along_normal(a.position, b.position, position, normal) {
                let point = lerp(a.position, b.position, u);
                let d = distance(position, point);
                let state = interp_state(a.state, b.state, u);
                match &best {
                    Some((best_d, _)) if d > *best_d => {}
                    _ => best = Some((d, state)),
                }
            }
        }

        best.map(|(_, state)| state)
    }

    pub fn save(&mut self) {
        self.saved = Some((self.samples.clone(), self.sticky));
    }

    pub fn restore(&mut self) {
        if let Some((samples, sticky)) = &self.saved {
            self.samples = samples.clone();
            self.sticky = *sticky;
        }
    }
}

fn interp_state(a: StylusState, b: StylusState, t: f32) -> StylusState {
    let axis = |x: f32, y: f32| if x < 0.0 || y < 0.0 { -1.0 } else { interp(x, y, t) };
    StylusState {
        pressure: axis(a.pressure, b.pressure),
        tilt: axis(a.tilt, b.tilt),
        orientation: if a.orientation < 0.0 || b.orientation < 0.0 {
            -1.0
        } else {
            crate::utils::lerp_angle(a.orientation, b.orientation, t)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(p: f32) -> StylusState {
        StylusState {
            pressure: p,
            tilt: p * 0.1,
            orientation: p * 0.2,
        }
    }

    fn params() -> StylusStateModelerParams {
        StylusStateModelerParams::default()
    }

    #[test]
    fn empty_queries_default() {
        let m = StylusStateModeler::new(params());
        assert_eq!(m.query(Vec2::ZERO, None), StylusState::default());
    }

    #[test]
    fn single_sample_is_constant() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::new(1.0, 1.0), Time(0.0), state(0.5));
        let q = m.query(Vec2::new(10.0, 10.0), None);
        assert_eq!(q.pressure, 0.5);
    }

    #[test]
    fn query_multiple_segments_matches_polyline_s5() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::new(0.0, 1.0), Time(0.0), state(1.0));
        m.update(Vec2::new(1.0, 2.0), Time(1.0), state(2.0));
        m.update(Vec2::new(4.0, 5.0), Time(2.0), state(3.0));
        m.update(Vec2::new(3.0, 3.0), Time(3.0), state(4.0));

        let q1 = m.query(Vec2::new(0.5, 1.5), None);
        assert!((q1.pressure - 1.5).abs() < 1e-4);

        let q2 = m.query(Vec2::new(2.0, 1.5), None);
        assert!((q2.pressure - 1.0).abs() < 1e-3 || (q2.pressure - 2.0).abs() < 1e-3);
    }

    #[test]
    fn stale_samples_are_evicted_at_capacity() {
        let mut m = StylusStateModeler::new(params());
        for i in 0..12 {
            m.update(Vec2::new(i as f32, 0.0), Time(i as f64), state(i as f32));
        }
        assert_eq!(m.samples.len(), params().max_input_samples);
        // earliest surviving sample should be index 2 (0 and 1 evicted).
        assert_eq!(m.samples.front().unwrap().state.pressure, 2.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::ZERO, Time(0.0), state(1.0));
        m.reset(params());
        assert_eq!(m.query(Vec2::ZERO, None), StylusState::default());
    }

    #[test]
    fn stroke_normal_projection_matches_s5() {
        let mut p = params();
        p.use_stroke_normal_projection = true;
        p.min_input_samples = 2;
        p.min_sample_duration = 0.01;
        let mut m = StylusStateModeler::new(p);
        m.update(
            Vec2::new(0.5, 1.5),
            Time(0.0),
            StylusState { pressure: 0.3, tilt: 0.8, orientation: 0.1 },
        );
        m.update(
            Vec2::new(2.0, 1.5),
            Time(0.1),
            StylusState { pressure: 0.6, tilt: 0.5, orientation: 0.7 },
        );
        m.update(
            Vec2::new(3.0, 3.5),
            Time(0.2),
            StylusState { pressure: 0.8, tilt: 0.1, orientation: 0.3 },
        );
        m.update(
            Vec2::new(3.5, 4.0),
            Time(0.3),
            StylusState { pressure: 0.2, tilt: 0.2, orientation: 0.2 },
        );

        // The projected intersection point itself, (2.7586, 3.0172), is on
        // the chosen segment at u=0.751724; pressure/tilt/orientation are
        // this same parameter interpolated between that segment's states.
        let q = m.query(Vec2::new(2.5, 3.125), Some(Vec2::new(0.3, -0.125)));
        assert!((q.pressure - 0.7517).abs() < 1e-3);
        assert!((q.tilt - 0.1966).abs() < 1e-3);
        assert!((q.orientation - 0.3966).abs() < 1e-3);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::ZERO, Time(0.0), state(1.0));
        m.save();
        m.update(Vec2::new(5.0, 5.0), Time(1.0), state(9.0));
        m.restore();
        assert_eq!(m.samples.len(), 1);
        m.restore();
        assert_eq!(m.samples.len(), 1);
    }

    #[test]
    fn unknown_pressure_sticks_for_rest_of_stroke() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::new(0.0, 0.0), Time(0.0), state(1.0));
        m.update(
            Vec2::new(1.0, 0.0),
            Time(1.0),
            StylusState {
                pressure: -1.0,
                ..state(2.0)
            },
        );
        // a later sample supplying a valid pressure does not clear the latch.
        m.update(Vec2::new(2.0, 0.0), Time(2.0), state(3.0));
        assert_eq!(m.query(Vec2::new(1.0, 0.0), None).pressure, -1.0);
        // other axes remain interpolated normally.
        assert!(m.query(Vec2::new(1.0, 0.0), None).tilt >= 0.0);
    }

    #[test]
    fn nan_axis_is_treated_as_unknown() {
        let mut m = StylusStateModeler::new(params());
        m.update(
            Vec2::ZERO,
            Time(0.0),
            StylusState {
                orientation: f32::NAN,
                ..state(1.0)
            },
        );
        assert_eq!(m.query(Vec2::ZERO, None).orientation, -1.0);
    }

    #[test]
    fn all_three_sticky_axes_clears_buffer() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::ZERO, Time(0.0), state(1.0));
        assert_eq!(m.samples.len(), 1);
        m.update(
            Vec2::new(1.0, 0.0),
            Time(1.0),
            StylusState {
                pressure: -1.0,
                tilt: -1.0,
                orientation: -1.0,
            },
        );
        assert_eq!(m.samples.len(), 0);
        // further updates are dropped once all axes are unknown-sticky.
        m.update(Vec2::new(2.0, 0.0), Time(2.0), state(5.0));
        assert_eq!(m.samples.len(), 0);
        let q = m.query(Vec2::ZERO, None);
        assert_eq!(q, StylusState::default());
    }

    #[test]
    fn sticky_flags_round_trip_through_save_restore() {
        let mut m = StylusStateModeler::new(params());
        m.update(Vec2::ZERO, Time(0.0), state(1.0));
        m.save();
        m.update(
            Vec2::new(1.0, 0.0),
            Time(1.0),
            StylusState {
                pressure: -1.0,
                ..state(2.0)
            },
        );
        assert_eq!(m.query(Vec2::ZERO, None).pressure, -1.0);
        m.restore();
        assert!(m.query(Vec2::ZERO, None).pressure >= 0.0);
    }
}
