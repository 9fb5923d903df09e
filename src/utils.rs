//! Numeric primitives shared across the modeling pipeline: clamping,
//! interpolation, angle-lerp and the segment/normal projection math used by
//! the stylus-state modeler.
use crate::types::{Duration, Result, Vec2};
use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};

/// The cosine of the angle below which velocity and acceleration are
/// considered to define a sharp turn (no stroke normal). `cos(0.1 degrees)`,
/// hard-coded and preserved verbatim.
pub const STROKE_NORMAL_MAGNITUDE_THRESHOLD: f32 = 0.999998477;

pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// 0 if `value <= start`, 1 if `value >= end`, otherwise the linear ratio.
/// If `start == end`, returns 1 when `value > start`, else 0.
pub fn normalize01(start: f32, end: f32, value: f32) -> f32 {
    if start == end {
        if value > start {
            1.0
        } else {
            0.0
        }
    } else {
        clamp01((value - start) / (end - start))
    }
}

/// Linear interpolation, with `t` clamped to [0, 1].
pub fn lerp<T>(start: T, end: T, t: f32) -> T
where
    T: Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T> + Copy,
{
    start + (end - start) * clamp01(t)
}

/// Alias kept for call sites that read more naturally as "interp".
pub fn interp<T>(start: T, end: T, t: f32) -> T
where
    T: Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T> + Copy,
{
    lerp(start, end, t)
}

/// Unclamped inverse of `lerp`: returns the `t` such that
/// `lerp(a, b, t) == x`. Returns 0 when `a == b`.
pub fn inverse_lerp(a: f32, b: f32, x: f32) -> f32 {
    if a == b {
        0.0
    } else {
        (x - a) / (b - a)
    }
}

fn normalize_angle(mut a: f32) -> f32 {
    let two_pi = 2.0 * PI;
    while a < 0.0 {
        a += two_pi;
    }
    while a >= two_pi {
        a -= two_pi;
    }
    a
}

/// Interpolates from angle `a` to angle `b` by the shorter arc, with the
/// result normalized into [0, 2*pi).
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let a = normalize_angle(a);
    let b = normalize_angle(b);
    let delta = b - a;
    let two_pi = 2.0 * PI;

    let result = if delta > PI {
        lerp(a + two_pi, b, t)
    } else if delta < -PI {
        lerp(a, b + two_pi, t)
    } else {
        lerp(a, b, t)
    };

    normalize_angle(result)
}

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).magnitude()
}

/// Returns the parameter `u` in [0, 1] of the point on segment
/// `start`..`end` nearest to `point`. Returns 0 when `start == end`.
pub fn nearest_point_on_segment(start: Vec2, end: Vec2, point: Vec2) -> f32 {
    if start == end {
        return 0.0;
    }
    let segment = end - start;
    let to_point = point - start;
    clamp01(to_point.dot(segment) / segment.dot(segment))
}

/// A vector orthogonal to the local stroke direction, pointing to the left
/// in a right-handed frame, or `None` when direction is undefined (the tip
/// is stationary with no acceleration) or the turn is too sharp to trust.
///
/// `delta_time` is the time elapsed since the previous tip state, used to
/// project the acceleration forward when blending it with velocity.
pub fn stroke_normal(velocity: Vec2, acceleration: Vec2, delta_time: Duration) -> Option<Vec2> {
    let v_mag = velocity.magnitude();
    let a_mag = acceleration.magnitude();

    if v_mag == 0.0 && a_mag == 0.0 {
        return None;
    }
    if v_mag == 0.0 {
        return Some(acceleration.rot90());
    }
    if a_mag == 0.0 {
        return Some(velocity.rot90());
    }

    let cos_angle = velocity.dot(acceleration) / (v_mag * a_mag);
    if cos_angle < STROKE_NORMAL_MAGNITUDE_THRESHOLD {
        return None;
    }

    let projected_velocity = velocity + acceleration * (delta_time.seconds() as f32);
    Some((velocity.unit() + projected_velocity.unit()).rot90())
}

/// Solves for `u` such that `start + u*(end-start) = point + k*normal` for
/// some `k`. Returns `None` if the segment and the normal line are parallel,
/// or if the solution falls outside [0, 1].
pub fn project_along_normal(start: Vec2, end: Vec2, point: Vec2, normal: Vec2) -> Option<f32> {
    let segment = end - start;
    // 2D cross product (z-component) of normal and segment.
    let det = normal.x * segment.y - normal.y * segment.x;
    if det == 0.0 {
        return None;
    }
    let to_start = start - point;
    let u = (to_start.x * normal.y - to_start.y * normal.x) / det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(u)
}

/// Interpolates every field of a `Result`, treating a negative value on
/// either endpoint as "unknown" (propagated as -1 rather than blended).
pub fn interp_result(start: Result, end: Result, t: f32) -> Result {
    let interp_axis = |a: f32, b: f32| if a < 0.0 || b < 0.0 { -1.0 } else { lerp(a, b, t) };

    Result {
        position: lerp(start.position, end.position, t),
        velocity: lerp(start.velocity, end.velocity, t),
        acceleration: lerp(start.acceleration, end.acceleration, t),
        time: crate::types::Time(lerp(start.time.0 as f32, end.time.0 as f32, t) as f64),
        pressure: interp_axis(start.pressure, end.pressure),
        tilt: interp_axis(start.tilt, end.tilt),
        orientation: if start.orientation < 0.0 || end.orientation < 0.0 {
            -1.0
        } else {
            lerp_angle(start.orientation, end.orientation, t)
        },
    }
}
