//! Core data types shared by every stage of the modeling pipeline.
use std::ops::{Add, Div, Mul, Sub};

/// A two-component float vector. Equality is bit-exact; no epsilon fuzzing
/// is performed here, that's left to the call sites that need it (tests use
/// `approx`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Rotate by +90 degrees (counter-clockwise in a right-handed frame).
    pub fn rot90(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn unit(self) -> Vec2 {
        let m = self.magnitude();
        if m == 0.0 {
            Vec2::ZERO
        } else {
            self / m
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// A point in time. Unitless and offset-agnostic: callers are free to treat
/// it as seconds, milliseconds, whatever, as long as they're consistent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64);

/// A span of time. `Time - Time = Duration`, `Time + Duration = Time`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Duration(pub f64);

impl Sub for Time {
    type Output = Duration;
    fn sub(self, rhs: Time) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Add<Duration> for Time {
    type Output = Time;
    fn add(self, rhs: Duration) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl Duration {
    pub fn seconds(self) -> f64 {
        self.0
    }
}

impl Mul<f64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: f64) -> Duration {
        Duration(self.0 * rhs)
    }
}

/// The three event kinds a stroke can see, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventType {
    Down,
    Move,
    Up,
}

/// Sentinel used for pressure/tilt/orientation when the physical quantity is
/// not known. Any negative value (or NaN) is treated as "unknown" on input.
pub const UNKNOWN: f32 = -1.0;

/// A raw stylus/touch event, as received from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Input {
    pub event_type: InputEventType,
    pub position: Vec2,
    pub time: Time,
    /// [0, 1], or negative for "unknown".
    pub pressure: f32,
    /// [0, pi/2], or negative for "unknown".
    pub tilt: f32,
    /// [0, 2*pi), or negative for "unknown".
    pub orientation: f32,
}

impl Input {
    pub fn new(event_type: InputEventType, position: Vec2, time: Time) -> Self {
        Self {
            event_type,
            position,
            time,
            pressure: UNKNOWN,
            tilt: UNKNOWN,
            orientation: UNKNOWN,
        }
    }

    /// True if `position` and `time` are finite.
    pub fn is_valid(&self) -> bool {
        self.position.x.is_finite() && self.position.y.is_finite() && self.time.0.is_finite()
    }
}

/// Internal kinematic state of the modeled tip: the quantity the position
/// modeler and the predictors pass around.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TipState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub time: Time,
}

/// The stylus axes that aren't part of the spring-mass simulation, tracked
/// per raw sample and interpolated over the raw polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylusState {
    pub pressure: f32,
    pub tilt: f32,
    pub orientation: f32,
}

impl Default for StylusState {
    fn default() -> Self {
        Self {
            pressure: UNKNOWN,
            tilt: UNKNOWN,
            orientation: UNKNOWN,
        }
    }
}

/// A single emitted sample of the modeled stroke, handed back to the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Result {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub time: Time,
    pub pressure: f32,
    pub tilt: f32,
    pub orientation: f32,
}

impl Result {
    #[cfg(test)]
    pub(crate) fn near(self, other: Result) -> bool {
        let tol = 1e-4;
        approx::abs_diff_eq!(self.position.x, other.position.x, epsilon = tol)
            && approx::abs_diff_eq!(self.position.y, other.position.y, epsilon = tol)
            && approx::abs_diff_eq!(self.velocity.x, other.velocity.x, epsilon = tol)
            && approx::abs_diff_eq!(self.velocity.y, other.velocity.y, epsilon = tol)
            && approx::abs_diff_eq!(self.acceleration.x, other.acceleration.x, epsilon = tol)
            && approx::abs_diff_eq!(self.acceleration.y, other.acceleration.y, epsilon = tol)
            && approx::abs_diff_eq!(self.time.0, other.time.0, epsilon = tol as f64)
            && approx::abs_diff_eq!(self.pressure, other.pressure, epsilon = tol)
            && approx::abs_diff_eq!(self.tilt, other.tilt, epsilon = tol)
            && approx::abs_diff_eq!(self.orientation, other.orientation, epsilon = tol)
    }
}
