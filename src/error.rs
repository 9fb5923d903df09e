//! Error kinds returned by the public modeler surface.
//!
//! Three kinds, mirroring the status codes the source library raises:
//! malformed input or parameters ([`ModelerError::InvalidArgument`]),
//! calling a method out of order ([`ModelerError::FailedPrecondition`]), and
//! a catch-all that must never actually be reached on valid input
//! ([`ModelerError::Internal`]).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
#[allow(clippy::enum_variant_names)]
pub enum ElementOrderError {
    #[error("Down event received while a stroke is already in progress")]
    UnexpectedDown,
    #[error("Move event received before the first Down event")]
    UnexpectedMove,
    #[error("Up event received before the first Down event")]
    UnexpectedUp,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ElementError {
    #[error("a duplicate input was sent to the modeler")]
    Duplicate,
    #[error("an input's time is not strictly greater than the previous input's time")]
    NegativeTimeDelta,
    #[error("an input's position or time is not finite")]
    NonFinite,
    #[error("too many output steps would be required between consecutive inputs")]
    TooManyOutputs,
}

// `InvalidParams` owns its message (built by folding every validation
// failure into one string), so this enum can't derive `Copy` the way its
// variant error types do.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ModelerError {
    #[error("invalid argument: {src}")]
    InvalidArgument {
        #[from]
        src: ElementError,
    },
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },
    #[error("failed precondition: {reason}")]
    FailedPrecondition { reason: &'static str },
    #[error("internal error: {reason} (this should be unreachable)")]
    Internal { reason: &'static str },
}

// Event-order violations are a `FailedPrecondition`, not an
// `InvalidArgument`: the input itself was well-formed, it just arrived
// while the orchestrator was in the wrong state to accept it.
impl From<ElementOrderError> for ModelerError {
    fn from(src: ElementOrderError) -> Self {
        let reason = match src {
            ElementOrderError::UnexpectedDown => "Down event received while a stroke is already in progress",
            ElementOrderError::UnexpectedMove => "Move event received before the first Down event",
            ElementOrderError::UnexpectedUp => "Up event received before the first Down event",
        };
        ModelerError::FailedPrecondition { reason }
    }
}

pub type ModelerResult<T> = std::result::Result<T, ModelerError>;
