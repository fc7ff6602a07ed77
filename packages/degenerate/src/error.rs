//! Error taxonomy for script runs.
//!
//! Every failure a script can cause lands in one of three buckets. None of them
//! are fatal to the interpreter: they are reported to the host as an `error`
//! message and the run still finishes with `done`.

use rhai::{Dynamic, EvalAltResult, Position};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// Malformed script text. Raised before any primitive runs.
    #[error("compile error: {0}")]
    Compile(String),
    /// A primitive rejected one of its arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Anything else thrown during execution.
    #[error("{0}")]
    Runtime(String),
}

/// Payload carried inside a Rhai runtime error when a host primitive rejects
/// an argument. Lets the top level tell `InvalidArgument` apart from values
/// thrown by the script itself.
#[derive(Debug, Clone)]
pub struct ArgumentError(pub String);

/// Build the boxed Rhai error a native function returns for a bad argument.
pub fn invalid_argument(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(ArgumentError(message.into())),
        Position::NONE,
    ))
}

/// Strip the `in call to function ...` wrappers Rhai adds around errors raised
/// inside script-defined functions.
pub fn innermost(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => innermost(inner),
        other => other,
    }
}

impl ScriptError {
    pub fn from_parse_error(err: &rhai::ParseError) -> Self {
        ScriptError::Compile(err.to_string())
    }

    /// Classify an evaluation error. Thrown strings are reported verbatim so
    /// that `throw "boom"` surfaces as `boom`.
    pub fn from_eval_error(err: &EvalAltResult) -> Self {
        match innermost(err) {
            EvalAltResult::ErrorRuntime(value, _) => {
                if let Some(ArgumentError(message)) = value.clone().try_cast::<ArgumentError>() {
                    return ScriptError::InvalidArgument(message);
                }
                if let Ok(message) = value.clone().into_string() {
                    return ScriptError::Runtime(message);
                }
                ScriptError::Runtime(err.to_string())
            }
            _ => ScriptError::Runtime(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_classified() {
        let err = invalid_argument("axis must be red, green or blue");
        assert_eq!(
            ScriptError::from_eval_error(&err),
            ScriptError::InvalidArgument("axis must be red, green or blue".to_string())
        );
    }

    #[test]
    fn test_thrown_string_is_runtime() {
        let err = EvalAltResult::ErrorRuntime(Dynamic::from("boom"), Position::NONE);
        assert_eq!(ScriptError::from_eval_error(&err), ScriptError::Runtime("boom".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ScriptError::InvalidArgument("empty".into()).to_string(),
            "invalid argument: empty"
        );
        assert_eq!(ScriptError::Runtime("boom".into()).to_string(), "boom");
    }
}
