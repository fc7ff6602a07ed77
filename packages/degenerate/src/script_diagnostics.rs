//! Structured script diagnostics.
//!
//! The `error` message sent to the host is a plain string. Alongside it the
//! interpreter keeps a JSON-serializable diagnostic with the failure class and
//! the location in the user's script, for editors that want to underline the
//! offending line.

use serde::Serialize;

use crate::error::ScriptError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptDiagnosticKind {
    ParseError,
    InvalidArgument,
    RuntimeError,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Compile,
    Run,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptLocation {
    /// 1-based line in the user script.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptDiagnostic {
    pub kind: ScriptDiagnosticKind,
    pub phase: ScriptPhase,
    pub message: String,
    pub location: Option<ScriptLocation>,
    /// Raw engine error string.
    pub raw: Option<String>,
}

fn location(position: rhai::Position) -> Option<ScriptLocation> {
    Some(ScriptLocation {
        line: position.line()? as u32,
        column: position.position().unwrap_or(1).max(1) as u32,
    })
}

pub fn from_parse_error(err: &rhai::ParseError) -> ScriptDiagnostic {
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::ParseError,
        phase: ScriptPhase::Compile,
        message: ScriptError::from_parse_error(err).to_string(),
        location: location(err.position()),
        raw: Some(err.to_string()),
    }
}

pub fn from_eval_error(err: &rhai::EvalAltResult) -> ScriptDiagnostic {
    let error = ScriptError::from_eval_error(err);
    let kind = match error {
        ScriptError::Compile(_) => ScriptDiagnosticKind::ParseError,
        ScriptError::InvalidArgument(_) => ScriptDiagnosticKind::InvalidArgument,
        ScriptError::Runtime(_) => ScriptDiagnosticKind::RuntimeError,
    };
    ScriptDiagnostic {
        kind,
        phase: ScriptPhase::Run,
        message: error.to_string(),
        location: location(err.position()),
        raw: Some(err.to_string()),
    }
}
