//! Messages exchanged between the host and the interpreter.
//!
//! Host messages are adjacently tagged (`{"tag": "script", "content": "..."}`);
//! worker messages are externally tagged (`"done"`, `{"render": {...}}`).

use serde::{Deserialize, Serialize};

use crate::filter::FilterState;
use crate::widget::{WidgetShape, WidgetValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "tag", content = "content")]
pub enum HostMessage {
    /// Replace whatever is running with this script.
    Script(String),
    /// The display is ready for a new frame.
    Frame,
    Checkbox { name: String, value: bool },
    Radio { name: String, value: String },
    Slider { name: String, value: f32 },
    /// Forget every widget, e.g. when navigating away.
    ClearWidgets,
}

impl HostMessage {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Registry update carried by a widget message.
    pub fn widget_update(&self) -> Option<(&str, WidgetValue)> {
        match self {
            HostMessage::Checkbox { name, value } => Some((name, WidgetValue::Checkbox(*value))),
            HostMessage::Radio { name, value } => Some((name, WidgetValue::Radio(value.clone()))),
            HostMessage::Slider { name, value } => Some((name, WidgetValue::Slider(*value))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkerMessage {
    /// Apply this filter and display it.
    Render(FilterState),
    /// The run finished. Sent exactly once per script, after any `Error`.
    Done,
    Error(String),
    /// A widget exists with this shape.
    Widget { name: String, widget: WidgetShape },
    Clear,
    Save,
    Resolution(u32),
    Record,
    OscillatorFrequency(f32),
    OscillatorGain(f32),
    DecibelRange { min: f32, max: f32 },
}

impl WorkerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, WorkerMessage::Done)
    }

    pub fn as_render(&self) -> Option<&FilterState> {
        match self {
            WorkerMessage::Render(state) => Some(state),
            _ => None,
        }
    }
}
