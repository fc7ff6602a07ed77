//! Widget registry: host-rendered controls whose values scripts read.
//!
//! The host owns the values. It pushes updates whenever the user interacts
//! with a control; scripts only ever read them. Entries outlive script runs so
//! a slider keeps its position when the script is edited and rerun.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Shape of a widget as announced to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetShape {
    Checkbox,
    Radio {
        options: Vec<String>,
    },
    Slider {
        min: f32,
        max: f32,
        step: f32,
        initial: f32,
    },
}

/// Last value the host reported for a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetValue {
    Checkbox(bool),
    Slider(f32),
    Radio(String),
}

#[derive(Debug, Clone)]
struct WidgetEntry {
    value: Option<WidgetValue>,
    /// Generation of the last script run that declared this widget.
    declared_in: Option<u64>,
}

#[derive(Debug, Default)]
pub struct WidgetRegistry {
    entries: HashMap<String, WidgetEntry>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a host-synchronized value.
    pub fn update(&mut self, name: &str, value: WidgetValue) {
        self.entries
            .entry(name.to_string())
            .or_insert(WidgetEntry {
                value: None,
                declared_in: None,
            })
            .value = Some(value);
    }

    /// Note that script run `generation` declared `name`.
    pub fn mark_declared(&mut self, name: &str, generation: u64) {
        self.entries
            .entry(name.to_string())
            .or_insert(WidgetEntry {
                value: None,
                declared_in: None,
            })
            .declared_in = Some(generation);
    }

    pub fn value(&self, name: &str) -> Option<&WidgetValue> {
        self.entries.get(name).and_then(|e| e.value.as_ref())
    }

    pub fn checkbox(&self, name: &str) -> bool {
        match self.value(name) {
            Some(WidgetValue::Checkbox(v)) => *v,
            _ => false,
        }
    }

    /// Selected radio option, falling back to the first option when the host
    /// has nothing or reported a value that is no longer offered.
    pub fn radio(&self, name: &str, options: &[String]) -> Option<String> {
        if let Some(WidgetValue::Radio(v)) = self.value(name) {
            if options.contains(v) {
                return Some(v.clone());
            }
        }
        options.first().cloned()
    }

    pub fn slider(&self, name: &str, initial: f32) -> f32 {
        match self.value(name) {
            Some(WidgetValue::Slider(v)) => *v,
            _ => initial,
        }
    }

    /// Widgets not declared by run `generation`.
    pub fn orphans(&self, generation: u64) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.declared_in != Some(generation))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop widgets not declared by run `generation`, returning their names.
    pub fn prune(&mut self, generation: u64) -> Vec<String> {
        let orphans = self.orphans(generation);
        for name in &orphans {
            self.entries.remove(name);
        }
        orphans
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_host_value() {
        let registry = WidgetRegistry::new();
        let options = vec!["x".to_string(), "circle".to_string()];
        assert!(!registry.checkbox("a"));
        assert_eq!(registry.radio("field", &options), Some("x".to_string()));
        assert_eq!(registry.slider("min", -100.0), -100.0);
    }

    #[test]
    fn test_host_values_win() {
        let mut registry = WidgetRegistry::new();
        let options = vec!["x".to_string(), "circle".to_string()];
        registry.update("a", WidgetValue::Checkbox(true));
        registry.update("field", WidgetValue::Radio("circle".into()));
        registry.update("min", WidgetValue::Slider(-50.0));
        assert!(registry.checkbox("a"));
        assert_eq!(registry.radio("field", &options), Some("circle".to_string()));
        assert_eq!(registry.slider("min", -100.0), -50.0);
    }

    #[test]
    fn test_kind_mismatch_falls_back() {
        let mut registry = WidgetRegistry::new();
        registry.update("a", WidgetValue::Slider(0.5));
        assert!(!registry.checkbox("a"));
    }

    #[test]
    fn test_stale_radio_option_falls_back() {
        let mut registry = WidgetRegistry::new();
        registry.update("field", WidgetValue::Radio("gone".into()));
        let options = vec!["x".to_string()];
        assert_eq!(registry.radio("field", &options), Some("x".to_string()));
        assert_eq!(registry.radio("field", &[]), None);
    }

    #[test]
    fn test_orphans_and_prune() {
        let mut registry = WidgetRegistry::new();
        registry.mark_declared("a", 1);
        registry.mark_declared("b", 1);
        registry.update("b", WidgetValue::Checkbox(true));
        registry.mark_declared("b", 2);
        assert_eq!(registry.orphans(2), vec!["a".to_string()]);
        assert_eq!(registry.prune(2), vec!["a".to_string()]);
        assert_eq!(registry.len(), 1);
        assert!(registry.checkbox("b"));
    }

    #[test]
    fn test_value_json() {
        let v: WidgetValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, WidgetValue::Checkbox(true));
        let v: WidgetValue = serde_json::from_str("0.25").unwrap();
        assert_eq!(v, WidgetValue::Slider(0.25));
        let v: WidgetValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v, WidgetValue::Radio("x".into()));
    }
}
