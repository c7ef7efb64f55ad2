//! Plugin and control metadata.
//!
//! [`MetaData`] is an association list of typed values. New entries are
//! inserted at the head, so a later insertion shadows an earlier one with the
//! same key. Getters coerce between value kinds and fall back to a
//! caller-supplied default.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single key/value entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assoc {
    pub key: String,
    pub value: Value,
}

impl Assoc {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn get_str<'a>(&'a self, default: &'a str) -> &'a str {
        self.value.as_str().unwrap_or(default)
    }

    pub fn get_int(&self, default: i32) -> i32 {
        self.value.as_i32().unwrap_or(default)
    }

    pub fn get_float(&self, default: f32) -> f32 {
        self.value.as_f32().unwrap_or(default)
    }
}

/// Ordered metadata owned by the plugin or control it describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    // Stored oldest first; the head is the last element.
    entries: Vec<Assoc>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.push(Assoc::new(key, value));
        self
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Entries from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &Assoc> {
        self.entries.iter().rev()
    }

    pub fn get(&self, key: &str) -> Option<&Assoc> {
        self.iter().find(|a| a.key == key)
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).map(|a| a.get_str(default)).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key).map(|a| a.get_int(default)).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get(key).map(|a| a.get_float(default)).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Control input description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub index: u32,
    pub name: String,
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
    pub metadata: MetaData,
}

impl ControlSpec {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            min_value: 0.0,
            max_value: 1.0,
            default_value: 0.0,
            metadata: MetaData::new(),
        }
    }

    pub fn range(mut self, min_value: f32, max_value: f32, default_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self.default_value = default_value;
        self
    }
}

/// User interface description tree.
///
/// Controls refer to a [`ControlSpec`] by control index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UiNode {
    Container {
        kind: String,
        label: String,
        children: Vec<UiNode>,
    },
    Control {
        control: u32,
        kind: String,
        label: String,
    },
}

impl UiNode {
    pub fn container(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Container {
            kind: kind.into(),
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn control(control: u32, kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Control {
            control,
            kind: kind.into(),
            label: label.into(),
        }
    }

    /// Append a child. No-op on controls.
    pub fn push(&mut self, child: UiNode) -> &mut Self {
        if let Self::Container { children, .. } = self {
            children.push(child);
        }
        self
    }

    /// Control indices in depth-first order.
    pub fn controls(&self) -> Vec<u32> {
        let mut out = Vec::new();
        self.collect_controls(&mut out);
        out
    }

    fn collect_controls(&self, out: &mut Vec<u32>) {
        match self {
            Self::Control { control, .. } => out.push(*control),
            Self::Container { children, .. } => {
                for child in children {
                    child.collect_controls(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_head_shadows() {
        let mut meta = MetaData::new();
        meta.insert("gain", 0.5f32).insert("gain", 0.25f32);

        assert_eq!(meta.get_float("gain", 1.0), 0.25);
        let keys: Vec<_> = meta.iter().map(|a| a.value.clone()).collect();
        assert_eq!(keys, vec![Value::Float(0.25), Value::Float(0.5)]);
    }

    #[test]
    fn test_coercing_getters() {
        let meta = MetaData::new()
            .with("channels", "2")
            .with("rate", 44100)
            .with("label", "Sampler");

        assert_eq!(meta.get_int("channels", 0), 2);
        assert_eq!(meta.get_float("rate", 0.0), 44100.0);
        assert_eq!(meta.get_str("label", "?"), "Sampler");
        assert_eq!(meta.get_str("rate", "?"), "?");
        assert_eq!(meta.get_int("label", -1), -1);
        assert_eq!(meta.get_int("missing", 7), 7);
    }

    #[test]
    fn test_ui_tree_controls() {
        let mut root = UiNode::container("vbox", "Sampler");
        let mut row = UiNode::container("hbox", "Levels");
        row.push(UiNode::control(0, "knob", "Amp"));
        root.push(row).push(UiNode::control(1, "toggle", "Loop"));

        assert_eq!(root.controls(), vec![0, 1]);
    }
}
