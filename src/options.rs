//! The options collaborator: a loose name/value map with used-key tracking.
//!
//! The driver consults options by name with a default; after a render it
//! asks the collaborator to flag any key that was supplied but never
//! consulted (a typo in the caller's option set, typically).

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct PlotOptions {
    values: BTreeMap<String, Value>,
    used: RefCell<BTreeSet<String>>,
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        PlotOptions {
            values,
            used: RefCell::new(BTreeSet::new()),
        }
    }

    /// Set an option, builder-style.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Whether the caller supplied this option. Does not mark it used.
    pub fn provided(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look up an option, marking it consulted.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.used.borrow_mut().insert(name.to_string());
        self.values.get(name).cloned()
    }

    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.get(name).unwrap_or(default)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn u32_or(&self, name: &str, default: u32) -> u32 {
        self.get(name)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(default)
    }

    pub fn str_opt(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Warn about and return every supplied key that was never consulted.
    pub fn check_unused(&self) -> Vec<String> {
        let used = self.used.borrow();
        let unused: Vec<String> = self
            .values
            .keys()
            .filter(|k| !used.contains(*k))
            .cloned()
            .collect();
        for key in &unused {
            warn!("option {key:?} was provided but never used");
        }
        unused
    }
}
