//! The directive and layer model.
//!
//! A directive is a typed, named bag of keyword parameters destined for the
//! rendering engine. A layer pairs one data directive with an optional style
//! directive; layers render in insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vocab::DirectiveType;

/// A single patch operation against a directive's parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Set the key unconditionally, overwriting any previous value.
    Add(String, Value),
    /// Delete the key if present.
    Remove(String),
    /// Set the key only when it is not already present.
    SetIfAbsent(String, Value),
}

/// A named, typed instruction for the rendering engine.
///
/// Parameter names are advisory: they should belong to the type's declared
/// vocabulary, but construction does not enforce this (the parameter index
/// only drives type inference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub dtype: DirectiveType,
    pub params: BTreeMap<String, Value>,
}

impl Directive {
    pub fn new(dtype: DirectiveType) -> Self {
        Directive {
            dtype,
            params: BTreeMap::new(),
        }
    }

    pub fn from_params(dtype: DirectiveType, params: BTreeMap<String, Value>) -> Self {
        Directive { dtype, params }
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Numeric parameter with a fallback, used for extent lookups.
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Apply a sequence of patch operations when `target` matches this
    /// directive's type.
    ///
    /// Returns a new directive with the operations applied; the original is
    /// never mutated. A type mismatch returns `None`, signalling the caller
    /// to treat the patch as unmatched.
    pub fn patch(&self, target: DirectiveType, ops: &[PatchOp]) -> Option<Directive> {
        if self.dtype != target {
            return None;
        }
        let mut params = self.params.clone();
        for op in ops {
            match op {
                PatchOp::Add(key, value) => {
                    params.insert(key.clone(), value.clone());
                }
                PatchOp::Remove(key) => {
                    params.remove(key);
                }
                PatchOp::SetIfAbsent(key, value) => {
                    params.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        Some(Directive {
            dtype: self.dtype,
            params,
        })
    }
}

// Sorted keys (BTreeMap iteration order) keep diagnostic dumps deterministic.
impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}(", self.dtype)?;
        for (k, v) in &self.params {
            writeln!(f, "    {k}={v},")?;
        }
        write!(f, ")")
    }
}

/// One data directive plus its current style directive.
#[derive(Debug, Clone)]
pub struct Layer {
    data: Directive,
    style: Option<Directive>,
}

impl Layer {
    /// Create a layer carrying the data directive's type-specific default
    /// style (field kinds get an automatic contour style, tables none).
    pub fn new(data: Directive) -> Self {
        let style = default_style(data.dtype);
        Layer { data, style }
    }

    pub fn style(&self) -> Option<&Directive> {
        self.style.as_ref()
    }

    /// Replace the style slot unconditionally.
    pub fn set_style(&mut self, style: Option<Directive>) {
        self.style = style;
    }

    /// Append the data directive then the style directive to `sequence`.
    pub fn append_to(&self, sequence: &mut Vec<Directive>) {
        sequence.push(self.data.clone());
        if let Some(style) = &self.style {
            sequence.push(style.clone());
        }
    }
}

/// Default style for a freshly created layer of the given content type.
pub fn default_style(dtype: DirectiveType) -> Option<Directive> {
    match dtype {
        DirectiveType::GribField | DirectiveType::NetcdfField | DirectiveType::ArrayField => Some(
            Directive::new(DirectiveType::Contour)
                .with("contour_automatic_setting", "ecmwf")
                .with("legend", false),
        ),
        _ => None,
    }
}
