//! The value resolution engine.
//!
//! Turns a loose config value (`null`, `true`, `false`, a dictionary, or a
//! preset name) into a concrete directive, or `None` when the slot should be
//! left empty. Dictionaries either build a fresh directive (type inferred
//! from the parameter index) or, when their keys carry `+`/`-`/`=` modifier
//! prefixes, patch an existing target directive.

use std::collections::BTreeMap;

use log::warn;
use serde_json::{Map, Value};

use crate::directive::{Directive, PatchOp};
use crate::error::{PlotError, Result};
use crate::presets::PresetStore;
use crate::vocab::{DirectiveType, ParamIndex};

/// Context for one resolution call.
pub struct ResolveCtx<'a> {
    store: &'a dyn PresetStore,
    collection: &'a str,
    dtype: Option<DirectiveType>,
    default: Option<&'a Value>,
    target: Option<&'a Directive>,
}

impl<'a> ResolveCtx<'a> {
    pub fn new(store: &'a dyn PresetStore, collection: &'a str) -> Self {
        ResolveCtx {
            store,
            collection,
            dtype: None,
            default: None,
            target: None,
        }
    }

    /// Explicit directive type, used when inference finds no candidate.
    pub fn dtype(mut self, dtype: DirectiveType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Value substituted when the config value is `true`.
    pub fn default(mut self, default: &'a Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Directive that modifier-prefixed dictionaries patch against.
    pub fn target(mut self, target: Option<&'a Directive>) -> Self {
        self.target = target;
        self
    }
}

/// Resolve `value` to a directive, `None` (slot absent or explicitly
/// suppressed), or a contract error.
pub fn resolve(value: &Value, ctx: &ResolveCtx) -> Result<Option<Directive>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(false) => Ok(None),
        Value::Bool(true) => {
            let default = ctx.default.ok_or_else(|| {
                PlotError::contract("`true` given but no default is defined for this slot")
            })?;
            let nested = ResolveCtx {
                store: ctx.store,
                collection: ctx.collection,
                dtype: ctx.dtype,
                default: None,
                target: ctx.target,
            };
            resolve(default, &nested)
        }
        Value::Object(map) => resolve_dict(map, ctx),
        Value::String(name) => {
            let entry = ctx.store.lookup(ctx.collection, name)?;
            Ok(Some(Directive::from_params(entry.dtype, entry.params)))
        }
        other => Err(PlotError::contract(format!(
            "unsupported config value {other} (expected null, bool, object or preset name)"
        ))),
    }
}

fn resolve_dict(map: &Map<String, Value>, ctx: &ResolveCtx) -> Result<Option<Directive>> {
    // Grouping forms rewrite to the uniform prefixed flat form and recurse.
    if map.contains_key("set") || map.contains_key("clear") {
        let flat = rewrite_grouping(map, "set", "clear")?;
        return resolve(&Value::Object(flat), ctx);
    }
    if map.contains_key("+") || map.contains_key("-") {
        let flat = rewrite_grouping(map, "+", "-")?;
        return resolve(&Value::Object(flat), ctx);
    }

    let index = ParamIndex::get();

    // Score candidate types over all keys, modifier prefixes stripped.
    // Ambiguous parameters (declared by several types) do not score.
    let mut modifiers = 0usize;
    let mut scores: BTreeMap<DirectiveType, usize> = BTreeMap::new();
    for key in map.keys() {
        let bare = match key.chars().next() {
            Some('+') | Some('-') | Some('=') => {
                modifiers += 1;
                &key[1..]
            }
            _ => key.as_str(),
        };
        if let Some(dtype) = index.unambiguous(bare) {
            *scores.entry(dtype).or_insert(0) += 1;
        }
    }

    // Rank `(score, type-name)` ascending and keep the first entry. The
    // ascending pick is long-standing observable behavior; see the pinned
    // test before changing it.
    let mut ranked: Vec<(usize, DirectiveType)> =
        scores.into_iter().map(|(t, s)| (s, t)).collect();
    ranked.sort_by(|a, b| (a.0, a.1.name()).cmp(&(b.0, b.1.name())));

    let keys: Vec<&String> = map.keys().collect();
    if ranked.is_empty() {
        warn!("cannot establish a directive type from {keys:?}");
    } else if ranked.len() >= 2 && ranked[0].0 == ranked[1].0 {
        warn!(
            "cannot establish a directive type from {keys:?}, it could be {} or {}",
            ranked[0].1, ranked[1].1
        );
    }

    let inferred = ranked.first().map(|(_, t)| *t).or(ctx.dtype);

    if modifiers > 0 {
        if modifiers != map.len() {
            return Err(PlotError::contract(format!(
                "cannot set some attributes and override others: {keys:?}"
            )));
        }
        let target = ctx.target.ok_or_else(|| {
            PlotError::contract(format!("cannot override attributes {keys:?}: no directive to override"))
        })?;
        let ttype = inferred.unwrap_or(target.dtype);

        let mut ops = Vec::with_capacity(map.len());
        for (key, value) in map {
            match key.chars().next() {
                Some('+') => ops.push(PatchOp::Add(key[1..].to_string(), value.clone())),
                Some('-') => ops.push(PatchOp::Remove(key[1..].to_string())),
                Some('=') => ops.push(PatchOp::SetIfAbsent(key[1..].to_string(), value.clone())),
                _ => unreachable!("all keys are prefixed when modifiers == len"),
            }
        }

        return target
            .patch(ttype, &ops)
            .map(Some)
            .ok_or_else(|| {
                PlotError::contract(format!(
                    "cannot override attributes {keys:?} (no matching directive)"
                ))
            });
    }

    let dtype = inferred.ok_or_else(|| {
        PlotError::contract(format!("cannot establish a directive type from {keys:?}"))
    })?;
    let params: BTreeMap<String, Value> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Ok(Some(Directive::from_params(dtype, params)))
}

/// Rewrite a `set`/`clear` (or `+`/`-`) grouping dictionary into the flat
/// prefixed form: set entries become `+key`, clear entries become `-key`.
fn rewrite_grouping(
    map: &Map<String, Value>,
    set_key: &str,
    clear_key: &str,
) -> Result<Map<String, Value>> {
    let mut flat = Map::new();

    if let Some(set) = map.get(set_key) {
        let set = set.as_object().ok_or_else(|| {
            PlotError::contract(format!("{set_key:?} entries must be an object"))
        })?;
        for (k, v) in set {
            flat.insert(format!("+{k}"), v.clone());
        }
    }

    if let Some(clear) = map.get(clear_key) {
        let clear = clear.as_array().ok_or_else(|| {
            PlotError::contract(format!("{clear_key:?} entries must be an array of keys"))
        })?;
        for k in clear {
            let k = k.as_str().ok_or_else(|| {
                PlotError::contract(format!("{clear_key:?} entries must be strings"))
            })?;
            flat.insert(format!("-{k}"), Value::Null);
        }
    }

    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::MemoryPresetStore;
    use serde_json::json;

    fn store() -> MemoryPresetStore {
        MemoryPresetStore::with_defaults()
    }

    #[test]
    fn null_and_false_resolve_to_none() {
        let store = store();
        let ctx = ResolveCtx::new(&store, "styles");
        assert!(resolve(&Value::Null, &ctx).unwrap().is_none());
        assert!(resolve(&json!(false), &ctx).unwrap().is_none());
    }

    #[test]
    fn true_requires_a_default() {
        let store = store();
        let ctx = ResolveCtx::new(&store, "layers");
        let err = resolve(&json!(true), &ctx).unwrap_err();
        assert!(matches!(err, PlotError::Contract(_)));
    }

    #[test]
    fn true_with_default_matches_resolving_the_default() {
        let store = store();
        let default = json!("default-background");
        let via_true = resolve(
            &json!(true),
            &ResolveCtx::new(&store, "layers").default(&default),
        )
        .unwrap();
        let direct = resolve(&default, &ResolveCtx::new(&store, "layers")).unwrap();
        assert_eq!(via_true, direct);
        assert!(via_true.is_some());
    }

    #[test]
    fn flat_dict_builds_inferred_directive_with_exact_params() {
        let store = store();
        let value = json!({
            "contour_line_colour": "navy",
            "contour_shade": true
        });
        let d = resolve(&value, &ResolveCtx::new(&store, "styles"))
            .unwrap()
            .unwrap();
        assert_eq!(d.dtype, DirectiveType::Contour);
        assert_eq!(d.params.len(), 2);
        assert_eq!(d.get("contour_line_colour"), Some(&json!("navy")));
        assert_eq!(d.get("contour_shade"), Some(&json!(true)));
    }

    #[test]
    fn inference_failure_without_explicit_type_is_an_error() {
        let store = store();
        let value = json!({"no_such_param": 1});
        assert!(resolve(&value, &ResolveCtx::new(&store, "styles")).is_err());
    }

    #[test]
    fn explicit_type_rescues_unknown_keys() {
        let store = store();
        let value = json!({"no_such_param": 1});
        let d = resolve(
            &value,
            &ResolveCtx::new(&store, "styles").dtype(DirectiveType::Text),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.dtype, DirectiveType::Text);
    }

    #[test]
    fn ambiguous_parameters_do_not_score() {
        // `legend` belongs to contour and symbol; the single symbol
        // parameter decides.
        let store = store();
        let value = json!({"legend": true, "symbol_colour": "red"});
        let d = resolve(&value, &ResolveCtx::new(&store, "styles"))
            .unwrap()
            .unwrap();
        assert_eq!(d.dtype, DirectiveType::Symbol);
    }

    #[test]
    fn tie_break_picks_first_ranked_ascending() {
        // One unambiguous key for each of two types: scores tie at 1 and
        // the ascending (score, name) sort picks "contour" over "symbol".
        // Inverted-looking, but pinned: lowest-ranked entry wins.
        let store = store();
        let value = json!({
            "contour_line_colour": "red",
            "symbol_colour": "blue"
        });
        let d = resolve(&value, &ResolveCtx::new(&store, "styles"))
            .unwrap()
            .unwrap();
        assert_eq!(d.dtype, DirectiveType::Contour);
    }

    #[test]
    fn lowest_score_wins_the_ascending_pick() {
        // contour scores 1, symbol scores 2; ascending sort ranks contour
        // first. Preserved behavior, not a bug to "fix" silently.
        let store = store();
        let value = json!({
            "contour_line_colour": "red",
            "symbol_colour": "blue",
            "symbol_height": 0.3
        });
        let d = resolve(&value, &ResolveCtx::new(&store, "styles"))
            .unwrap()
            .unwrap();
        assert_eq!(d.dtype, DirectiveType::Contour);
    }

    #[test]
    fn patch_add_against_matching_target() {
        let store = store();
        let target = Directive::new(DirectiveType::Contour).with("contour_line_colour", "blue");
        let value = json!({"+contour_line_colour": "red"});
        let d = resolve(
            &value,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.dtype, DirectiveType::Contour);
        assert_eq!(d.get("contour_line_colour"), Some(&json!("red")));
    }

    #[test]
    fn patch_falls_back_to_target_type_for_unknown_keys() {
        let store = store();
        let target = Directive::new(DirectiveType::Contour).with("contour_line_colour", "blue");
        let value = json!({"+colour": "red"});
        let d = resolve(
            &value,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.get("colour"), Some(&json!("red")));
        assert_eq!(d.get("contour_line_colour"), Some(&json!("blue")));
    }

    #[test]
    fn mixed_prefixed_and_plain_keys_violate_the_contract() {
        let store = store();
        let target = Directive::new(DirectiveType::Contour);
        let value = json!({"+contour_line_colour": "red", "contour_shade": "blue"});
        let err = resolve(
            &value,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::Contract(_)));
    }

    #[test]
    fn patch_without_target_is_an_error() {
        let store = store();
        let value = json!({"+contour_line_colour": "red"});
        let err = resolve(&value, &ResolveCtx::new(&store, "styles")).unwrap_err();
        assert!(matches!(err, PlotError::Contract(_)));
    }

    #[test]
    fn patch_against_mismatched_type_is_an_error() {
        let store = store();
        let target = Directive::new(DirectiveType::Text);
        let value = json!({"+contour_line_colour": "red"});
        let err = resolve(
            &value,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::Contract(_)));
    }

    #[test]
    fn set_clear_grouping_equals_prefix_form() {
        let store = store();
        let target = Directive::new(DirectiveType::Contour)
            .with("contour_line_colour", "blue")
            .with("contour_shade", true);

        let grouped = json!({
            "set": {"contour_line_colour": "red"},
            "clear": ["contour_shade"]
        });
        let raw = json!({
            "+contour_line_colour": "red",
            "-contour_shade": null
        });

        let via_grouped = resolve(
            &grouped,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap();
        let via_raw = resolve(
            &raw,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap();
        assert_eq!(via_grouped, via_raw);

        let d = via_grouped.unwrap();
        assert_eq!(d.get("contour_line_colour"), Some(&json!("red")));
        assert_eq!(d.get("contour_shade"), None);
    }

    #[test]
    fn plus_minus_grouping_equals_prefix_form() {
        let store = store();
        let target = Directive::new(DirectiveType::Symbol).with("symbol_height", 0.2);

        let grouped = json!({
            "+": {"symbol_colour": "red"},
            "-": ["symbol_height"]
        });
        let d = resolve(
            &grouped,
            &ResolveCtx::new(&store, "styles").target(Some(&target)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.get("symbol_colour"), Some(&json!("red")));
        assert_eq!(d.get("symbol_height"), None);
    }

    #[test]
    fn preset_name_builds_the_catalog_directive() {
        let store = store();
        let d = resolve(
            &json!("default-style-observations"),
            &ResolveCtx::new(&store, "styles"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.dtype, DirectiveType::Symbol);
        assert_eq!(d.get("symbol_type"), Some(&json!("marker")));
    }

    #[test]
    fn unknown_preset_name_is_an_error() {
        let store = store();
        let err = resolve(&json!("no-such-preset"), &ResolveCtx::new(&store, "styles"))
            .unwrap_err();
        assert!(matches!(err, PlotError::Preset(_)));
    }

    #[test]
    fn numbers_are_rejected() {
        let store = store();
        let err = resolve(&json!(42), &ResolveCtx::new(&store, "styles")).unwrap_err();
        assert!(matches!(err, PlotError::Contract(_)));
    }
}
