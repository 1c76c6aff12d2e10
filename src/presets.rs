//! Preset store: named, catalog-stored parameter dictionaries.
//!
//! A preset entry maps exactly one directive type name to its parameter
//! dictionary. The store is read-only from the driver's point of view; the
//! in-memory implementation ships the default catalog and accepts extra
//! entries for callers and tests.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde_json::{Map, Value};

use crate::error::{PlotError, Result};
use crate::vocab::DirectiveType;

/// A resolved preset: the directive type it declares plus its parameters.
#[derive(Debug, Clone)]
pub struct PresetEntry {
    pub dtype: DirectiveType,
    pub params: BTreeMap<String, Value>,
}

/// Read-only lookup of presets by collection and name.
pub trait PresetStore {
    fn lookup(&self, collection: &str, name: &str) -> Result<PresetEntry>;
}

/// Default catalog, mirroring the entries the driver relies on: background
/// and foreground layers, the observation point style, and a few named
/// projections.
const DEFAULT_CATALOG: &str = r#"
{
    "layers": {
        "default-background": {
            "coastline": {
                "map_coastline_land_shade": true,
                "map_coastline_land_shade_colour": "cream",
                "map_coastline_sea_shade": false,
                "map_grid": false,
                "map_coastline": false,
                "map_label": false
            }
        },
        "default-foreground": {
            "coastline": {
                "map_coastline": true,
                "map_coastline_colour": "charcoal",
                "map_grid": false,
                "map_label": false
            }
        }
    },
    "styles": {
        "default-style-observations": {
            "symbol": {
                "symbol_type": "marker",
                "symbol_table_mode": "advanced",
                "symbol_advanced_table_selection_type": "interval",
                "symbol_marker_index": 15,
                "legend": false
            }
        }
    },
    "projections": {
        "global": {
            "map_frame": {
                "subpage_map_projection": "cylindrical",
                "subpage_lower_left_latitude": -90.0,
                "subpage_lower_left_longitude": -180.0,
                "subpage_upper_right_latitude": 90.0,
                "subpage_upper_right_longitude": 180.0
            }
        },
        "europe": {
            "map_frame": {
                "subpage_map_projection": "polar_stereographic",
                "subpage_lower_left_latitude": 21.51,
                "subpage_lower_left_longitude": -37.63,
                "subpage_upper_right_latitude": 51.28,
                "subpage_upper_right_longitude": 65.75,
                "subpage_map_vertical_longitude": 9.0
            }
        }
    }
}
"#;

/// In-memory preset store seeded with the default catalog.
pub struct MemoryPresetStore {
    // collection -> name -> { type-name: params }
    entries: AHashMap<String, AHashMap<String, Map<String, Value>>>,
}

impl MemoryPresetStore {
    /// Store holding only the built-in catalog.
    pub fn with_defaults() -> Self {
        let catalog: AHashMap<String, AHashMap<String, Map<String, Value>>> =
            serde_json::from_str(DEFAULT_CATALOG).expect("default catalog is valid");
        MemoryPresetStore { entries: catalog }
    }

    /// Register or replace a preset. `body` must be an object with exactly
    /// one `type-name: params` pair, but the shape is only checked at
    /// lookup time, matching the external-store contract.
    pub fn insert(&mut self, collection: &str, name: &str, body: Map<String, Value>) {
        self.entries
            .entry(collection.to_string())
            .or_default()
            .insert(name.to_string(), body);
    }
}

impl Default for MemoryPresetStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PresetStore for MemoryPresetStore {
    fn lookup(&self, collection: &str, name: &str) -> Result<PresetEntry> {
        let body = self
            .entries
            .get(collection)
            .and_then(|c| c.get(name))
            .ok_or_else(|| {
                PlotError::preset(format!("no preset {name:?} in collection {collection:?}"))
            })?;

        if body.len() != 1 {
            return Err(PlotError::preset(format!(
                "preset {name:?} in {collection:?} must declare exactly one directive type, found {}",
                body.len()
            )));
        }

        let (type_name, params) = body
            .iter()
            .next()
            .ok_or_else(|| PlotError::preset(format!("preset {name:?} in {collection:?} is empty")))?;
        let dtype = DirectiveType::from_name(type_name).ok_or_else(|| {
            PlotError::preset(format!(
                "preset {name:?} declares unknown directive type {type_name:?}"
            ))
        })?;
        let params = params
            .as_object()
            .ok_or_else(|| {
                PlotError::preset(format!("preset {name:?} parameters must be an object"))
            })?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(PresetEntry { dtype, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_catalog_has_background_and_foreground() {
        let store = MemoryPresetStore::with_defaults();
        let bg = store.lookup("layers", "default-background").unwrap();
        assert_eq!(bg.dtype, DirectiveType::Coastline);
        assert_eq!(bg.params["map_coastline_land_shade"], json!(true));

        let fg = store.lookup("layers", "default-foreground").unwrap();
        assert_eq!(fg.dtype, DirectiveType::Coastline);
        assert_eq!(fg.params["map_coastline"], json!(true));
    }

    #[test]
    fn observation_style_is_a_symbol_preset() {
        let store = MemoryPresetStore::with_defaults();
        let entry = store.lookup("styles", "default-style-observations").unwrap();
        assert_eq!(entry.dtype, DirectiveType::Symbol);
        assert_eq!(entry.params["symbol_type"], json!("marker"));
    }

    #[test]
    fn missing_preset_is_an_error() {
        let store = MemoryPresetStore::with_defaults();
        assert!(store.lookup("styles", "no-such-style").is_err());
        assert!(store.lookup("no-such-collection", "x").is_err());
    }

    #[test]
    fn malformed_entry_rejected_at_lookup() {
        let mut store = MemoryPresetStore::with_defaults();
        let mut body = Map::new();
        body.insert("contour".into(), json!({}));
        body.insert("symbol".into(), json!({}));
        store.insert("styles", "two-types", body);
        assert!(store.lookup("styles", "two-types").is_err());
    }
}
