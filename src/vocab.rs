//! Directive vocabulary and the parameter index.
//!
//! The renderer understands a closed set of directive types, each declaring
//! the parameter names it accepts. The declarative table lives in
//! `vocab.json`; from it we build a reverse index (parameter name -> set of
//! declaring types) used by the resolution engine to infer a directive type
//! from a bare parameter dictionary.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// The closed vocabulary of rendering directives.
///
/// Content types hold data to draw; the rest are styles, map decorations,
/// the map frame (projection) and the output page description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveType {
    /// File-backed grid field addressed by byte offset.
    GribField,
    /// File-backed multidimensional field addressed by variable name.
    NetcdfField,
    /// In-memory field with explicit geolocation grid parameters.
    ArrayField,
    /// Tabular point file with column roles.
    Table,
    /// Isoline/shading style for field layers.
    Contour,
    /// Marker style for point layers.
    Symbol,
    /// Legend box describing the drawn styles.
    Legend,
    /// Coastline / grid / border / city overlay.
    Coastline,
    /// Map frame and projection.
    MapFrame,
    /// Title or annotation text.
    Text,
    /// Physical page geometry and output destination.
    OutputPage,
}

impl DirectiveType {
    pub const ALL: [DirectiveType; 11] = [
        DirectiveType::GribField,
        DirectiveType::NetcdfField,
        DirectiveType::ArrayField,
        DirectiveType::Table,
        DirectiveType::Contour,
        DirectiveType::Symbol,
        DirectiveType::Legend,
        DirectiveType::Coastline,
        DirectiveType::MapFrame,
        DirectiveType::Text,
        DirectiveType::OutputPage,
    ];

    /// Type-name string as used in the vocabulary table and preset store.
    pub fn name(&self) -> &'static str {
        match self {
            DirectiveType::GribField => "grib_field",
            DirectiveType::NetcdfField => "netcdf_field",
            DirectiveType::ArrayField => "array_field",
            DirectiveType::Table => "table",
            DirectiveType::Contour => "contour",
            DirectiveType::Symbol => "symbol",
            DirectiveType::Legend => "legend",
            DirectiveType::Coastline => "coastline",
            DirectiveType::MapFrame => "map_frame",
            DirectiveType::Text => "text",
            DirectiveType::OutputPage => "output_page",
        }
    }

    pub fn from_name(name: &str) -> Option<DirectiveType> {
        DirectiveType::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl std::fmt::Display for DirectiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const VOCAB_JSON: &str = include_str!("vocab.json");

/// Reverse lookup from parameter name to the directive types declaring it.
///
/// Built once per process on first use and never rebuilt. A parameter
/// declared by more than one type is ambiguous and ignored by inference
/// scoring.
pub struct ParamIndex {
    by_param: AHashMap<String, BTreeSet<DirectiveType>>,
}

impl ParamIndex {
    /// The process-wide index, built on first call.
    pub fn get() -> &'static ParamIndex {
        static INDEX: OnceLock<ParamIndex> = OnceLock::new();
        INDEX.get_or_init(ParamIndex::build)
    }

    fn build() -> ParamIndex {
        // The embedded table is part of the crate; a parse failure is a
        // packaging bug, not a runtime condition.
        let table: AHashMap<String, Vec<String>> =
            serde_json::from_str(VOCAB_JSON).expect("vocab.json is valid");

        let mut by_param: AHashMap<String, BTreeSet<DirectiveType>> = AHashMap::new();
        for (type_name, params) in &table {
            let dtype = DirectiveType::from_name(type_name)
                .unwrap_or_else(|| panic!("vocab.json names unknown type {type_name:?}"));
            for param in params {
                by_param.entry(param.clone()).or_default().insert(dtype);
            }
        }
        ParamIndex { by_param }
    }

    /// Directive types declaring `param`; empty when the name is unknown.
    pub fn lookup(&self, param: &str) -> &BTreeSet<DirectiveType> {
        static EMPTY: BTreeSet<DirectiveType> = BTreeSet::new();
        self.by_param.get(param).unwrap_or(&EMPTY)
    }

    /// The single type declaring `param`, or `None` when the name is
    /// unknown or ambiguous.
    pub fn unambiguous(&self, param: &str) -> Option<DirectiveType> {
        let types = self.lookup(param);
        if types.len() == 1 {
            types.iter().next().copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for t in DirectiveType::ALL {
            assert_eq!(DirectiveType::from_name(t.name()), Some(t));
        }
        assert_eq!(DirectiveType::from_name("nonsense"), None);
    }

    #[test]
    fn lookup_unambiguous_parameter() {
        let index = ParamIndex::get();
        assert_eq!(
            index.unambiguous("contour_line_colour"),
            Some(DirectiveType::Contour)
        );
        assert_eq!(index.unambiguous("table_filename"), Some(DirectiveType::Table));
        assert_eq!(
            index.unambiguous("subpage_map_projection"),
            Some(DirectiveType::MapFrame)
        );
        assert_eq!(
            index.unambiguous("legend_display_type"),
            Some(DirectiveType::Legend)
        );
    }

    #[test]
    fn legend_is_ambiguous() {
        let index = ParamIndex::get();
        let types = index.lookup("legend");
        assert!(types.contains(&DirectiveType::Contour));
        assert!(types.contains(&DirectiveType::Symbol));
        assert_eq!(index.unambiguous("legend"), None);
    }

    #[test]
    fn unknown_parameter_yields_empty_set() {
        let index = ParamIndex::get();
        assert!(index.lookup("no_such_parameter").is_empty());
    }
}
