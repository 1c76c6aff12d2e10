//! The pipeline driver.
//!
//! Accumulates data layers and map decorations, resolves loose style/config
//! values into directives, computes the page geometry, and hands the final
//! ordered directive sequence to the external renderer. One driver serves a
//! single plot: accumulate, then render once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::error;
use serde_json::{Map, Value, json};

use crate::bbox::BoundingBox;
use crate::directive::{Directive, Layer};
use crate::error::{PlotError, Result};
use crate::options::PlotOptions;
use crate::presets::{MemoryPresetStore, PresetStore};
use crate::render::{ArtifactKind, PlotArtifact, Renderer};
use crate::resolve::{ResolveCtx, resolve};
use crate::vocab::DirectiveType;

const PAGE_WIDTH_CM: f64 = 10.0;
const PAGE_HEIGHT_CM: f64 = 10.0;
const TITLE_BAND_CM: f64 = 0.7;

pub struct Driver {
    options: PlotOptions,
    store: Box<dyn PresetStore>,

    layers: Vec<Layer>,
    projection: Option<Directive>,
    background: Option<Directive>,
    foreground: Option<Directive>,
    grid: Option<Directive>,
    rivers: Option<Directive>,
    borders: Option<Directive>,
    cities: Option<Directive>,
    legend: Option<Directive>,
    title: Option<Directive>,

    bounding: Option<BoundingBox>,
    tmp: Vec<tempfile::TempPath>,
}

impl Driver {
    /// Driver with the built-in preset catalog. The background and
    /// foreground slots start at their default presets.
    pub fn new(options: PlotOptions) -> Result<Self> {
        Self::with_store(options, Box::new(MemoryPresetStore::with_defaults()))
    }

    pub fn with_store(options: PlotOptions, store: Box<dyn PresetStore>) -> Result<Self> {
        let mut driver = Driver {
            options,
            store,
            layers: Vec::new(),
            projection: None,
            background: None,
            foreground: None,
            grid: None,
            rivers: None,
            borders: None,
            cities: None,
            legend: None,
            title: None,
            bounding: None,
            tmp: Vec::new(),
        };
        driver.background(&json!(true))?;
        driver.foreground(&json!(true))?;
        Ok(driver)
    }

    /// Temporary file deleted when the driver goes out of scope.
    pub fn temporary_file(&mut self, extension: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new().suffix(extension).tempfile()?;
        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        self.tmp.push(temp_path);
        Ok(path)
    }

    /// Union the box into the accumulated extent. Monotonic: the extent
    /// only grows, never shrinks.
    pub fn bounding_box(&mut self, north: f64, west: f64, south: f64, east: f64) {
        let bbox = BoundingBox::new(north, west, south, east);
        self.bounding = Some(match self.bounding {
            None => bbox,
            Some(current) => current.merge(&bbox),
        });
    }

    fn push_layer(&mut self, data: Directive) {
        self.layers.push(Layer::new(data));
    }

    /// File-backed grid field addressed by byte offset.
    pub fn plot_grib(&mut self, path: impl AsRef<Path>, offset: u64) {
        self.push_layer(
            Directive::new(DirectiveType::GribField)
                .with("grib_input_file_name", path.as_ref().to_string_lossy().as_ref())
                .with("grib_file_address_mode", "byte_offset")
                .with("grib_field_position", offset),
        );
    }

    /// File-backed multidimensional field, addressed by variable name and
    /// optional dimension indices.
    pub fn plot_netcdf(
        &mut self,
        path: impl AsRef<Path>,
        variable: &str,
        dimensions: &BTreeMap<String, i64>,
    ) {
        let mut data = Directive::new(DirectiveType::NetcdfField)
            .with("netcdf_filename", path.as_ref().to_string_lossy().as_ref())
            .with("netcdf_value_variable", variable);

        if !dimensions.is_empty() {
            let settings: Vec<String> =
                dimensions.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            data = data
                .with("netcdf_dimension_setting", json!(settings))
                .with("netcdf_dimension_setting_method", "index");
        }

        self.push_layer(data);
    }

    /// In-memory field on a regular lat/lon grid. The latitude step runs
    /// north to south, hence the negated increment.
    pub fn plot_array(
        &mut self,
        values: Vec<Vec<f64>>,
        north: f64,
        west: f64,
        south_north_increment: f64,
        west_east_increment: f64,
        metadata: Map<String, Value>,
    ) {
        self.push_layer(
            Directive::new(DirectiveType::ArrayField)
                .with("input_field", json!(values))
                .with("input_field_initial_latitude", north)
                .with("input_field_latitude_step", -south_north_increment)
                .with("input_field_initial_longitude", west)
                .with("input_field_longitude_step", west_east_increment)
                .with("input_metadata", Value::Object(metadata)),
        );
    }

    /// Tabular point file with fixed column roles (latitude, longitude,
    /// value), styled with the default observation preset.
    pub fn plot_table(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.push_layer(
            Directive::new(DirectiveType::Table)
                .with("table_filename", path.as_ref().to_string_lossy().as_ref())
                .with("table_latitude_variable", "1")
                .with("table_longitude_variable", "2")
                .with("table_value_variable", "3")
                .with("table_header_row", 0)
                .with("table_variable_identifier_type", "index"),
        );
        self.style(&json!("default-style-observations"))
    }

    /// In-memory (lat, lon, value) records, materialized to a temporary
    /// CSV file and plotted as a table. An optional style annotation is
    /// applied on top of the observation default.
    pub fn plot_records(
        &mut self,
        records: &[(f64, f64, f64)],
        style: Option<&Value>,
    ) -> Result<()> {
        let path = self.temporary_file(".csv")?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        for (lat, lon, value) in records {
            writer.serialize((lat, lon, value))?;
        }
        writer.flush()?;

        self.plot_table(&path)?;
        if let Some(style) = style {
            self.style(style)?;
        }
        Ok(())
    }

    /// Resolve a style value against the last layer's current style.
    pub fn style(&mut self, value: &Value) -> Result<()> {
        let Some(layer) = self.layers.last_mut() else {
            return Err(PlotError::contract(format!(
                "no current data layer: cannot set style {value}"
            )));
        };
        let resolved = resolve(
            value,
            &ResolveCtx::new(self.store.as_ref(), "styles").target(layer.style()),
        )?;
        layer.set_style(resolved);
        Ok(())
    }

    pub fn background(&mut self, value: &Value) -> Result<()> {
        let default = json!("default-background");
        let resolved = resolve(
            value,
            &ResolveCtx::new(self.store.as_ref(), "layers")
                .default(&default)
                .target(self.background.as_ref()),
        )?;
        self.background = resolved;
        Ok(())
    }

    pub fn foreground(&mut self, value: &Value) -> Result<()> {
        let default = json!("default-foreground");
        let resolved = resolve(
            value,
            &ResolveCtx::new(self.store.as_ref(), "layers")
                .default(&default)
                .target(self.foreground.as_ref()),
        )?;
        self.foreground = resolved;
        Ok(())
    }

    /// No default here: a bare `true` for the projection is a contract
    /// violation.
    pub fn projection(&mut self, value: &Value) -> Result<()> {
        let resolved = resolve(
            value,
            &ResolveCtx::new(self.store.as_ref(), "projections")
                .target(self.projection.as_ref()),
        )?;
        self.projection = resolved;
        Ok(())
    }

    /// Legend box for the drawn styles. Like the projection, there is no
    /// default to fall back on for a bare `true`.
    pub fn legend(&mut self, value: &Value) -> Result<()> {
        let resolved = resolve(
            value,
            &ResolveCtx::new(self.store.as_ref(), "legends")
                .target(self.legend.as_ref()),
        )?;
        self.legend = resolved;
        Ok(())
    }

    fn apply_option_inputs(&mut self) -> Result<()> {
        if self.options.provided("style") {
            let value = self.options.get_or("style", Value::Null);
            self.style(&value)?;
        }

        if self.options.provided("bounding_box") {
            let value = self.options.get_or("bounding_box", Value::Null);
            let bbox = parse_bbox_option(&value)?;
            self.bounding_box(bbox.north, bbox.west, bbox.south, bbox.east);
        }

        if self.options.provided("background") {
            let value = self.options.get_or("background", Value::Null);
            self.background(&value)?;
        }

        if self.options.provided("foreground") {
            let value = self.options.get_or("foreground", Value::Null);
            self.foreground(&value)?;
        }

        if self.options.provided("projection") {
            let value = self.options.get_or("projection", Value::Null);
            self.projection(&value)?;
        }

        if self.options.bool_or("grid", false) {
            self.grid = Some(
                Directive::new(DirectiveType::Coastline)
                    .with("map_grid", true)
                    .with("map_coastline", false),
            );
        }

        if self.options.bool_or("borders", false) {
            self.borders = Some(
                Directive::new(DirectiveType::Coastline)
                    .with("map_boundaries", true)
                    .with("map_grid", false)
                    .with("map_coastline", false)
                    .with("map_label", false),
            );
        }

        if self.options.bool_or("rivers", false) {
            self.rivers = Some(
                Directive::new(DirectiveType::Coastline)
                    .with("map_rivers", true)
                    .with("map_grid", false)
                    .with("map_coastline", false)
                    .with("map_label", false),
            );
        }

        if self.options.bool_or("cities", false) {
            self.cities = Some(
                Directive::new(DirectiveType::Coastline)
                    .with("map_cities", true)
                    .with("map_label", false)
                    .with("map_grid", false)
                    .with("map_coastline", false),
            );
        }

        Ok(())
    }

    /// Finalize the plot: resolve option-sourced inputs, compute the page
    /// geometry, assemble the directive sequence and execute it.
    pub fn render(&mut self, renderer: &dyn Renderer) -> Result<PlotArtifact> {
        self.apply_option_inputs()?;

        let title = self.options.get_or("title", Value::Null);
        let width = self.options.u32_or("width", 680);
        let frame = self.options.bool_or("frame", false);
        let format = self
            .options
            .str_opt("format")
            .unwrap_or_else(|| "png".to_string());
        let path = match self.options.str_opt("path") {
            Some(p) => PathBuf::from(p),
            None => self.temporary_file(&format!(".{format}"))?,
        };

        if self.projection.is_none() {
            self.projection = Some(
                Directive::new(DirectiveType::MapFrame)
                    .with("subpage_map_projection", "cylindrical"),
            );
        }

        if let Some(bbox) = self.bounding {
            let bbox = bbox.add_margins(self.options.f64_or("margins", 0.0));
            let patch = json!({
                "+subpage_upper_right_longitude": bbox.east,
                "+subpage_upper_right_latitude": bbox.north,
                "+subpage_lower_left_latitude": bbox.south,
                "+subpage_lower_left_longitude": bbox.west,
            });
            let resolved = resolve(
                &patch,
                &ResolveCtx::new(self.store.as_ref(), "projections")
                    .dtype(DirectiveType::MapFrame)
                    .target(self.projection.as_ref()),
            )?;
            self.projection = resolved;
        }

        let page_ratio = self
            .projection
            .as_ref()
            .map(projection_page_ratio)
            .unwrap_or(1.0);

        let mut title_band_cm = 0.0;
        self.title = match title {
            Value::Null | Value::Bool(false) => None,
            Value::Bool(true) => {
                // Automatic title, filled in by the engine.
                title_band_cm = TITLE_BAND_CM;
                Some(Directive::new(DirectiveType::Text))
            }
            Value::String(text) if text.is_empty() => None,
            // Other falsy values suppress the title too, like the
            // empty string.
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(fields) if fields.is_empty() => None,
            Value::String(text) => {
                title_band_cm = TITLE_BAND_CM;
                Some(Directive::new(DirectiveType::Text).with("text_lines", json!([text])))
            }
            other => {
                title_band_cm = TITLE_BAND_CM;
                Some(
                    Directive::new(DirectiveType::Text)
                        .with("text_lines", json!([other.to_string()])),
                )
            }
        };

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&format)
            .to_string();
        let base = path.with_extension("");

        let page = Directive::new(DirectiveType::OutputPage)
            .with("output_formats", json!([format]))
            .with("output_name_first_page_number", false)
            .with("page_x_length", PAGE_WIDTH_CM)
            .with("page_y_length", PAGE_HEIGHT_CM * page_ratio)
            .with("super_page_x_length", PAGE_WIDTH_CM)
            .with("super_page_y_length", PAGE_HEIGHT_CM * page_ratio + title_band_cm)
            .with("subpage_x_length", PAGE_WIDTH_CM)
            .with("subpage_y_length", PAGE_HEIGHT_CM * page_ratio)
            .with("subpage_x_position", 0.0)
            .with("subpage_y_position", 0.0)
            .with("output_width", width)
            .with("page_frame", frame)
            .with("page_id_line", false)
            .with("output_name", base.to_string_lossy().as_ref());

        // Reserved for incremental re-rendering; consulted so the unused
        // check stays quiet when callers pass them.
        self.options.bool_or("update", false);
        self.options.bool_or("update_foreground", false);

        self.options.check_unused();

        let mut sequence = vec![page];
        sequence.extend(self.assemble());

        if let Err(err) = renderer.execute(&sequence) {
            let listing: Vec<String> = sequence.iter().map(|d| d.to_string()).collect();
            error!("error executing directive sequence:\n{}", listing.join("\n"));
            return Err(err.into());
        }

        Ok(PlotArtifact {
            kind: ArtifactKind::from_extension(&format),
            path,
            width,
        })
    }

    /// The fixed stacking order: projection, background, each layer's
    /// [data, style] pair in insertion order, rivers, borders, cities,
    /// foreground, grid, legend, title. Empty slots are omitted.
    pub fn assemble(&self) -> Vec<Directive> {
        let mut sequence = Vec::new();
        if let Some(projection) = &self.projection {
            sequence.push(projection.clone());
        }
        if let Some(background) = &self.background {
            sequence.push(background.clone());
        }
        for layer in &self.layers {
            layer.append_to(&mut sequence);
        }
        for slot in [
            &self.rivers,
            &self.borders,
            &self.cities,
            &self.foreground,
            &self.grid,
            &self.legend,
            &self.title,
        ] {
            if let Some(directive) = slot {
                sequence.push(directive.clone());
            }
        }
        sequence
    }
}

/// Height-to-width ratio of the map area, from the frame's extent (full
/// world when unset).
fn projection_page_ratio(projection: &Directive) -> f64 {
    let south = projection.get_f64_or("subpage_lower_left_latitude", -90.0);
    let west = projection.get_f64_or("subpage_lower_left_longitude", -180.0);
    let north = projection.get_f64_or("subpage_upper_right_latitude", 90.0);
    let east = projection.get_f64_or("subpage_upper_right_longitude", 180.0);
    (north - south) / (east - west)
}

/// Accept a `bounding_box` option as a `[north, west, south, east]` array
/// or a `{north, west, south, east}` object.
fn parse_bbox_option(value: &Value) -> Result<BoundingBox> {
    match value {
        Value::Array(parts) if parts.len() == 4 => {
            let mut coords = [0.0; 4];
            for (slot, part) in coords.iter_mut().zip(parts) {
                *slot = part.as_f64().ok_or_else(|| {
                    PlotError::contract(format!("bounding_box entries must be numbers, got {part}"))
                })?;
            }
            Ok(BoundingBox::new(coords[0], coords[1], coords[2], coords[3]))
        }
        Value::Object(fields) => {
            let coord = |name: &str| {
                fields.get(name).and_then(Value::as_f64).ok_or_else(|| {
                    PlotError::contract(format!("bounding_box object is missing numeric {name:?}"))
                })
            };
            Ok(BoundingBox::new(
                coord("north")?,
                coord("west")?,
                coord("south")?,
                coord("east")?,
            ))
        }
        other => Err(PlotError::contract(format!(
            "bounding_box must be a 4-element array or an object, got {other}"
        ))),
    }
}
