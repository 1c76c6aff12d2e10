//! cartoplot
//!
//! A lightweight Rust library for turning declarative, loosely-typed map
//! plot descriptions into the ordered, typed directive sequence an external
//! cartographic rendering engine consumes. Pairs with the `cartoplot` CLI.
//!
//! ### Features
//! - Data layers from grib, netCDF, tabular point files and in-memory arrays
//! - Styles from named presets, flat parameter dictionaries, or incremental
//!   `+`/`-`/`=` patches against the current style
//! - Map decorations (background, foreground, grid, borders, rivers,
//!   cities), bounding-box accumulation and page-geometry computation
//! - Deterministic assembly order handed to any [`render::Renderer`]
//!
//! ### Example
//! ```no_run
//! use cartoplot::{Driver, PlotOptions};
//! use cartoplot::render::RecordingRenderer;
//! use serde_json::json;
//!
//! let options = PlotOptions::new()
//!     .with("title", "Observations")
//!     .with("grid", true)
//!     .with("path", "obs.png");
//! let mut driver = Driver::new(options)?;
//! driver.plot_table("observations.csv")?;
//! driver.style(&json!({"+symbol_colour": "red"}))?;
//! driver.bounding_box(60.0, -15.0, 30.0, 40.0);
//!
//! let renderer = RecordingRenderer::new();
//! let artifact = driver.render(&renderer)?;
//! println!("{}", artifact.path.display());
//! # Ok::<(), cartoplot::PlotError>(())
//! ```

pub mod bbox;
pub mod directive;
pub mod driver;
pub mod error;
pub mod options;
pub mod presets;
pub mod render;
pub mod resolve;
pub mod vocab;

pub use bbox::BoundingBox;
pub use directive::{Directive, Layer, PatchOp};
pub use driver::Driver;
pub use error::{PlotError, RenderError, Result};
pub use options::PlotOptions;
pub use presets::{MemoryPresetStore, PresetEntry, PresetStore};
pub use render::{ArtifactKind, PlotArtifact, Renderer};
pub use vocab::{DirectiveType, ParamIndex};
