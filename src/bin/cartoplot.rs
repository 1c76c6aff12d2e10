use anyhow::Result;
use cartoplot::render::RecordingRenderer;
use cartoplot::{Driver, PlotOptions};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cartoplot",
    version,
    about = "Turn a declarative map plot description into rendering directives"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a plot description and dump the assembled directive sequence.
    Plot(PlotArgs),
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// CSV file of (latitude, longitude, value) points.
    #[arg(long)]
    table: Option<PathBuf>,
    /// Grib file with a field to plot.
    #[arg(long)]
    grib: Option<PathBuf>,
    /// Byte offset of the field inside the grib file (default 0).
    #[arg(long, default_value_t = 0)]
    offset: u64,
    /// NetCDF file with a field to plot.
    #[arg(long)]
    netcdf: Option<PathBuf>,
    /// Variable name inside the netCDF file.
    #[arg(long)]
    variable: Option<String>,
    /// Style: a preset name, or a JSON dictionary of style parameters.
    #[arg(long)]
    style: Option<String>,
    /// Projection: a preset name, or a JSON dictionary.
    #[arg(long)]
    projection: Option<String>,
    /// Bounding box as north,west,south,east (degrees).
    #[arg(long)]
    bbox: Option<String>,
    /// Margin in degrees added around the bounding box.
    #[arg(long, default_value_t = 0.0)]
    margins: f64,
    /// Plot title.
    #[arg(long)]
    title: Option<String>,
    /// Draw the lat/lon grid.
    #[arg(long, default_value_t = false)]
    grid: bool,
    /// Draw country boundaries.
    #[arg(long, default_value_t = false)]
    borders: bool,
    /// Draw rivers.
    #[arg(long, default_value_t = false)]
    rivers: bool,
    /// Draw cities.
    #[arg(long, default_value_t = false)]
    cities: bool,
    /// Suppress the shaded background layer.
    #[arg(long, default_value_t = false)]
    no_background: bool,
    /// Output pixel width (default 680).
    #[arg(long, default_value_t = 680)]
    width: u32,
    /// Output file path; extension selects the format.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format when --out is not given (default png).
    #[arg(long)]
    format: Option<String>,
    /// Draw a frame around the page.
    #[arg(long, default_value_t = false)]
    frame: bool,
}

/// A value flag is either inline JSON or a preset name.
fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn parse_bbox(s: &str) -> Result<[f64; 4]> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("invalid --bbox, expected north,west,south,east"))?;
    if parts.len() != 4 {
        anyhow::bail!("invalid --bbox, expected 4 comma-separated numbers");
    }
    Ok([parts[0], parts[1], parts[2], parts[3]])
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Plot(args) => cmd_plot(args),
    }
}

fn cmd_plot(args: PlotArgs) -> Result<()> {
    let mut options = PlotOptions::new().with("width", args.width);
    if let Some(title) = &args.title {
        options.set("title", title.as_str());
    }
    if args.grid {
        options.set("grid", true);
    }
    if args.borders {
        options.set("borders", true);
    }
    if args.rivers {
        options.set("rivers", true);
    }
    if args.cities {
        options.set("cities", true);
    }
    if args.frame {
        options.set("frame", true);
    }
    if args.no_background {
        options.set("background", false);
    }
    if args.margins != 0.0 {
        options.set("margins", args.margins);
    }
    if let Some(projection) = &args.projection {
        options.set("projection", parse_value(projection));
    }
    if let Some(bbox) = &args.bbox {
        let [n, w, s, e] = parse_bbox(bbox)?;
        options.set("bounding_box", serde_json::json!([n, w, s, e]));
    }
    if let Some(out) = &args.out {
        options.set("path", out.to_string_lossy().as_ref());
    }
    if let Some(format) = &args.format {
        options.set("format", format.as_str());
    }

    let mut driver = Driver::new(options)?;

    if let Some(table) = &args.table {
        driver.plot_table(table)?;
    }
    if let Some(grib) = &args.grib {
        driver.plot_grib(grib, args.offset);
    }
    if let Some(netcdf) = &args.netcdf {
        let variable = args
            .variable
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--netcdf requires --variable"))?;
        driver.plot_netcdf(netcdf, variable, &Default::default());
    }
    if let Some(style) = &args.style {
        driver.style(&parse_value(style))?;
    }

    let renderer = RecordingRenderer::new();
    let artifact = driver.render(&renderer)?;

    let sequence = renderer.executed().into_iter().next().unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&sequence)?);
    eprintln!(
        "rendered {} ({} directives, width {})",
        artifact.path.display(),
        sequence.len(),
        artifact.width
    );
    Ok(())
}
