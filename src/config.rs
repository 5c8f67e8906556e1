// config.rs
//
// Compiled-in tuning for the atlas. Nothing here is read from disk; the only
// runtime settings are the directories and the export format chosen on the
// command line.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use plotters::prelude::RGBColor;

use crate::plot::OutputFormat;
use crate::region::Region;

/// Canvas of a single continent map, in pixels.
pub const REGION_CANVAS: (u32, u32) = (800, 600);
/// Canvas of the world overview map, in pixels.
pub const WORLD_CANVAS: (u32, u32) = (1000, 800);

pub const WORLD_SCALE: f64 = 230.0;
pub const WORLD_TRANSLATE: (f64, f64) = (860.0, 560.0);

/// Projection center shared by every continent map, as [lon, lat].
pub const REGION_CENTER: (f64, f64) = (10.0, 50.0);
/// Fraction of the viewport a fitted boundary may fill.
pub const FIT_PADDING: f64 = 0.8;
/// Smallest boundary extent, in degrees, used when fitting.
pub const MIN_EXTENT_DEG: f64 = 0.001;

/// Number of thresholds requested from the tick generator for histograms.
pub const HISTOGRAM_TICKS: usize = 10;
pub const LEGEND_TICKS: usize = 5;

pub const NO_DATA_COLOR: RGBColor = RGBColor(0xd3, 0xd3, 0xd3);
pub const OCEAN_COLOR: RGBColor = RGBColor(173, 216, 230);
pub const FILL_OPACITY: f64 = 0.8;

/// YlOrRd, low to high.
pub const STANDARD_RAMP: [RGBColor; 9] = [
    RGBColor(0xff, 0xff, 0xcc),
    RGBColor(0xff, 0xed, 0xa0),
    RGBColor(0xfe, 0xd9, 0x76),
    RGBColor(0xfe, 0xb2, 0x4c),
    RGBColor(0xfd, 0x8d, 0x3c),
    RGBColor(0xfc, 0x4e, 0x2a),
    RGBColor(0xe3, 0x1a, 0x1c),
    RGBColor(0xbd, 0x00, 0x26),
    RGBColor(0x80, 0x00, 0x26),
];

/// Viridis, low to high.
pub const COLORBLIND_RAMP: [RGBColor; 10] = [
    RGBColor(0x44, 0x01, 0x54),
    RGBColor(0x48, 0x28, 0x78),
    RGBColor(0x3e, 0x49, 0x89),
    RGBColor(0x31, 0x68, 0x8e),
    RGBColor(0x26, 0x82, 0x8e),
    RGBColor(0x1f, 0x9e, 0x89),
    RGBColor(0x35, 0xb7, 0x79),
    RGBColor(0x6e, 0xce, 0x58),
    RGBColor(0xb5, 0xde, 0x2b),
    RGBColor(0xfd, 0xe7, 0x25),
];

pub const STANDARD_LEGEND: [RGBColor; 3] = [
    RGBColor(0x88, 0x88, 0x88),
    RGBColor(0xff, 0xe7, 0xa2),
    RGBColor(0x90, 0x1d, 0x1d),
];

pub const COLORBLIND_LEGEND: [RGBColor; 3] = [
    RGBColor(0x44, 0x01, 0x54),
    RGBColor(0x21, 0x90, 0x8d),
    RGBColor(0xfd, 0xe7, 0x25),
];

/// Hand-tuned framing applied on top of the fitted projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Tuning {
    pub const NEUTRAL: Tuning = Tuning {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    const fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        Tuning {
            scale,
            translate_x,
            translate_y,
        }
    }
}

pub fn tuning_for(region: Region) -> Tuning {
    match region {
        Region::Europe => Tuning::new(200.0, 350.0, 125.0),
        Region::Asia => Tuning::new(55.0, 80.0, 0.0),
        Region::Africa => Tuning::new(50.0, 125.0, -300.0),
        Region::NorthAmerica => Tuning::new(45.0, -35.0, 250.0),
        Region::SouthAmerica => Tuning::new(50.0, 25.0, -600.0),
        Region::Oceania => Tuning::new(45.0, 450.0, -850.0),
        Region::World => Tuning::NEUTRAL,
    }
}

pub fn canvas_for(region: Region) -> (u32, u32) {
    if region.is_world() {
        WORLD_CANVAS
    } else {
        REGION_CANVAS
    }
}

/// Relative layout of the static data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataPaths { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn boundaries(&self, region: Region) -> PathBuf {
        self.root
            .join("geometria")
            .join(format!("{}.geojson", region.id()))
    }

    pub fn grades(&self, region: Region) -> PathBuf {
        self.root
            .join("grades")
            .join(format!("{}_routes_grades.csv", region.id()))
    }

    pub fn route_info(&self, region: Region) -> PathBuf {
        self.root
            .join("info")
            .join(format!("{}_routes_info.csv", region.id()))
    }

    pub fn climbers(&self) -> PathBuf {
        self.root.join("charts").join("processed_climber_df.csv")
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data: DataPaths,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
#[command(name = "crag-atlas", about = "Climbing-route atlas: choropleth maps and climber charts")]
pub struct Cli {
    /// Directory holding geometria/, grades/, info/ and charts/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
    /// Where exported images and the session log are written
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export the choropleth map of a region
    Map {
        /// world, europe, asia, africa, north_america, south_america or oceania
        region: Region,
        /// Grade label to filter by, or "all"
        #[arg(long, default_value = "all")]
        grade: String,
        /// Use the colorblind-safe palette
        #[arg(long)]
        colorblind: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
    },
    /// Export the demographic charts of a country
    Charts {
        country: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
    },
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let format = match &self.command {
            Some(Command::Map { format, .. } | Command::Charts { format, .. }) => *format,
            None => OutputFormat::default(),
        };
        Settings {
            data: DataPaths::new(&self.data_dir),
            output_dir: self.output_dir.clone(),
            format,
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
