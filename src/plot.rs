// plot.rs
//
// Image export of choropleth maps and demographic charts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::choropleth::ChoroplethLayer;
use crate::config::{FILL_OPACITY, LEGEND_TICKS, NO_DATA_COLOR, OCEAN_COLOR};
use crate::demographics::{Bin, CountryCharts, GradeChart, MetricChart};
use crate::scale::ticks;

const CHART_BACKGROUND: RGBColor = RGBColor(34, 34, 34);
const MALE_COLOR: RGBColor = RGBColor(128, 0, 128);
const FEMALE_COLOR: RGBColor = RGBColor(255, 255, 0);
const GRADE_COLOR: RGBColor = RGBColor(60, 179, 113);
const GLOBAL_MARKER: RGBColor = RGBColor(255, 0, 0);

const METRIC_CANVAS: (u32, u32) = (480, 300);
const GRADE_CANVAS: (u32, u32) = (1555, 300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

enum Drawing<'a> {
    Map(&'a ChoroplethLayer),
    Metric(&'a MetricChart),
    Grades(&'a GradeChart, &'a str),
}

fn render(path: &Path, size: (u32, u32), format: OutputFormat, drawing: Drawing<'_>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw(&root, drawing)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw(&root, drawing)?;
            root.present()?;
        }
    }
    info!(path = %path.display(), "image written");
    Ok(())
}

fn draw<DB>(root: &DrawingArea<DB, Shift>, drawing: Drawing<'_>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    match drawing {
        Drawing::Map(layer) => draw_map(root, layer),
        Drawing::Metric(chart) => draw_metric_chart(root, chart),
        Drawing::Grades(chart, country) => draw_grade_chart(root, chart, country),
    }
}

pub fn write_map(layer: &ChoroplethLayer, path: &Path, format: OutputFormat) -> Result<()> {
    render(path, layer.viewport(), format, Drawing::Map(layer))
        .with_context(|| format!("rendering {} map", layer.region()))
}

/// Writes one image per metric plus the grade chart; returns the paths.
pub fn write_country_charts(
    charts: &CountryCharts,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let stem = file_stem(&charts.country);
    let ext = format.extension();
    let mut written = Vec::new();

    for chart in &charts.metrics {
        let path = dir.join(format!("{stem}_{}.{ext}", chart.metric.id()));
        render(&path, METRIC_CANVAS, format, Drawing::Metric(chart))
            .with_context(|| format!("rendering {} chart", chart.metric.id()))?;
        written.push(path);
    }

    let path = dir.join(format!("{stem}_grades.{ext}"));
    render(
        &path,
        GRADE_CANVAS,
        format,
        Drawing::Grades(&charts.grades, &charts.country),
    )
    .context("rendering grade chart")?;
    written.push(path);
    Ok(written)
}

pub fn map_path(dir: &Path, layer: &ChoroplethLayer, format: OutputFormat) -> PathBuf {
    dir.join(format!(
        "{}_{}_map.{}",
        layer.region().id(),
        file_stem(layer.grade().label()),
        format.extension()
    ))
}

/// Lowercase, with anything outside [a-z0-9] replaced by '_'.
pub fn file_stem(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn pixel(point: &(f64, f64)) -> (i32, i32) {
    (point.0.round() as i32, point.1.round() as i32)
}

fn draw_map<DB>(root: &DrawingArea<DB, Shift>, layer: &ChoroplethLayer) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&OCEAN_COLOR)?;

    let outline = ShapeStyle {
        color: BLACK.to_rgba(),
        filled: false,
        stroke_width: 1,
    };
    for shape in layer.shapes() {
        let fill = shape.fill.mix(FILL_OPACITY).filled();
        for rings in &shape.polygons {
            if let Some(exterior) = rings.first() {
                root.draw(&Polygon::new(
                    exterior.iter().map(pixel).collect::<Vec<_>>(),
                    fill,
                ))?;
            }
            for ring in rings {
                let mut points: Vec<(i32, i32)> = ring.iter().map(pixel).collect();
                if let Some(&first) = points.first() {
                    points.push(first);
                }
                root.draw(&PathElement::new(points, outline))?;
            }
        }
    }

    let title = format!(
        "{}: routes, grade {}",
        layer.region().display_name(),
        layer.grade()
    );
    root.draw(&Text::new(title, (20, 20), ("sans-serif", 24).into_font()))?;
    draw_legend(root, layer)
}

fn draw_legend<DB>(root: &DrawingArea<DB, Shift>, layer: &ChoroplethLayer) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    const WIDTH: i32 = 200;
    let (_, height) = layer.viewport();
    let left = 20;
    let top = height as i32 - 60;

    let ramp = layer.palette().legend();
    for i in 0..WIDTH {
        let color = ramp.sample(i as f64 / (WIDTH - 1) as f64);
        root.draw(&Rectangle::new(
            [(left + i, top), (left + i + 1, top + 12)],
            color.filled(),
        ))?;
    }

    let max = layer.max_count() as f64;
    let font = ("sans-serif", 12).into_font();
    for tick in ticks(0.0, max, LEGEND_TICKS)
        .into_iter()
        .filter(|t| t.fract() == 0.0)
    {
        let x = left + (tick / max * (WIDTH - 1) as f64).round() as i32;
        root.draw(&PathElement::new(
            vec![(x, top + 12), (x, top + 16)],
            BLACK.stroke_width(1),
        ))?;
        root.draw(&Text::new(
            format!("{}", tick as u64),
            (x - 4, top + 18),
            font.clone(),
        ))?;
    }

    let swatch = left + WIDTH + 20;
    root.draw(&Rectangle::new(
        [(swatch, top), (swatch + 12, top + 12)],
        NO_DATA_COLOR.filled(),
    ))?;
    root.draw(&Text::new("No data", (swatch + 18, top), font))?;
    Ok(())
}

// Dash segments of a vertical rule at `x` from `y0` up to `y1`.
fn dashed_rule(x: f64, y0: f64, y1: f64) -> Vec<Vec<(f64, f64)>> {
    let dash = (y1 - y0) / 24.0;
    let mut segments = Vec::new();
    let mut y = y0;
    while y < y1 {
        segments.push(vec![(x, y), (x, (y + dash).min(y1))]);
        y += dash * 2.0;
    }
    segments
}

// Zero-width bins (a domain collapsing onto its last threshold) have no area.
fn is_drawn(bin: &Bin) -> bool {
    bin.count > 0 && bin.x1 > bin.x0
}

/// Pins `x` into `[lo, hi]`; the flag is false when it had to move.
fn clamp_to_domain(x: f64, lo: f64, hi: f64) -> (f64, bool) {
    let clamped = x.clamp(lo, hi);
    (clamped, clamped == x)
}

fn draw_metric_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &MetricChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&CHART_BACKGROUND)?;

    let (mut lo, mut hi) = chart.domain;
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let top = chart.y_max().max(1) as f64 * 1.15;

    let mut ctx = ChartBuilder::on(root)
        .margin(20)
        .caption(chart.metric.label(), ("sans-serif", 18).into_font().color(&WHITE))
        .set_label_area_size(LabelAreaPosition::Left, 40)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(lo..hi, 0.0..top)?;

    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(5)
        .y_labels(5)
        .x_desc(chart.metric.label())
        .axis_style(&WHITE)
        .label_style(("sans-serif", 12).into_font().color(&WHITE))
        .axis_desc_style(("sans-serif", 13).into_font().color(&WHITE))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    for (bins, color) in [
        (&chart.male_bins, MALE_COLOR),
        (&chart.female_bins, FEMALE_COLOR),
    ] {
        ctx.draw_series(bins.iter().filter(|bin| is_drawn(bin)).map(|bin| {
            Rectangle::new(
                [(bin.x0, 0.0), (bin.x1, bin.count as f64)],
                color.mix(0.8).filled(),
            )
        }))?;
    }

    let label_font = ("sans-serif", 12).into_font();
    let country_rule = ShapeStyle {
        color: WHITE.to_rgba(),
        filled: false,
        stroke_width: 2,
    };
    let global_rule = ShapeStyle {
        color: GLOBAL_MARKER.to_rgba(),
        filled: false,
        stroke_width: 2,
    };

    // Country means sit inline next to the bars.
    let country_markers = [
        (chart.country_means.male, "M", (5, 15)),
        (chart.country_means.female, "F", (-55, 30)),
    ];
    for (mean, tag, offset) in country_markers {
        let Some(mean) = mean else { continue };
        ctx.draw_series(
            dashed_rule(mean, 0.0, top)
                .into_iter()
                .map(|segment| PathElement::new(segment, country_rule)),
        )?;
        ctx.draw_series(std::iter::once(
            EmptyElement::at((mean, top))
                + Text::new(
                    format!("{tag}: {mean:.1}"),
                    offset,
                    label_font.clone().color(&WHITE),
                ),
        ))?;
    }

    // Global means are red and labelled along the top edge.
    let global_markers = [
        (chart.global_means.male, "M", (0, -14)),
        (chart.global_means.female, "F", (-45, -14)),
    ];
    for (mean, tag, offset) in global_markers {
        let Some(mean) = mean else { continue };
        let (x, inside) = clamp_to_domain(mean, lo, hi);
        if inside {
            ctx.draw_series(
                dashed_rule(mean, 0.0, top)
                    .into_iter()
                    .map(|segment| PathElement::new(segment, global_rule)),
            )?;
        }
        ctx.draw_series(std::iter::once(
            EmptyElement::at((x, top))
                + Text::new(
                    format!("{tag}: {mean:.1}"),
                    offset,
                    label_font.clone().color(&GLOBAL_MARKER),
                ),
        ))?;
    }
    Ok(())
}

fn draw_grade_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &GradeChart, country: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&CHART_BACKGROUND)?;

    let labels: Vec<&str> = chart.categories.iter().map(|(l, _)| l.as_str()).collect();
    let n = labels.len().max(1) as u32;
    let top = chart.max_count().max(1) as f64 * 1.1;

    let mut ctx = ChartBuilder::on(root)
        .margin(20)
        .caption(
            format!("Climbers in {country} climb..."),
            ("sans-serif", 18).into_font().color(&WHITE),
        )
        .set_label_area_size(LabelAreaPosition::Left, 40)
        .set_label_area_size(LabelAreaPosition::Bottom, 30)
        .build_cartesian_2d((0u32..n).into_segmented(), 0.0..top)?;

    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(labels.len().max(1))
        .y_labels(5)
        .axis_style(&WHITE)
        .label_style(("sans-serif", 12).into_font().color(&WHITE))
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).copied().unwrap_or("").to_string(),
            _ => String::new(),
        })
        .y_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    ctx.draw_series(
        Histogram::vertical(&ctx)
            .style(GRADE_COLOR.filled())
            .margin(8)
            .data(
                chart
                    .categories
                    .iter()
                    .enumerate()
                    .map(|(i, (_, count))| (i as u32, *count as f64)),
            ),
    )?;

    if let (Some(index), Some(label)) = (chart.reference_index(), chart.global_reference.as_ref()) {
        let style = ShapeStyle {
            color: GLOBAL_MARKER.to_rgba(),
            filled: false,
            stroke_width: 2,
        };
        let index = index as u32;
        ctx.draw_series(dashed_rule(0.0, 0.0, top).into_iter().map(|segment| {
            PathElement::new(
                segment
                    .into_iter()
                    .map(|(_, y)| (SegmentValue::CenterOf(index), y))
                    .collect::<Vec<_>>(),
                style,
            )
        }))?;
        ctx.draw_series(std::iter::once(
            EmptyElement::at((SegmentValue::CenterOf(index), top))
                + Text::new(
                    format!("Global median: {label}"),
                    (5, 2),
                    ("sans-serif", 12).into_font().color(&GLOBAL_MARKER),
                ),
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::data::{BoundaryDocument, CountryFeature, RouteGradeRecord, WorldData};
    use crate::grades::GradeFilter;
    use crate::region::Region;

    #[test]
    fn file_stems_are_filesystem_safe() {
        assert_eq!(file_stem(" South Korea "), "south_korea");
        assert_eq!(file_stem("6b+"), "6b_");
    }

    #[test]
    fn empty_and_zero_width_bins_are_not_drawn() {
        assert!(is_drawn(&Bin { x0: 160.0, x1: 165.0, count: 3 }));
        assert!(!is_drawn(&Bin { x0: 160.0, x1: 165.0, count: 0 }));
        assert!(!is_drawn(&Bin { x0: 190.0, x1: 190.0, count: 2 }));
    }

    #[test]
    fn global_means_outside_the_domain_pin_to_the_edge() {
        assert_eq!(clamp_to_domain(172.5, 160.0, 190.0), (172.5, true));
        assert_eq!(clamp_to_domain(150.0, 160.0, 190.0), (160.0, false));
        assert_eq!(clamp_to_domain(201.0, 160.0, 190.0), (190.0, false));
    }

    #[test]
    fn dashed_rule_covers_the_span() {
        let segments = dashed_rule(3.0, 0.0, 24.0);
        assert_eq!(segments.len(), 12);
        assert!(segments.iter().all(|s| s[0].0 == 3.0));
        assert_eq!(segments[0], vec![(3.0, 0.0), (3.0, 1.0)]);
    }

    #[test]
    fn svg_map_is_written() {
        let world = WorldData {
            continents: vec![(
                Region::Europe,
                BoundaryDocument {
                    features: vec![CountryFeature {
                        name: Some("Spain".into()),
                        polygons: vec![vec![vec![
                            (-9.0, 36.0),
                            (3.0, 36.0),
                            (3.0, 43.5),
                            (-9.0, 43.5),
                        ]]],
                    }],
                },
            )],
            grades: vec![RouteGradeRecord {
                country: "Spain".into(),
                grade: "6a".into(),
                route_count: 12,
            }],
        };
        let layer = ChoroplethLayer::for_world(&world, &GradeFilter::All, Palette::Colorblind);
        let dir = tempfile::tempdir().unwrap();
        let path = map_path(dir.path(), &layer, OutputFormat::Svg);
        assert!(path.ends_with("world_all_map.svg"));

        write_map(&layer, &path, OutputFormat::Svg).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polygon"));
    }
}
