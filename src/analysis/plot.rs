use std::fs;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::summary::SummaryTable;
use crate::analysis::AnalysisError;
use crate::types::TraceAnalysis;

const CURRENT_AXIS: &str = "I_s (A)";
const DRIVE_VOLTAGE_AXIS: &str = "U_a (V)";
const STOP_VOLTAGE_AXIS: &str = "U_s (mV)";

/// Figure geometry and colors. Sizes are in inches and points, like a print figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font_pt: f64,
    pub line_pt: f64,
    /// Marker diameter.
    pub marker_pt: f64,
    pub background: [u8; 3],
    pub panel: [u8; 3],
    pub grid: [u8; 3],
    pub text: [u8; 3],
    pub palette: Vec<[u8; 3]>,
    /// Draw axes, axis labels and legends. Plots without them need no fonts.
    pub annotate: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        // ggplot-like look at print resolution.
        Self {
            width_in: 6.4,
            height_in: 4.8,
            dpi: 300,
            font_pt: 10.0,
            line_pt: 1.5,
            marker_pt: 3.0,
            background: [255, 255, 255],
            panel: [229, 229, 229],
            grid: [255, 255, 255],
            text: [85, 85, 85],
            palette: vec![
                [226, 74, 51],
                [52, 138, 189],
                [152, 142, 213],
                [119, 119, 119],
                [251, 193, 94],
                [142, 186, 66],
                [255, 181, 184],
            ],
            annotate: true,
        }
    }
}

impl PlotStyle {
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |reason: &str| AnalysisError::InvalidConfig(format!("plot: {reason}"));
        if self.dpi == 0 {
            return Err(invalid("dpi must be positive"));
        }
        let sizes = [self.width_in, self.height_in, self.font_pt, self.line_pt, self.marker_pt];
        if sizes.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(invalid("sizes must be finite and positive"));
        }
        let (width, height) = self.pixel_size();
        if width == 0 || height == 0 || width > 16_384 || height > 16_384 {
            return Err(invalid("figure must be between 1 and 16384 pixels per side"));
        }
        if self.palette.is_empty() {
            return Err(invalid("palette is empty"));
        }
        Ok(())
    }

    fn pixels(&self, points: f64) -> u32 {
        ((points * f64::from(self.dpi) / 72.0).round() as u32).max(1)
    }

    fn series_color(&self, index: usize) -> RGBColor {
        self.palette
            .get(index % self.palette.len().max(1))
            .map(|&rgb| color(rgb))
            .unwrap_or(BLACK)
    }
}

fn color([r, g, b]: [u8; 3]) -> RGBColor {
    RGBColor(r, g, b)
}

struct Axes<'s> {
    x_range: Range<f64>,
    y_range: Range<f64>,
    x_desc: &'s str,
    y_desc: &'s str,
}

/// One legend entry: a line plus optional markers, drawn in the same color.
struct Series {
    label: String,
    line: Vec<(f64, f64)>,
    markers: Vec<(f64, f64)>,
}

/// Smoothed current against smoothed drive voltage for every trace, in the given order.
///
/// The x extent follows the first trace. Extracted minima are marked in the
/// color of their curve.
pub fn render_overlay_png(
    analyses: &[TraceAnalysis],
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    let axes = overlay_axes(analyses)?;
    let series: Vec<Series> = analyses
        .iter()
        .map(|analysis| Series {
            label: analysis.parameter.label(),
            line: analysis.smoothed.points().collect(),
            markers: analysis
                .minima
                .iter()
                .flatten()
                .map(|m| (m.voltage, m.current))
                .collect(),
        })
        .collect();
    render_chart(style, &axes, &series)
}

/// The y range covers the curves and the raw-current markers.
fn overlay_axes(analyses: &[TraceAnalysis]) -> Result<Axes<'static>, AnalysisError> {
    let first = analyses
        .first()
        .ok_or_else(|| AnalysisError::Plot("no traces to plot".into()))?;
    let (start, end) = first
        .trace
        .voltage_span()
        .ok_or_else(|| AnalysisError::Plot("first trace is empty".into()))?;
    Ok(Axes {
        x_range: span_range(start.min(end), start.max(end), 0.0),
        y_range: padded_range(analyses.iter().flat_map(|a| {
            let markers = a.minima.iter().flatten().map(|m| m.current);
            a.smoothed.current.iter().copied().chain(markers)
        })),
        x_desc: DRIVE_VOLTAGE_AXIS,
        y_desc: CURRENT_AXIS,
    })
}

/// Current at each minimum rank against stop voltage.
pub fn render_minima_png(
    tables: &[SummaryTable],
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    if tables.iter().all(|table| table.rows.is_empty()) {
        return Err(AnalysisError::Plot("summary tables have no rows".into()));
    }
    let axes = Axes {
        x_range: padded_range(tables.iter().flat_map(|t| t.stop_voltages())),
        y_range: padded_range(tables.iter().flat_map(|t| t.currents())),
        x_desc: STOP_VOLTAGE_AXIS,
        y_desc: CURRENT_AXIS,
    };
    let series: Vec<Series> = tables
        .iter()
        .map(|table| {
            let points: Vec<(f64, f64)> = table.stop_voltages().zip(table.currents()).collect();
            Series {
                label: table.rank.label().to_string(),
                line: points.clone(),
                markers: points,
            }
        })
        .collect();
    render_chart(style, &axes, &series)
}

pub fn save_png(png: &[u8], path: &Path) -> Result<(), AnalysisError> {
    fs::write(path, png).map_err(AnalysisError::io(path))
}

fn render_chart(
    style: &PlotStyle,
    axes: &Axes<'_>,
    series: &[Series],
) -> Result<Vec<u8>, AnalysisError> {
    let (width, height) = style.pixel_size();
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        let background = color(style.background);
        let grid = color(style.grid);
        let text = color(style.text);
        let font_px = style.pixels(style.font_pt);
        let line_px = style.pixels(style.line_pt);
        let marker_px = style.pixels(style.marker_pt / 2.0);
        let legend_px = style.pixels(style.font_pt * 2.0) as i32;
        root.fill(&background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(font_px);
        if style.annotate {
            builder
                .set_label_area_size(LabelAreaPosition::Left, font_px * 6)
                .set_label_area_size(LabelAreaPosition::Bottom, font_px * 3);
        }
        let mut chart = builder.build_cartesian_2d(axes.x_range.clone(), axes.y_range.clone())?;
        chart.plotting_area().fill(&color(style.panel))?;
        let font = ("sans-serif", font_px).into_font().color(&text);
        if style.annotate {
            chart
                .configure_mesh()
                .x_desc(axes.x_desc)
                .y_desc(axes.y_desc)
                .label_style(font.clone())
                .axis_desc_style(font.clone())
                .bold_line_style(&grid)
                .light_line_style(&grid.mix(0.4))
                .y_label_formatter(&|v: &f64| format!("{v:.1e}"))
                .draw()?;
        }
        for (idx, entry) in series.iter().enumerate() {
            let line_color = style.series_color(idx);
            let stroke = line_color.stroke_width(line_px);
            chart
                .draw_series(LineSeries::new(entry.line.iter().copied(), stroke))?
                .label(entry.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_px, y)], stroke));
            chart.draw_series(
                entry
                    .markers
                    .iter()
                    .map(|&point| Circle::new(point, marker_px, line_color.filled())),
            )?;
        }
        if style.annotate {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .legend_area_size(style.pixels(style.font_pt * 2.5))
                .label_font(font)
                .background_style(&background.mix(0.8))
                .border_style(&text.mix(0.3))
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, width, height)
}

/// Data range widened by 5% on each side; degenerate input still yields a usable axis.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    span_range(lo, hi, 0.05)
}

fn span_range(lo: f64, hi: f64, margin: f64) -> Range<f64> {
    if hi > lo {
        let pad = (hi - lo) * margin;
        return (lo - pad)..(hi + pad);
    }
    let pad = if lo != 0.0 { lo.abs() * 0.05 } else { 0.5 };
    (lo - pad)..(hi + pad)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AnalysisError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AnalysisError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
