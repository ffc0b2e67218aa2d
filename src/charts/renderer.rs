//! Static Chart Renderer
//! Draws chart specifications to PNG files with plotters.
//!
//! Categories are placed at integer x positions; stacked areas are drawn
//! top-down so each lower band paints over the one above it.

use crate::charts::plotter::{ChartError, ChartKind, ChartSpec};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render one chart to a PNG file.
    pub fn render_png(spec: &ChartSpec, path: &Path, size: (u32, u32)) -> Result<(), ChartError> {
        let colors = spec
            .series
            .iter()
            .map(|series| parse_color(&series.color))
            .collect::<Result<Vec<_>, _>>()?;

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let n = spec.categories.len().max(1);
        let (y_min, y_max) = spec.value_range().unwrap_or((0.0, 1.0));
        let pad = ((y_max - y_min) * 0.1).max(1.0);
        let categories = spec.categories.clone();

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..(y_max + pad))
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&categories, *x))
            .disable_x_mesh()
            .draw()
            .map_err(render_error)?;

        match spec.kind {
            ChartKind::Line => Self::draw_lines(&mut chart, spec, &colors)?,
            ChartKind::Bar => Self::draw_bars(&mut chart, spec, &colors)?,
            ChartKind::StackedArea => Self::draw_stacked(&mut chart, spec, &colors)?,
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
        Ok(())
    }

    /// Render every chart into `dir`, one file per chart named after its title.
    pub fn render_all(
        specs: &[ChartSpec],
        dir: &Path,
        size: (u32, u32),
    ) -> Result<Vec<PathBuf>, ChartError> {
        let mut written = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let path = dir.join(format!("{:02}_{}.png", i + 1, slug(&spec.title)));
            Self::render_png(spec, &path, size)?;
            info!(path = %path.display(), "Wrote chart");
            written.push(path);
        }
        Ok(written)
    }

    fn draw_lines(chart: &mut Chart<'_, '_>, spec: &ChartSpec, colors: &[RGBColor]) -> Result<(), ChartError> {
        for (series, &color) in spec.series.iter().zip(colors) {
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
                .collect();

            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                .map_err(render_error)?
                .label(series.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

            chart
                .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                .map_err(render_error)?;
        }
        Ok(())
    }

    fn draw_bars(chart: &mut Chart<'_, '_>, spec: &ChartSpec, colors: &[RGBColor]) -> Result<(), ChartError> {
        let width = 0.8 / spec.series.len().max(1) as f64;

        for (s, (series, &color)) in spec.series.iter().zip(colors).enumerate() {
            let offset = -0.4 + width * s as f64;
            let bars = series.values.iter().enumerate().filter_map(|(i, v)| {
                v.map(|v| {
                    let x0 = i as f64 + offset;
                    Rectangle::new([(x0, 0.0), (x0 + width, v)], color.filled())
                })
            });

            chart
                .draw_series(bars)
                .map_err(render_error)?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        Ok(())
    }

    fn draw_stacked(chart: &mut Chart<'_, '_>, spec: &ChartSpec, colors: &[RGBColor]) -> Result<(), ChartError> {
        let totals = spec.stacked_totals();

        for ((series, totals), &color) in spec.series.iter().zip(&totals).zip(colors).rev() {
            let points: Vec<(f64, f64)> = totals
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as f64, v))
                .collect();

            chart
                .draw_series(
                    AreaSeries::new(points, 0.0, color.mix(0.8)).border_style(color.stroke_width(1)),
                )
                .map_err(render_error)?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        Ok(())
    }
}

/// Parse `#rrggbb`.
pub fn parse_color(hex: &str) -> Result<RGBColor, ChartError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| ChartError::InvalidColor(hex.to_string()))
    };

    if digits.len() != 6 {
        return Err(ChartError::InvalidColor(hex.to_string()));
    }
    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn category_label(categories: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    categories.get(nearest as usize).cloned().unwrap_or_default()
}

fn slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn render_error<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Render(err.to_string())
}
