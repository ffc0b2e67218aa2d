//! Charts module - Chart specifications and rendering

mod plotter;
mod renderer;

pub use plotter::{ChartError, ChartKind, ChartPlotter, ChartSpec, ColorSpec, SeriesSpec, PALETTE};
pub use renderer::{parse_color, StaticChartRenderer};
