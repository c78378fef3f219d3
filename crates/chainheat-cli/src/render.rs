//! Plotly figure construction and export.
//!
//! Builds one of three figure styles from a liquidity grid: a flat heatmap, a
//! 3D surface, or side-by-side calls/puts heatmaps. A chain that filters down
//! to nothing renders a placeholder figure instead of failing.

use std::fs;
use std::path::{Path, PathBuf};

use plotly::color::NamedColor;
use plotly::common::{ColorBar, ColorScale, ColorScalePalette, Font, Title};
use plotly::layout::{Annotation, Axis, GridPattern, LayoutGrid, LayoutScene};
use plotly::{HeatMap, Layout, Plot, Surface};
use thiserror::Error;
use time::Date;
use tracing::warn;

use chainheat_core::{
    ChainSnapshot, GridConfig, GridError, LiquidityGrid, OptionTypeFilter,
};

use crate::cli::{ExportFormat, PlotType};

const DTE_AXIS_TITLE: &str = "Days to expiration (DTE)";
const EMPTY_MESSAGE: &str = "No data available for the specified filters";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("{format} export requires a build with the 'static-export' feature")]
    StaticExportUnavailable { format: &'static str },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build the requested figure from a chain snapshot.
pub fn build_plot(
    chain: &ChainSnapshot,
    config: &GridConfig,
    plot_type: PlotType,
    today: Date,
) -> Result<Plot, RenderError> {
    match plot_type {
        PlotType::Heatmap | PlotType::Surface => single(chain, config, plot_type, today),
        PlotType::Split => split(chain, config, today),
    }
}

/// Write the figure next to `output_stem` with the format's extension and
/// return the full path.
pub fn save(
    plot: &Plot,
    output_stem: &str,
    format: ExportFormat,
    width: usize,
    height: usize,
) -> Result<PathBuf, RenderError> {
    let path = PathBuf::from(format!("{output_stem}.{}", format.extension()));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| RenderError::OutputDir {
                path: parent.to_owned(),
                source,
            })?;
        }
    }
    write_figure(plot, &path, format, width, height)?;
    Ok(path)
}

#[cfg(feature = "static-export")]
fn write_figure(
    plot: &Plot,
    path: &Path,
    format: ExportFormat,
    width: usize,
    height: usize,
) -> Result<(), RenderError> {
    use plotly::ImageFormat;

    match format {
        ExportFormat::Html => plot.write_html(path),
        ExportFormat::Png => plot.write_image(path, ImageFormat::PNG, width, height, 1.0),
        ExportFormat::Svg => plot.write_image(path, ImageFormat::SVG, width, height, 1.0),
        ExportFormat::Pdf => plot.write_image(path, ImageFormat::PDF, width, height, 1.0),
    }
    Ok(())
}

#[cfg(not(feature = "static-export"))]
fn write_figure(
    plot: &Plot,
    path: &Path,
    format: ExportFormat,
    _width: usize,
    _height: usize,
) -> Result<(), RenderError> {
    match format {
        ExportFormat::Html => {
            plot.write_html(path);
            Ok(())
        }
        other => Err(RenderError::StaticExportUnavailable {
            format: other.extension(),
        }),
    }
}

fn single(
    chain: &ChainSnapshot,
    config: &GridConfig,
    plot_type: PlotType,
    today: Date,
) -> Result<Plot, RenderError> {
    let title = figure_title(chain, config, plot_type);
    let Some(grid) = LiquidityGrid::build(chain, config, today)? else {
        return Ok(placeholder(config, title));
    };

    let x = grid.dte_values().to_vec();
    let y = grid.y_values().to_vec();
    let z = grid.cells().to_vec();
    let palette = palette_for(&config.colorscale);

    let mut plot = Plot::new();
    let mut layout = base_layout(title, config);

    match plot_type {
        PlotType::Surface => {
            let trace = Surface::new(z)
                .x(x)
                .y(y)
                .color_scale(ColorScale::Palette(palette));
            plot.add_trace(trace);
            layout = layout.scene(
                LayoutScene::new()
                    .x_axis(Axis::new().title(Title::with_text(DTE_AXIS_TITLE)))
                    .y_axis(Axis::new().title(Title::with_text(config.y_axis.axis_label())))
                    .z_axis(Axis::new().title(Title::with_text(config.value_mode.label()))),
            );
        }
        _ => {
            let trace = HeatMap::new(x, y, z)
                .color_scale(ColorScale::Palette(palette))
                .color_bar(ColorBar::new().title(Title::with_text(config.value_mode.label())));
            plot.add_trace(trace);
            layout = layout
                .x_axis(Axis::new().title(Title::with_text(DTE_AXIS_TITLE)))
                .y_axis(Axis::new().title(Title::with_text(config.y_axis.axis_label())));
            if config.show_annotations {
                layout = layout.annotations(cell_annotations(&grid));
            }
        }
    }

    plot.set_layout(layout);
    Ok(plot)
}

/// Side-by-side calls and puts sharing one figure. Percent modes normalize
/// within each side so the two panels stay comparable to themselves.
fn split(chain: &ChainSnapshot, config: &GridConfig, today: Date) -> Result<Plot, RenderError> {
    let calls_config = GridConfig {
        option_type: OptionTypeFilter::Call,
        ..config.clone()
    };
    let puts_config = GridConfig {
        option_type: OptionTypeFilter::Put,
        ..config.clone()
    };
    let calls = LiquidityGrid::build(chain, &calls_config, today)?;
    let puts = LiquidityGrid::build(chain, &puts_config, today)?;

    let title = figure_title(chain, config, PlotType::Split);
    if calls.is_none() && puts.is_none() {
        return Ok(placeholder(config, title));
    }

    let palette = palette_for(&config.colorscale);
    let mut plot = Plot::new();
    let mut annotations = vec![
        panel_label("CALLS", 0.2),
        panel_label("PUTS", 0.8),
    ];

    if let Some(grid) = calls {
        let trace = HeatMap::new(
            grid.dte_values().to_vec(),
            grid.y_values().to_vec(),
            grid.cells().to_vec(),
        )
        .color_scale(ColorScale::Palette(palette.clone()))
        .show_scale(false);
        plot.add_trace(trace);
        if config.show_annotations {
            annotations.extend(cell_annotations(&grid));
        }
    }
    if let Some(grid) = puts {
        let trace = HeatMap::new(
            grid.dte_values().to_vec(),
            grid.y_values().to_vec(),
            grid.cells().to_vec(),
        )
        .color_scale(ColorScale::Palette(palette))
        .color_bar(ColorBar::new().title(Title::with_text(config.value_mode.label())))
        .x_axis("x2")
        .y_axis("y2");
        plot.add_trace(trace);
    }

    let layout = base_layout(title, config)
        .grid(
            LayoutGrid::new()
                .rows(1)
                .columns(2)
                .pattern(GridPattern::Independent),
        )
        .x_axis(Axis::new().title(Title::with_text(DTE_AXIS_TITLE)))
        .y_axis(Axis::new().title(Title::with_text(config.y_axis.axis_label())))
        .x_axis2(Axis::new().title(Title::with_text(DTE_AXIS_TITLE)))
        .y_axis2(Axis::new())
        .annotations(annotations);

    plot.set_layout(layout);
    Ok(plot)
}

fn base_layout(title: String, config: &GridConfig) -> Layout {
    Layout::new()
        .title(Title::with_text(title))
        .width(config.width)
        .height(config.height)
}

fn placeholder(config: &GridConfig, title: String) -> Plot {
    let mut plot = Plot::new();
    let layout = base_layout(title, config).annotations(vec![Annotation::new()
        .text(EMPTY_MESSAGE)
        .x_ref("paper")
        .y_ref("paper")
        .x(0.5)
        .y(0.5)
        .show_arrow(false)]);
    plot.set_layout(layout);
    plot
}

fn figure_title(chain: &ChainSnapshot, config: &GridConfig, plot_type: PlotType) -> String {
    if let Some(title) = &config.title {
        return title.clone();
    }

    let style = match plot_type {
        PlotType::Heatmap => "Options Liquidity Heatmap",
        PlotType::Surface => "Options Liquidity 3D Surface",
        PlotType::Split => "Options Liquidity - Calls vs Puts",
    };
    let side = match config.option_type {
        OptionTypeFilter::Call => "CALLS",
        OptionTypeFilter::Put => "PUTS",
        OptionTypeFilter::Both => "CALLS + PUTS",
    };
    format!(
        "{} {}<br><sub>{} | Underlying: ${:.2} | As of: {}</sub>",
        chain.underlying, style, side, chain.underlying_price, chain.captured_at
    )
}

fn cell_annotations(grid: &LiquidityGrid) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for (row, y) in grid.y_values().iter().enumerate() {
        for (col, dte) in grid.dte_values().iter().enumerate() {
            let value = grid.cell(row, col);
            if value > 0.0 {
                annotations.push(
                    Annotation::new()
                        .x(*dte as f64)
                        .y(*y)
                        .text(format!("{value:.0}"))
                        .show_arrow(false)
                        .font(Font::new().size(8).color(NamedColor::White)),
                );
            }
        }
    }
    annotations
}

fn panel_label(text: &str, x: f64) -> Annotation {
    Annotation::new()
        .text(text)
        .x_ref("paper")
        .y_ref("paper")
        .x(x)
        .y(1.05)
        .show_arrow(false)
}

/// Map a user-supplied colorscale name to a plotly palette, falling back to
/// Viridis for unknown names.
fn palette_for(name: &str) -> ColorScalePalette {
    match name.to_ascii_lowercase().as_str() {
        "viridis" => ColorScalePalette::Viridis,
        "cividis" => ColorScalePalette::Cividis,
        "plasma" => ColorScalePalette::Plasma,
        "blues" => ColorScalePalette::Blues,
        "greens" => ColorScalePalette::Greens,
        "greys" => ColorScalePalette::Greys,
        "hot" => ColorScalePalette::Hot,
        "jet" => ColorScalePalette::Jet,
        "portland" => ColorScalePalette::Portland,
        "rainbow" => ColorScalePalette::Rainbow,
        "rdbu" => ColorScalePalette::RdBu,
        "ylgnbu" => ColorScalePalette::YlGnBu,
        "ylorrd" => ColorScalePalette::YlOrRd,
        other => {
            warn!(colorscale = other, "unknown colorscale, using Viridis");
            ColorScalePalette::Viridis
        }
    }
}
