//! Subcommand bodies: build a dashboard, drive it, print a render model.

use crate::source::{open_source, SourceArgs};
use crate::FilterArgs;
use aqm_core::{ColorClassifier, ColorStandard, DataSource, FilterOptions, FilterSelection, SiteId};
use aqm_data::aggregate::DateWindow;
use aqm_data::dashboard::{ChartOutcome, Dashboard, ModelKind, Rendered};
use aqm_data::render::LegendMode;
use aqm_data::selection::SelectionEvent;
use aqm_data::view::{LatLon, ViewChange};
use log::info;
use serde::Serialize;

type CliDashboard = Dashboard<Box<dyn DataSource>>;

/// Map view flags.
#[derive(Debug, Clone, Default)]
pub struct ViewArgs {
    pub zoom: Option<f64>,
    pub center: Option<(f64, f64)>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
struct OptionsReport {
    options: FilterOptions,
    borough_labels: Vec<(String, String)>,
    default_filter: FilterSelection,
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    value: f64,
    pollutant: String,
    standard: ColorStandard,
    color: &'static str,
    label: &'static str,
    legend: Vec<String>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Create a dashboard over `source` with the filter flags and the selected
/// sites applied.
pub fn build_dashboard(
    source: Box<dyn DataSource>,
    filter: &FilterArgs,
    sites: &[String],
) -> anyhow::Result<CliDashboard> {
    let dashboard = Dashboard::new(source)?;
    for change in filter.changes() {
        dashboard.update_filter(change);
    }
    if !sites.is_empty() {
        let selected = sites.iter().map(|s| SiteId::new(s.as_str())).collect();
        dashboard.apply_selection(SelectionEvent::Dropdown(selected));
    }
    Ok(dashboard)
}

/// Render one model, turning an unavailable source into an error.
pub fn render_model(dashboard: &CliDashboard, model: ModelKind) -> anyhow::Result<Rendered> {
    match dashboard.render(model) {
        ChartOutcome::Ready(rendered) => Ok(rendered),
        ChartOutcome::Unavailable(reason) => anyhow::bail!("{:?} unavailable: {}", model, reason),
    }
}

async fn open_dashboard(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
) -> anyhow::Result<CliDashboard> {
    let source = open_source(source).await?;
    let dashboard = build_dashboard(source, filter, sites)?;
    let current = dashboard.filter();
    info!(
        "[AQM] query: {} / {} / {} over {} boroughs",
        current.pollutant,
        current.period,
        current.year,
        current.boroughs.len()
    );
    Ok(dashboard)
}

pub async fn run_options(source: &SourceArgs) -> anyhow::Result<()> {
    let dashboard = open_dashboard(source, &FilterArgs::default(), &[]).await?;
    let options = dashboard.options();
    print_json(&OptionsReport {
        borough_labels: options.borough_labels(),
        options,
        default_filter: dashboard.filter(),
    })
}

/// Apply map view flags. Unknown styles are ignored by the dashboard.
pub fn apply_view_args(dashboard: &CliDashboard, view: &ViewArgs) {
    let change = ViewChange {
        center: view.center.map(|(lat, lon)| LatLon { lat, lon }),
        zoom: view.zoom,
    };
    if !change.is_empty() {
        dashboard.apply_view(change);
    }
    if let Some(style) = &view.style {
        dashboard.set_map_style(style);
    }
}

pub async fn run_map(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
    view: &ViewArgs,
) -> anyhow::Result<()> {
    let dashboard = open_dashboard(source, filter, sites).await?;
    apply_view_args(&dashboard, view);
    print_json(&render_model(&dashboard, ModelKind::Map)?)
}

pub async fn run_sensors(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
) -> anyhow::Result<()> {
    let dashboard = open_dashboard(source, filter, sites).await?;
    print_json(&render_model(&dashboard, ModelKind::Dropdown)?)
}

pub async fn run_series(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
) -> anyhow::Result<()> {
    let dashboard = open_dashboard(source, filter, sites).await?;
    print_json(&render_model(&dashboard, ModelKind::TimeSeries)?)
}

pub async fn run_bars(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
) -> anyhow::Result<()> {
    let dashboard = open_dashboard(source, filter, sites).await?;
    print_json(&render_model(&dashboard, ModelKind::Bar)?)
}

/// Parse optional `YYYY-MM-DD` bounds into a window.
pub fn date_window(start: Option<&str>, end: Option<&str>) -> anyhow::Result<DateWindow> {
    let start = start.map(aqm_utils::dates::parse_date).transpose()?;
    let end = end.map(aqm_utils::dates::parse_date).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        anyhow::ensure!(s <= e, "window start {} is after end {}", s, e);
    }
    Ok(DateWindow::new(start, end))
}

pub async fn run_detailed(
    source: &SourceArgs,
    filter: &FilterArgs,
    sites: &[String],
    start: Option<&str>,
    end: Option<&str>,
    legend_mode: usize,
) -> anyhow::Result<()> {
    let window = date_window(start, end)?;
    let dashboard = open_dashboard(source, filter, sites).await?;
    dashboard.set_date_window(window);
    dashboard.set_legend_mode(LegendMode::from_index(legend_mode));
    print_json(&render_model(&dashboard, ModelKind::Detailed)?)
}

pub fn run_classify(value: f64, pollutant: &str, standard: ColorStandard) -> anyhow::Result<()> {
    let classifier = ColorClassifier::default();
    let classification = classifier.classify(Some(value), pollutant, standard);
    let legend = classifier
        .catalog()
        .bands(pollutant, standard)
        .map(|bands| bands.iter().map(|b| b.legend_text()).collect())
        .unwrap_or_default();
    print_json(&ClassifyReport {
        value,
        pollutant: pollutant.to_string(),
        standard,
        color: classification.color,
        label: classification.label,
        legend,
    })
}
