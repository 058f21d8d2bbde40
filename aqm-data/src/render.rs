//! Render models handed to the presentation layer.
//!
//! Builders here are pure: they take resolved data plus the current filter,
//! selection and view, and never touch a data source.

use crate::aggregate::{max_series_value, BarAverage, SeriesPoint, TimeSeries};
use crate::filter_engine::Resolution;
use crate::reference::{reference_levels, y_axis_max};
use crate::selection::SelectionState;
use crate::view::ViewState;
use aqm_core::{AveragingPeriod, ColorClassifier, FilterSelection, Sensor, SiteId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const NO_SELECTION_DETAILED: &str =
    "No sensors selected. Click on sensors in the map or use the dropdown to select sensors.";
pub const NO_SELECTION: &str = "No sensors selected";
pub const NO_DATA: &str = "No data for selected sensors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub value: SiteId,
    pub label: String,
}

impl DropdownOption {
    pub fn for_sensor(sensor: &Sensor) -> Self {
        DropdownOption {
            value: sensor.site_id.clone(),
            label: format!("{}: {}", sensor.site_id, sensor.display_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropdownRenderModel {
    pub options: Vec<DropdownOption>,
    /// Selected ids still present in `options`
    pub value: Vec<SiteId>,
}

pub fn dropdown_model(options: Vec<DropdownOption>, selection: &SelectionState) -> DropdownRenderModel {
    let value = selection.pruned(&options).into_iter().collect();
    DropdownRenderModel { options, value }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub site_id: SiteId,
    pub name: String,
    pub borough: String,
    pub sensor_type: String,
    pub lat: f64,
    pub lon: f64,
    pub symbol: &'static str,
    pub value: Option<f64>,
    /// Band color; `None` for plain markers
    pub color: Option<&'static str>,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRenderModel {
    pub style: String,
    pub view: ViewState,
    pub marker_size: u32,
    /// Sensors with a value, colored by band
    pub colored: Vec<MapMarker>,
    /// Eligible sensors without a value for the current filter
    pub plain: Vec<MapMarker>,
    pub legend_title: String,
    pub legend: Vec<LegendEntry>,
    /// Sensors left off the map for lack of valid coordinates
    pub unplaced: usize,
}

pub fn map_model(
    resolution: &Resolution,
    filter: &FilterSelection,
    view: ViewState,
    style: &str,
    classifier: &ColorClassifier,
    selection: &SelectionState,
) -> MapRenderModel {
    let mut colored = Vec::new();
    let mut plain = Vec::new();
    let mut unplaced = 0;

    for (sensor, value) in resolution.sensors_with_values() {
        let Some((lat, lon)) = sensor.position() else {
            unplaced += 1;
            continue;
        };
        let classification = value.map(|v| classifier.classify(Some(v), &filter.pollutant, filter.standard));
        let marker = MapMarker {
            site_id: sensor.site_id.clone(),
            name: sensor.display_name().to_string(),
            borough: sensor.borough.clone(),
            sensor_type: sensor.sensor_type.clone(),
            lat,
            lon,
            symbol: sensor.marker_symbol(),
            value,
            color: classification.map(|c| c.color),
            label: classification.map_or("", |c| c.label),
            selected: selection.contains(&sensor.site_id),
        };
        if value.is_some() {
            colored.push(marker);
        } else {
            plain.push(marker);
        }
    }
    if unplaced > 0 {
        log::debug!("[AQM] render: {} sensors without valid coordinates", unplaced);
    }

    let legend = classifier
        .catalog()
        .bands(&filter.pollutant, filter.standard)
        .unwrap_or_default()
        .iter()
        .map(|band| LegendEntry {
            color: band.color,
            text: band.legend_text(),
        })
        .collect();

    MapRenderModel {
        style: style.to_string(),
        view,
        marker_size: view.marker_size(),
        colored,
        plain,
        legend_title: format!("{} - {}", filter.pollutant, filter.standard.title()),
        legend,
        unplaced,
    }
}

/// How the detailed chart labels and places its legend. Cycles through all
/// five modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LegendMode {
    /// Site ids, to the right of the plot
    #[default]
    Id,
    /// "id: name", to the right of the plot
    IdAndName,
    /// "id: name", horizontally below the plot
    IdAndNameBelow,
    /// Site ids, inside the plot area
    IdInside,
    Hidden,
}

impl LegendMode {
    pub const ALL: [LegendMode; 5] = [
        LegendMode::Id,
        LegendMode::IdAndName,
        LegendMode::IdAndNameBelow,
        LegendMode::IdInside,
        LegendMode::Hidden,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Mode for a stored index; out-of-range indices wrap.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn placement(self) -> LegendPlacement {
        match self {
            LegendMode::Id | LegendMode::IdAndName => LegendPlacement::Right,
            LegendMode::IdAndNameBelow => LegendPlacement::Below,
            LegendMode::IdInside => LegendPlacement::Inside,
            LegendMode::Hidden => LegendPlacement::Hidden,
        }
    }

    fn label(self, site_id: &SiteId, name: &str) -> String {
        match self {
            LegendMode::IdAndName | LegendMode::IdAndNameBelow => format!("{}: {}", site_id, name),
            _ => site_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegendPlacement {
    Right,
    Below,
    Inside,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Detailed,
    TimeSeries,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub site_id: SiteId,
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub label: &'static str,
    pub value: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRenderModel {
    pub kind: ChartKind,
    pub title: String,
    pub y_axis_title: String,
    pub y_max: f64,
    pub series: Vec<ChartSeries>,
    pub bars: Vec<BarAverage>,
    pub reference_lines: Vec<ReferenceLine>,
    pub legend: LegendPlacement,
    /// Message shown instead of data, e.g. when nothing is selected
    pub placeholder: Option<String>,
}

impl ChartRenderModel {
    fn placeholder(kind: ChartKind, title: String, pollutant: &str, message: &str) -> Self {
        ChartRenderModel {
            kind,
            title,
            y_axis_title: y_axis_title(pollutant),
            y_max: 1.0,
            series: Vec::new(),
            bars: Vec::new(),
            reference_lines: Vec::new(),
            legend: LegendPlacement::Hidden,
            placeholder: Some(message.to_string()),
        }
    }

    pub fn has_data(&self) -> bool {
        self.placeholder.is_none()
    }
}

fn y_axis_title(pollutant: &str) -> String {
    format!("{} Concentration (μg/m³)", pollutant)
}

pub fn reference_lines(pollutant: &str) -> Vec<ReferenceLine> {
    let levels = reference_levels(pollutant);
    let mut lines = Vec::new();
    if let Some(value) = levels.who {
        lines.push(ReferenceLine {
            label: "WHO Guideline",
            value,
            color: "green",
        });
    }
    if let Some(value) = levels.uk {
        lines.push(ReferenceLine {
            label: "UK Limit",
            value,
            color: "red",
        });
    }
    lines
}

pub fn detailed_title(pollutant: &str, period: AveragingPeriod) -> String {
    match period {
        AveragingPeriod::Annual => format!("Chart of Annual Average {}", pollutant),
        AveragingPeriod::Month => format!("Chart of Monthly Average {}", pollutant),
    }
}

/// The large chart: one line per selected sensor, ordered by each series'
/// last value descending, labelled according to `legend`.
pub fn detailed_chart(
    selection: &BTreeSet<SiteId>,
    series: TimeSeries,
    names: &HashMap<SiteId, String>,
    pollutant: &str,
    period: AveragingPeriod,
    legend: LegendMode,
) -> ChartRenderModel {
    if selection.is_empty() {
        return ChartRenderModel::placeholder(
            ChartKind::Detailed,
            "Detailed Chart".to_string(),
            pollutant,
            NO_SELECTION_DETAILED,
        );
    }
    if series.is_empty() {
        return ChartRenderModel::placeholder(
            ChartKind::Detailed,
            "Detailed Chart".to_string(),
            pollutant,
            NO_DATA,
        );
    }

    let y_max = y_axis_max(max_series_value(&series), pollutant);
    let mut lines: Vec<ChartSeries> = series
        .into_iter()
        .map(|(site_id, points)| {
            let name = names
                .get(&site_id)
                .map(String::as_str)
                .unwrap_or(site_id.as_str());
            ChartSeries {
                name: legend.label(&site_id, name),
                site_id,
                points,
            }
        })
        .collect();
    let last = |s: &ChartSeries| s.points.last().map_or(0.0, |p| p.value);
    lines.sort_by(|a, b| {
        last(b)
            .total_cmp(&last(a))
            .then_with(|| a.site_id.cmp(&b.site_id))
    });

    ChartRenderModel {
        kind: ChartKind::Detailed,
        title: detailed_title(pollutant, period),
        y_axis_title: y_axis_title(pollutant),
        y_max,
        series: lines,
        bars: Vec::new(),
        reference_lines: reference_lines(pollutant),
        legend: legend.placement(),
        placeholder: None,
    }
}

/// The small time-series chart: one line per sensor labelled by site id.
pub fn time_series_chart(
    selection: &BTreeSet<SiteId>,
    series: TimeSeries,
    pollutant: &str,
) -> ChartRenderModel {
    let title = format!("{} Time Series", pollutant);
    if selection.is_empty() {
        return ChartRenderModel::placeholder(ChartKind::TimeSeries, title, pollutant, NO_SELECTION);
    }
    if series.is_empty() {
        return ChartRenderModel::placeholder(ChartKind::TimeSeries, title, pollutant, NO_DATA);
    }
    let y_max = y_axis_max(max_series_value(&series), pollutant);
    ChartRenderModel {
        kind: ChartKind::TimeSeries,
        title,
        y_axis_title: y_axis_title(pollutant),
        y_max,
        series: series
            .into_iter()
            .map(|(site_id, points)| ChartSeries {
                name: site_id.to_string(),
                site_id,
                points,
            })
            .collect(),
        bars: Vec::new(),
        reference_lines: reference_lines(pollutant),
        legend: LegendPlacement::Right,
        placeholder: None,
    }
}

/// The bar chart of per-sensor averages, already sorted by the aggregator.
pub fn bar_chart(selection: &BTreeSet<SiteId>, bars: Vec<BarAverage>, pollutant: &str) -> ChartRenderModel {
    let title = format!("Average {} by Sensor", pollutant);
    if selection.is_empty() {
        return ChartRenderModel::placeholder(ChartKind::Bar, title, pollutant, NO_SELECTION);
    }
    if bars.is_empty() {
        return ChartRenderModel::placeholder(ChartKind::Bar, title, pollutant, NO_DATA);
    }
    let max = bars.iter().map(|b| b.mean).fold(f64::NEG_INFINITY, f64::max);
    ChartRenderModel {
        kind: ChartKind::Bar,
        title,
        y_axis_title: y_axis_title(pollutant),
        y_max: y_axis_max(Some(max), pollutant),
        series: Vec::new(),
        bars,
        reference_lines: reference_lines(pollutant),
        legend: LegendPlacement::Hidden,
        placeholder: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqm_core::{ColorStandard, FilterSelection};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sensor(id: &str, lat: Option<f64>) -> Sensor {
        Sensor {
            site_id: SiteId::new(id),
            borough: "Richmond".to_string(),
            sensor_type: "DT".to_string(),
            name: format!("{} Lane", id),
            latitude: lat,
            longitude: Some(-0.3),
        }
    }

    fn filter() -> FilterSelection {
        FilterSelection {
            boroughs: BTreeSet::from(["Richmond".to_string()]),
            pollutant: "NO2".to_string(),
            sensor_types: BTreeSet::from(["DT".to_string()]),
            period: AveragingPeriod::Annual,
            year: 2024,
            month: 1,
            standard: ColorStandard::Who,
        }
    }

    fn point(year: i32, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            value,
        }
    }

    fn ids(ids: &[&str]) -> BTreeSet<SiteId> {
        ids.iter().map(|id| SiteId::new(*id)).collect()
    }

    #[test]
    fn map_splits_colored_plain_and_unplaced() {
        let resolution = Resolution {
            eligible: vec![sensor("R1", Some(51.44)), sensor("R2", Some(51.45)), sensor("R3", None)],
            values: BTreeMap::from([(SiteId::new("R1"), 12.0), (SiteId::new("R3"), 50.0)]),
        };
        let selection = SelectionState::new([SiteId::new("R2")]);
        let model = map_model(
            &resolution,
            &filter(),
            ViewState::default(),
            "carto-voyager",
            &ColorClassifier::default(),
            &selection,
        );

        assert_eq!(model.colored.len(), 1);
        assert_eq!(model.colored[0].color, Some("#33ccff"));
        assert_eq!(model.colored[0].label, "Good");
        assert_eq!(model.colored[0].symbol, "square");
        assert_eq!(model.plain.len(), 1);
        assert!(model.plain[0].selected);
        assert_eq!(model.plain[0].color, None);
        assert_eq!(model.unplaced, 1);
        assert_eq!(model.marker_size, 17);
        assert_eq!(model.legend[1].text, "Good (10-20)");
        assert_eq!(model.legend.last().unwrap().text, "Extremely Poor (100-∞)");
        assert_eq!(model.legend_title, "NO2 - WHO Guidelines");
    }

    #[test]
    fn unknown_pollutant_gets_neutral_markers_and_no_legend() {
        let resolution = Resolution {
            eligible: vec![sensor("R1", Some(51.44))],
            values: BTreeMap::from([(SiteId::new("R1"), 12.0)]),
        };
        let mut f = filter();
        f.pollutant = "O3".to_string();
        let model = map_model(
            &resolution,
            &f,
            ViewState::default(),
            "carto-voyager",
            &ColorClassifier::default(),
            &SelectionState::default(),
        );
        assert_eq!(model.colored[0].color, Some(aqm_core::NEUTRAL_COLOR));
        assert!(model.legend.is_empty());
    }

    #[test]
    fn detailed_chart_placeholders() {
        let names = HashMap::new();
        let none = detailed_chart(&BTreeSet::new(), TimeSeries::new(), &names, "NO2", AveragingPeriod::Annual, LegendMode::Id);
        assert_eq!(none.placeholder.as_deref(), Some(NO_SELECTION_DETAILED));
        assert_eq!(none.y_max, 1.0);

        let empty = detailed_chart(&ids(&["R1"]), TimeSeries::new(), &names, "NO2", AveragingPeriod::Annual, LegendMode::Id);
        assert_eq!(empty.placeholder.as_deref(), Some(NO_DATA));
    }

    #[test]
    fn detailed_chart_orders_by_last_value_and_labels_by_mode() {
        let series = TimeSeries::from([
            (SiteId::new("A"), vec![point(2023, 50.0), point(2024, 20.0)]),
            (SiteId::new("B"), vec![point(2023, 10.0), point(2024, 35.0)]),
        ]);
        let names = HashMap::from([(SiteId::new("A"), "Castelnau".to_string())]);
        let model = detailed_chart(
            &ids(&["A", "B"]),
            series,
            &names,
            "NO2",
            AveragingPeriod::Month,
            LegendMode::IdAndNameBelow,
        );
        let order: Vec<&str> = model.series.iter().map(|s| s.site_id.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(model.series[1].name, "A: Castelnau");
        assert_eq!(model.series[0].name, "B: B");
        assert_eq!(model.title, "Chart of Monthly Average NO2");
        assert_eq!(model.legend, LegendPlacement::Below);
        assert!((model.y_max - 52.5).abs() < 1e-9);
        assert_eq!(model.reference_lines.len(), 2);
    }

    #[test]
    fn legend_mode_cycles() {
        assert_eq!(LegendMode::default().next(), LegendMode::IdAndName);
        assert_eq!(LegendMode::Hidden.next(), LegendMode::Id);
        assert_eq!(LegendMode::from_index(8), LegendMode::IdInside);
    }

    #[test]
    fn time_series_chart_keeps_reference_lines_visible() {
        let series = TimeSeries::from([(SiteId::new("A"), vec![point(2024, 3.0)])]);
        let model = time_series_chart(&ids(&["A"]), series, "PM2.5");
        assert_eq!(model.y_max, 30.0);
        assert_eq!(model.reference_lines[0].value, 5.0);
        assert_eq!(model.reference_lines[1].value, 20.0);
    }

    #[test]
    fn bar_chart_placeholders_and_data() {
        assert_eq!(
            bar_chart(&BTreeSet::new(), Vec::new(), "NO2").placeholder.as_deref(),
            Some(NO_SELECTION)
        );
        let bars = vec![BarAverage {
            site_id: SiteId::new("A"),
            mean: 60.0,
        }];
        let model = bar_chart(&ids(&["A"]), bars, "NO2");
        assert!(model.has_data());
        assert!((model.y_max - 63.0).abs() < 1e-9);
    }

    #[test]
    fn chart_model_serializes_for_the_presentation_layer() {
        let series = TimeSeries::from([(SiteId::new("A"), vec![point(2024, 12.5)])]);
        let model = time_series_chart(&ids(&["A"]), series, "NO2");
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["kind"], "TimeSeries");
        assert_eq!(json["series"][0]["site_id"], "A");
        assert_eq!(json["series"][0]["points"][0]["date"], "2024-01-01");
        assert_eq!(json["reference_lines"][0]["label"], "WHO Guideline");
        assert!(json["placeholder"].is_null());
    }

    #[test]
    fn dropdown_value_is_pruned() {
        let options = vec![DropdownOption::for_sensor(&sensor("R1", Some(51.4)))];
        let selection = SelectionState::new([SiteId::new("R1"), SiteId::new("OLD")]);
        let model = dropdown_model(options, &selection);
        assert_eq!(model.value, vec![SiteId::new("R1")]);
        assert_eq!(model.options[0].label, "R1: R1 Lane");
    }
}
