//! A long-lived dashboard session.
//!
//! [`Dashboard`] owns the filter, the selection, the map view and the
//! cosmetic display settings, each behind its own lock. Every mutation
//! reports which [`Topics`] changed; only render models subscribed to one of
//! those topics are recomputed. Recomputation snapshots state first and then
//! releases every lock before touching the data source, and results are
//! published last-write-wins through [`LatestSlot`].

use crate::aggregate::{ChartAggregator, DateWindow};
use crate::cache::CachedSource;
use crate::filter_engine::FilterEngine;
use crate::render::{
    bar_chart, detailed_chart, dropdown_model, map_model, time_series_chart, ChartRenderModel,
    DropdownRenderModel, LegendMode, MapRenderModel,
};
use crate::selection::{SelectionEvent, SelectionState};
use crate::sequence::{LatestSlot, UpdateSequencer};
use crate::view::{is_known_map_style, ViewChange, ViewState, DEFAULT_MAP_STYLE};
use aqm_core::{
    AveragingPeriod, ColorClassifier, ColorStandard, DataSource, FilterOptions, FilterSelection,
    Result, Sensor, SiteId,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A set of state fields, used both for "what changed" and "what a render
/// model depends on".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Topics(u32);

impl Topics {
    pub const NONE: Topics = Topics(0);
    pub const BOROUGHS: Topics = Topics(1 << 0);
    pub const POLLUTANT: Topics = Topics(1 << 1);
    pub const SENSOR_TYPES: Topics = Topics(1 << 2);
    pub const PERIOD: Topics = Topics(1 << 3);
    pub const YEAR: Topics = Topics(1 << 4);
    pub const MONTH: Topics = Topics(1 << 5);
    pub const STANDARD: Topics = Topics(1 << 6);
    pub const SELECTION: Topics = Topics(1 << 7);
    pub const VIEW: Topics = Topics(1 << 8);
    pub const MAP_STYLE: Topics = Topics(1 << 9);
    pub const DATE_WINDOW: Topics = Topics(1 << 10);
    pub const LEGEND_MODE: Topics = Topics(1 << 11);
    /// Sensor metadata was reloaded
    pub const METADATA: Topics = Topics(1 << 12);

    pub const FILTER: Topics = Topics(
        Self::BOROUGHS.0
            | Self::POLLUTANT.0
            | Self::SENSOR_TYPES.0
            | Self::PERIOD.0
            | Self::YEAR.0
            | Self::MONTH.0
            | Self::STANDARD.0,
    );
    /// What decides the effective selection: the selected ids and the
    /// sensors the filter still offers.
    pub const ELIGIBILITY: Topics = Topics(
        Self::BOROUGHS.0 | Self::SENSOR_TYPES.0 | Self::SELECTION.0 | Self::METADATA.0,
    );
    pub const ALL: Topics = Topics((1 << 13) - 1);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: Topics) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: Topics) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Topics {
    type Output = Topics;

    fn bitor(self, rhs: Topics) -> Topics {
        Topics(self.0 | rhs.0)
    }
}

impl BitOrAssign for Topics {
    fn bitor_assign(&mut self, rhs: Topics) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    Map,
    Dropdown,
    TimeSeries,
    Bar,
    Detailed,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Map,
        ModelKind::Dropdown,
        ModelKind::TimeSeries,
        ModelKind::Bar,
        ModelKind::Detailed,
    ];

    /// The state each model is computed from.
    pub fn topics(self) -> Topics {
        match self {
            ModelKind::Map => {
                Topics::FILTER
                    | Topics::VIEW
                    | Topics::MAP_STYLE
                    | Topics::SELECTION
                    | Topics::METADATA
            }
            ModelKind::Dropdown => Topics::ELIGIBILITY,
            ModelKind::TimeSeries => Topics::ELIGIBILITY | Topics::POLLUTANT | Topics::PERIOD,
            ModelKind::Bar => {
                Topics::ELIGIBILITY
                    | Topics::POLLUTANT
                    | Topics::PERIOD
                    | Topics::YEAR
                    | Topics::MONTH
            }
            ModelKind::Detailed => {
                Topics::ELIGIBILITY
                    | Topics::POLLUTANT
                    | Topics::PERIOD
                    | Topics::DATE_WINDOW
                    | Topics::LEGEND_MODE
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Rendered {
    Map(MapRenderModel),
    Dropdown(DropdownRenderModel),
    Chart(ChartRenderModel),
}

/// A render model, or the reason it could not be produced. One model failing
/// never affects the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartOutcome {
    Ready(Rendered),
    Unavailable(String),
}

impl ChartOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ChartOutcome::Ready(_))
    }
}

/// One edit to the working filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Boroughs(BTreeSet<String>),
    ToggleBorough(String),
    Pollutant(String),
    SensorTypes(BTreeSet<String>),
    ToggleSensorType(String),
    Period(AveragingPeriod),
    Year(i32),
    Month(u32),
    Standard(ColorStandard),
}

impl FilterChange {
    /// Apply to `filter`, returning the topics that actually changed.
    /// Replacing boroughs or sensor types with an empty set is refused.
    pub fn apply(self, filter: &mut FilterSelection) -> Topics {
        fn set_if<T: PartialEq>(slot: &mut T, value: T, topic: Topics) -> Topics {
            if *slot == value {
                Topics::NONE
            } else {
                *slot = value;
                topic
            }
        }

        match self {
            FilterChange::Boroughs(set) if set.is_empty() => Topics::NONE,
            FilterChange::Boroughs(set) => set_if(&mut filter.boroughs, set, Topics::BOROUGHS),
            FilterChange::ToggleBorough(b) => {
                if filter.toggle_borough(&b) {
                    Topics::BOROUGHS
                } else {
                    Topics::NONE
                }
            }
            FilterChange::Pollutant(p) => set_if(&mut filter.pollutant, p, Topics::POLLUTANT),
            FilterChange::SensorTypes(set) if set.is_empty() => Topics::NONE,
            FilterChange::SensorTypes(set) => {
                set_if(&mut filter.sensor_types, set, Topics::SENSOR_TYPES)
            }
            FilterChange::ToggleSensorType(t) => {
                if filter.toggle_sensor_type(&t) {
                    Topics::SENSOR_TYPES
                } else {
                    Topics::NONE
                }
            }
            FilterChange::Period(p) => set_if(&mut filter.period, p, Topics::PERIOD),
            FilterChange::Year(y) => set_if(&mut filter.year, y, Topics::YEAR),
            FilterChange::Month(m) => {
                let before = filter.month;
                filter.set_month(m);
                if filter.month == before {
                    Topics::NONE
                } else {
                    Topics::MONTH
                }
            }
            FilterChange::Standard(s) => set_if(&mut filter.standard, s, Topics::STANDARD),
        }
    }
}

/// Cosmetic settings that still feed render models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySettings {
    pub map_style: String,
    pub legend_mode: LegendMode,
    pub date_window: DateWindow,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            map_style: DEFAULT_MAP_STYLE.to_string(),
            legend_mode: LegendMode::default(),
            date_window: DateWindow::default(),
        }
    }
}

/// A consistent copy of the session state, taken before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub filter: FilterSelection,
    pub selection: SelectionState,
    pub view: ViewState,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&ChartOutcome) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    model: ModelKind,
    callback: Callback,
}

fn read<T: Clone>(lock: &RwLock<T>) -> T {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

pub struct Dashboard<S> {
    source: CachedSource<S>,
    classifier: ColorClassifier,
    options: RwLock<FilterOptions>,
    filter: RwLock<FilterSelection>,
    selection: RwLock<SelectionState>,
    view: RwLock<ViewState>,
    display: RwLock<DisplaySettings>,
    sequencer: UpdateSequencer,
    slots: HashMap<ModelKind, LatestSlot<ChartOutcome>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscription: AtomicU64,
}

impl<S: DataSource> Dashboard<S> {
    /// Start a session: load filter options and select the defaults.
    pub fn new(source: S) -> Result<Self> {
        let source = CachedSource::new(source);
        let options = FilterOptions::load(&source)?;
        let filter = FilterSelection::from_options(&options);
        log::info!(
            "[AQM] dashboard: started with {} boroughs, year {}",
            filter.boroughs.len(),
            filter.year
        );
        Ok(Dashboard {
            source,
            classifier: ColorClassifier::default(),
            options: RwLock::new(options),
            filter: RwLock::new(filter),
            selection: RwLock::new(SelectionState::default()),
            view: RwLock::new(ViewState::default()),
            display: RwLock::new(DisplaySettings::default()),
            sequencer: UpdateSequencer::new(),
            slots: ModelKind::ALL
                .iter()
                .map(|kind| (*kind, LatestSlot::new()))
                .collect(),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        })
    }

    pub fn source(&self) -> &CachedSource<S> {
        &self.source
    }

    pub fn options(&self) -> FilterOptions {
        read(&self.options)
    }

    pub fn filter(&self) -> FilterSelection {
        read(&self.filter)
    }

    pub fn selection(&self) -> SelectionState {
        read(&self.selection)
    }

    pub fn view(&self) -> ViewState {
        read(&self.view)
    }

    pub fn display(&self) -> DisplaySettings {
        read(&self.display)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            filter: self.filter(),
            selection: self.selection(),
            view: self.view(),
            display: self.display(),
        }
    }

    pub fn update_filter(&self, change: FilterChange) -> Topics {
        let changed = {
            let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
            change.apply(&mut filter)
        };
        self.notify(changed);
        changed
    }

    pub fn apply_selection(&self, event: SelectionEvent) -> Topics {
        let changed = {
            let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
            let next = selection.apply(event);
            if next == *selection {
                Topics::NONE
            } else {
                *selection = next;
                Topics::SELECTION
            }
        };
        self.notify(changed);
        changed
    }

    pub fn clear_selection(&self) -> Topics {
        self.apply_selection(SelectionEvent::Clear)
    }

    pub fn apply_view(&self, change: ViewChange) -> Topics {
        let changed = {
            let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
            let next = view.apply_pan(&change);
            if next == *view {
                Topics::NONE
            } else {
                *view = next;
                Topics::VIEW
            }
        };
        self.notify(changed);
        changed
    }

    /// Switch the basemap. Unknown styles are ignored.
    pub fn set_map_style(&self, style: &str) -> Topics {
        if !is_known_map_style(style) {
            log::warn!("[AQM] dashboard: ignoring unknown map style '{}'", style);
            return Topics::NONE;
        }
        self.update_display(Topics::MAP_STYLE, |d| {
            if d.map_style == style {
                false
            } else {
                d.map_style = style.to_string();
                true
            }
        })
    }

    pub fn set_legend_mode(&self, mode: LegendMode) -> Topics {
        self.update_display(Topics::LEGEND_MODE, |d| {
            let changed = d.legend_mode != mode;
            d.legend_mode = mode;
            changed
        })
    }

    /// Advance to the next legend mode and return it.
    pub fn cycle_legend_mode(&self) -> LegendMode {
        let mut mode = LegendMode::default();
        self.update_display(Topics::LEGEND_MODE, |d| {
            d.legend_mode = d.legend_mode.next();
            mode = d.legend_mode;
            true
        });
        mode
    }

    pub fn set_date_window(&self, window: DateWindow) -> Topics {
        self.update_display(Topics::DATE_WINDOW, |d| {
            let changed = d.date_window != window;
            d.date_window = window;
            changed
        })
    }

    fn update_display<F>(&self, topic: Topics, edit: F) -> Topics
    where
        F: FnOnce(&mut DisplaySettings) -> bool,
    {
        let changed = {
            let mut display = self.display.write().unwrap_or_else(PoisonError::into_inner);
            if edit(&mut display) {
                topic
            } else {
                Topics::NONE
            }
        };
        self.notify(changed);
        changed
    }

    /// Drop cached sensor metadata, reload the filter options and refresh
    /// every model that depends on metadata.
    pub fn invalidate_metadata(&self) -> Result<()> {
        self.source.invalidate();
        let options = FilterOptions::load(&self.source)?;
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options;
        self.notify(Topics::METADATA);
        Ok(())
    }

    /// Call `callback` with every new `model` result published after this.
    pub fn subscribe<F>(&self, model: ModelKind, callback: F) -> SubscriptionId
    where
        F: Fn(&ChartOutcome) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                model,
                callback: Arc::new(callback),
            });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// The newest published result for `model`.
    pub fn latest(&self, model: ModelKind) -> Option<ChartOutcome> {
        self.slots.get(&model).and_then(LatestSlot::latest)
    }

    /// Recompute `model` and publish it; returns the result if it was not
    /// overtaken by a newer recomputation.
    pub fn refresh(&self, model: ModelKind) -> Option<ChartOutcome> {
        let ticket = self.sequencer.issue();
        let outcome = self.render(model);
        let slot = self.slots.get(&model)?;
        slot.offer(ticket, outcome.clone()).then_some(outcome)
    }

    /// Compute `model` from a fresh snapshot without publishing it.
    pub fn render(&self, model: ModelKind) -> ChartOutcome {
        let snapshot = self.snapshot();
        self.render_snapshot(model, &snapshot)
    }

    pub fn render_snapshot(&self, model: ModelKind, snap: &Snapshot) -> ChartOutcome {
        match self.compute(model, snap) {
            Ok(rendered) => ChartOutcome::Ready(rendered),
            Err(err) => {
                log::warn!("[AQM] dashboard: {:?} unavailable: {}", model, err);
                ChartOutcome::Unavailable(err.to_string())
            }
        }
    }

    /// The snapshot's selection restricted to sensors the filter still
    /// offers, plus those sensors. Every model reads this one selection so
    /// the charts never show ids the dropdown has pruned.
    fn effective_selection(
        &self,
        engine: &FilterEngine<'_>,
        snap: &Snapshot,
    ) -> Result<(SelectionState, Vec<Sensor>)> {
        if snap.selection.is_empty() {
            return Ok((SelectionState::default(), Vec::new()));
        }
        let eligible = engine.eligible_sensors(&snap.filter)?;
        let ids: BTreeSet<SiteId> = eligible.iter().map(|s| s.site_id.clone()).collect();
        let selection = snap.selection.within(&ids);
        if selection.selected().len() < snap.selection.selected().len() {
            log::debug!(
                "[AQM] dashboard: ignoring {} stale selected sensors",
                snap.selection.selected().len() - selection.selected().len()
            );
        }
        let sensors = eligible
            .into_iter()
            .filter(|s| selection.contains(&s.site_id))
            .collect();
        Ok((selection, sensors))
    }

    fn compute(&self, model: ModelKind, snap: &Snapshot) -> Result<Rendered> {
        let filter = &snap.filter;
        let engine = FilterEngine::new(&self.source);
        let aggregator = ChartAggregator::new(&self.source);

        Ok(match model {
            ModelKind::Map => {
                let resolution = engine.resolve(filter)?;
                let selection = snap.selection.within(&resolution.eligible_ids());
                Rendered::Map(map_model(
                    &resolution,
                    filter,
                    snap.view,
                    &snap.display.map_style,
                    &self.classifier,
                    &selection,
                ))
            }
            ModelKind::Dropdown => {
                let options = engine.dropdown_options(filter)?;
                Rendered::Dropdown(dropdown_model(options, &snap.selection))
            }
            ModelKind::TimeSeries => {
                let (selection, _) = self.effective_selection(&engine, snap)?;
                let selected = selection.selected();
                let series = aggregator.time_series(selected, &filter.pollutant, filter.period)?;
                Rendered::Chart(time_series_chart(selected, series, &filter.pollutant))
            }
            ModelKind::Bar => {
                let (selection, _) = self.effective_selection(&engine, snap)?;
                let selected = selection.selected();
                let bars = aggregator.bar_averages(
                    selected,
                    &filter.pollutant,
                    filter.period,
                    filter.year,
                    filter.effective_month(),
                )?;
                Rendered::Chart(bar_chart(selected, bars, &filter.pollutant))
            }
            ModelKind::Detailed => {
                let (selection, sensors) = self.effective_selection(&engine, snap)?;
                let selected = selection.selected();
                let series = aggregator.time_series_within(
                    selected,
                    &filter.pollutant,
                    filter.period,
                    snap.display.date_window,
                )?;
                let names: HashMap<SiteId, String> = sensors
                    .into_iter()
                    .map(|s| (s.site_id.clone(), s.display_name().to_string()))
                    .collect();
                Rendered::Chart(detailed_chart(
                    selected,
                    series,
                    &names,
                    &filter.pollutant,
                    filter.period,
                    snap.display.legend_mode,
                ))
            }
        })
    }

    fn callbacks_for(&self, model: ModelKind) -> Vec<Callback> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.model == model)
            .map(|s| Arc::clone(&s.callback))
            .collect()
    }

    /// Recompute and deliver every subscribed model that depends on `changed`.
    fn notify(&self, changed: Topics) {
        if changed.is_empty() {
            return;
        }
        for model in ModelKind::ALL {
            if !model.topics().intersects(changed) {
                continue;
            }
            let callbacks = self.callbacks_for(model);
            if callbacks.is_empty() {
                continue;
            }
            if let Some(outcome) = self.refresh(model) {
                for callback in &callbacks {
                    callback(&outcome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::LatLon;
    use aqm_core::{AqmError, DistinctField, MemorySource, Reading, ReadingQuery, Sensor};
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    const CSV: &str = "\
site_code,borough,lat,lon,sensor_type,year,month,pollutant,value,date,averaging_period,site_name
R1,Richmond,51.4452,-0.2967,Automatic,2024,,NO2,12.0,2024,Annual,Castelnau
R1,Richmond,51.4452,-0.2967,Automatic,2023,,NO2,15.0,2023,Annual,Castelnau
R1,Richmond,51.4452,-0.2967,Automatic,2024,,PM2.5,7.0,2024,Annual,Castelnau
S2,Wandsworth,51.4633,-0.2153,DT,2024,,NO2,41.0,2024,Annual,Putney High Street
S9,Merton,51.4100,-0.1900,Clarity,2024,,NO2,28.0,2024,Annual,Morden Road
S7,Merton,51.4000,-0.2000,Clarity,2024,3,NO2,33.0,2024-03,Month,Mitcham
";

    fn dashboard() -> Dashboard<MemorySource> {
        Dashboard::new(MemorySource::from_csv_str(CSV).unwrap()).unwrap()
    }

    fn counter(dash: &Dashboard<MemorySource>, model: ModelKind) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        dash.subscribe(model, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn defaults_come_from_options() {
        let dash = dashboard();
        let filter = dash.filter();
        assert_eq!(filter.pollutant, "NO2");
        assert_eq!(filter.year, 2024, "latest year with readings");
        assert_eq!(filter.boroughs.len(), 3);
        assert_eq!(dash.view(), ViewState::default());
        assert_eq!(dash.display().map_style, "carto-voyager");
    }

    #[test]
    fn pollutant_change_leaves_view_untouched() {
        let dash = dashboard();
        dash.apply_view(ViewChange {
            center: None,
            zoom: Some(13.0),
        });
        let maps = counter(&dash, ModelKind::Map);

        let changed = dash.update_filter(FilterChange::Pollutant("PM2.5".to_string()));
        assert_eq!(changed, Topics::POLLUTANT);
        assert_eq!(dash.view().zoom, 13.0);
        assert_eq!(maps.load(Ordering::SeqCst), 1);
        match dash.latest(ModelKind::Map) {
            Some(ChartOutcome::Ready(Rendered::Map(map))) => {
                assert_eq!(map.view.zoom, 13.0);
                assert_eq!(map.colored.len(), 1);
            }
            other => panic!("unexpected map outcome: {:?}", other),
        }
    }

    #[test]
    fn only_dependent_models_recompute() {
        let dash = dashboard();
        let maps = counter(&dash, ModelKind::Map);
        let series = counter(&dash, ModelKind::TimeSeries);
        let bars = counter(&dash, ModelKind::Bar);

        dash.apply_view(ViewChange {
            center: Some(LatLon { lat: 51.5, lon: -0.1 }),
            zoom: None,
        });
        assert_eq!(maps.load(Ordering::SeqCst), 1);
        assert_eq!(series.load(Ordering::SeqCst), 0);

        dash.update_filter(FilterChange::Year(2023));
        assert_eq!(maps.load(Ordering::SeqCst), 2);
        assert_eq!(bars.load(Ordering::SeqCst), 1);
        assert_eq!(series.load(Ordering::SeqCst), 0);

        dash.apply_selection(SelectionEvent::Click(Some(SiteId::new("R1"))));
        assert_eq!(series.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let dash = dashboard();
        let maps = counter(&dash, ModelKind::Map);
        assert!(dash
            .update_filter(FilterChange::Pollutant("NO2".to_string()))
            .is_empty());
        assert!(dash.apply_view(ViewChange::default()).is_empty());
        assert!(dash.update_filter(FilterChange::Boroughs(BTreeSet::new())).is_empty());
        assert_eq!(maps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn click_then_lasso_replaces_selection() {
        let dash = dashboard();
        dash.apply_selection(SelectionEvent::Click(Some(SiteId::new("S7"))));
        dash.apply_selection(SelectionEvent::Lasso(BTreeSet::from([
            SiteId::new("S2"),
            SiteId::new("S9"),
        ])));
        assert_eq!(
            dash.selection().dropdown_value(),
            vec![SiteId::new("S2"), SiteId::new("S9")]
        );
        dash.clear_selection();
        assert!(dash.selection().is_empty());
    }

    #[test]
    fn charts_follow_selection() {
        let dash = dashboard();
        dash.apply_selection(SelectionEvent::Dropdown(BTreeSet::from([
            SiteId::new("R1"),
            SiteId::new("S2"),
        ])));

        let ChartOutcome::Ready(Rendered::Chart(bars)) = dash.render(ModelKind::Bar) else {
            panic!("bar chart should render");
        };
        let order: Vec<&str> = bars.bars.iter().map(|b| b.site_id.as_str()).collect();
        assert_eq!(order, vec!["S2", "R1"]);

        dash.set_legend_mode(LegendMode::IdAndName);
        let ChartOutcome::Ready(Rendered::Chart(detailed)) = dash.render(ModelKind::Detailed) else {
            panic!("detailed chart should render");
        };
        assert_eq!(detailed.title, "Chart of Annual Average NO2");
        assert_eq!(detailed.series[0].name, "S2: Putney High Street");
        assert_eq!(detailed.series[1].points.len(), 2);
    }

    #[test]
    fn stale_click_yields_empty_dropdown_value() {
        let dash = dashboard();
        dash.apply_selection(SelectionEvent::Click(Some(SiteId::new("S2"))));
        dash.update_filter(FilterChange::Boroughs(BTreeSet::from(["Richmond".to_string()])));
        let ChartOutcome::Ready(Rendered::Dropdown(dropdown)) = dash.render(ModelKind::Dropdown) else {
            panic!("dropdown should render");
        };
        assert!(dropdown.value.is_empty());
        assert_eq!(dropdown.options.len(), 1);
    }

    #[test]
    fn click_outside_the_filter_leaves_every_model_empty() {
        let dash = dashboard();
        dash.update_filter(FilterChange::Boroughs(BTreeSet::from(["Richmond".to_string()])));
        dash.apply_selection(SelectionEvent::Click(Some(SiteId::new("S2"))));

        let ChartOutcome::Ready(Rendered::Dropdown(dropdown)) = dash.render(ModelKind::Dropdown) else {
            panic!("dropdown should render");
        };
        assert!(dropdown.value.is_empty());

        for model in [ModelKind::TimeSeries, ModelKind::Bar, ModelKind::Detailed] {
            let ChartOutcome::Ready(Rendered::Chart(chart)) = dash.render(model) else {
                panic!("{:?} should render", model);
            };
            assert!(chart.series.is_empty(), "{:?} plotted a stale sensor", model);
            assert!(chart.bars.is_empty(), "{:?} plotted a stale sensor", model);
            assert!(!chart.has_data());
        }

        let ChartOutcome::Ready(Rendered::Map(map)) = dash.render(ModelKind::Map) else {
            panic!("map should render");
        };
        assert!(map.colored.iter().chain(&map.plain).all(|m| !m.selected));
    }

    #[test]
    fn borough_change_prunes_charts_of_an_earlier_selection() {
        let dash = dashboard();
        dash.apply_selection(SelectionEvent::Dropdown(BTreeSet::from([
            SiteId::new("R1"),
            SiteId::new("S2"),
        ])));
        let bars = counter(&dash, ModelKind::Bar);

        dash.update_filter(FilterChange::Boroughs(BTreeSet::from(["Richmond".to_string()])));
        assert_eq!(bars.load(Ordering::SeqCst), 1);
        match dash.latest(ModelKind::Bar) {
            Some(ChartOutcome::Ready(Rendered::Chart(chart))) => {
                let ids: Vec<&str> = chart.bars.iter().map(|b| b.site_id.as_str()).collect();
                assert_eq!(ids, vec!["R1"]);
            }
            other => panic!("unexpected bar outcome: {:?}", other),
        }
    }

    #[test]
    fn legend_mode_cycles_through_dashboard() {
        let dash = dashboard();
        assert_eq!(dash.cycle_legend_mode(), LegendMode::IdAndName);
        assert_eq!(dash.display().legend_mode, LegendMode::IdAndName);
        assert!(dash.set_map_style("satellite").is_empty());
        assert_eq!(dash.set_map_style("carto-positron"), Topics::MAP_STYLE);
    }

    #[test]
    fn concurrent_legend_cycles_each_advance_once() {
        let dash = Arc::new(dashboard());
        let handles: Vec<_> = (0..LegendMode::ALL.len() * 2 + 1)
            .map(|_| {
                let dash = Arc::clone(&dash);
                std::thread::spawn(move || {
                    dash.cycle_legend_mode();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // two full laps plus one step
        assert_eq!(dash.display().legend_mode, LegendMode::default().next());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let dash = dashboard();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = dash.subscribe(ModelKind::Map, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert!(dash.unsubscribe(id));
        dash.update_filter(FilterChange::Year(2023));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!dash.unsubscribe(id));
    }

    struct Flaky {
        inner: MemorySource,
        readings_down: AtomicBool,
    }

    impl DataSource for Flaky {
        fn list_sensors(&self) -> Result<Vec<Sensor>> {
            self.inner.list_sensors()
        }

        fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
            if self.readings_down.load(Ordering::SeqCst) {
                return Err(AqmError::unavailable("query timed out"));
            }
            self.inner.list_readings(query)
        }

        fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>> {
            self.inner.list_distinct_values(field)
        }
    }

    #[test]
    fn failing_fetch_only_affects_its_own_model() {
        let dash = Dashboard::new(Flaky {
            inner: MemorySource::from_csv_str(CSV).unwrap(),
            readings_down: AtomicBool::new(false),
        })
        .unwrap();
        dash.source().inner().readings_down.store(true, Ordering::SeqCst);

        match dash.render(ModelKind::Map) {
            ChartOutcome::Unavailable(reason) => assert!(reason.contains("query timed out")),
            other => panic!("map should be unavailable: {:?}", other),
        }
        assert!(dash.render(ModelKind::Dropdown).is_ready());
        assert!(dash.render(ModelKind::TimeSeries).is_ready(), "empty selection needs no I/O");
    }

    #[test]
    fn invalidate_metadata_reloads_options() {
        let dash = dashboard();
        dash.source().list_sensors().unwrap();
        assert!(dash.source().is_warm());
        dash.invalidate_metadata().unwrap();
        assert_eq!(dash.options().boroughs.len(), 3);
    }

    #[test]
    fn dashboard_is_shared_across_threads() {
        let dash = Arc::new(dashboard());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let dash = Arc::clone(&dash);
                std::thread::spawn(move || {
                    dash.apply_view(ViewChange {
                        center: None,
                        zoom: Some(10.0 + i as f64),
                    });
                    dash.update_filter(FilterChange::Year(2020 + i));
                    dash.render(ModelKind::Map).is_ready()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!((2020..2024).contains(&dash.filter().year));
    }
}
