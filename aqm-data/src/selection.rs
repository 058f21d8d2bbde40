//! The set of sensors highlighted for chart display.
//!
//! Three input channels feed one selection: a map click, a map lasso/box and
//! the sensor dropdown. Every event replaces the previous selection outright;
//! channels never merge within one update.

use crate::render::DropdownOption;
use aqm_core::SiteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// A click on a sensor, or on empty map space when `None`.
    Click(Option<SiteId>),
    /// A lasso or box selection; an empty lasso clears.
    Lasso(BTreeSet<SiteId>),
    /// The dropdown's new value, edited directly.
    Dropdown(BTreeSet<SiteId>),
    /// The clear-selection button.
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: BTreeSet<SiteId>,
}

impl SelectionState {
    pub fn new<I: IntoIterator<Item = SiteId>>(ids: I) -> Self {
        Self {
            selected: ids.into_iter().collect(),
        }
    }

    pub fn selected(&self) -> &BTreeSet<SiteId> {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, site_id: &SiteId) -> bool {
        self.selected.contains(site_id)
    }

    /// The selection after `event`. The previous selection never survives.
    pub fn apply(&self, event: SelectionEvent) -> SelectionState {
        let selected = match event {
            SelectionEvent::Click(Some(site_id)) => BTreeSet::from([site_id]),
            SelectionEvent::Click(None) | SelectionEvent::Clear => BTreeSet::new(),
            SelectionEvent::Lasso(ids) | SelectionEvent::Dropdown(ids) => ids,
        };
        log::debug!(
            "[AQM] selection: {} -> {} sensors",
            self.selected.len(),
            selected.len()
        );
        SelectionState { selected }
    }

    /// The value shown by the dropdown, in id order.
    pub fn dropdown_value(&self) -> Vec<SiteId> {
        self.selected.iter().cloned().collect()
    }

    /// The selection restricted to `eligible`. Ids left over from a stale
    /// render drop out, possibly leaving an empty selection.
    pub fn within(&self, eligible: &BTreeSet<SiteId>) -> SelectionState {
        SelectionState {
            selected: self.selected.intersection(eligible).cloned().collect(),
        }
    }

    /// The selected ids still offered by `options`. Ids left over from a
    /// stale render drop out, possibly leaving an empty selection.
    pub fn pruned(&self, options: &[DropdownOption]) -> BTreeSet<SiteId> {
        let offered: BTreeSet<&SiteId> = options.iter().map(|o| &o.value).collect();
        self.selected
            .iter()
            .filter(|id| offered.contains(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> BTreeSet<SiteId> {
        ids.iter().map(|id| SiteId::new(*id)).collect()
    }

    #[test]
    fn click_replaces_any_previous_selection() {
        let previous = SelectionState::new(ids(&["A", "B", "C"]));
        let next = previous.apply(SelectionEvent::Click(Some(SiteId::new("S7"))));
        assert_eq!(next.selected(), &ids(&["S7"]));
    }

    #[test]
    fn click_on_empty_space_clears() {
        let previous = SelectionState::new(ids(&["A", "B"]));
        assert!(previous.apply(SelectionEvent::Click(None)).is_empty());
        assert!(SelectionState::default()
            .apply(SelectionEvent::Click(None))
            .is_empty());
    }

    #[test]
    fn lasso_after_click_replaces() {
        let state = SelectionState::default()
            .apply(SelectionEvent::Click(Some(SiteId::new("S7"))))
            .apply(SelectionEvent::Lasso(ids(&["S2", "S9"])));
        assert_eq!(state.selected(), &ids(&["S2", "S9"]));
    }

    #[test]
    fn within_drops_ids_outside_the_eligible_set() {
        let state = SelectionState::new(ids(&["R1", "S2"]));
        assert_eq!(state.within(&ids(&["R1", "S9"])).selected(), &ids(&["R1"]));
        assert!(state.within(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn empty_lasso_and_clear_empty_the_selection() {
        let state = SelectionState::new(ids(&["S2"]));
        assert!(state.apply(SelectionEvent::Lasso(BTreeSet::new())).is_empty());
        assert!(state.apply(SelectionEvent::Clear).is_empty());
    }

    #[test]
    fn dropdown_is_source_of_truth_and_mirrors_state() {
        let state = SelectionState::new(ids(&["S1"]))
            .apply(SelectionEvent::Dropdown(ids(&["S4", "S3"])));
        assert_eq!(
            state.dropdown_value(),
            vec![SiteId::new("S3"), SiteId::new("S4")]
        );
    }

    #[test]
    fn stale_ids_are_pruned_against_options() {
        let state = SelectionState::new(ids(&["GONE"]));
        let options = vec![DropdownOption {
            value: SiteId::new("S1"),
            label: "S1: Castelnau".to_string(),
        }];
        assert!(state.pruned(&options).is_empty());
        assert!(state.contains(&SiteId::new("GONE")));
    }
}
