//! Filter derivation and evaluation
//!
//! [`enumerate_all_filter_options`] walks the dataset once per filterable
//! heading to build the choice lists. [`Filter`] holds what the visitor has
//! selected, and [`apply_filter`] recomputes the visible rows from the full
//! dataset on every change.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::configuration::{FilterKeyword, ProcessedFilters, Tag};
use crate::dataset::{Dataset, Row, cell};

type Selections = BTreeMap<FilterKeyword, BTreeMap<String, BTreeSet<String>>>;

/// Distinct non-empty values per filterable heading, per kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterOptionsIndex(Selections);

impl FilterOptionsIndex {
    /// Options of every heading under one kind
    pub fn get(&self, kind: FilterKeyword) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        self.0.get(&kind)
    }

    pub fn options(&self, kind: FilterKeyword, heading: &str) -> Option<&BTreeSet<String>> {
        self.0.get(&kind)?.get(heading)
    }

    /// Every option of a kind as a flat list, in heading then value order
    ///
    /// This is what the listing search bar offers.
    pub fn items(&self, kind: FilterKeyword) -> Vec<Tag> {
        self.0
            .get(&kind)
            .into_iter()
            .flatten()
            .flat_map(|(heading, values)| values.iter().map(move |value| Tag::new(heading, value)))
            .collect()
    }
}

/// Build the choice list of every filterable heading
///
/// Empty cells are not options. Headings absent from the dataset end up with
/// an empty set. Every known kind is present in the result.
///
/// # Arguments
/// * `dataset` - Full dataset
/// * `processed_filters` - Filterable headings grouped by kind
///
/// # Returns
/// * `FilterOptionsIndex` - kind -> heading -> distinct values
pub fn enumerate_all_filter_options(
    dataset: &Dataset,
    processed_filters: &ProcessedFilters,
) -> FilterOptionsIndex {
    let mut index: Selections = FilterKeyword::ALL
        .into_iter()
        .map(|kind| (kind, BTreeMap::new()))
        .collect();

    for (kind, headings) in processed_filters.iter() {
        let by_heading = index.entry(kind).or_default();
        for heading in headings {
            let values = by_heading.entry(heading.clone()).or_default();
            for row in dataset.rows() {
                match cell(row, heading) {
                    Some(value) if !value.is_empty() => {
                        values.insert(value.to_string());
                    }
                    _ => {}
                }
            }
        }
    }

    debug!(
        "enumerated filter options for {} headings over {} rows",
        index.values().map(BTreeMap::len).sum::<usize>(),
        dataset.len()
    );

    FilterOptionsIndex(index)
}

/// Active filter selection of one listing visit
///
/// Headings and kinds without any selected value are never stored, so a filter
/// with nothing selected always equals [`Filter::new`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Selections")]
pub struct Filter(Selections);

impl From<Selections> for Filter {
    fn from(mut selections: Selections) -> Self {
        for by_heading in selections.values_mut() {
            by_heading.retain(|_, values| !values.is_empty());
        }
        selections.retain(|_, by_heading| !by_heading.is_empty());
        Filter(selections)
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select or deselect `value` for `heading` under `kind`
    ///
    /// Selecting twice equals selecting once; deselecting a value that is not
    /// selected does nothing.
    pub fn toggle(&mut self, kind: FilterKeyword, value: &str, heading: &str, checked: bool) {
        if checked {
            self.0
                .entry(kind)
                .or_default()
                .entry(heading.to_string())
                .or_default()
                .insert(value.to_string());
            return;
        }

        let Some(by_heading) = self.0.get_mut(&kind) else {
            return;
        };
        if let Some(values) = by_heading.get_mut(heading) {
            values.remove(value);
            if values.is_empty() {
                by_heading.remove(heading);
            }
        }
        if by_heading.is_empty() {
            self.0.remove(&kind);
        }
    }

    /// Checkbox toggle, as fired by the filter modal and search bar
    pub fn toggle_or_change_filter_option(&mut self, value: &str, heading: &str, checked: bool) {
        self.toggle(FilterKeyword::Checkbox, value, heading, checked);
    }

    pub fn reset(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn selected(&self, kind: FilterKeyword, heading: &str) -> Option<&BTreeSet<String>> {
        self.0.get(&kind)?.get(heading)
    }

    /// Replace the whole selection with the given checkbox tags
    pub fn select_only<'a>(&mut self, tags: impl IntoIterator<Item = &'a Tag>) {
        self.reset();
        for tag in tags {
            self.toggle_or_change_filter_option(&tag.value, &tag.heading, true);
        }
    }

    /// Every selected value as a chip, across all kinds
    pub fn selected_tags(&self) -> Vec<Tag> {
        self.0
            .values()
            .flatten()
            .flat_map(|(heading, values)| values.iter().map(move |value| Tag::new(heading, value)))
            .collect()
    }

    pub fn apply_change(&mut self, change: FilterChange) {
        match change {
            FilterChange::Toggle {
                kind,
                value,
                heading,
                checked,
            } => self.toggle(kind, &value, &heading, checked),
            FilterChange::Reset => self.reset(),
            FilterChange::SelectOnly { tags } => self.select_only(&tags),
        }
    }

    /// Whether a row passes every constrained heading
    ///
    /// AND across headings, OR across the values selected for one heading.
    pub fn matches(&self, row: &Row) -> bool {
        self.0.values().flatten().all(|(heading, selected)| {
            cell(row, heading).is_some_and(|value| selected.contains(value))
        })
    }
}

/// One user interaction against a [`Filter`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterChange {
    Toggle {
        #[serde(default)]
        kind: FilterKeyword,
        value: String,
        heading: String,
        checked: bool,
    },
    Reset,
    SelectOnly {
        tags: Vec<Tag>,
    },
}

/// Selected values of every heading that has at least one
pub fn currently_selected_filters(filter: &Filter) -> Vec<Vec<String>> {
    filter
        .0
        .values()
        .flat_map(BTreeMap::values)
        .map(|values| values.iter().cloned().collect())
        .collect()
}

/// Rows visible under the current selection, in dataset order
///
/// An empty filter returns every row.
pub fn apply_filter<'a>(dataset: &'a Dataset, filter: &Filter) -> Vec<&'a Row> {
    dataset.rows().iter().filter(|row| filter.matches(row)).collect()
}

/// Result-count caption shown above the listing
pub fn generate_showing_results(count: usize) -> String {
    match count {
        1 => "Showing 1 result".to_string(),
        n => format!("Showing {} results", n),
    }
}
