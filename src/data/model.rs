use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Column – the fixed projected column set
// ---------------------------------------------------------------------------

/// The four columns a dataset is projected onto, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Date,
    Location,
    NewDeathsSmoothed,
    PeopleVaccinatedPerHundred,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Date,
        Column::Location,
        Column::NewDeathsSmoothed,
        Column::PeopleVaccinatedPerHundred,
    ];

    /// Header text as it appears in OWID files.
    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Location => "location",
            Column::NewDeathsSmoothed => "new_deaths_smoothed",
            Column::PeopleVaccinatedPerHundred => "people_vaccinated_per_hundred",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ValueColumn – the numeric columns charts and aggregations read
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueColumn {
    NewDeathsSmoothed,
    PeopleVaccinatedPerHundred,
}

impl ValueColumn {
    /// Human-readable axis label.
    pub fn label(self) -> &'static str {
        match self {
            ValueColumn::NewDeathsSmoothed => "New deaths (smoothed)",
            ValueColumn::PeopleVaccinatedPerHundred => "People vaccinated per 100",
        }
    }

    /// Read this column from a record.
    pub fn get(self, record: &Record) -> Option<f64> {
        match self {
            ValueColumn::NewDeathsSmoothed => record.new_deaths_smoothed,
            ValueColumn::PeopleVaccinatedPerHundred => record.people_vaccinated_per_hundred,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one observation
// ---------------------------------------------------------------------------

/// One row of the dataset. Every field is nullable; an unparseable date
/// is stored as `None` so the row survives loading but never matches a
/// date interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub new_deaths_smoothed: Option<f64>,
    pub people_vaccinated_per_hundred: Option<f64>,
}

impl Record {
    /// True when both value columns are null.
    pub fn has_no_values(&self) -> bool {
        self.new_deaths_smoothed.is_none() && self.people_vaccinated_per_hundred.is_none()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An immutable, insertion-ordered table of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
    loaded: bool,
}

impl Dataset {
    /// A successfully loaded dataset.
    pub fn from_records(records: Vec<Record>) -> Self {
        Dataset {
            records,
            loaded: true,
        }
    }

    /// The degraded state produced when loading fails: no rows, not loaded.
    pub fn invalid() -> Self {
        Dataset {
            records: Vec::new(),
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct non-null locations.
    pub fn locations(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.location.clone())
            .collect()
    }

    /// Earliest and latest parsed date, if any row has one.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria – what the user selected
// ---------------------------------------------------------------------------

/// Selected locations plus an inclusive date interval.
/// `start > end` is allowed and simply matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub locations: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FilterCriteria {
    pub fn new(
        locations: impl IntoIterator<Item = impl Into<String>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        FilterCriteria {
            locations: locations.into_iter().map(Into::into).collect(),
            start,
            end,
        }
    }

    /// Select every location of `dataset` over its whole date span.
    /// `None` when the dataset has no parsed dates.
    #[cfg(test)]
    pub fn everything(dataset: &Dataset) -> Option<Self> {
        let (start, end) = dataset.date_span()?;
        Some(FilterCriteria {
            locations: dataset.locations(),
            start,
            end,
        })
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// FilteredView – derived, read-only projection
// ---------------------------------------------------------------------------

/// Indices of the rows of a shared dataset that passed a filter.
#[derive(Debug, Clone)]
pub struct FilteredView {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl FilteredView {
    pub(crate) fn new(dataset: Arc<Dataset>, indices: Vec<usize>) -> Self {
        FilteredView { dataset, indices }
    }

    #[cfg(test)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Records in their original dataset order.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.indices.iter().map(|&i| &self.dataset.records()[i])
    }

    /// Distinct locations present in the view, in first-seen order.
    pub fn locations(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records()
            .filter_map(|r| r.location.as_deref())
            .filter(|loc| seen.insert(*loc))
            .collect()
    }
}

impl PartialEq for FilteredView {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices
            && (Arc::ptr_eq(&self.dataset, &other.dataset) || self.dataset == other.dataset)
    }
}
