use std::collections::BTreeMap;
use std::fmt;

use super::model::{FilteredView, ValueColumn};

/// How the values of one location are folded into a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Max,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Max => "max",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    max: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.max = if self.count == 0 { v } else { self.max.max(v) };
        self.sum += v;
        self.count += 1;
    }

    fn finish(&self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Mean => self.sum / self.count as f64,
            Reducer::Max => self.max,
        }
    }
}

/// Group the view by location and reduce `column` per group.
///
/// Null values are skipped, not counted as zero. A location whose values
/// are all null has no entry in the result.
pub fn aggregate(
    view: &FilteredView,
    column: ValueColumn,
    reducer: Reducer,
) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for record in view.records() {
        let (Some(location), Some(value)) = (record.location.as_deref(), column.get(record))
        else {
            continue;
        };
        groups.entry(location).or_default().push(value);
    }

    groups
        .into_iter()
        .map(|(loc, acc)| (loc.to_string(), acc.finish(reducer)))
        .collect()
}

/// Aggregation entries sorted by descending value (ties by name).
pub fn sorted_descending(aggregated: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = aggregated
        .iter()
        .map(|(loc, v)| (loc.as_str(), *v))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}
