use std::sync::Arc;

use super::model::{Dataset, FilterCriteria, FilteredView};

// ---------------------------------------------------------------------------
// Filter engine: location membership AND inclusive date interval
// ---------------------------------------------------------------------------

/// Return the view of `dataset` rows that pass `criteria`.
///
/// A row passes when:
/// * its location is in the selected set (an empty set selects nothing)
/// * its date is inside `[start, end]`; a missing date never is
/// * at least one of its value columns is non-null
///
/// Relative row order is preserved.
pub fn filter(dataset: &Arc<Dataset>, criteria: &FilterCriteria) -> FilteredView {
    debug_assert!(dataset.is_loaded(), "filtering an unloaded dataset");

    let indices = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            let location_ok = r
                .location
                .as_ref()
                .is_some_and(|loc| criteria.locations.contains(loc));
            let date_ok = r.date.is_some_and(|d| criteria.contains_date(d));
            location_ok && date_ok && !r.has_no_values()
        })
        .map(|(i, _)| i)
        .collect();

    FilteredView::new(Arc::clone(dataset), indices)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::Record;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(d: Option<&str>, loc: &str, deaths: Option<f64>, vax: Option<f64>) -> Record {
        Record {
            date: d.map(date),
            location: Some(loc.to_string()),
            new_deaths_smoothed: deaths,
            people_vaccinated_per_hundred: vax,
        }
    }

    fn example() -> Arc<Dataset> {
        Arc::new(Dataset::from_records(vec![
            rec(Some("2021-01-01"), "A", Some(5.0), Some(10.0)),
            rec(Some("2021-01-02"), "A", None, Some(12.0)),
            rec(Some("2021-01-01"), "B", Some(3.0), Some(20.0)),
        ]))
    }

    #[test]
    fn test_example_selects_both_a_rows_in_order() {
        let ds = example();
        let c = FilterCriteria::new(["A"], date("2021-01-01"), date("2021-01-02"));
        let view = filter(&ds, &c);
        assert_eq!(view.indices(), &[0, 1]);
    }

    #[test]
    fn test_empty_location_set_yields_empty_view() {
        let ds = example();
        let c = FilterCriteria::new(Vec::<String>::new(), date("2000-01-01"), date("2100-01-01"));
        assert!(filter(&ds, &c).is_empty());
    }

    #[test]
    fn test_full_selection_drops_only_missing_dates_and_all_null_rows() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(Some("2021-01-01"), "A", Some(1.0), None),
            rec(None, "A", Some(2.0), Some(3.0)),
            rec(Some("2021-01-03"), "B", None, None),
            rec(Some("2021-01-04"), "B", None, Some(7.0)),
            rec(Some("2021-01-05"), "C", Some(0.0), Some(0.0)),
        ]));
        let c = FilterCriteria::everything(&ds).unwrap();
        let view = filter(&ds, &c);
        assert_eq!(view.indices(), &[0, 3, 4]);
    }

    #[test]
    fn test_missing_date_excluded_from_all_time_interval() {
        let ds = Arc::new(Dataset::from_records(vec![rec(None, "A", Some(1.0), Some(1.0))]));
        let c = FilterCriteria::new(["A"], NaiveDate::MIN, NaiveDate::MAX);
        assert!(filter(&ds, &c).is_empty());
    }

    #[test]
    fn test_interval_bounds_are_inclusive() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(Some("2020-12-31"), "A", Some(1.0), None),
            rec(Some("2021-01-01"), "A", Some(1.0), None),
            rec(Some("2021-01-31"), "A", Some(1.0), None),
            rec(Some("2021-02-01"), "A", Some(1.0), None),
        ]));
        let c = FilterCriteria::new(["A"], date("2021-01-01"), date("2021-01-31"));
        assert_eq!(filter(&ds, &c).indices(), &[1, 2]);
    }

    #[test]
    fn test_inverted_interval_yields_empty_view() {
        let ds = example();
        let c = FilterCriteria::new(["A", "B"], date("2021-01-02"), date("2021-01-01"));
        assert!(filter(&ds, &c).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent_and_leaves_dataset_untouched() {
        let ds = example();
        let before = (*ds).clone();
        let c = FilterCriteria::new(["A", "B"], date("2021-01-01"), date("2021-01-02"));
        let first = filter(&ds, &c);
        let second = filter(&ds, &c);
        assert_eq!(first, second);
        assert_eq!(*ds, before);
    }

    #[test]
    fn test_order_is_preserved_across_interleaved_locations() {
        let ds = Arc::new(Dataset::from_records(vec![
            rec(Some("2021-01-02"), "B", Some(1.0), None),
            rec(Some("2021-01-01"), "A", Some(1.0), None),
            rec(Some("2021-01-01"), "C", Some(1.0), None),
            rec(Some("2021-01-01"), "B", Some(1.0), None),
        ]));
        let c = FilterCriteria::new(["A", "B"], date("2021-01-01"), date("2021-01-02"));
        assert_eq!(filter(&ds, &c).indices(), &[0, 1, 3]);
    }

    #[test]
    fn test_row_without_location_never_matches() {
        let mut r = rec(Some("2021-01-01"), "A", Some(1.0), None);
        r.location = None;
        let ds = Arc::new(Dataset::from_records(vec![r]));
        let c = FilterCriteria::new(["A", ""], date("2021-01-01"), date("2021-01-01"));
        assert!(filter(&ds, &c).is_empty());
    }
}
