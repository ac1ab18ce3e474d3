use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::models::{Dataset, Dimension, FilterCriteria, FilteredView, Record};

/// Keeps the records that satisfy every active predicate, in dataset order.
///
/// Equality predicates on dimensions the dataset does not carry are ignored.
pub fn apply<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    let schema = dataset.schema();
    let equals: Vec<(Dimension, &str)> = criteria
        .equals
        .iter()
        .filter(|(dimension, _)| schema.supports(**dimension))
        .map(|(dimension, value)| (*dimension, value.as_str()))
        .collect();

    let records = dataset
        .records()
        .iter()
        .filter(|record| criteria.date_range.contains(record.date))
        .filter(|record| {
            equals
                .iter()
                .all(|(dimension, value)| record.dimension(*dimension) == Some(*value))
        })
        .filter(|record| matches_derived(record, criteria))
        .collect();

    FilteredView { schema, records }
}

fn matches_derived(record: &Record, criteria: &FilterCriteria) -> bool {
    let month_ok = criteria
        .month
        .as_deref()
        .map_or(true, |month| record.month_name().as_deref() == Some(month));
    let week_ok = criteria.week.map_or(true, |week| record.week() == Some(week));
    let quarter_ok = criteria
        .quarter
        .map_or(true, |quarter| record.quarter() == Some(quarter));
    month_ok && week_ok && quarter_ok
}

/// Values a user can pick from for each filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub sdrs: Vec<String>,
    pub statuses: Vec<String>,
    pub months: Vec<String>,
    pub weeks: Vec<u32>,
    pub quarters: Vec<u32>,
    pub dimensions: Vec<(Dimension, Vec<String>)>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

/// Sorted distinct values; months in calendar order, blanks left out.
pub fn options(dataset: &Dataset) -> FilterOptions {
    let distinct = |dimension: Dimension| -> Vec<String> {
        dataset
            .records()
            .iter()
            .filter_map(|record| record.dimension(dimension))
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    let mut months: Vec<String> = dataset
        .records()
        .iter()
        .filter_map(Record::month_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    months.sort_by_key(|month| dates::month_index(month));

    let weeks: Vec<u32> = dataset
        .records()
        .iter()
        .filter_map(Record::week)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let quarters: Vec<u32> = dataset
        .records()
        .iter()
        .filter_map(Record::quarter)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let dimensions = [
        Dimension::Source,
        Dimension::SalesTeam,
        Dimension::Ae,
        Dimension::Industry,
        Dimension::EmployeeSize,
    ]
    .into_iter()
    .filter(|dimension| dataset.schema().supports(*dimension))
    .map(|dimension| (dimension, distinct(dimension)))
    .collect();

    FilterOptions {
        sdrs: distinct(Dimension::Sdr),
        statuses: distinct(Dimension::Status),
        months,
        weeks,
        quarters,
        dimensions,
        date_bounds: dataset.date_bounds(),
    }
}
