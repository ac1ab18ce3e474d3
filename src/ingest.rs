use std::collections::BTreeMap;

use serde::Serialize;

use crate::dates::{self, DATE_HEADERS};
use crate::error::SchemaError;
use crate::models::{Dataset, Field, Record, Schema};

pub const SDR_HEADERS: [&str; 3] = ["SDR", "sdr", "Sdr"];
pub const STATUS_HEADERS: [&str; 3] = ["Status", "status", "STATUS"];

/// A header row plus string cells, as handed over by a data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first candidate header present, by candidate priority.
    fn column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .position(|header| header.trim() == *candidate)
        })
    }
}

/// Records kept with an unparseable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub unparsed_dates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub dataset: Dataset,
    pub warning: Option<ParseWarning>,
}

/// Turns a raw table into a dataset with a fixed schema.
///
/// Fails before producing any record when the date or SDR column is
/// missing. A missing status column yields empty statuses. Rows whose
/// cells are all blank are skipped.
pub fn normalize(table: &RawTable) -> Result<Loaded, SchemaError> {
    let date_col = table.column(&DATE_HEADERS);
    let sdr_col = table.column(&SDR_HEADERS);

    let mut missing = Vec::new();
    if date_col.is_none() {
        missing.push(DATE_HEADERS[0].to_string());
    }
    if sdr_col.is_none() {
        missing.push(SDR_HEADERS[0].to_string());
    }
    let (Some(date_col), Some(sdr_col)) = (date_col, sdr_col) else {
        return Err(SchemaError { missing });
    };

    let status_col = table.column(&STATUS_HEADERS);
    let optional: BTreeMap<Field, usize> = Field::ALL
        .iter()
        .filter_map(|field| table.column(field.headers()).map(|col| (*field, col)))
        .collect();
    let schema = Schema::new(optional.keys().copied());

    let mut records = Vec::with_capacity(table.rows.len());
    let mut unparsed_dates = 0usize;

    for row in &table.rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

        let date = dates::parse_date(cell(date_col));
        if date.is_none() {
            unparsed_dates += 1;
        }

        let mut record = Record::new(
            date,
            cell(sdr_col),
            status_col.map(cell).unwrap_or(""),
        );
        for (field, col) in &optional {
            record = record.with(*field, cell(*col));
        }
        records.push(record);
    }

    if unparsed_dates > 0 {
        log::warn!("{unparsed_dates} row(s) kept without a usable date");
    }
    log::debug!(
        "normalized {} row(s) with optional columns {:?}",
        records.len(),
        schema.fields().collect::<Vec<_>>()
    );

    Ok(Loaded {
        dataset: Dataset::new(schema, records),
        warning: (unparsed_dates > 0).then_some(ParseWarning { unparsed_dates }),
    })
}
