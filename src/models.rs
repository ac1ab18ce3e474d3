use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;

/// Optional source columns. Which of these a dataset carries is fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Industry,
    Source,
    SalesTeam,
    Ae,
    EmployeeSize,
    Company,
    ContactName,
    Title,
    SalesAccepted,
    Remarks,
    MeetingTranscript,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Industry,
        Field::Source,
        Field::SalesTeam,
        Field::Ae,
        Field::EmployeeSize,
        Field::Company,
        Field::ContactName,
        Field::Title,
        Field::SalesAccepted,
        Field::Remarks,
        Field::MeetingTranscript,
    ];

    /// Header names accepted for this column, matched after trimming.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Field::Industry => &["Industry", "industry"],
            Field::Source => &["Source", "source", "Lead Source"],
            Field::SalesTeam => &["Sales Team", "sales_team", "Sales team"],
            Field::Ae => &["AE", "ae", "Ae"],
            Field::EmployeeSize => &["Employee Size", "employee_size", "Employee size"],
            Field::Company => &["Company", "company", "Company Name"],
            Field::ContactName => &["Contact Name", "contact_name", "Contact name"],
            Field::Title => &["Title", "title"],
            Field::SalesAccepted => &["Sales Accepted?", "sales_accepted", "Sales Accepted"],
            Field::Remarks => &["Remarks", "remarks"],
            Field::MeetingTranscript => &["Meeting Transcript", "meeting_transcript"],
        }
    }

    pub fn label(self) -> &'static str {
        self.headers()[0]
    }

    /// Free-text columns kept in the model but never shown in tables.
    pub fn is_data_only(self) -> bool {
        matches!(
            self,
            Field::ContactName
                | Field::Title
                | Field::SalesAccepted
                | Field::Remarks
                | Field::MeetingTranscript
        )
    }
}

/// Keys usable for equality filters and group breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sdr,
    Status,
    Source,
    SalesTeam,
    Ae,
    Industry,
    EmployeeSize,
}

impl Dimension {
    /// Dimensions reported by the per-dimension breakdown, in report order.
    pub const BREAKDOWN: [Dimension; 5] = [
        Dimension::Sdr,
        Dimension::Source,
        Dimension::SalesTeam,
        Dimension::Ae,
        Dimension::Industry,
    ];

    /// The optional column backing this dimension, or `None` for required ones.
    pub fn field(self) -> Option<Field> {
        match self {
            Dimension::Sdr | Dimension::Status => None,
            Dimension::Source => Some(Field::Source),
            Dimension::SalesTeam => Some(Field::SalesTeam),
            Dimension::Ae => Some(Field::Ae),
            Dimension::Industry => Some(Field::Industry),
            Dimension::EmployeeSize => Some(Field::EmployeeSize),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Sdr => "SDR",
            Dimension::Status => "Status",
            other => other.field().map(Field::label).unwrap_or("?"),
        }
    }
}

/// The optional-column set shared by every record of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    optional: BTreeSet<Field>,
}

impl Schema {
    pub fn new(optional: impl IntoIterator<Item = Field>) -> Self {
        Self {
            optional: optional.into_iter().collect(),
        }
    }

    pub fn has(&self, field: Field) -> bool {
        self.optional.contains(&field)
    }

    pub fn supports(&self, dimension: Dimension) -> bool {
        dimension.field().map_or(true, |field| self.has(field))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.optional.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub date: Option<NaiveDate>,
    pub sdr: String,
    pub status: String,
    /// Present exactly for the fields in the dataset schema.
    pub optional: BTreeMap<Field, String>,
}

impl Record {
    pub fn new(date: Option<NaiveDate>, sdr: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            date,
            sdr: sdr.into(),
            status: status.into(),
            optional: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.optional.insert(field, value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.optional.get(&field).map(String::as_str)
    }

    /// Raw value of a dimension, `None` when the backing column is absent.
    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Sdr => Some(&self.sdr),
            Dimension::Status => Some(&self.status),
            other => other.field().and_then(|field| self.get(field)),
        }
    }

    pub fn week(&self) -> Option<u32> {
        self.date.map(dates::iso_week)
    }

    pub fn month_name(&self) -> Option<String> {
        self.date.map(dates::month_name)
    }

    pub fn quarter(&self) -> Option<u32> {
        self.date.map(dates::quarter)
    }

    pub fn is_done(&self) -> bool {
        is_done_status(&self.status)
    }

    pub fn is_scheduled(&self) -> bool {
        is_scheduled_status(&self.status)
    }
}

/// Comparison form of a status: trimmed and lowercased.
pub fn normalize_status(status: &str) -> String {
    status.trim().to_lowercase()
}

pub fn is_done_status(status: &str) -> bool {
    normalize_status(status) == "done"
}

pub fn is_scheduled_status(status: &str) -> bool {
    matches!(
        normalize_status(status).as_str(),
        "done" | "scheduled" | "rescheduled"
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset, filling any schema field a record lacks with an empty value
    /// and dropping fields outside the schema.
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                record.optional.retain(|field, _| schema.has(*field));
                for field in schema.fields() {
                    record.optional.entry(field).or_default();
                }
                record
            })
            .collect();
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Earliest and latest parsed dates, `None` if no record has one.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|record| record.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(min, max), date| {
            (min.min(date), max.max(date))
        }))
    }
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The dataset's full min/max span. A dataset without any parsed date
    /// yields an inverted window that matches nothing.
    pub fn spanning(dataset: &Dataset) -> Self {
        match dataset.date_bounds() {
            Some((from, to)) => Self { from, to },
            None => Self {
                from: NaiveDate::MAX,
                to: NaiveDate::MIN,
            },
        }
    }

    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|date| self.from <= date && date <= self.to)
    }
}

/// Predicates chosen for one pipeline run. `None` means "All".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub equals: BTreeMap<Dimension, String>,
    pub month: Option<String>,
    pub week: Option<u32>,
    pub quarter: Option<u32>,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            equals: BTreeMap::new(),
            month: None,
            week: None,
            quarter: None,
            date_range,
        }
    }

    /// Every predicate unset and the date window spanning the whole dataset.
    pub fn unfiltered(dataset: &Dataset) -> Self {
        Self::new(DateRange::spanning(dataset))
    }

    pub fn with(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.equals.insert(dimension, value.into());
        self
    }

    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn with_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }

    pub fn with_quarter(mut self, quarter: u32) -> Self {
        self.quarter = Some(quarter);
        self
    }
}

/// Records of a dataset that satisfy a set of criteria, in source order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub schema: &'a Schema,
    pub records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub value: String,
    pub total: usize,
    pub done_count: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionBreakdown {
    pub dimension: Dimension,
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: usize,
    pub done_count: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossCount {
    pub value: String,
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub dimension: Dimension,
    pub cells: Vec<CrossCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total: usize,
    pub done_count: usize,
    pub scheduled_count: usize,
    pub completion_rate: f64,
    pub breakdowns: Vec<DimensionBreakdown>,
    pub series: Vec<DailyPoint>,
    pub statuses: Vec<StatusCount>,
    pub cross_tabs: Vec<CrossTab>,
}

impl SummaryMetrics {
    #[cfg(test)]
    pub fn breakdown(&self, dimension: Dimension) -> Option<&DimensionBreakdown> {
        self.breakdowns
            .iter()
            .find(|breakdown| breakdown.dimension == dimension)
    }
}
