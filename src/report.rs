use std::fmt::Write;

use serde::Serialize;

use crate::filter::FilterOptions;
use crate::ingest::ParseWarning;
use crate::models::{
    DimensionBreakdown, Field, FilterCriteria, GroupStats, Record, Schema, SummaryMetrics,
};
use crate::pipeline::DashboardRun;
use crate::summary;

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Optional columns shown in record tables; free-text fields stay hidden.
pub fn display_columns(schema: &Schema) -> Vec<Field> {
    schema.fields().filter(|field| !field.is_data_only()).collect()
}

fn groups_for_display(breakdown: &DimensionBreakdown, top: Option<usize>) -> Vec<GroupStats> {
    match top {
        Some(limit) => summary::ranked(&breakdown.groups, limit),
        None => breakdown.groups.clone(),
    }
}

fn describe_criteria(criteria: &FilterCriteria) -> String {
    let mut parts: Vec<String> = criteria
        .equals
        .iter()
        .map(|(dimension, value)| format!("{} = {}", dimension.label(), value))
        .collect();
    if let Some(month) = &criteria.month {
        parts.push(format!("Month = {month}"));
    }
    if let Some(week) = criteria.week {
        parts.push(format!("Week = {week}"));
    }
    if let Some(quarter) = criteria.quarter {
        parts.push(format!("Quarter = Q{quarter}"));
    }
    parts.push(format!(
        "{} to {}",
        criteria.date_range.from, criteria.date_range.to
    ));
    parts.join(", ")
}

pub fn render_summary(
    run: &DashboardRun<'_>,
    warning: Option<ParseWarning>,
    top: Option<usize>,
) -> String {
    let metrics = &run.metrics;
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Records: {} total, {} after filters",
        run.total_records,
        run.view.len()
    );
    if let Some(warning) = warning {
        let _ = writeln!(
            output,
            "Warning: {} row(s) have no usable date and never match a date range",
            warning.unparsed_dates
        );
    }
    if metrics.total == 0 {
        let _ = writeln!(output, "No data available for selected filters.");
        return output;
    }

    let _ = writeln!(output, "Demos done: {}", metrics.done_count);
    let _ = writeln!(output, "Demos scheduled: {}", metrics.scheduled_count);
    let _ = writeln!(output, "Completion rate: {}", percent(metrics.completion_rate));

    for breakdown in &metrics.breakdowns {
        let _ = writeln!(output);
        let _ = writeln!(output, "By {}:", breakdown.dimension.label());
        for group in groups_for_display(breakdown, top) {
            let _ = writeln!(
                output,
                "- {}: {} done of {} ({})",
                group.value,
                group.done_count,
                group.total,
                percent(group.success_rate)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Status distribution:");
    for status in &metrics.statuses {
        let _ = writeln!(output, "- {}: {}", status.status, status.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Daily:");
    for point in &metrics.series {
        let _ = writeln!(
            output,
            "- {}: {} done of {} ({})",
            point.date,
            point.done_count,
            point.total,
            percent(point.completion_rate)
        );
    }

    output
}

#[derive(Serialize)]
struct SummaryJson<'a> {
    total_records: usize,
    filtered_records: usize,
    warning: Option<ParseWarning>,
    metrics: &'a SummaryMetrics,
}

pub fn summary_json(
    run: &DashboardRun<'_>,
    warning: Option<ParseWarning>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SummaryJson {
        total_records: run.total_records,
        filtered_records: run.view.len(),
        warning,
        metrics: &run.metrics,
    })
}

fn row_cells(record: &Record, columns: &[Field]) -> Vec<String> {
    let mut cells = vec![
        record
            .date
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        record.status.clone(),
    ];
    cells.extend(
        columns
            .iter()
            .map(|field| record.get(*field).unwrap_or_default().to_string()),
    );
    cells
}

/// Tab-separated filtered records. The SDR column is left out like the
/// dashboard table, which shows it through the SDR filter instead.
pub fn render_rows(run: &DashboardRun<'_>, limit: usize) -> String {
    let columns = display_columns(run.view.schema);
    let mut output = String::new();

    let mut header = vec!["Date".to_string(), "Status".to_string()];
    header.extend(columns.iter().map(|field| field.label().to_string()));
    let _ = writeln!(output, "{}", header.join("\t"));

    for record in run.view.iter().take(limit) {
        let _ = writeln!(output, "{}", row_cells(record, &columns).join("\t"));
    }
    if run.view.len() > limit {
        let _ = writeln!(output, "... {} more", run.view.len() - limit);
    }
    output
}

pub fn render_options(options: &FilterOptions) -> String {
    let mut output = String::new();
    let join = |values: &[String]| {
        if values.is_empty() {
            "(none)".to_string()
        } else {
            values.join(", ")
        }
    };

    let _ = writeln!(output, "SDR: All, {}", join(&options.sdrs));
    let _ = writeln!(output, "Status: All, {}", join(&options.statuses));
    let _ = writeln!(output, "Month: All, {}", join(&options.months));
    let weeks: Vec<String> = options.weeks.iter().map(u32::to_string).collect();
    let _ = writeln!(output, "Week: All, {}", join(&weeks));
    let quarters: Vec<String> = options.quarters.iter().map(|q| format!("Q{q}")).collect();
    let _ = writeln!(output, "Quarter: All, {}", join(&quarters));
    for (dimension, values) in &options.dimensions {
        let _ = writeln!(output, "{}: All, {}", dimension.label(), join(values));
    }
    match options.date_bounds {
        Some((from, to)) => {
            let _ = writeln!(output, "Dates: {from} to {to}");
        }
        None => {
            let _ = writeln!(output, "Dates: none parsed");
        }
    }
    output
}

pub fn build_report(
    source: &str,
    criteria: &FilterCriteria,
    run: &DashboardRun<'_>,
    warning: Option<ParseWarning>,
) -> String {
    let metrics = &run.metrics;
    let mut output = String::new();

    let _ = writeln!(output, "# SDR Demo Dashboard Report");
    let _ = writeln!(output, "Source: {source}");
    let _ = writeln!(output, "Filters: {}", describe_criteria(criteria));
    let _ = writeln!(
        output,
        "Records: {} total, {} filtered",
        run.total_records,
        run.view.len()
    );
    if let Some(warning) = warning {
        let _ = writeln!(
            output,
            "> {} row(s) had an unparseable date and are excluded from date filters.",
            warning.unparsed_dates
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Metrics");
    if metrics.total == 0 {
        let _ = writeln!(output, "No data available for selected filters.");
        return output;
    }
    let _ = writeln!(output, "- Demo done: {}", metrics.done_count);
    let _ = writeln!(output, "- Demo scheduled: {}", metrics.scheduled_count);
    let _ = writeln!(output, "- Completion rate: {}", percent(metrics.completion_rate));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Distribution");
    for status in &metrics.statuses {
        let _ = writeln!(output, "- {}: {}", status.status, status.count);
    }

    for breakdown in &metrics.breakdowns {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Top {} by Success Rate", breakdown.dimension.label());
        let _ = writeln!(output, "| {} | Total | Done | Success |", breakdown.dimension.label());
        let _ = writeln!(output, "| --- | ---: | ---: | ---: |");
        for group in summary::ranked(&breakdown.groups, 10) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                group.value,
                group.total,
                group.done_count,
                percent(group.success_rate)
            );
        }
    }

    for tab in &metrics.cross_tabs {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} vs Status", tab.dimension.label());
        for cell in &tab.cells {
            let _ = writeln!(output, "- {} / {}: {}", cell.value, cell.status, cell.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Activity");
    if metrics.series.is_empty() {
        let _ = writeln!(output, "No dated records in this view.");
    } else {
        for point in &metrics.series {
            let _ = writeln!(
                output,
                "- {}: {} of {} done ({})",
                point.date,
                point.done_count,
                point.total,
                percent(point.completion_rate)
            );
        }
    }

    output
}
