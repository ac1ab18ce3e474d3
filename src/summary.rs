use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::{
    CrossCount, CrossTab, DailyPoint, Dimension, DimensionBreakdown, FilteredView, GroupStats,
    StatusCount, SummaryMetrics,
};

/// Dimensions cross-tabulated against status.
const CROSS_TAB_DIMENSIONS: [Dimension; 2] = [Dimension::SalesTeam, Dimension::Ae];

pub fn rate(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    }
}

pub fn summarize(view: &FilteredView<'_>) -> SummaryMetrics {
    let total = view.len();
    let done_count = view.iter().filter(|record| record.is_done()).count();
    let scheduled_count = view.iter().filter(|record| record.is_scheduled()).count();

    let breakdowns = Dimension::BREAKDOWN
        .into_iter()
        .filter(|dimension| view.schema.supports(*dimension))
        .map(|dimension| DimensionBreakdown {
            dimension,
            groups: group_by(view, dimension),
        })
        .collect();

    let cross_tabs = CROSS_TAB_DIMENSIONS
        .into_iter()
        .filter(|dimension| view.schema.supports(*dimension))
        .map(|dimension| cross_tab(view, dimension))
        .collect();

    SummaryMetrics {
        total,
        done_count,
        scheduled_count,
        completion_rate: rate(done_count, total),
        breakdowns,
        series: daily_series(view),
        statuses: status_counts(view),
        cross_tabs,
    }
}

/// Groups by raw dimension value in first-seen order.
pub fn group_by(view: &FilteredView<'_>, dimension: Dimension) -> Vec<GroupStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupStats> = Vec::new();

    for record in view.iter() {
        let Some(value) = record.dimension(dimension) else {
            continue;
        };
        let slot = *index.entry(value).or_insert_with(|| {
            groups.push(GroupStats {
                value: value.to_string(),
                total: 0,
                done_count: 0,
                success_rate: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        if record.is_done() {
            group.done_count += 1;
        }
    }

    for group in &mut groups {
        group.success_rate = rate(group.done_count, group.total);
    }
    groups
}

/// Display-time ordering: success rate descending, ties keep first-seen order.
pub fn ranked(groups: &[GroupStats], limit: usize) -> Vec<GroupStats> {
    let mut ranked = groups.to_vec();
    ranked.sort_by(|a, b| {
        b.success_rate
            .partial_cmp(&a.success_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Per-day totals over records with a date, ascending, without gap filling.
pub fn daily_series(view: &FilteredView<'_>) -> Vec<DailyPoint> {
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for record in view.iter() {
        let Some(date) = record.date else {
            continue;
        };
        let entry = days.entry(date).or_insert((0, 0));
        entry.0 += 1;
        if record.is_done() {
            entry.1 += 1;
        }
    }

    days.into_iter()
        .map(|(date, (total, done_count))| DailyPoint {
            date,
            total,
            done_count,
            completion_rate: rate(done_count, total),
        })
        .collect()
}

/// Count per raw status value, first-seen order.
pub fn status_counts(view: &FilteredView<'_>) -> Vec<StatusCount> {
    let mut counts: Vec<StatusCount> = Vec::new();
    for record in view.iter() {
        match counts.iter_mut().find(|count| count.status == record.status) {
            Some(count) => count.count += 1,
            None => counts.push(StatusCount {
                status: record.status.clone(),
                count: 1,
            }),
        }
    }
    counts
}

/// Count per (dimension value, raw status) pair, first-seen order.
pub fn cross_tab(view: &FilteredView<'_>, dimension: Dimension) -> CrossTab {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut cells: Vec<CrossCount> = Vec::new();

    for record in view.iter() {
        let Some(value) = record.dimension(dimension) else {
            continue;
        };
        let key = (value, record.status.as_str());
        match index.get(&key) {
            Some(slot) => cells[*slot].count += 1,
            None => {
                index.insert(key, cells.len());
                cells.push(CrossCount {
                    value: value.to_string(),
                    status: record.status.clone(),
                    count: 1,
                });
            }
        }
    }

    CrossTab { dimension, cells }
}
