use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

mod cache;
mod config;
mod dates;
mod error;
mod filter;
mod ingest;
mod models;
mod pipeline;
mod report;
mod source;
mod summary;

use config::Config;
use models::{DateRange, Dataset, Dimension, FilterCriteria};
use pipeline::Session;
use source::{CsvFileSource, DataSource, SheetSource, Source, WorkbookSource};

#[derive(Parser)]
#[command(name = "demo-dashboard")]
#[command(
    about = "SDR demo pipeline dashboard: filters, completion rates and breakdowns",
    long_about = None
)]
#[command(group(
    ArgGroup::new("input")
        .args(["sheet_url", "csv", "xlsx"])
        .multiple(false)
))]
struct Cli {
    /// Published sheet CSV export URL (defaults to DASHBOARD_SHEET_URL)
    #[arg(long)]
    sheet_url: Option<String>,
    /// Local CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Uploaded Excel workbook
    #[arg(long)]
    xlsx: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    sdr: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    sales_team: Option<String>,
    #[arg(long)]
    ae: Option<String>,
    #[arg(long)]
    industry: Option<String>,
    #[arg(long)]
    employee_size: Option<String>,
    /// Month name, e.g. January
    #[arg(long)]
    month: Option<String>,
    /// ISO week number, 1-53
    #[arg(long, value_parser = week_value)]
    week: Option<String>,
    /// Quarter, 1-4
    #[arg(long, value_parser = quarter_value)]
    quarter: Option<String>,
    /// First day included (YYYY-MM-DD); defaults to the earliest date in the data
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD); defaults to the latest date in the data
    #[arg(long)]
    to: Option<NaiveDate>,
}

fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| *value != "All")
}

/// Accepts `All` or a number in `1..=max`.
fn numbered_or_all(raw: &str, max: u32) -> Result<String, String> {
    if raw == "All" {
        return Ok(raw.to_string());
    }
    match raw.parse::<u32>() {
        Ok(n) if (1..=max).contains(&n) => Ok(raw.to_string()),
        _ => Err(format!("expected All or a number from 1 to {max}")),
    }
}

fn week_value(raw: &str) -> Result<String, String> {
    numbered_or_all(raw, 53)
}

fn quarter_value(raw: &str) -> Result<String, String> {
    numbered_or_all(raw, 4)
}

impl FilterArgs {
    fn criteria(&self, dataset: &Dataset) -> FilterCriteria {
        let span = DateRange::spanning(dataset);
        let mut criteria = FilterCriteria::new(DateRange::new(
            self.from.unwrap_or(span.from),
            self.to.unwrap_or(span.to),
        ));

        let equals = [
            (Dimension::Sdr, &self.sdr),
            (Dimension::Status, &self.status),
            (Dimension::Source, &self.source),
            (Dimension::SalesTeam, &self.sales_team),
            (Dimension::Ae, &self.ae),
            (Dimension::Industry, &self.industry),
            (Dimension::EmployeeSize, &self.employee_size),
        ];
        for (dimension, value) in equals {
            if let Some(value) = selected(value) {
                criteria = criteria.with(dimension, value);
            }
        }
        if let Some(month) = selected(&self.month) {
            criteria = criteria.with_month(month);
        }
        if let Some(week) = selected(&self.week).and_then(|week| week.parse().ok()) {
            criteria = criteria.with_week(week);
        }
        if let Some(quarter) = selected(&self.quarter).and_then(|q| q.parse().ok()) {
            criteria = criteria.with_quarter(quarter);
        }
        criteria
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary metrics and breakdowns
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Rank each breakdown by success rate and keep the top N groups
        #[arg(long)]
        top: Option<usize>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the filtered records
    Rows {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// List the values available for each filter
    Options,
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Re-run the summary periodically; press Enter to refresh the data now
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

impl Cli {
    fn source(&self, config: &Config) -> anyhow::Result<Source> {
        if let Some(path) = &self.csv {
            return Ok(Source::Csv(CsvFileSource::new(path)));
        }
        if let Some(path) = &self.xlsx {
            return Ok(Source::Workbook(WorkbookSource::new(path)));
        }
        let url = match &self.sheet_url {
            Some(url) => url.as_str(),
            None => config.require_sheet_url()?,
        };
        Ok(Source::Sheet(SheetSource::new(url, config.fetch_timeout)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let source = cli.source(&config)?;
    let mut session = Session::new(source, config.cache_ttl);

    match cli.command {
        Commands::Summary {
            filters,
            top,
            json,
        } => {
            let loaded = session.load().await?;
            let run = pipeline::run(&loaded.dataset, &filters.criteria(&loaded.dataset));
            if json {
                println!("{}", report::summary_json(&run, loaded.warning)?);
            } else {
                print!("{}", report::render_summary(&run, loaded.warning, top));
            }
        }
        Commands::Rows { filters, limit } => {
            let loaded = session.load().await?;
            let run = pipeline::run(&loaded.dataset, &filters.criteria(&loaded.dataset));
            if run.view.is_empty() {
                println!("No data available for selected filters.");
                return Ok(());
            }
            print!("{}", report::render_rows(&run, limit));
        }
        Commands::Options => {
            let loaded = session.load().await?;
            print!("{}", report::render_options(&filter::options(&loaded.dataset)));
        }
        Commands::Report { filters, out } => {
            let loaded = session.load().await?;
            let criteria = filters.criteria(&loaded.dataset);
            let run = pipeline::run(&loaded.dataset, &criteria);
            let markdown = report::build_report(
                &session.source().describe(),
                &criteria,
                &run,
                loaded.warning,
            );
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch {
            filters,
            interval_secs,
        } => watch(&mut session, &filters, interval_secs).await?,
    }

    Ok(())
}

async fn watch(
    session: &mut Session<Source>,
    filters: &FilterArgs,
    interval_secs: u64,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            line = lines.next_line(), if stdin_open => match line? {
                Some(_) => session.refresh(),
                None => stdin_open = false,
            },
        }

        match session.load().await {
            Ok(loaded) => {
                let run = pipeline::run(&loaded.dataset, &filters.criteria(&loaded.dataset));
                println!(
                    "--- {} ---",
                    chrono::Local::now().format("%H:%M:%S")
                );
                print!("{}", report::render_summary(&run, loaded.warning, Some(10)));
            }
            Err(err) => log::error!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, Schema};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::new(
            Schema::default(),
            vec![
                Record::new(Some(day(9)), "A", "Done"),
                Record::new(Some(day(3)), "B", "Scheduled"),
                Record::new(None, "B", "Done"),
            ],
        )
    }

    fn all() -> Option<String> {
        Some("All".to_string())
    }

    #[test]
    fn all_values_leave_predicates_unset() {
        let args = FilterArgs {
            sdr: all(),
            status: all(),
            industry: all(),
            month: all(),
            week: all(),
            quarter: all(),
            ..FilterArgs::default()
        };
        let criteria = args.criteria(&dataset());
        assert!(criteria.equals.is_empty());
        assert_eq!(criteria.month, None);
        assert_eq!(criteria.week, None);
        assert_eq!(criteria.quarter, None);
        assert_eq!(criteria.date_range, DateRange::new(day(3), day(9)));
    }

    #[test]
    fn chosen_values_become_predicates() {
        let args = FilterArgs {
            sdr: Some("A".to_string()),
            week: Some("2".to_string()),
            quarter: Some("1".to_string()),
            ..FilterArgs::default()
        };
        let criteria = args.criteria(&dataset());
        assert_eq!(criteria.equals.get(&Dimension::Sdr).map(String::as_str), Some("A"));
        assert_eq!(criteria.week, Some(2));
        assert_eq!(criteria.quarter, Some(1));
    }

    #[test]
    fn partial_bounds_keep_the_dataset_span() {
        let args = FilterArgs {
            from: Some(day(5)),
            ..FilterArgs::default()
        };
        assert_eq!(
            args.criteria(&dataset()).date_range,
            DateRange::new(day(5), day(9))
        );

        let args = FilterArgs {
            to: Some(day(4)),
            ..FilterArgs::default()
        };
        assert_eq!(
            args.criteria(&dataset()).date_range,
            DateRange::new(day(3), day(4))
        );
    }

    #[test]
    fn undated_dataset_gets_an_empty_default_range() {
        let undated = Dataset::new(Schema::default(), vec![Record::new(None, "A", "Done")]);
        let criteria = FilterArgs::default().criteria(&undated);
        assert!(criteria.date_range.from > criteria.date_range.to);
        assert!(pipeline::run(&undated, &criteria).view.is_empty());
    }

    #[test]
    fn week_and_quarter_flags_accept_all_or_range() {
        let cli = Cli::try_parse_from([
            "demo-dashboard",
            "--csv",
            "data.csv",
            "summary",
            "--week",
            "All",
            "--quarter",
            "3",
        ])
        .unwrap();
        let Commands::Summary { filters, .. } = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(filters.week.as_deref(), Some("All"));
        assert_eq!(filters.quarter.as_deref(), Some("3"));

        assert!(week_value("53").is_ok());
        assert!(week_value("54").is_err());
        assert!(quarter_value("0").is_err());
        assert!(quarter_value("All").is_ok());
        assert!(Cli::try_parse_from(["demo-dashboard", "summary", "--quarter", "5"]).is_err());
    }
}
