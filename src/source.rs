use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FetchError;
use crate::ingest::RawTable;

/// Anything that can hand the pipeline a table of rows.
pub trait DataSource {
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<RawTable, FetchError>;
}

/// Published spreadsheet exported as CSV over HTTP.
#[derive(Debug, Clone)]
pub struct SheetSource {
    url: String,
    timeout: Duration,
}

impl SheetSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl DataSource for SheetSource {
    fn describe(&self) -> String {
        format!("sheet export {}", self.url)
    }

    async fn fetch(&self) -> Result<RawTable, FetchError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let resp = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(|e| self.classify(e))?;
        log::debug!("fetched {} bytes from {}", body.len(), self.url);
        Ok(read_csv(body.as_bytes())?)
    }
}

impl SheetSource {
    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::Http(err)
        }
    }
}

/// CSV file on local disk.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }

    async fn fetch(&self) -> Result<RawTable, FetchError> {
        let file = std::fs::File::open(&self.path)?;
        Ok(read_csv(file)?)
    }
}

/// Uploaded `.xlsx` workbook; the first worksheet is read, its first row
/// being the header.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for WorkbookSource {
    fn describe(&self) -> String {
        format!("workbook {}", self.path.display())
    }

    async fn fetch(&self) -> Result<RawTable, FetchError> {
        read_workbook(&self.path)
    }
}

/// The source picked on the command line.
#[derive(Debug, Clone)]
pub enum Source {
    Sheet(SheetSource),
    Csv(CsvFileSource),
    Workbook(WorkbookSource),
}

impl DataSource for Source {
    fn describe(&self) -> String {
        match self {
            Source::Sheet(source) => source.describe(),
            Source::Csv(source) => source.describe(),
            Source::Workbook(source) => source.describe(),
        }
    }

    async fn fetch(&self) -> Result<RawTable, FetchError> {
        match self {
            Source::Sheet(source) => source.fetch().await,
            Source::Csv(source) => source.fetch().await,
            Source::Workbook(source) => source.fetch().await,
        }
    }
}

pub fn read_csv<R: io::Read>(input: R) -> Result<RawTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

fn read_workbook(path: &Path) -> Result<RawTable, FetchError> {
    use calamine::{open_workbook_auto, Reader};

    let workbook_error = |e: calamine::Error| FetchError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(FetchError::EmptyWorkbook(path.to_path_buf()));
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(workbook_error)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };

    Ok(RawTable::new(
        header.iter().map(cell_to_string).collect(),
        rows.map(|row| row.iter().map(cell_to_string).collect())
            .collect(),
    ))
}

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_keeps_headers_and_ragged_rows() {
        let text = "Date,SDR,Status\n2024-01-05,A,Done\n2024-01-06,B\n";
        let table = read_csv(text.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Date", "SDR", "Status"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["2024-01-06", "B"]);
    }

    #[test]
    fn csv_handles_quoted_fields() {
        let text = "Date,SDR,Remarks\n2024-01-05,A,\"said \"\"yes\"\", then left\"\n";
        let table = read_csv(text.as_bytes()).unwrap();
        assert_eq!(table.rows[0][2], "said \"yes\", then left");
    }

    #[tokio::test]
    async fn csv_file_source_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,SDR,Status").unwrap();
        writeln!(file, "2024-01-05,A,Done").unwrap();

        let source = CsvFileSource::new(file.path());
        let table = source.fetch().await.unwrap();
        assert_eq!(table.rows, vec![vec!["2024-01-05", "A", "Done"]]);
        assert!(source.describe().starts_with("CSV file"));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let source = Source::Csv(CsvFileSource::new("/nonexistent/data.csv"));
        assert!(matches!(source.fetch().await, Err(FetchError::Io(_))));
    }

    #[tokio::test]
    async fn unreadable_workbook_is_a_fetch_error() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(file, "not a workbook").unwrap();
        let source = WorkbookSource::new(file.path());
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Workbook { .. })
        ));
    }

    #[test]
    fn workbook_cells_render_as_text() {
        use calamine::Data;
        assert_eq!(cell_to_string(&Data::Float(50.0)), "50");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("Done".into())), "Done");
    }
}
