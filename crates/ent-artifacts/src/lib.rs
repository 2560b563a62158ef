use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use ent_reconcile::{export_to, EnterpriseLearner, RowSink};

const EXPORT_FILE_PREFIX: &str = "missing_enterprise_course_enrollments";

/// `missing_enterprise_course_enrollments_<YYYYMMDDHHMM>.csv`, `at` in local time.
pub fn export_file_name(at: NaiveDateTime) -> String {
    format!("{EXPORT_FILE_PREFIX}_{}.csv", at.format("%Y%m%d%H%M"))
}

// ---------------------------------------------------------------------------
// CSV sink
// ---------------------------------------------------------------------------

/// [`RowSink`] over a `csv::Writer`. Call [`CsvReportWriter::finish`] to flush.
pub struct CsvReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl CsvReportWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("create export csv failed: {}", path.display()))?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvReportWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            inner: csv::Writer::from_writer(writer),
        }
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().context("flush export csv failed")?;
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("finalize export csv failed: {}", e.error()))
    }
}

impl<W: Write> RowSink for CsvReportWriter<W> {
    type Error = csv::Error;

    fn write_header(&mut self, header: &[&str]) -> Result<(), Self::Error> {
        self.inner.write_record(header)
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), Self::Error> {
        self.inner.write_record(row)
    }
}

pub struct WriteReportArgs<'a, I> {
    pub exports_root: &'a Path, // e.g. ../exports
    /// Local wall-clock time the run started; names the file.
    pub started_at: NaiveDateTime,
    pub exclude_incidental: bool,
    pub learners: I,
}

#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub export_csv_path: PathBuf,
    pub rows: usize,
}

/// Write `<exports_root>/missing_enterprise_course_enrollments_<YYYYMMDDHHMM>.csv`.
///
/// The CSV is the only file a run leaves behind. A second run in the same
/// minute overwrites the first.
pub fn write_report<'l, I>(args: WriteReportArgs<'_, I>) -> Result<WrittenReport>
where
    I: IntoIterator<Item = &'l EnterpriseLearner>,
{
    fs::create_dir_all(args.exports_root).with_context(|| {
        format!("create exports dir failed: {}", args.exports_root.display())
    })?;

    let export_csv_path = args.exports_root.join(export_file_name(args.started_at));
    let mut writer = CsvReportWriter::create(&export_csv_path)?;
    let rows = export_to(&mut writer, args.learners, args.exclude_incidental)
        .with_context(|| format!("write export csv failed: {}", export_csv_path.display()))?;
    writer.finish()?;

    Ok(WrittenReport {
        export_csv_path,
        rows,
    })
}
