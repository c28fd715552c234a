//! CSV table I/O
//!
//! Every persisted table is UTF-8, comma-delimited CSV with a header row and
//! empty cells for missing values. Columns are looked up by header name so
//! that absent columns read as missing instead of failing the whole file, and
//! output column sets are tracked explicitly by [`Schema`].

use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::models::TrackColumn;
use crate::{Error, Result};

/// Header row of an input table: column name to field position
#[derive(Debug, Clone, Default)]
pub struct Header {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Header {
    pub fn from_record(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|n| n.trim().to_string()).collect();
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            // Duplicate header names resolve to the first occurrence
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Known track columns present in this header, in header order
    pub fn schema(&self) -> Schema {
        Schema::new(self.names.iter().filter_map(|n| TrackColumn::from_name(n)).collect())
    }
}

/// Read-only view of one data row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    header: &'a Header,
    record: &'a StringRecord,
}

impl<'a> RowView<'a> {
    pub fn new(header: &'a Header, record: &'a StringRecord) -> Self {
        Self { header, record }
    }

    /// Cell text; `None` when the column is absent or the cell is blank
    pub fn text(&self, name: &str) -> Option<&'a str> {
        let value = self.record.get(self.header.position(name)?)?;
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn owned_text(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }

    /// Cell parsed as a number; unparseable, NaN and infinite cells read as
    /// missing
    pub fn number(&self, name: &str) -> Option<f64> {
        self.text(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// Ordered set of track columns present in a table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<TrackColumn>,
}

impl Schema {
    pub fn new(columns: Vec<TrackColumn>) -> Self {
        let mut unique = Vec::with_capacity(columns.len());
        for c in columns {
            if !unique.contains(&c) {
                unique.push(c);
            }
        }
        Self { columns: unique }
    }

    pub fn columns(&self) -> &[TrackColumn] {
        &self.columns
    }

    pub fn contains(&self, column: TrackColumn) -> bool {
        self.columns.contains(&column)
    }

    /// Columns of `wanted` that are present, in `wanted` order
    pub fn intersect(&self, wanted: &[TrackColumn]) -> Schema {
        Schema::new(wanted.iter().copied().filter(|c| self.contains(*c)).collect())
    }

    /// This schema with `column` appended when absent
    pub fn with(mut self, column: TrackColumn) -> Schema {
        if !self.contains(column) {
            self.columns.push(column);
        }
        self
    }

    pub fn header_record(&self) -> StringRecord {
        self.columns.iter().map(|c| c.name()).collect()
    }
}

/// A record that can be written under any [`Schema`]
pub trait TableRow {
    /// Cell text for `column`; `None` writes an empty cell
    fn cell(&self, column: TrackColumn) -> Option<String>;

    fn to_record(&self, schema: &Schema) -> StringRecord {
        schema
            .columns()
            .iter()
            .map(|c| self.cell(*c).unwrap_or_default())
            .collect()
    }
}

/// Format a number for output: integral values without a fractional part
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn format_opt_number(value: Option<f64>) -> Option<String> {
    value.map(format_number)
}

/// Open a CSV file for streaming reads
///
/// Fails with [`Error::MissingInput`] when the file does not exist.
pub fn open_reader(path: &Path) -> Result<(csv::Reader<File>, Header)> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let header = Header::from_record(reader.headers()?);
    Ok((reader, header))
}

/// Only the header row of a CSV file
pub fn read_header(path: &Path) -> Result<Header> {
    open_reader(path).map(|(_, header)| header)
}

/// Read a whole table, converting each row with `convert`
///
/// Rows for which `convert` returns `None` are skipped. Records that fail to
/// decode (e.g. invalid UTF-8) are skipped with a warning.
pub fn read_rows<T>(path: &Path, convert: impl Fn(RowView<'_>) -> Option<T>) -> Result<(Header, Vec<T>)> {
    let (mut reader, header) = open_reader(path)?;
    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                if let Some(row) = convert(RowView::new(&header, &record)) {
                    rows.push(row);
                }
            }
            Ok(false) => break,
            Err(e) if is_record_error(&e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable row");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok((header, rows))
}

/// Row-level decode errors are recoverable; I/O errors are not
pub fn is_record_error(e: &csv::Error) -> bool {
    !matches!(e.kind(), csv::ErrorKind::Io(_))
}

/// Streaming writer that writes the header once and rows after it
pub struct TableWriter {
    writer: Writer<File>,
    schema: Schema,
    rows: usize,
}

impl TableWriter {
    /// Create (truncate) `path` and write the header row
    pub fn create(path: &Path, schema: Schema) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(&schema.header_record())?;
        Ok(Self {
            writer,
            schema,
            rows: 0,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn write_row(&mut self, row: &impl TableRow) -> Result<()> {
        self.writer.write_record(&row.to_record(&self.schema))?;
        self.rows += 1;
        Ok(())
    }

    /// Push buffered rows to disk so readers see every completed chunk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a full table to a temporary sibling, then rename it over `path`
pub fn write_table<'a, R: TableRow + 'a>(
    path: &Path,
    schema: &Schema,
    rows: impl IntoIterator<Item = &'a R>,
) -> Result<usize> {
    let tmp = temp_sibling(path);
    let mut writer = TableWriter::create(&tmp, schema.clone())?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.flush()?;
    let written = writer.rows_written();
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(written)
}

/// `<file>.tmp` next to `path`
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(&'static str, Option<f64>);

    impl TableRow for Pair {
        fn cell(&self, column: TrackColumn) -> Option<String> {
            match column {
                TrackColumn::TrackName => Some(self.0.to_string()),
                TrackColumn::Energy => format_opt_number(self.1),
                _ => None,
            }
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_schema_intersect_keeps_wanted_order() {
        let schema = Schema::new(vec![TrackColumn::Energy, TrackColumn::TrackName, TrackColumn::Uri]);
        let narrowed = schema.intersect(&[TrackColumn::TrackName, TrackColumn::Mood, TrackColumn::Energy]);
        assert_eq!(narrowed.columns(), &[TrackColumn::TrackName, TrackColumn::Energy]);
    }

    #[test]
    fn test_write_then_read_with_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let schema = Schema::new(vec![TrackColumn::TrackName, TrackColumn::Energy]);
        let rows = vec![Pair("a, b", Some(0.5)), Pair("c", None)];
        assert_eq!(write_table(&path, &schema, &rows).unwrap(), 2);
        assert!(!temp_sibling(&path).exists());

        let (header, read) = read_rows(&path, |row| {
            Some((row.owned_text("track_name"), row.number("energy"), row.owned_text("missing")))
        })
        .unwrap();
        assert_eq!(header.names(), &["track_name".to_string(), "energy".to_string()]);
        assert_eq!(read[0], (Some("a, b".to_string()), Some(0.5), None));
        assert_eq!(read[1], (Some("c".to_string()), None, None));
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = read_header(Path::new("/nonexistent/mtune/x.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[test]
    fn test_number_rejects_garbage_and_non_finite() {
        let header = Header::from_record(&StringRecord::from(vec!["a", "b", "c", "d", "e"]));
        let record = StringRecord::from(vec!["abc", "nan", " 1.5 ", "inf", "-Infinity"]);
        let row = RowView::new(&header, &record);
        assert_eq!(row.number("a"), None);
        assert_eq!(row.number("b"), None);
        assert_eq!(row.number("c"), Some(1.5));
        assert_eq!(row.number("d"), None);
        assert_eq!(row.number("e"), None);
    }
}
