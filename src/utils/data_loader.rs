//! CSV loading and prediction export

use crate::error::{ExoSeekerError, Result};
use crate::schema::{Disposition, LABEL_COLUMN};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// CSV data loader for catalog tables. Schema inference scans every row, so a
/// column whose first values are blank is still typed from its later ones.
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a CSV file with a header row
    pub fn load_csv_path(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let start = Instant::now();
        let file = File::open(path.as_ref())?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(file)
            .finish()?;

        debug!(
            path = %path.as_ref().display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a CSV table held in memory, e.g. an uploaded file
    pub fn load_csv_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<DataFrame> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ExoSeekerError::EmptyDataset("uploaded file is empty".to_string()));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        debug!(rows = df.height(), cols = df.width(), "Loaded CSV from memory");
        Ok(df)
    }

    /// Write predicted labels to disk as `predictions.csv`-style output
    pub fn save_predictions(path: impl AsRef<Path>, labels: &[Disposition]) -> Result<()> {
        let bytes = write_predictions_csv(labels)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Render predicted labels as a single-column CSV with no index
pub fn write_predictions_csv(labels: &[Disposition]) -> Result<Vec<u8>> {
    let values: Vec<&str> = labels.iter().map(Disposition::as_str).collect();
    let mut df = DataFrame::new(vec![Column::new(LABEL_COLUMN.into(), values)])?;

    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "kepid,koi_period,koi_tce_delivname").unwrap();
        writeln!(file, "1,2.5,q1_q17_dr25_tce").unwrap();
        writeln!(file, "2,,q1_q17_dr25_tce").unwrap();
        writeln!(file, "3,7.25,").unwrap();
        file
    }

    #[test]
    fn test_load_csv_path() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv_path(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("koi_period").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_bytes() {
        let bytes = b"a,b\n1,2\n3,4\n".to_vec();
        let df = DataLoader::new().load_csv_bytes(bytes).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DataLoader::new()
            .load_csv_path("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, ExoSeekerError::Io(_)));
    }

    #[test]
    fn test_empty_upload() {
        let err = DataLoader::new().load_csv_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, ExoSeekerError::EmptyDataset(_)));
    }

    #[test]
    fn test_write_predictions_csv() {
        let labels = vec![Disposition::Confirmed, Disposition::Candidate];
        let bytes = write_predictions_csv(&labels).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["koi_disposition", "CONFIRMED", "CANDIDATE"]);
    }

    #[test]
    fn test_save_predictions() {
        let file = NamedTempFile::new().unwrap();
        DataLoader::save_predictions(file.path(), &[Disposition::Confirmed]).unwrap();

        let loaded = DataLoader::new().load_csv_path(file.path()).unwrap();
        assert_eq!(loaded.height(), 1);
        assert_eq!(loaded.get_column_names()[0].as_str(), LABEL_COLUMN);
    }
}
