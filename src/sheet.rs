//! CSV-backed spreadsheets.
//!
//! A sheet id is a path relative to the drive root. Rows are read and
//! appended as plain string records; the first row is the header.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::drive::resolve_id;
use crate::error::{Result, TransflowError};

#[derive(Debug, Clone)]
pub struct Sheet {
    path: PathBuf,
}

impl Sheet {
    /// Resolve a sheet id under `root`; ids escaping the root are rejected
    pub fn open(root: &Path, sheet_id: &str) -> Result<Self> {
        Ok(Self { path: resolve_id(root, sheet_id)? })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row, header included
    pub fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.is_file() {
            return Err(TransflowError::FileNotFound(self.path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }
        Ok(rows)
    }

    /// Read rows after the header
    pub fn data_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.read_rows()?.into_iter().skip(1).collect())
    }

    /// Append one row, writing `header` first when the sheet is empty
    pub fn append_row(&self, header: &[String], row: &[String]) -> Result<()> {
        let parent_missing = self
            .path
            .parent()
            .map(|parent| !parent.as_os_str().is_empty() && !parent.is_dir())
            .unwrap_or(false);
        if parent_missing {
            return Err(TransflowError::FileNotFound(self.path.display().to_string()));
        }

        let is_empty = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        // A hand-edited sheet may lack the final line break
        if !is_empty && !ends_with_newline(&self.path)? {
            file.write_all(b"\n")?;
        }
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

        if is_empty {
            writer.write_record(header)?;
        }
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = Sheet::open(dir.path(), "log.csv").unwrap();
        let header = strings(&["Name", "Words"]);

        sheet.append_row(&header, &strings(&["First, with comma", "3"])).unwrap();
        sheet.append_row(&header, &strings(&["Second", "5"])).unwrap();

        let rows = sheet.read_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header);
        assert_eq!(rows[1], strings(&["First, with comma", "3"]));
        assert_eq!(sheet.data_rows().unwrap().len(), 2);
    }

    #[test]
    fn unreachable_sheet_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = Sheet::open(dir.path(), "missing/log.csv").unwrap();

        assert!(sheet.append_row(&strings(&["A"]), &strings(&["1"])).is_err());
        assert!(matches!(sheet.read_rows(), Err(TransflowError::FileNotFound(_))));
    }

    #[test]
    fn append_after_header_without_line_break() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("log.csv"), "Name,Words").unwrap();
        let sheet = Sheet::open(dir.path(), "log.csv").unwrap();

        sheet.append_row(&strings(&["Name", "Words"]), &strings(&["Test1", "1"])).unwrap();
        sheet.append_row(&strings(&["Name", "Words"]), &strings(&["Test2", "4"])).unwrap();

        let rows = sheet.read_rows().unwrap();
        assert_eq!(
            rows,
            vec![strings(&["Name", "Words"]), strings(&["Test1", "1"]), strings(&["Test2", "4"])]
        );
    }

    #[test]
    fn sheet_ids_stay_under_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Sheet::open(dir.path(), "../outside.csv"), Err(TransflowError::Drive(_))));
        assert!(Sheet::open(dir.path(), "/etc/passwd").is_err());
        assert!(Sheet::open(dir.path(), "Tracking/log.csv").is_ok());
    }
}
