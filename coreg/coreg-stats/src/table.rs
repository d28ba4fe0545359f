use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A comma separated table with a header row, kept as text.
///
/// Cells are written back exactly as read so columns this crate does not
/// know about survive a rewrite.
#[derive(Debug, Clone)]
pub struct StatsTable {
    path: PathBuf,
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl StatsTable {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let csv_err = |source| Error::Csv {
            path: path.clone(),
            source,
        };
        let mut rdr = csv::Reader::from_path(&path).map_err(csv_err)?;
        let headers = rdr.headers().map_err(csv_err)?.clone();
        let rows = rdr
            .into_records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_err)?;
        Ok(Self {
            path,
            headers,
            rows,
        })
    }

    /// Write the table to `path`.
    ///
    /// The content goes to a scratch file in the same directory which then
    /// replaces `path`, so a failed write leaves the previous file intact.
    /// An existing file keeps its permissions.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let csv_err = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let scratch = tempfile::Builder::new()
            .prefix(".stats")
            .suffix(".csv")
            .tempfile_in(dir)
            .map_err(io_err)?;
        {
            let mut wtr = csv::Writer::from_writer(scratch.as_file());
            wtr.write_record(&self.headers).map_err(csv_err)?;
            for row in self.rows.iter() {
                wtr.write_record(row).map_err(csv_err)?;
            }
            wtr.flush().map_err(io_err)?;
        }
        if let Ok(meta) = std::fs::metadata(path) {
            scratch
                .as_file()
                .set_permissions(meta.permissions())
                .map_err(io_err)?;
        }
        scratch.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn parse_column(&self, col: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|r| r.get(col).and_then(|c| c.trim().parse().ok()))
            .collect()
    }

    /// Values of column `name`; cells which are not numbers become `None`.
    pub fn real_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.column_index(name).ok_or_else(|| Error::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })?;
        Ok(self.parse_column(col))
    }

    /// As [Self::real_column] but `None` if the column does not exist.
    pub fn optional_real_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column_index(name).map(|col| self.parse_column(col))
    }

    /// Set column `name` to `value(row)` for every row, appending the column
    /// if it does not exist yet.
    pub fn set_column<F: Fn(usize) -> String>(&mut self, name: &str, value: F) {
        match self.column_index(name) {
            Some(col) => {
                for (i, row) in self.rows.iter_mut().enumerate() {
                    let new_value = value(i);
                    let fields: Vec<&str> = row
                        .iter()
                        .enumerate()
                        .map(|(j, f)| if j == col { new_value.as_str() } else { f })
                        .collect();
                    *row = csv::StringRecord::from(fields);
                }
            }
            None => {
                self.headers.push_field(name);
                for (i, row) in self.rows.iter_mut().enumerate() {
                    row.push_field(&value(i));
                }
            }
        }
    }
}
