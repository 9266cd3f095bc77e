use chrono::Utc;
use csv::Writer;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::database::{Database, TableData, TableName};
use crate::error::Result;

/// `<table>_<timestamp>.csv`, or `<table>_<timestamp>_<n>.csv` for the n-th
/// export that lands in the same second.
pub fn export_file_name(table: TableName, timestamp: &str, attempt: usize) -> String {
    if attempt == 0 {
        format!("{}_{}.csv", table, timestamp)
    } else {
        format!("{}_{}_{}.csv", table, timestamp, attempt)
    }
}

/// Writes `data` as CSV (header row first).
pub fn write_table_csv<W: Write>(data: &TableData, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(&data.columns)?;
    for row in &data.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Creates the export file without ever replacing an existing one.
fn create_export_file(dir: &Path, table: TableName, timestamp: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let path = dir.join(export_file_name(table, timestamp, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Exports one table to `<dir>/<table>_<YYYYmmdd_HHMMSS>.csv`.
pub async fn export_table(db: &Database, table: TableName, dir: &Path) -> Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    export_table_at(db, table, dir, &timestamp).await
}

async fn export_table_at(
    db: &Database,
    table: TableName,
    dir: &Path,
    timestamp: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let data = db.fetch_table(table).await?;
    let (path, file) = create_export_file(dir, table, timestamp)?;
    write_table_csv(&data, file)?;
    log::info!("exported {} rows of {} to {}", data.rows.len(), table, path.display());
    Ok(path)
}

/// Exports every table with a shared timestamp.
pub async fn export_all(db: &Database, dir: &Path) -> Result<Vec<PathBuf>> {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let mut paths = Vec::with_capacity(TableName::ALL.len());
    for table in TableName::ALL {
        paths.push(export_table_at(db, table, dir, &timestamp).await?);
    }
    Ok(paths)
}
