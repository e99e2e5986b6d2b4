//! Loading collaborators: the SQLite sales ledger and the delimited processor
//! report.
//!
//! Both loaders materialize the whole source into a [`RecordSet`] and release
//! their connection or file handle before returning.

use crate::amount::Amount;
use crate::error::{ReconError, Result};
use crate::record::{RecordSet, Value};
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads every row of `table` from the SQLite database at `path`.
///
/// The database is opened read-only, so a missing file is reported instead of
/// silently creating an empty ledger.
pub fn load_ledger(path: &Path, table: &str) -> Result<RecordSet> {
    let unavailable = |source: rusqlite::Error| ReconError::LedgerUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(unavailable)?;

    let records = read_table(&conn, table).map_err(|e| match e {
        ReconError::Sqlite(source) => unavailable(source),
        other => other,
    })?;
    drop(conn);

    info!(
        "Loaded {} ledger records from {}:{}",
        records.len(),
        path.display(),
        table
    );
    Ok(records)
}

/// Reads all rows of one table from an open connection.
pub fn read_table(conn: &Connection, table: &str) -> Result<RecordSet> {
    let sql = format!("SELECT * FROM {}", quote_identifier(table));
    debug!("Ledger query: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();
    let mut records = RecordSet::new(columns);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(sql_value(row.get_ref(idx)?));
        }
        records.push(values)?;
    }

    Ok(records)
}

/// Reads the processor report at `path`, using its header row for field names.
pub fn load_report(path: &Path, delimiter: u8) -> Result<RecordSet> {
    let unavailable = |source: csv::Error| ReconError::ReportUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| unavailable(csv::Error::from(e)))?;
    let records = read_report(file, delimiter).map_err(|e| match e {
        ReconError::Csv(source) => unavailable(source),
        other => other,
    })?;

    info!(
        "Loaded {} report records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parses delimited text with a header row. Cells are trimmed; empty cells
/// become `Null` and everything else stays text, so identifiers such as
/// `007` keep their exact spelling. Amount fields are typed by the Normalizer.
pub fn read_report<R: Read>(reader: R, delimiter: u8) -> Result<RecordSet> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut records = RecordSet::new(columns);

    for result in csv_reader.records() {
        let record = result?;
        records.push(record.iter().map(Value::from_cell).collect())?;
    }

    Ok(records)
}

fn sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(Amount::from(i)),
        ValueRef::Real(f) => match Amount::from_f64(f) {
            Some(amount) => Value::Number(amount),
            None => Value::Text(f.to_string()),
        },
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Quotes an SQL identifier so a configured table name cannot inject SQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
