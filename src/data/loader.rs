use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::raw::{ColumnSchema, RawTable, RawTrade};

/// Read a journal CSV file into an unparsed table.
pub fn load_csv(path: &Path) -> Result<RawTable, AppError> {
    if !path.exists() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }
    let file = File::open(path)
        .map_err(|e| AppError::FileRead(format!("{}: {}", path.display(), e)))?;
    let table = read_csv(file)?;
    info!("Read {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Read journal CSV from any reader. The header row decides the schema.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let schema = ColumnSchema::from_headers(headers.iter());
    if schema.has_order_id {
        debug!("Ignoring Order ID column");
    }

    let rows = rdr
        .deserialize::<RawTrade>()
        .enumerate()
        .map(|(i, record)| {
            record.map_err(|e| AppError::InvalidCsvFormat(format!("row {}: {}", i + 1, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawTable::new(schema, rows))
}
