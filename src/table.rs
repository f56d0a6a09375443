use std::io::{Read, Write};

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::ProcessingError;

/// One pass over a delimited table whose first record is the header row.
///
/// Each record is deserialized by column name into `T` and handed to
/// `accept`; records it accepts are echoed to `echo` when one is given.
/// Returns the number of accepted records.
pub fn filter_table<T, R, F>(
    table: &str,
    source: R,
    echo: Option<&mut dyn Write>,
    mut accept: F,
) -> Result<usize, ProcessingError>
where
    T: DeserializeOwned,
    R: Read,
    F: FnMut(T) -> Result<bool, ProcessingError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);
    let headers = reader
        .headers()
        .map_err(|source| ProcessingError::csv(table, source))?
        .clone();
    let mut echo = echo.map(|writer| {
        csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(writer)
    });

    let (mut seen, mut accepted) = (0usize, 0usize);
    for record in reader.records() {
        let record = record.map_err(|source| ProcessingError::csv(table, source))?;
        seen += 1;

        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|source| ProcessingError::csv(table, source))?;
        if !accept(row)? {
            continue;
        }
        accepted += 1;

        if let Some(writer) = echo.as_mut() {
            writer
                .write_record(&record)
                .map_err(|source| ProcessingError::csv(table, source))?;
        }
    }

    if let Some(mut writer) = echo {
        writer
            .flush()
            .map_err(|source| ProcessingError::EchoError {
                table: table.to_owned(),
                source,
            })?;
    }

    debug!("{table}: accepted {accepted} of {seen} rows");
    Ok(accepted)
}
