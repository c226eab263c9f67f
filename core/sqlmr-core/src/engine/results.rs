//! Reading and rendering query results
//!
//! Output rows are untyped text, so the Arrow view is all-Utf8 with
//! positional column names.

use crate::error::SqlmrResult;
use crate::mapreduce::reducer_files;
use crate::record::Record;
use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Every record of every reducer file in `dir`, file by file.
pub fn read_results(dir: &Path, separator: &str) -> SqlmrResult<Vec<Record>> {
    let mut records = Vec::new();
    for file in reducer_files(dir)? {
        let reader = BufReader::new(File::open(&file)?);
        for line in reader.lines() {
            records.push(Record::parse_exact(&line?, separator));
        }
    }
    Ok(records)
}

/// Header of the n-th (0-based) result column.
pub fn column_name(index: usize) -> String {
    format!("column_{}", index + 1)
}

/// Records → one Utf8 batch. Short rows are padded with nulls.
pub fn records_to_batch(records: &[Record]) -> SqlmrResult<RecordBatch> {
    let width = records.iter().map(Record::len).max().unwrap_or(0);
    let schema = Arc::new(Schema::new(
        (0..width)
            .map(|i| Field::new(column_name(i), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    if width == 0 {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut builders: Vec<StringBuilder> = (0..width)
        .map(|_| StringBuilder::with_capacity(records.len(), records.len() * 8))
        .collect();
    for record in records {
        for (i, builder) in builders.iter_mut().enumerate() {
            match record.fields().get(i) {
                Some(value) => builder.append_value(value),
                None => builder.append_null(),
            }
        }
    }
    let columns: Vec<ArrayRef> = builders
        .into_iter()
        .map(|mut b| Arc::new(b.finish()) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Pretty table of `records`, or a note when there are none.
pub fn format_records(records: &[Record]) -> SqlmrResult<String> {
    if records.is_empty() {
        return Ok("(0 rows)".to_string());
    }
    let batch = records_to_batch(records)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}
