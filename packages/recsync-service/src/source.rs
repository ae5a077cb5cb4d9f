//! Header-keyed loading of delimited source files.

use std::{io::Read, path::Path};

use csv::{ReaderBuilder, Trim};
use serde_json::Value;

use crate::{Error, Result};
use recsync_domain::RawRow;

/// Reads every record of `path` as a raw row keyed by the header line. Cells stay strings; typing
/// is left to the normaliser. Short records simply lack their trailing keys.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
	let reader = builder()
		.from_path(path)
		.map_err(|err| Error::ReadSource { path: path.to_path_buf(), source: err })?;
	let rows = collect_rows(reader)
		.map_err(|err| Error::ReadSource { path: path.to_path_buf(), source: err })?;

	tracing::info!(path = %path.display(), rows = rows.len(), "Loaded source file.");

	Ok(rows)
}

pub fn parse_rows(text: &str) -> Result<Vec<RawRow>, csv::Error> {
	collect_rows(builder().from_reader(text.as_bytes()))
}

fn builder() -> ReaderBuilder {
	let mut builder = ReaderBuilder::new();

	builder.flexible(true).trim(Trim::Headers);

	builder
}

fn collect_rows<R>(mut reader: csv::Reader<R>) -> Result<Vec<RawRow>, csv::Error>
where
	R: Read,
{
	let headers = reader.headers()?.clone();
	let mut rows = Vec::new();

	for record in reader.records() {
		let record = record?;

		rows.push(
			headers
				.iter()
				.zip(record.iter())
				.map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
				.collect(),
		);
	}

	Ok(rows)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keys_cells_by_header() {
		let rows = parse_rows("movieId,title,genres\n1,\"Toy Story, The (1995)\",Animation\n")
			.expect("Parse failed.");

		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].get("movieId"), Some(&Value::String("1".to_string())));
		assert_eq!(rows[0].get("title"), Some(&Value::String("Toy Story, The (1995)".to_string())));
	}

	#[test]
	fn short_records_lack_trailing_keys() {
		let rows = parse_rows("userId,movieId,rating,timestamp\n1,2,3.5\n").expect("Parse failed.");

		assert_eq!(rows[0].len(), 3);
		assert!(!rows[0].contains_key("timestamp"));
	}
}
