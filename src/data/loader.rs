use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};

use super::format::TextFormat;
use super::model::{Table, TableBuilder};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub format: TextFormat,
    /// Rows buffered before they are flushed into the table. `0` reads the
    /// file in a single pass.
    pub chunk_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: TextFormat::default(),
            chunk_rows: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a delimited shipment file into a [`Table`].
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    load_table_with_progress(path, options, |_| {})
}

/// Like [`load_table`], calling `on_chunk` with the running row count after
/// every flushed chunk.
pub fn load_table_with_progress(
    path: &Path,
    options: &LoadOptions,
    on_chunk: impl FnMut(usize),
) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = load_from_reader(BufReader::new(file), options, on_chunk)?;
    log::info!(
        "Loaded {} rows, columns {:?} from {}",
        table.len(),
        table.headers(),
        path.display()
    );
    Ok(table)
}

/// Parse delimited data from any reader.
///
/// Layout: a header row naming at least the recognised columns, then one
/// shipment per line. Fields are decoded with `options.format.encoding`.
pub fn load_from_reader<R: Read>(
    reader: R,
    options: &LoadOptions,
    mut on_chunk: impl FnMut(usize),
) -> Result<Table, LoadError> {
    let format = options.format;
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let raw_headers = reader.byte_headers().map_err(csv_error)?.clone();
    let headers = decode_record(&raw_headers, None, options)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut builder = TableBuilder::new(headers)?;

    let chunk_rows = options.chunk_rows;
    let mut pending: Vec<(u64, ByteRecord)> = Vec::with_capacity(chunk_rows);
    let mut record = ByteRecord::new();

    loop {
        let more = reader.read_byte_record(&mut record).map_err(csv_error)?;
        if !more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if chunk_rows == 0 {
            push_record(&mut builder, &record, line, options)?;
            continue;
        }
        pending.push((line, record.clone()));
        if pending.len() == chunk_rows {
            flush(&mut builder, &mut pending, options)?;
            log::debug!("Loaded chunk, {} rows so far", builder.len());
            on_chunk(builder.len());
        }
    }

    if !pending.is_empty() {
        flush(&mut builder, &mut pending, options)?;
    }
    on_chunk(builder.len());
    Ok(builder.finish())
}

// -- helpers --

fn flush(
    builder: &mut TableBuilder,
    pending: &mut Vec<(u64, ByteRecord)>,
    options: &LoadOptions,
) -> Result<(), LoadError> {
    for (line, record) in pending.drain(..) {
        push_record(builder, &record, line, options)?;
    }
    Ok(())
}

fn push_record(
    builder: &mut TableBuilder,
    record: &ByteRecord,
    line: u64,
    options: &LoadOptions,
) -> Result<(), LoadError> {
    let fields = decode_record(record, Some((line, builder.headers())), options)?;
    builder.push_row(fields.as_slice(), line)
}

/// Decode every field of a raw record. `context` carries the line number and
/// headers used to name the offending column.
fn decode_record(
    record: &ByteRecord,
    context: Option<(u64, &[String])>,
    options: &LoadOptions,
) -> Result<Vec<String>, LoadError> {
    let encoding = options.format.encoding;
    record
        .iter()
        .enumerate()
        .map(|(i, field)| {
            encoding.decode(field).ok_or_else(|| {
                let (line, column) = match context {
                    Some((line, headers)) => (
                        line,
                        headers
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| format!("#{}", i + 1)),
                    ),
                    None => (1, format!("header #{}", i + 1)),
                };
                LoadError::Encoding {
                    line,
                    column,
                    encoding: encoding.name(),
                }
            })
        })
        .collect()
}

fn csv_error(source: csv::Error) -> LoadError {
    let line = source.position().map(|p| p.line());
    LoadError::Csv { line, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::format::TextEncoding;
    use crate::data::model::{Dimension, Value};

    /// Header + rows, encoded as Latin-1 like the published files.
    fn latin1(text: &str) -> Vec<u8> {
        TextEncoding::Latin1.encode(text).unwrap()
    }

    const SAMPLE: &str = "Ano;Mês;Descrição do Produto;UF de Origem;UF do Destinatário;Região do Destinatário;Volume(L)\n\
        2022;1;ÓLEO LUBRIFICANTE;SP;RJ;SUDESTE;100\n\
        2022;2;GRAXA;SP;BA;NORDESTE;50,5\n\
        2023;1;ÓLEO LUBRIFICANTE;PR;SC;SUL;30\n\
        2023;12;GRAXA;RJ;SP;SUDESTE;0\n";

    #[test]
    fn loads_latin1_file() {
        let table = load_from_reader(&latin1(SAMPLE)[..], &LoadOptions::default(), |_| {}).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.volumes(), &[100.0, 50.5, 30.0, 0.0]);
        let rec = table.record(0);
        assert_eq!(rec.product_description, Value::text("ÓLEO LUBRIFICANTE"));
        assert_eq!(rec.year, Value::Integer(2022));
        let years: Vec<_> = table.available_values(Dimension::Year).into_iter().collect();
        assert_eq!(years, vec![Value::Integer(2022), Value::Integer(2023)]);
    }

    #[test]
    fn chunked_read_matches_single_pass() {
        let bytes = latin1(SAMPLE);
        let single = load_from_reader(&bytes[..], &LoadOptions::default(), |_| {}).unwrap();
        for chunk_rows in [1, 3, 4, 100] {
            let mut reports = Vec::new();
            let options = LoadOptions {
                chunk_rows,
                ..LoadOptions::default()
            };
            let chunked = load_from_reader(&bytes[..], &options, |n| reports.push(n)).unwrap();
            assert_eq!(chunked, single, "chunk_rows = {chunk_rows}");
            assert_eq!(reports.last(), Some(&4));
            assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn header_mismatch_is_a_load_error() {
        let text = "Ano;Mes;Produto;Volume\n2022;1;X;1\n";
        let err = load_from_reader(text.as_bytes(), &LoadOptions::default(), |_| {}).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumns { .. }), "{err}");
    }

    #[test]
    fn utf8_bytes_in_latin1_file_still_decode_but_do_not_match_headers() {
        // A UTF-8 encoded header read as Latin-1 yields mojibake column names.
        let err = load_from_reader(SAMPLE.as_bytes(), &LoadOptions::default(), |_| {}).unwrap_err();
        match err {
            LoadError::MissingColumns { missing } => {
                assert!(missing.contains(&"Mês".to_string()));
                assert!(!missing.contains(&"Ano".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn utf8_encoding_rejects_latin1_bytes() {
        let options = LoadOptions {
            format: TextFormat {
                encoding: TextEncoding::Utf8,
                ..TextFormat::default()
            },
            chunk_rows: 0,
        };
        let err = load_from_reader(&latin1(SAMPLE)[..], &options, |_| {}).unwrap_err();
        assert!(matches!(err, LoadError::Encoding { line: 1, .. }), "{err}");
    }

    #[test]
    fn short_row_reports_line() {
        let text = format!("{}2024;1;GRAXA\n", SAMPLE);
        let err = load_from_reader(&latin1(&text)[..], &LoadOptions::default(), |_| {}).unwrap_err();
        assert!(
            matches!(err, LoadError::FieldCount { line: 6, expected: 7, found: 3 }),
            "{err}"
        );
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = load_table(Path::new("/nonexistent/dados.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn header_only_file_gives_empty_table() {
        let header = SAMPLE.lines().next().unwrap();
        let table = load_from_reader(&latin1(header)[..], &LoadOptions::default(), |_| {}).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 7);
    }
}
