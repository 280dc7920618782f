use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{ByteRecord, WriterBuilder};

use super::filter::FilteredView;
use super::format::TextFormat;
use crate::error::ExportError;

/// Write the header row and every row of `view`, in view order, using the
/// same delimiter, encoding and column order the loader reads.
pub fn write_delimited<W: Write>(
    view: &FilteredView<'_>,
    writer: W,
    format: &TextFormat,
) -> Result<(), ExportError> {
    let table = view.table();
    let encoding = format.encoding;
    let mut out = WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_writer(writer);

    let header = encode_fields(table.headers().iter().cloned(), 0, format)?;
    out.write_byte_record(&header)?;

    for (i, &row) in view.rows().iter().enumerate() {
        let cells = (0..table.headers().len()).map(|col| table.cell_text(row, col));
        let record = encode_fields(cells, i + 1, format)?;
        out.write_byte_record(&record)?;
    }
    out.flush()?;
    log::debug!(
        "Wrote {} rows as {} delimited text",
        view.len(),
        encoding.name()
    );
    Ok(())
}

/// Serialise a view to an in-memory byte buffer.
pub fn export_to_bytes(view: &FilteredView<'_>, format: &TextFormat) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_delimited(view, &mut buf, format)?;
    Ok(buf)
}

/// Serialise a view to `path`, replacing any existing file.
pub fn export_to_file(
    view: &FilteredView<'_>,
    path: &Path,
    format: &TextFormat,
) -> Result<(), ExportError> {
    // Encode fully first so an unencodable row never leaves a truncated file.
    let bytes = export_to_bytes(view, format)?;
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&bytes)?;
    file.flush()?;
    log::info!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}

fn encode_fields(
    fields: impl Iterator<Item = String>,
    row: usize,
    format: &TextFormat,
) -> Result<ByteRecord, ExportError> {
    let mut record = ByteRecord::new();
    for field in fields {
        let bytes = format
            .encoding
            .encode(&field)
            .map_err(|ch| ExportError::Unencodable {
                row,
                ch,
                encoding: format.encoding.name(),
            })?;
        record.push_field(&bytes);
    }
    Ok(record)
}
