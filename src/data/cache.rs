use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::loader::{load_table, LoadOptions};
use super::model::{Column, Table, TableBuilder};
use crate::archive::EntryDigest;
use crate::error::{CacheError, LoadError};

/// Rows per Parquet record batch when writing a snapshot.
const BATCH_ROWS: usize = 65_536;

// ---------------------------------------------------------------------------
// Snapshot cache
// ---------------------------------------------------------------------------

/// Parquet snapshots of parsed tables, keyed by the content identity of the
/// source file (name, size, CRC-32 recorded in the archive). A hit is always
/// equal to a fresh parse of the same content. One snapshot is kept per
/// source name.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot file name for `source` with the given content digest.
    pub fn key_for(source: &Path, digest: EntryDigest) -> String {
        format!(
            "{}-{}-{:08x}.parquet",
            snapshot_stem(source),
            digest.size,
            digest.crc32
        )
    }

    /// Return the cached table for `key`, or `Ok(None)` on a miss.
    pub fn fetch(&self, key: &str) -> Result<Option<Table>, CacheError> {
        let path = self.dir.join(key);
        if !path.is_file() {
            return Ok(None);
        }
        read_snapshot(&path).map(Some)
    }

    /// Write `table` under `key` and drop older snapshots of the same source.
    pub fn store(&self, table: &Table, source: &Path, key: &str) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(key);
        write_snapshot(table, &path)?;
        self.remove_stale(source, key)?;
        Ok(path)
    }

    /// Snapshot files currently stored for `source`.
    pub fn snapshots_of(&self, source: &Path) -> Result<Vec<PathBuf>, CacheError> {
        let stem = snapshot_stem(source);
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_ours = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| is_snapshot_of(name, &stem));
            if is_ours {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    fn remove_stale(&self, source: &Path, keep: &str) -> Result<(), CacheError> {
        for path in self.snapshots_of(source)? {
            if path.file_name().and_then(|n| n.to_str()) == Some(keep) {
                continue;
            }
            std::fs::remove_file(&path)?;
            log::debug!("Removed stale snapshot {}", path.display());
        }
        Ok(())
    }
}

fn snapshot_stem(source: &Path) -> String {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}

/// `name` is `{stem}-{size}-{crc32:08x}.parquet`.
fn is_snapshot_of(name: &str, stem: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('-'))
        .and_then(|r| r.strip_suffix(".parquet"))
    else {
        return false;
    };
    match rest.split_once('-') {
        Some((size, crc)) => {
            size.parse::<u64>().is_ok() && crc.len() == 8 && u32::from_str_radix(crc, 16).is_ok()
        }
        None => false,
    }
}

/// Parse `source`, going through the snapshot cache when one is given along
/// with the source's content digest. Cache failures are logged and never
/// change the outcome.
pub fn load_cached(
    cache: Option<&SnapshotCache>,
    source: &Path,
    digest: Option<EntryDigest>,
    options: &LoadOptions,
) -> Result<Table, LoadError> {
    let (Some(cache), Some(digest)) = (cache, digest) else {
        return load_table(source, options);
    };
    let key = SnapshotCache::key_for(source, digest);

    match cache.fetch(&key) {
        Ok(Some(table)) => {
            log::info!("Snapshot hit for {} ({} rows)", source.display(), table.len());
            return Ok(table);
        }
        Ok(None) => log::debug!("No snapshot for {}", source.display()),
        Err(e) => log::warn!("Ignoring unreadable snapshot for {}: {e}", source.display()),
    }

    let table = load_table(source, options)?;
    match cache.store(&table, source, &key) {
        Ok(path) => log::debug!("Stored snapshot {}", path.display()),
        Err(e) => log::warn!("Could not store snapshot for {}: {e}", source.display()),
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet encoding
// ---------------------------------------------------------------------------

/// Label columns are stored as Utf8 text, the volume column as Float64.
pub fn write_snapshot(table: &Table, path: &Path) -> Result<(), CacheError> {
    let fields: Vec<Field> = table
        .headers()
        .iter()
        .zip(table.columns())
        .map(|(name, col)| match col {
            Column::Labels(_) => Field::new(name, DataType::Utf8, false),
            Column::Volume(_) => Field::new(name, DataType::Float64, false),
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;

    let mut start = 0;
    while start < table.len() {
        let end = (start + BATCH_ROWS).min(table.len());
        let arrays: Vec<ArrayRef> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(col_idx, col)| -> ArrayRef {
                match col {
                    Column::Labels(_) => Arc::new(StringArray::from(
                        (start..end)
                            .map(|row| table.cell_text(row, col_idx))
                            .collect::<Vec<String>>(),
                    )),
                    Column::Volume(v) => Arc::new(Float64Array::from(v[start..end].to_vec())),
                }
            })
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;
        writer.write(&batch)?;
        start = end;
    }
    writer.close()?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Table, CacheError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut table = TableBuilder::new(headers)?;
    for batch_result in reader {
        let batch = batch_result?;
        let columns: Vec<SnapshotColumn<'_>> = batch
            .columns()
            .iter()
            .map(|col| SnapshotColumn::from_array(col.as_ref()))
            .collect::<Result<_, _>>()?;

        let mut fields = vec![String::new(); columns.len()];
        for row in 0..batch.num_rows() {
            for (slot, col) in fields.iter_mut().zip(&columns) {
                *slot = col.text(row);
            }
            let line = table.len() as u64 + 1;
            table.push_row(fields.as_slice(), line)?;
        }
    }
    Ok(table.finish())
}

/// Typed access to one snapshot column.
enum SnapshotColumn<'a> {
    Text(&'a StringArray),
    Number(&'a Float64Array),
}

impl<'a> SnapshotColumn<'a> {
    fn from_array(array: &'a dyn Array) -> Result<Self, CacheError> {
        if let Some(s) = array.as_any().downcast_ref::<StringArray>() {
            Ok(SnapshotColumn::Text(s))
        } else if let Some(f) = array.as_any().downcast_ref::<Float64Array>() {
            Ok(SnapshotColumn::Number(f))
        } else {
            Err(CacheError::Schema(format!(
                "column type {:?} is neither Utf8 nor Float64",
                array.data_type()
            )))
        }
    }

    fn text(&self, row: usize) -> String {
        match self {
            SnapshotColumn::Text(s) => s.value(row).to_string(),
            SnapshotColumn::Number(f) => f.value(row).to_string(),
        }
    }
}
