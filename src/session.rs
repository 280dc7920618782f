use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveExtractor, Extraction};
use crate::config::DashboardConfig;
use crate::data::aggregate::{summarize, Summary};
use crate::data::cache::{load_cached, SnapshotCache};
use crate::data::export::{export_to_bytes, export_to_file};
use crate::data::filter::{apply_filters, FilterCriteria, FilteredView};
use crate::data::model::{Dimension, Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Where an upload stands after a [`Session::poll_upload`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UploadState {
    /// No upload running.
    Idle,
    /// Still extracting; fraction of entries written.
    Extracting(f64),
    /// Extraction and load finished; the table is ready.
    Loaded,
}

/// Session-scoped context: the current extraction, table and filter state.
///
/// A table exists only after a successful upload. Starting a new upload drops
/// it; a failed upload leaves the session empty.
pub struct Session {
    pub config: DashboardConfig,

    /// Extraction in progress, driven one entry per poll.
    pending: Option<ArchiveExtractor<BufReader<File>>>,

    /// Files of the last successful extraction.
    extraction: Option<Extraction>,

    /// Loaded table (None until an upload succeeds).
    table: Option<Table>,

    /// Per-dimension filter selections.
    criteria: FilterCriteria,

    /// Rows passing the current filters (cached).
    visible_rows: Vec<usize>,

    /// Indicators and chart series for `visible_rows`; None when empty.
    summary: Option<Summary>,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            pending: None,
            extraction: None,
            table: None,
            criteria: FilterCriteria::default(),
            visible_rows: Vec::new(),
            summary: None,
        }
    }

    // -- upload --

    /// Drop the current table and start extracting `archive`.
    pub fn begin_upload(&mut self, archive: &Path) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::UploadInProgress);
        }
        self.invalidate();
        let extractor = ArchiveExtractor::open(archive, self.config.extract_dir.clone())?;
        log::info!("Upload started: {}", archive.display());
        self.pending = Some(extractor);
        Ok(())
    }

    /// Extract one more entry; once every entry is written, load the table.
    pub fn poll_upload(&mut self) -> Result<UploadState> {
        let Some(extractor) = self.pending.as_mut() else {
            return Ok(UploadState::Idle);
        };

        match extractor.extract_next() {
            Ok(Some(progress)) if progress < 1.0 => return Ok(UploadState::Extracting(progress)),
            Ok(_) => {}
            Err(e) => {
                self.pending = None;
                return Err(e.into());
            }
        }

        let Some(extractor) = self.pending.take() else {
            return Ok(UploadState::Idle);
        };
        let extraction = extractor.finish()?;
        self.load_extraction(extraction)?;
        Ok(UploadState::Loaded)
    }

    /// Progress of the running upload, if any.
    pub fn upload_progress(&self) -> Option<f64> {
        self.pending.as_ref().map(|e| e.progress())
    }

    /// Run a whole upload synchronously.
    pub fn ingest_archive(&mut self, archive: &Path) -> Result<()> {
        self.begin_upload(archive)?;
        loop {
            match self.poll_upload()? {
                UploadState::Extracting(_) => continue,
                UploadState::Loaded | UploadState::Idle => return Ok(()),
            }
        }
    }

    fn load_extraction(&mut self, extraction: Extraction) -> Result<()> {
        let member = extraction.member(&self.config.member_name)?;
        let digest = extraction.digest(&self.config.member_name);
        let options = self.config.load_options()?;
        let cache = self
            .config
            .cache_snapshots
            .then(|| SnapshotCache::new(self.config.snapshot_dir()));
        let table = load_cached(cache.as_ref(), &member, digest, &options)?;
        self.extraction = Some(extraction);
        self.set_table(table);
        Ok(())
    }

    /// Install a table directly (tests, alternative front-ends).
    pub fn set_table(&mut self, table: Table) {
        self.criteria = FilterCriteria::default();
        self.table = Some(table);
        self.refilter();
    }

    /// Forget the current table, extraction and filters.
    pub fn invalidate(&mut self) {
        self.pending = None;
        self.extraction = None;
        self.table = None;
        self.criteria = FilterCriteria::default();
        self.visible_rows.clear();
        self.summary = None;
    }

    // -- accessors --

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        self.extraction.as_ref()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.table
            .as_ref()
            .map(|t| FilteredView::borrowed(t, &self.visible_rows))
    }

    /// Values offered for a dimension; empty when nothing is loaded.
    pub fn available_values(&self, dim: Dimension) -> BTreeSet<Value> {
        self.table
            .as_ref()
            .map(|t| t.available_values(dim))
            .unwrap_or_default()
    }

    // -- filters --

    /// Recompute `visible_rows` and the summary after a criteria change.
    pub fn refilter(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        let view = apply_filters(table, &self.criteria);
        self.summary = summarize(&view);
        self.visible_rows = view.into_rows();
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle_filter_value(&mut self, dim: Dimension, value: &Value) {
        self.criteria.toggle(dim, value);
        self.refilter();
    }

    pub fn set_filter(&mut self, dim: Dimension, values: impl IntoIterator<Item = Value>) {
        self.criteria.set(dim, values);
        self.refilter();
    }

    /// Remove the constraint on one dimension.
    pub fn clear_dimension(&mut self, dim: Dimension) {
        self.criteria.clear(dim);
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear_all();
        self.refilter();
    }

    // -- export --

    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let view = self.view().ok_or(Error::NoTable)?;
        Ok(export_to_bytes(&view, &self.config.text_format()?)?)
    }

    pub fn export_to_path(&self, path: &Path) -> Result<PathBuf> {
        let view = self.view().ok_or(Error::NoTable)?;
        export_to_file(&view, path, &self.config.text_format()?)?;
        Ok(path.to_path_buf())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}
