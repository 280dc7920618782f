//! Zip extraction with step-wise progress.
//!
//! Entries are written in archive index order, so extracting the same archive
//! twice produces the same files. Progress is `completed / total` after each
//! entry and reaches exactly 1.0 when the last entry is written.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::ArchiveError;

// ---------------------------------------------------------------------------
// Extraction result
// ---------------------------------------------------------------------------

/// Content identity of one archive entry, as recorded in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryDigest {
    pub crc32: u32,
    pub size: u64,
}

/// Files written by one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Extraction directory.
    pub root: PathBuf,
    /// Regular files, relative to `root`, in archive order.
    pub files: Vec<PathBuf>,
    /// Digest of each entry in `files`, same order.
    pub digests: Vec<EntryDigest>,
}

impl Extraction {
    /// Path of the member the loader expects, e.g. `Lubrificante_Anexo_A.csv`.
    pub fn member(&self, name: &str) -> Result<PathBuf, ArchiveError> {
        let wanted = Path::new(name);
        self.files
            .iter()
            .find(|f| f.as_path() == wanted)
            .map(|f| self.root.join(f))
            .ok_or_else(|| ArchiveError::MissingMember {
                name: name.to_string(),
                root: self.root.clone(),
            })
    }

    /// Recorded CRC-32 and size of an extracted file.
    pub fn digest(&self, name: &str) -> Option<EntryDigest> {
        let wanted = Path::new(name);
        self.files
            .iter()
            .position(|f| f.as_path() == wanted)
            .and_then(|i| self.digests.get(i).copied())
    }
}

// ---------------------------------------------------------------------------
// Step-wise extractor
// ---------------------------------------------------------------------------

/// Extracts one entry per [`extract_next`](Self::extract_next) call so a UI
/// loop can paint progress between entries.
pub struct ArchiveExtractor<R> {
    archive: ZipArchive<R>,
    root: PathBuf,
    next: usize,
    files: Vec<PathBuf>,
    digests: Vec<EntryDigest>,
    /// Absolute paths written so far, removed again if a later entry fails.
    written: Vec<PathBuf>,
}

impl ArchiveExtractor<BufReader<File>> {
    /// Open an archive file on disk.
    pub fn open(archive: &Path, root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let file = File::open(archive).map_err(|source| ArchiveError::Open {
            path: archive.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file), root)
    }
}

impl<R: Read + Seek> ArchiveExtractor<R> {
    /// Read the central directory and make sure `root` exists. An existing
    /// directory is reused.
    pub fn new(reader: R, root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let archive = ZipArchive::new(reader)?;
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ArchiveError::CreateDir {
            path: root.clone(),
            source,
        })?;
        log::info!(
            "Extracting {} entries into {}",
            archive.len(),
            root.display()
        );
        Ok(Self {
            archive,
            root,
            next: 0,
            files: Vec::new(),
            digests: Vec::new(),
            written: Vec::new(),
        })
    }

    pub fn total_entries(&self) -> usize {
        self.archive.len()
    }

    pub fn completed_entries(&self) -> usize {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.archive.len()
    }

    /// Fraction of entries written, in [0, 1]. An empty archive is complete.
    pub fn progress(&self) -> f64 {
        let total = self.archive.len();
        if total == 0 {
            1.0
        } else {
            self.next as f64 / total as f64
        }
    }

    /// Write the next entry. Returns the new progress, or `None` when every
    /// entry has already been written.
    ///
    /// On failure the files written by this run are removed.
    pub fn extract_next(&mut self) -> Result<Option<f64>, ArchiveError> {
        if self.is_finished() {
            return Ok(None);
        }
        if let Err(e) = self.write_entry(self.next) {
            self.discard();
            return Err(e);
        }
        self.next += 1;
        let progress = self.progress();
        log::debug!(
            "Extracted entry {}/{} ({:.0}%)",
            self.next,
            self.archive.len(),
            progress * 100.0
        );
        Ok(Some(progress))
    }

    /// Write every remaining entry and return the result.
    pub fn finish(mut self) -> Result<Extraction, ArchiveError> {
        while self.extract_next()?.is_some() {}
        Ok(Extraction {
            root: self.root,
            files: self.files,
            digests: self.digests,
        })
    }

    fn write_entry(&mut self, index: usize) -> Result<(), ArchiveError> {
        let mut entry = self.archive.by_index(index)?;
        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| ArchiveError::UnsafePath(name.clone()))?;
        let target = self.root.join(&relative);
        let entry_error = |source: io::Error| ArchiveError::Entry {
            name: name.clone(),
            source,
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(entry_error)?;
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(entry_error)?;
        }
        let mut out = File::create(&target).map_err(entry_error)?;
        self.written.push(target.clone());
        io::copy(&mut entry, &mut out).map_err(entry_error)?;
        self.files.push(relative);
        self.digests.push(EntryDigest {
            crc32: entry.crc32(),
            size: entry.size(),
        });
        Ok(())
    }

    fn discard(&mut self) {
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Could not remove partial file {}: {e}", path.display());
            }
        }
        self.files.clear();
        self.digests.clear();
    }
}

/// Extract the whole archive, calling `on_progress` after every entry.
/// The last call always reports 1.0.
pub fn extract_archive<R: Read + Seek>(
    reader: R,
    root: impl Into<PathBuf>,
    mut on_progress: impl FnMut(f64),
) -> Result<Extraction, ArchiveError> {
    let mut extractor = ArchiveExtractor::new(reader, root)?;
    if extractor.total_entries() == 0 {
        on_progress(1.0);
    }
    while let Some(progress) = extractor.extract_next()? {
        on_progress(progress);
    }
    extractor.finish()
}
