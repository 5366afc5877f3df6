// src/batch.rs
//
// Batch driver around the engine.
//
// The host owns the documents; the driver only needs to list candidates by
// media type, read bytes and write bytes back. Each document is decoded,
// rewritten and compared on its own: one bad document is recorded and the
// batch moves on. A cancellation flag is honoured between documents, never
// in the middle of one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use walkdir::WalkDir;

use crate::criteria::Rule;
use crate::error::BatchError;

pub type DocumentId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Xhtml,
    Html,
    Css,
    Other,
}

impl MediaType {
    /// Media types the rewriter is run over.
    pub const DOCUMENTS: &'static [MediaType] = &[MediaType::Xhtml, MediaType::Html];

    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("xhtml") | Some("xht") => MediaType::Xhtml,
            Some("html") | Some("htm") => MediaType::Html,
            Some("css") => MediaType::Css,
            _ => MediaType::Other,
        }
    }
}

/// Storage the host hands to the batch driver.
pub trait DocumentStore {
    /// Ids of the documents whose media type is in `media_types`, in a stable order.
    fn list_candidates(&self, media_types: &[MediaType]) -> Vec<DocumentId>;

    fn read(&self, id: &str) -> Result<Vec<u8>, BatchError>;

    fn write(&mut self, id: &str, bytes: &[u8]) -> Result<(), BatchError>;
}

/* ============================= Directory tree ============================ */

/// Documents under a directory, identified by `/`-separated relative paths.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, id: &str) -> PathBuf {
        id.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

impl DocumentStore for DirectoryStore {
    fn list_candidates(&self, media_types: &[MediaType]) -> Vec<DocumentId> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!(target: "retag.batch", "skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !media_types.contains(&MediaType::from_path(entry.path())) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let id = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            ids.push(id);
        }
        ids
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, BatchError> {
        fs::read(self.path_of(id)).map_err(|source| BatchError::Read {
            id: id.to_string(),
            source,
        })
    }

    fn write(&mut self, id: &str, bytes: &[u8]) -> Result<(), BatchError> {
        fs::write(self.path_of(id), bytes).map_err(|source| BatchError::Write {
            id: id.to_string(),
            source,
        })
    }
}

/* ================================ In memory ============================== */

/// Documents held in memory, e.g. an unpacked book container.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: BTreeMap<DocumentId, (MediaType, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<DocumentId>, media_type: MediaType, bytes: impl Into<Vec<u8>>) {
        self.docs.insert(id.into(), (media_type, bytes.into()));
    }

    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.docs.get(id).map(|(_, bytes)| bytes.as_slice())
    }
}

impl DocumentStore for MemoryStore {
    fn list_candidates(&self, media_types: &[MediaType]) -> Vec<DocumentId> {
        self.docs
            .iter()
            .filter(|(_, (mt, _))| media_types.contains(mt))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, BatchError> {
        self.get(id)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BatchError::Missing(id.to_string()))
    }

    fn write(&mut self, id: &str, bytes: &[u8]) -> Result<(), BatchError> {
        match self.docs.get_mut(id) {
            Some((_, slot)) => {
                *slot = bytes.to_vec();
                Ok(())
            }
            None => Err(BatchError::Missing(id.to_string())),
        }
    }
}

/* ================================= Driver ================================ */

#[derive(Debug, Default)]
pub struct BatchOptions<'a> {
    /// Report what would change without writing anything.
    pub dry_run: bool,
    pub cancel: Option<&'a AtomicBool>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub changed: Vec<DocumentId>,
    pub failed: Vec<(DocumentId, BatchError)>,
    pub cancelled: bool,
}

impl BatchReport {
    /// Nothing matched anywhere.
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Run `rule` over every document candidate in `store`.
pub fn run_batch<S>(store: &mut S, rule: &Rule, options: &BatchOptions<'_>) -> BatchReport
where
    S: DocumentStore + ?Sized,
{
    let mut report = BatchReport::default();

    for id in store.list_candidates(MediaType::DOCUMENTS) {
        if options.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            log::info!(target: "retag.batch", "cancelled before {id}");
            report.cancelled = true;
            break;
        }

        log::debug!(target: "retag.batch", "processing {id}");
        report.processed += 1;
        match rewrite_document(store, rule, &id, options.dry_run) {
            Ok(true) => {
                log::info!(target: "retag.batch", "changed {id}");
                report.changed.push(id);
            }
            Ok(false) => {}
            Err(err) => {
                log::warn!(target: "retag.batch", "{err}");
                report.failed.push((id, err));
            }
        }
    }

    report
}

/// Rewrite one document; `Ok(true)` if its text changed.
fn rewrite_document<S>(store: &mut S, rule: &Rule, id: &str, dry_run: bool) -> Result<bool, BatchError>
where
    S: DocumentStore + ?Sized,
{
    let bytes = store.read(id)?;
    let source = String::from_utf8(bytes).map_err(|source| BatchError::Decode {
        id: id.to_string(),
        source,
    })?;

    let rewrite = rule.rewrite(&source);
    if !rewrite.changed(&source) {
        return Ok(false);
    }
    if !dry_run {
        store.write(id, rewrite.output.as_bytes())?;
    }
    Ok(true)
}
