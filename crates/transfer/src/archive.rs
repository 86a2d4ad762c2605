use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use crate::TransferError;

/// Sentinel entry reported when the archive cannot be opened.
pub const PEEK_OPEN_FAILED: &str = "Could not peek ZIP";

/// Sentinel entry reported when an entry record cannot be read.
pub const PEEK_READ_FAILED: &str = "Error reading ZIP";

/// Iterator over a ZIP archive's entry names, one central-directory record
/// at a time.
///
/// Entries are read raw (payloads are never decompressed), so iteration
/// cost is independent of archive content size, and callers cap traversal
/// with ordinary iterator control flow.
pub struct ZipEntryNames {
    archive: ZipArchive<File>,
    index: usize,
}

impl ZipEntryNames {
    /// Opens `path` as a ZIP archive.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self { archive, index: 0 })
    }

    /// Total number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }
}

impl Iterator for ZipEntryNames {
    type Item = Result<String, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.archive.len() {
            return None;
        }
        let entry = self.archive.by_index_raw(self.index);
        self.index += 1;
        match entry {
            Ok(entry) => Some(Ok(entry.name().to_string())),
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Collects up to `cap` top-level entry names (no path separator, so
/// directory entries and nested members are excluded).
///
/// The peek is informational: if the archive cannot be opened or an entry
/// record is unreadable, the result degrades to a single sentinel entry
/// instead of failing the caller.
pub fn peek_archive(path: &Path, cap: usize) -> Vec<String> {
    let names = match ZipEntryNames::open(path) {
        Ok(names) => names,
        Err(_) => return vec![PEEK_OPEN_FAILED.to_string()],
    };

    let mut top_level = Vec::new();
    for name in names {
        match name {
            Ok(name) if !name.contains('/') => {
                top_level.push(name);
                if top_level.len() == cap {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => return vec![PEEK_READ_FAILED.to_string()],
        }
    }
    top_level
}
