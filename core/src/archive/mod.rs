pub mod entry;

use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

pub use entry::find_primary;

#[derive(Debug, Clone)]
pub struct Archive {
    id: String,
    name: String,
    raw_bytes: Vec<u8>,
    files: BTreeMap<String, Vec<u8>>,
    lower_index: HashMap<String, String>,
}

impl Archive {
    /// Read a zip archive held in memory. Directory entries are skipped and
    /// entry names are normalized to forward-slash, root-relative paths.
    pub fn from_zip_bytes(name: impl Into<String>, bytes: Vec<u8>) -> CoreResult<Self> {
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        {
            let mut zip = ZipArchive::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| CoreError::Zip(e.to_string()))?;
            for i in 0..zip.len() {
                let mut f = zip.by_index(i).map_err(|e| CoreError::Zip(e.to_string()))?;
                if f.is_dir() {
                    continue;
                }
                let path = match normalize_entry_name(f.name()) {
                    Some(p) => p,
                    None => continue,
                };
                let mut out = Vec::new();
                f.read_to_end(&mut out)?;
                files.insert(path, out);
            }
        }
        let mut h = Sha256::new();
        h.update(&bytes);
        let id = hex::encode(h.finalize());
        Ok(Self::build(id, name.into(), bytes, files))
    }

    pub fn from_dir(name: impl Into<String>, root: &Path) -> CoreResult<Self> {
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for e in WalkDir::new(root).sort_by_file_name() {
            let e =
                e.map_err(|err| CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
            if !e.file_type().is_file() {
                continue;
            }
            let rel = match e.path().strip_prefix(root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let path = match normalize_entry_name(&rel.to_string_lossy()) {
                Some(p) => p,
                None => continue,
            };
            files.insert(path, std::fs::read(e.path())?);
        }
        Ok(Self::from_map(name.into(), files))
    }

    pub fn from_files<I, P>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: AsRef<str>,
    {
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (p, bytes) in entries {
            if let Some(path) = normalize_entry_name(p.as_ref()) {
                files.insert(path, bytes);
            }
        }
        Self::from_map(name.into(), files)
    }

    fn from_map(name: String, files: BTreeMap<String, Vec<u8>>) -> Self {
        // Content identity over the sorted (path, bytes) stream.
        let mut h = Sha256::new();
        for (path, bytes) in &files {
            h.update(path.as_bytes());
            h.update([0u8]);
            h.update((bytes.len() as u64).to_le_bytes());
            h.update(bytes);
        }
        let id = hex::encode(h.finalize());
        Self::build(id, name, Vec::new(), files)
    }

    fn build(id: String, name: String, raw_bytes: Vec<u8>, files: BTreeMap<String, Vec<u8>>) -> Self {
        let mut lower_index: HashMap<String, String> = HashMap::with_capacity(files.len());
        for path in files.keys() {
            // First path in sorted order wins on a case-insensitive collision.
            lower_index
                .entry(path.to_lowercase())
                .or_insert_with(|| path.clone());
        }
        let bytes: u64 = files.values().map(|b| b.len() as u64).sum();
        debug!(archive = %name, files = files.len(), bytes, "archive loaded");
        Self {
            id,
            name,
            raw_bytes,
            files,
            lower_index,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original compressed bytes; empty when built from a directory or map.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|b| b.as_slice())
    }

    pub fn resolve_ci(&self, path: &str) -> Option<&str> {
        self.lower_index
            .get(&path.to_lowercase())
            .map(|p| p.as_str())
    }

    pub fn get_ci(&self, path: &str) -> Option<(&str, &[u8])> {
        let stored = self.resolve_ci(path)?;
        self.files
            .get_key_value(stored)
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn text_ci(&self, path: &str) -> Option<Cow<'_, str>> {
        self.get_ci(path)
            .map(|(_, bytes)| String::from_utf8_lossy(bytes))
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|b| b.len() as u64).sum()
    }
}

/// Normalize an entry name to a forward-slash path without a leading `./`
/// or `/`. Returns `None` for directory-like or empty names.
pub fn normalize_entry_name(name: &str) -> Option<String> {
    let mut s = name.replace('\\', "/");
    loop {
        if let Some(rest) = s.strip_prefix("./") {
            s = rest.to_string();
        } else if let Some(rest) = s.strip_prefix('/') {
            s = rest.to_string();
        } else {
            break;
        }
    }
    if s.is_empty() || s.ends_with('/') {
        return None;
    }
    Some(s)
}

pub fn extension_of(path: &str) -> Option<String> {
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() && !file.starts_with('.') {
        return None;
    }
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
