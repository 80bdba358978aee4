use crate::archive::Archive;
use flate2::{write::GzEncoder, Compression};
use std::collections::HashMap;
use std::io::Write;
use std::sync::RwLock;

pub fn gzip_len(bytes: &[u8]) -> u64 {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity((bytes.len() / 2).max(64)),
        Compression::default(),
    );
    if encoder.write_all(bytes).is_err() {
        return bytes.len() as u64;
    }
    match encoder.finish() {
        Ok(out) => out.len() as u64,
        Err(_) => bytes.len() as u64,
    }
}

// Keyed by (archive id, path); concurrent first writes of a key recompute
// the same value.
#[derive(Debug, Default)]
pub struct SizeCache {
    entries: RwLock<HashMap<(String, String), u64>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compressed_size(&self, archive: &Archive, path: &str) -> u64 {
        let key = (archive.id().to_string(), path.to_string());
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(v) = entries.get(&key) {
                return *v;
            }
        }
        let size = match archive.get(path) {
            Some(bytes) => gzip_len(bytes),
            None => return 0,
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *entries.entry(key).or_insert(size)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
