pub mod size_cache;

use crate::archive::Archive;
use crate::resolver::paths::host_of;
use crate::resolver::Reference;
use serde::{Deserialize, Serialize};
use size_cache::SizeCache;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadPhaseMetrics {
    pub initial_bytes: u64,
    pub subload_bytes: u64,
    pub total_bytes: u64,
    pub initial_requests: usize,
    pub subload_requests: usize,
    pub total_requests: usize,
    pub initial_hosts: usize,
    pub total_hosts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhasePartition {
    pub initial: BTreeSet<String>,
    pub subload: BTreeSet<String>,
}

pub fn partition_files(
    references: &[Reference],
    archive: &Archive,
    entry: Option<&str>,
) -> PhasePartition {
    let mut initial: BTreeSet<String> = BTreeSet::new();
    if let Some(stored) = entry.and_then(|e| archive.resolve_ci(e)) {
        initial.insert(stored.to_string());
    }
    for r in references.iter().filter(|r| !r.external && r.in_zip) {
        if let Some(stored) = r.normalized.as_deref().and_then(|n| archive.resolve_ci(n)) {
            initial.insert(stored.to_string());
        }
    }
    let subload = archive
        .paths()
        .filter(|p| !initial.contains(*p))
        .map(|p| p.to_string())
        .collect();
    PhasePartition { initial, subload }
}

/// Unique hosts of external references; `loads_only` skips anchors.
pub fn external_hosts(references: &[Reference], loads_only: bool) -> BTreeSet<String> {
    references
        .iter()
        .filter(|r| r.external)
        .filter(|r| !loads_only || r.is_load())
        .filter_map(|r| host_of(&r.url))
        .collect()
}

pub fn compute_load_metrics(
    references: &[Reference],
    archive: &Archive,
    entry: Option<&str>,
    cache: &SizeCache,
) -> LoadPhaseMetrics {
    let partition = partition_files(references, archive, entry);
    let initial_bytes = partition
        .initial
        .iter()
        .map(|p| cache.compressed_size(archive, p))
        .sum();
    let subload_bytes = partition
        .subload
        .iter()
        .map(|p| cache.compressed_size(archive, p))
        .sum();

    let metrics = LoadPhaseMetrics {
        initial_bytes,
        subload_bytes,
        total_bytes: archive.total_bytes(),
        initial_requests: partition.initial.len(),
        subload_requests: partition.subload.len(),
        total_requests: archive.len(),
        initial_hosts: external_hosts(references, true).len(),
        total_hosts: external_hosts(references, false).len(),
    };
    debug!(
        bundle_id = %archive.id(),
        initial_bytes = metrics.initial_bytes,
        subload_bytes = metrics.subload_bytes,
        initial_requests = metrics.initial_requests,
        subload_requests = metrics.subload_requests,
        "load metrics computed"
    );
    metrics
}
