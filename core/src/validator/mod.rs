pub mod summary;

use crate::adsize::{detect_ad_size, AdSize};
use crate::archive::{find_primary, Archive};
use crate::error::CoreResult;
use crate::eval::context::{collect_text_sources, CheckContext, PartialResult};
use crate::eval::finding::Finding;
use crate::eval::runner::{run_checks, RunOptions};
use crate::metrics::size_cache::SizeCache;
use crate::metrics::{compute_load_metrics, partition_files};
use crate::policy::settings::Settings;
use crate::resolver::{resolve_references, Reference};
use serde::{Deserialize, Serialize};
use std::path::Path;
use summary::{aggregate, Summary};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleResult {
    pub bundle_id: String,
    pub bundle_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_size: Option<AdSize>,
    pub references: Vec<Reference>,
    pub total_bytes: u64,
    pub initial_bytes: u64,
    pub subsequent_bytes: u64,
    pub initial_requests: usize,
    pub total_requests: usize,
    pub findings: Vec<Finding>,
    pub summary: Summary,
}

pub struct BundleValidator {
    settings: Settings,
}

impl Default for BundleValidator {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl BundleValidator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prepare(&self, archive: &Archive, sizes: &SizeCache) -> PartialResult {
        let primary = find_primary(archive);
        if let Some(p) = &primary {
            debug!(bundle_id = %archive.id(), path = %p, "entry document chosen");
        }
        let primary_html = primary
            .as_deref()
            .and_then(|p| archive.text_ci(p))
            .map(|t| t.into_owned());
        let references = match primary.as_deref() {
            Some(p) => resolve_references(archive, p),
            None => {
                warn!(bundle_id = %archive.id(), bundle = %archive.name(), "no primary HTML document");
                Vec::new()
            }
        };
        let ad_size = primary.as_deref().and_then(|p| detect_ad_size(archive, p));
        let metrics = compute_load_metrics(&references, archive, primary.as_deref(), sizes);
        let partition = partition_files(&references, archive, primary.as_deref());
        let sources = collect_text_sources(archive, primary.as_deref());
        PartialResult {
            primary,
            primary_html,
            ad_size,
            references,
            metrics,
            partition,
            sources,
        }
    }

    pub fn validate_archive(&self, archive: &Archive, opts: &RunOptions) -> BundleResult {
        let sizes = SizeCache::new();
        let partial = self.prepare(archive, &sizes);
        let ctx = CheckContext::new(archive, &partial, &self.settings, &sizes, opts.profile);
        let findings = run_checks(&ctx, opts);
        let summary = aggregate(&findings);
        info!(
            bundle = %archive.name(),
            bundle_id = %archive.id(),
            status = ?summary.status,
            fails = summary.fails,
            warns = summary.warns,
            "bundle audited"
        );
        let metrics = &partial.metrics;
        BundleResult {
            bundle_id: archive.id().to_string(),
            bundle_name: archive.name().to_string(),
            primary: partial.primary.clone(),
            ad_size: partial.ad_size.clone(),
            references: partial.references.clone(),
            total_bytes: metrics.total_bytes,
            initial_bytes: metrics.initial_bytes,
            subsequent_bytes: metrics.subload_bytes,
            initial_requests: metrics.initial_requests,
            total_requests: metrics.total_requests,
            findings,
            summary,
        }
    }

    pub fn validate_zip(&self, zip_path: &Path, opts: &RunOptions) -> CoreResult<BundleResult> {
        let bytes = std::fs::read(zip_path)?;
        let archive = Archive::from_zip_bytes(display_name(zip_path), bytes)?;
        Ok(self.validate_archive(&archive, opts))
    }

    pub fn validate_dir(&self, dir: &Path, opts: &RunOptions) -> CoreResult<BundleResult> {
        let archive = Archive::from_dir(display_name(dir), dir)?;
        Ok(self.validate_archive(&archive, opts))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
