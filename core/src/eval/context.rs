use crate::adsize::AdSize;
use crate::archive::entry::MACOS_RESOURCE_DIR;
use crate::archive::{extension_of, Archive};
use crate::eval::finding::Offender;
use crate::metrics::size_cache::SizeCache;
use crate::metrics::{LoadPhaseMetrics, PhasePartition};
use crate::policy::settings::Settings;
use crate::policy::types::Profile;
use crate::resolver::markup::line_at;
use crate::resolver::Reference;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Script,
    Stylesheet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSource {
    pub path: String,
    pub kind: SourceKind,
    pub text: String,
}

pub fn collect_text_sources(archive: &Archive, primary: Option<&str>) -> Vec<TextSource> {
    let mut out = Vec::new();
    if let Some((path, bytes)) = primary.and_then(|p| archive.get_ci(p)) {
        out.push(TextSource {
            path: path.to_string(),
            kind: SourceKind::Html,
            text: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
    for (path, bytes) in archive.files() {
        if path.starts_with(MACOS_RESOURCE_DIR) {
            continue;
        }
        let kind = match extension_of(path).as_deref() {
            Some("js") | Some("mjs") => SourceKind::Script,
            Some("css") => SourceKind::Stylesheet,
            _ => continue,
        };
        out.push(TextSource {
            path: path.clone(),
            kind,
            text: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct PartialResult {
    pub primary: Option<String>,
    pub primary_html: Option<String>,
    pub ad_size: Option<AdSize>,
    pub references: Vec<Reference>,
    pub metrics: LoadPhaseMetrics,
    pub partition: PhasePartition,
    pub sources: Vec<TextSource>,
}

pub struct CheckContext<'a> {
    pub archive: &'a Archive,
    pub partial: &'a PartialResult,
    pub settings: &'a Settings,
    pub files: Vec<&'a str>,
    pub primary: Option<&'a str>,
    pub html: Option<&'a str>,
    pub profile: Option<Profile>,
    sizes: &'a SizeCache,
}

const DETAIL_MAX_CHARS: usize = 80;

fn clip(s: &str) -> String {
    let t = s.trim();
    if t.chars().count() <= DETAIL_MAX_CHARS {
        t.to_string()
    } else {
        let mut out: String = t.chars().take(DETAIL_MAX_CHARS).collect();
        out.push('…');
        out
    }
}

impl<'a> CheckContext<'a> {
    pub fn new(
        archive: &'a Archive,
        partial: &'a PartialResult,
        settings: &'a Settings,
        sizes: &'a SizeCache,
        profile: Option<Profile>,
    ) -> Self {
        Self {
            archive,
            partial,
            settings,
            files: archive.paths().collect(),
            primary: partial.primary.as_deref(),
            html: partial.primary_html.as_deref(),
            profile,
            sizes,
        }
    }

    pub fn compressed_size(&self, path: &str) -> u64 {
        self.sizes.compressed_size(self.archive, path)
    }

    pub fn references(&self) -> &'a [Reference] {
        &self.partial.references
    }

    pub fn ad_size(&self) -> Option<&'a AdSize> {
        self.partial.ad_size.as_ref()
    }

    pub fn metrics(&self) -> &'a LoadPhaseMetrics {
        &self.partial.metrics
    }

    pub fn sources(&self, kinds: &'a [SourceKind]) -> impl Iterator<Item = &'a TextSource> + 'a {
        self.partial
            .sources
            .iter()
            .filter(move |s| kinds.contains(&s.kind))
    }

    /// Every match of `re` in the given source kinds, as offenders with
    /// line numbers and the matched text as detail.
    pub fn scan_sources(&self, re: &Regex, kinds: &[SourceKind]) -> Vec<Offender> {
        let mut out = Vec::new();
        for src in self.partial.sources.iter().filter(|s| kinds.contains(&s.kind)) {
            for m in re.find_iter(&src.text) {
                out.push(Offender::at(
                    src.path.clone(),
                    Some(line_at(&src.text, m.start())),
                    clip(m.as_str()),
                ));
            }
        }
        out
    }

    pub fn any_source_matches(&self, re: &Regex, kinds: &[SourceKind]) -> bool {
        self.partial
            .sources
            .iter()
            .filter(|s| kinds.contains(&s.kind))
            .any(|s| re.is_match(&s.text))
    }
}

pub const ALL_SOURCES: [SourceKind; 3] = [SourceKind::Html, SourceKind::Script, SourceKind::Stylesheet];
pub const CODE_SOURCES: [SourceKind; 2] = [SourceKind::Html, SourceKind::Script];
