use std::collections::HashSet;
use std::path::Path;

use saphyr::{LoadableYamlNode, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::config::yaml::{get, read_document, scalar_string, string_map};
use crate::sitemap::{SitemapEntry, SitemapTree, site_path};

/// Sitemap entries loaded from a YAML document.
///
/// ```yaml
/// root: /sites/default
/// entries:
///   - name: about
///     title: About us
///     vfs: /sites/default/about.html
///     properties: { template: two-column }
///     children:
///       - name: team
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapSource {
    root: String,
    entries: Vec<SitemapEntry>,
}

impl SitemapSource {
    pub async fn read(path: &Path) -> Result<Self, SitemapSourceError> {
        let contents = read_document(path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let source: Self = contents.as_str().try_into()?;
        debug!(
            "Loaded {} top-level sitemap entries below '{}'",
            source.entries.len(),
            source.root
        );
        Ok(source)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn entries(&self) -> &[SitemapEntry] {
        &self.entries
    }

    /// The mirror of this sitemap, anchored at the configured root.
    pub fn into_tree(self) -> SitemapTree {
        SitemapTree::with_root_path(self.root, self.entries)
    }
}

impl TryFrom<&str> for SitemapSource {
    type Error = SitemapSourceError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let top_level = documents
            .first()
            .context(MalformedDocumentSnafu)?
            .as_mapping()
            .context(TopLevelNotMapSnafu)?;

        let root = match get(top_level, "root") {
            Some(value) => normalize_root(value.as_str().context(RootNotStringSnafu)?),
            None => site_path::ROOT_PATH.to_string(),
        };

        let entries = match get(top_level, "entries") {
            Some(value) => {
                let sequence = value
                    .as_sequence()
                    .context(EntriesNotSequenceSnafu { parent: &root })?;
                parse_entries(&root, sequence)?
            }
            None => Vec::new(),
        };

        Ok(SitemapSource { root, entries })
    }
}

fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        site_path::ROOT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_entries(parent_path: &str, nodes: &[Yaml]) -> Result<Vec<SitemapEntry>, SitemapSourceError> {
    let mut names = HashSet::new();
    nodes
        .iter()
        .map(|node| {
            let entry = parse_entry(parent_path, node)?;
            ensure!(
                names.insert(entry.name().to_string()),
                DuplicateEntrySnafu {
                    path: entry.site_path()
                }
            );
            Ok(entry)
        })
        .collect()
}

fn parse_entry(parent_path: &str, node: &Yaml) -> Result<SitemapEntry, SitemapSourceError> {
    let map = node
        .as_mapping()
        .context(EntryNotMapSnafu { parent: parent_path })?;
    let name = get(map, "name")
        .and_then(scalar_string)
        .context(MissingNameSnafu { parent: parent_path })?;
    ensure!(is_valid_name(&name), InvalidNameSnafu { name: &name });

    let path = site_path::join(parent_path, &name);
    let mut entry = SitemapEntry::new(&path);
    if let Some(title) = get(map, "title").and_then(scalar_string) {
        entry = entry.with_title(title);
    }
    if let Some(vfs_reference) = get(map, "vfs").and_then(scalar_string) {
        entry = entry.with_vfs_reference(vfs_reference);
    }
    if let Some(properties) = get(map, "properties") {
        let properties = string_map(properties).context(PropertiesNotMapSnafu { path: &path })?;
        for (key, value) in properties {
            entry = entry.with_property(key, value);
        }
    }
    if let Some(children) = get(map, "children") {
        let sequence = children
            .as_sequence()
            .context(EntriesNotSequenceSnafu { parent: &path })?;
        for child in parse_entries(&path, sequence)? {
            entry = entry.with_child(child);
        }
    }
    Ok(entry)
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains('/') && name != "." && name != ".."
}

#[derive(Debug, Snafu)]
pub enum SitemapSourceError {
    #[snafu(display("Failed to read the sitemap file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the sitemap file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted sitemap file"))]
    MalformedDocument,
    #[snafu(display("Top level of the sitemap file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'root' should be a string"))]
    RootNotString,
    #[snafu(display("Entries below '{}' should be a sequence", parent))]
    EntriesNotSequence { parent: String },
    #[snafu(display("Entry below '{}' should be a map", parent))]
    EntryNotMap { parent: String },
    #[snafu(display("Entry below '{}' has no name", parent))]
    MissingName { parent: String },
    #[snafu(display("'{}' is not a valid entry name", name))]
    InvalidName { name: String },
    #[snafu(display("Entry '{}' is defined multiple times", path))]
    DuplicateEntry { path: String },
    #[snafu(display("Properties of '{}' should be a map", path))]
    PropertiesNotMap { path: String },
}
