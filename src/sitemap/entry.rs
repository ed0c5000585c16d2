use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use crate::sitemap::site_path;

/// The editable attributes of a sitemap entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub struct EntryAttributes {
    pub title: String,
    pub vfs_reference: String,
    pub properties: BTreeMap<String, String>,
}

/// A node of the sitemap tree.
///
/// The site path of every child is the parent's site path joined with the
/// child's name, and the position of every child equals its index in the
/// parent's child list. [`SitemapEntry::insert_child`] and
/// [`SitemapEntry::remove_child`] keep both invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub struct SitemapEntry {
    site_path: String,
    name: String,
    attributes: EntryAttributes,
    position: usize,
    children: Vec<SitemapEntry>,
}

impl SitemapEntry {
    pub fn new(site_path: impl Into<String>) -> Self {
        let site_path = site_path.into();
        let name = site_path::name_of(&site_path).to_string();
        Self {
            site_path,
            name,
            attributes: EntryAttributes::default(),
            position: 0,
            children: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.attributes.title = title.into();
        self
    }

    pub fn with_vfs_reference(mut self, vfs_reference: impl Into<String>) -> Self {
        self.attributes.vfs_reference = vfs_reference.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Appends `child` below this entry, rewriting its site path.
    pub fn with_child(mut self, child: SitemapEntry) -> Self {
        self.add_child(child);
        self
    }

    pub fn site_path(&self) -> &str {
        &self.site_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.attributes.title
    }

    pub fn vfs_reference(&self) -> &str {
        &self.attributes.vfs_reference
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.attributes.properties
    }

    pub fn attributes(&self) -> &EntryAttributes {
        &self.attributes
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn children(&self) -> &[SitemapEntry] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&SitemapEntry> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut SitemapEntry> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|child| child.name == name)
    }

    /// Number of entries in this subtree, this entry included.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SitemapEntry::subtree_len)
            .sum::<usize>()
    }

    pub(crate) fn set_attributes(&mut self, attributes: EntryAttributes) {
        self.attributes = attributes;
    }

    pub(crate) fn set_site_path(&mut self, site_path: impl Into<String>) {
        self.site_path = site_path.into();
        self.name = site_path::name_of(&self.site_path).to_string();
    }

    pub(crate) fn add_child(&mut self, child: SitemapEntry) {
        let position = self.children.len();
        self.insert_child(child, position);
    }

    /// Inserts `child` at `position`, shifting later siblings.
    ///
    /// `position` must not exceed the number of children.
    pub(crate) fn insert_child(&mut self, mut child: SitemapEntry, position: usize) {
        child.rebase(&self.site_path);
        self.children.insert(position, child);
        self.reindex();
    }

    pub(crate) fn remove_child(&mut self, position: usize) -> Option<SitemapEntry> {
        if position >= self.children.len() {
            return None;
        }
        let removed = self.children.remove(position);
        self.reindex();
        Some(removed)
    }

    pub(crate) fn replace_children(&mut self, children: Vec<SitemapEntry>) {
        self.children = Vec::with_capacity(children.len());
        for child in children {
            self.add_child(child);
        }
    }

    /// Moves this subtree below `parent_path`, keeping the names.
    fn rebase(&mut self, parent_path: &str) {
        self.site_path = site_path::join(parent_path, &self.name);
        let own_path = self.site_path.clone();
        for child in &mut self.children {
            child.rebase(&own_path);
        }
    }

    fn reindex(&mut self) {
        for (idx, child) in self.children.iter_mut().enumerate() {
            child.position = idx;
        }
    }
}
