//! Sitemap entries and the client-side tree mirror they live in.

mod entry;
pub mod site_path;
mod tree;

pub use entry::{EntryAttributes, SitemapEntry};
pub use tree::{SitemapTree, TreeError};

#[cfg(test)]
pub(crate) use tree::tests::sample_tree;
