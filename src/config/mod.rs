//! YAML inputs of the editor: the sitemap to edit and the edit script.

pub mod edit_script;
pub mod sitemap_source;
mod yaml;
