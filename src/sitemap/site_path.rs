//! Helpers for slash-delimited sitemap site paths.
//!
//! Site paths never carry a trailing slash, except for the root folder `/`
//! itself. The parent of a top-level entry such as `/about` is `/`.

pub const ROOT_PATH: &str = "/";

/// Returns the parent folder of `path`, `/` for top-level entries.
pub fn parent_folder(path: &str) -> &str {
    let trimmed = trim_trailing_slash(path);
    match trimmed.rfind('/') {
        Some(0) | None => ROOT_PATH,
        Some(idx) => &trimmed[..idx],
    }
}

/// Returns the last segment of `path`.
pub fn name_of(path: &str) -> &str {
    let trimmed = trim_trailing_slash(path);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Splits `path` into the segments below `root`.
///
/// Returns `None` when `path` is not located inside `root`. The prefix check
/// respects segment boundaries, so `/ab` is not inside `/a`.
pub fn relative_segments<'a>(root: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let rest = path.strip_prefix(root)?;
    if !root.ends_with('/') && !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(rest.split('/').filter(|s| !s.trim().is_empty()).collect())
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/a", "/")]
    #[case("/a/b", "/a")]
    #[case("/a/b/", "/a")]
    #[case("/", "/")]
    #[case("a", "/")]
    fn parent_folder_of(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(parent_folder(path), expected);
    }

    #[rstest]
    #[case("/a", "a")]
    #[case("/a/b", "b")]
    #[case("/a/b/", "b")]
    fn name_of_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(name_of(path), expected);
    }

    #[test]
    fn join_does_not_double_the_root_slash() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn relative_segments_respects_segment_boundaries() {
        assert_eq!(relative_segments("/a", "/a/b/c"), Some(vec!["b", "c"]));
        assert_eq!(relative_segments("/a", "/a"), Some(vec![]));
        assert_eq!(relative_segments("/a", "/ab"), None);
        assert_eq!(relative_segments("/a", "/x/y"), None);
        assert_eq!(relative_segments("/", "/x/y"), Some(vec!["x", "y"]));
    }
}
