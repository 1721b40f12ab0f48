//! URL to filesystem path resolution across multiple roots.

use std::path::{Path, PathBuf};

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A concrete file to serve (may be a directory's index.html).
    File(PathBuf),
    /// A directory without an index.html; gets a listing.
    Directory(PathBuf),
    /// The path tried to escape the served roots; answered with 403.
    Forbidden,
}

/// Resolve a URL against the roots in order; first root containing the
/// path wins. Later roots are not consulted once a root matches, so
/// shadowed files stay shadowed.
pub fn resolve(url: &str, roots: &[PathBuf]) -> Option<Resolved> {
    let clean = normalize_url(url);

    // Reject parent-directory components early; names merely containing
    // dots ("a..b.txt") are legitimate
    if clean.split('/').any(|segment| segment == "..") {
        return Some(Resolved::Forbidden);
    }

    roots.iter().find_map(|root| resolve_in_root(&clean, root))
}

fn resolve_in_root(clean: &str, root: &Path) -> Option<Resolved> {
    let local = root.join(clean);

    // Canonicalize to resolve symlinks and verify containment.
    // This prevents traversal via symlinks or encoded sequences.
    let canonical = local.canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(Resolved::File(canonical));
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(Resolved::File(index));
        }
        return Some(Resolved::Directory(canonical));
    }

    None
}

/// Normalize URL: decode, strip query string, trim slashes
pub fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    decoded.trim_matches('/').to_string()
}
