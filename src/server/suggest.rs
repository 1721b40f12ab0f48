//! Near-miss suggestions for 404 responses.
//!
//! When a request misses, the target's parent directory is scanned for
//! names close to the requested one so a typo lands one click away.

use std::path::PathBuf;

use crate::utils::html;

/// Minimum similarity (1 - distance/len) for a name to be suggested.
const MIN_SIMILARITY: f64 = 0.5;

/// At most this many suggestions per 404 page.
const MAX_SUGGESTIONS: usize = 5;

/// Find entries similar to the missed path, best match first.
///
/// `clean` is the normalized request path (no leading slash). The parent
/// portion must resolve inside one of the roots; suggestions come from the
/// first root containing it.
pub fn find_similar(clean: &str, roots: &[PathBuf]) -> Vec<String> {
    let (parent, name) = match clean.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", clean),
    };
    if name.is_empty() {
        return Vec::new();
    }

    let Some(dir) = resolve_parent_dir(parent, roots) else {
        return Vec::new();
    };

    let mut scored: Vec<(f64, String)> = std::fs::read_dir(&dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let candidate = entry.file_name().to_string_lossy().into_owned();
            let score = similarity(name, &candidate);
            (score >= MIN_SIMILARITY).then(|| {
                let url = if parent.is_empty() {
                    format!("/{candidate}")
                } else {
                    format!("/{parent}/{candidate}")
                };
                (score, url)
            })
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_SUGGESTIONS);
    scored.into_iter().map(|(_, url)| url).collect()
}

/// Resolve the parent portion of a missed request to a real directory
/// inside one of the roots.
fn resolve_parent_dir(parent: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    if parent.split('/').any(|segment| segment == "..") {
        return None;
    }

    roots.iter().find_map(|root| {
        let canonical = root.join(parent).canonicalize().ok()?;
        let root_canonical = root.canonicalize().ok()?;
        (canonical.starts_with(&root_canonical) && canonical.is_dir()).then_some(canonical)
    })
}

/// Normalized similarity in `0.0..=1.0`, case-insensitive.
fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Classic two-row Levenshtein distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Render the 404 page, with suggestion links when any were found.
pub fn render_not_found(url: &str, suggestions: &[String]) -> String {
    let escaped_url = html::escape(url);

    let suggestion_block = if suggestions.is_empty() {
        String::new()
    } else {
        let items: String = suggestions
            .iter()
            .map(|s| format!("<li><a href=\"{0}\">{1}</a></li>", s, html::escape(s)))
            .collect();
        format!("<p>Did you mean:</p><ul>{items}</ul>")
    };

    format!(
        "<!DOCTYPE html><html><head><title>404 Not Found</title>{style}</head>\
         <body><h1>404</h1><p><code>{escaped_url}</code> was not found on this server.</p>\
         {suggestion_block}<p><a href=\"/\">Back to index</a></p></body></html>",
        style = PAGE_STYLE,
    )
}

/// Render the 403 page for requests that escape the served roots.
pub fn render_forbidden() -> String {
    format!(
        "<!DOCTYPE html><html><head><title>403 Forbidden</title>{style}</head>\
         <body><h1>403</h1><p>Access denied.</p></body></html>",
        style = PAGE_STYLE,
    )
}

/// Render the 503 page shown when the connection limit is reached.
pub fn render_busy() -> String {
    format!(
        "<!DOCTYPE html><html><head><title>503 Server Busy</title>{style}\
         <meta http-equiv=\"refresh\" content=\"2\"></head>\
         <body><h1>503</h1><p>Too many connections. Retrying shortly&hellip;</p></body></html>",
        style = PAGE_STYLE,
    )
}

/// Render the 413 page for files over the configured size cap.
pub fn render_too_large(url: &str, limit_mib: u64) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>413 Payload Too Large</title>{style}</head>\
         <body><h1>413</h1><p><code>{url}</code> exceeds the {limit_mib} MiB serving limit.</p>\
         </body></html>",
        style = PAGE_STYLE,
        url = html::escape(url),
    )
}

const PAGE_STYLE: &str = "<style>body{font-family:system-ui,sans-serif;max-width:40rem;\
margin:4rem auto;padding:0 1rem;color:#333}h1{font-size:4rem;margin:0;color:#888}\
code{background:#f4f4f4;padding:.1rem .3rem;border-radius:3px}</style>";
