//! HTTP response handlers.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use flate2::{Compression, write::GzEncoder};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::{listing, suggest};
use crate::{
    config::Config,
    embed::serve::{LIVERELOAD_JS, LivereloadVars},
    reload::{CLIENT_SCRIPT_PATH, WS_PATH},
    utils::mime::{self, types},
};

/// Bodies smaller than this are never gzipped; the header overhead wins.
const GZIP_MIN_BYTES: usize = 1024;

/// Respond with a static file, applying size/type policy, caching
/// metadata, compression and reload-script injection.
pub fn respond_file(request: Request, path: &Path, config: &Config, inject: bool) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;

    if meta.len() > config.http.max_file_bytes() {
        let body = suggest::render_too_large(request.url(), config.http.max_file_size);
        return send_body(request, 413, types::HTML, body.into_bytes(), config);
    }

    let ext = path.extension().and_then(|e| e.to_str());
    if !config.http.is_allowed_extension(ext) {
        return respond_attachment(request, path, config);
    }

    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type, config);
    }

    // Range requests for media files (video/audio seeking)
    if mime::is_media(content_type)
        && let Some(range) = get_header(&request, "range")
    {
        return respond_range(request, path, content_type, &range, config);
    }

    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let body = if inject && content_type.starts_with("text/html") {
        inject_reload_script(&body)
    } else {
        body
    };

    // Content-addressed ETag lets the browser revalidate for free
    let etag = etag_for(&body);
    if get_header(&request, "if-none-match").is_some_and(|v| v == etag) {
        let response = Response::empty(StatusCode(304)).with_header(header("ETag", &etag));
        return request.respond(response).map_err(Into::into);
    }

    let mut headers = base_headers(content_type, config);
    headers.push(header("ETag", &etag));

    let body = if should_gzip(&request, content_type, body.len(), config) {
        headers.push(header("Content-Encoding", "gzip"));
        headers.push(header("Vary", "Accept-Encoding"));
        gzip(&body)?
    } else {
        body
    };

    let mut response = Response::from_data(body);
    for h in headers {
        response = response.with_header(h);
    }
    request.respond(response).map_err(Into::into)
}

/// Serve a file whose extension is outside the allow list as a download.
/// The raw bytes go out untouched; no injection, no compression.
fn respond_attachment(request: Request, path: &Path, config: &Config) -> Result<()> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("download");
    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));

    if is_head_request(&request) {
        return send_head(request, 200, types::OCTET_STREAM, config);
    }

    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut response = Response::from_data(body)
        .with_header(header("Content-Disposition", &disposition));
    for h in base_headers(types::OCTET_STREAM, config) {
        response = response.with_header(h);
    }
    request.respond(response).map_err(Into::into)
}

/// Handle Range request for media files (video/audio seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
    config: &Config,
) -> Result<()> {
    use std::io::{Read, Seek, SeekFrom};

    let file_size = fs::metadata(path)?.len();
    if file_size == 0 {
        return send_body(request, 200, content_type, Vec::new(), config);
    }

    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let (start, end) = parse_range(range, file_size);
    let length = end - start + 1;

    // Stream the requested range, no allocation for large files
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    let content_range = format!("bytes {start}-{end}/{file_size}");
    let mut headers = base_headers(content_type, config);
    headers.push(header("Content-Range", &content_range));
    headers.push(header("Accept-Ranges", "bytes"));

    let response = Response::new(StatusCode(206), headers, reader, Some(length as usize), None);
    request.respond(response)?;
    Ok(())
}

/// Parse Range header value "start-end" into (start, end) bytes.
/// Malformed or unsatisfiable input degrades to the whole file.
/// `file_size` must be > 0.
fn parse_range(range: &str, file_size: u64) -> (u64, u64) {
    let range = range.trim();
    let parts: Vec<&str> = range.split('-').collect();

    let (start, end) = match parts.as_slice() {
        // "0-499": specific range
        [s, e] if !s.is_empty() && !e.is_empty() => {
            let start: u64 = s.trim().parse().unwrap_or(0);
            let end: u64 = e.trim().parse().unwrap_or(file_size - 1);
            (start, end.min(file_size - 1))
        }
        // "500-": from offset to end
        [s, ""] if !s.is_empty() => {
            let start: u64 = s.trim().parse().unwrap_or(0);
            (start, file_size - 1)
        }
        // "-500": last 500 bytes
        ["", e] if !e.is_empty() => {
            let suffix: u64 = e.trim().parse().unwrap_or(0);
            (file_size.saturating_sub(suffix), file_size - 1)
        }
        _ => (0, file_size - 1),
    };

    // Inverted or past-EOF starts are unsatisfiable; serve everything
    if start > end || start >= file_size {
        return (0, file_size - 1);
    }
    (start, end)
}

/// Respond with a directory listing page.
pub fn respond_listing(request: Request, url_path: &str, dir: &Path, config: &Config) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, types::HTML, config);
    }

    let entries = listing::read_entries(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    let body = listing::render(url_path, &entries);
    send_body(request, 200, types::HTML, body.into_bytes(), config)
}

/// Respond with the 404 page, including near-miss suggestions.
pub fn respond_not_found(request: Request, config: &Config) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::HTML, config);
    }

    let clean = super::resolve::normalize_url(request.url());
    let suggestions = suggest::find_similar(&clean, &config.roots);
    let body = suggest::render_not_found(request.url(), &suggestions);
    send_body(request, 404, types::HTML, body.into_bytes(), config)
}

/// Respond with the 403 page (path escaped the served roots).
pub fn respond_forbidden(request: Request, config: &Config) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 403, types::HTML, config);
    }

    let body = suggest::render_forbidden();
    send_body(request, 403, types::HTML, body.into_bytes(), config)
}

/// Respond with the 503 busy page (connection limit reached).
pub fn respond_busy(request: Request, config: &Config) -> Result<()> {
    let body = suggest::render_busy();
    let mut response = Response::from_data(body.into_bytes())
        .with_status_code(StatusCode(503))
        .with_header(header("Retry-After", "2"));
    for h in base_headers(types::HTML, config) {
        response = response.with_header(h);
    }
    request.respond(response).map_err(Into::into)
}

/// Respond with the reload client script from memory.
pub fn respond_client_script(request: Request, config: &Config) -> Result<()> {
    let body = LIVERELOAD_JS.render(&LivereloadVars { ws_path: WS_PATH });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes(), config)
}

/// CORS preflight answer.
pub fn respond_preflight(request: Request, config: &Config) -> Result<()> {
    let mut response = Response::empty(StatusCode(204));
    for h in base_headers(types::PLAIN, config) {
        response = response.with_header(h);
    }
    request.respond(response).map_err(Into::into)
}

/// Inject the reload client before `</body>`, or append when the tag is
/// missing (browsers handle trailing scripts fine).
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let script = format!("<script src=\"{CLIENT_SCRIPT_PATH}\"></script>");
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let insert_at = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(&content[..insert_at]);
    result.extend_from_slice(script_bytes);
    result.extend_from_slice(&content[insert_at..]);
    result
}

fn etag_for(body: &[u8]) -> String {
    let hash = blake3::hash(body);
    format!("\"{}\"", hex::encode(&hash.as_bytes()[..16]))
}

fn should_gzip(request: &Request, content_type: &str, len: usize, config: &Config) -> bool {
    config.http.compression
        && len >= GZIP_MIN_BYTES
        && mime::is_text(content_type)
        && get_header(request, "accept-encoding")
            .is_some_and(|v| v.split(',').any(|enc| enc.trim().starts_with("gzip")))
}

fn gzip(body: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn get_header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

fn send_head(request: Request, status: u16, content_type: &'static str, config: &Config) -> Result<()> {
    let mut response = Response::empty(StatusCode(status));
    for h in base_headers(content_type, config) {
        response = response.with_header(h);
    }
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    config: &Config,
) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    for h in base_headers(content_type, config) {
        response = response.with_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Headers every response carries: content type, development cache
/// policy, and CORS when enabled.
fn base_headers(content_type: &str, config: &Config) -> Vec<Header> {
    let mut headers = vec![
        header("Content-Type", content_type),
        header("Cache-Control", "no-cache, no-store, must-revalidate"),
    ];
    if config.http.cors {
        headers.push(header("Access-Control-Allow-Origin", "*"));
        headers.push(header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"));
        headers.push(header("Access-Control-Allow-Headers", "*"));
    }
    headers
}

fn header(key: &str, value: &str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
