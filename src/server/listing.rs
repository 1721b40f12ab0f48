//! Directory listing pages.
//!
//! Pure rendering over a sorted entry list; the filesystem read and the
//! HTML generation are separate so ordering and markup stay testable
//! without a server.

use std::{fs, io, path::Path, time::SystemTime};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::utils::{
    fs::{format_mtime, format_size},
    html,
};

/// Characters escaped when entry names become href attributes.
const HREF_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?');

/// One row of a listing.
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub mtime: Option<SystemTime>,
}

/// Read a directory into listing entries, directories first, names
/// compared case-insensitively. The ordering is total, so the same tree
/// always renders the same page.
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries: Vec<ListingEntry> = fs::read_dir(dir)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let meta = entry.metadata().ok()?;
            Some(ListingEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: meta.len(),
                mtime: meta.modified().ok(),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}

/// Render the listing page for `url_path` (always starts with `/`).
pub fn render(url_path: &str, entries: &[ListingEntry]) -> String {
    let mut rows = String::new();

    // Parent link on everything but the root listing
    if url_path != "/" {
        rows.push_str(
            "<tr><td><a href=\"../\">&#128193; ..</a></td><td></td><td></td></tr>",
        );
    }

    for entry in entries {
        let icon = if entry.is_dir { "&#128193;" } else { "&#128196;" };
        let href = utf8_percent_encode(&entry.name, HREF_SET).to_string();
        let href = if entry.is_dir { format!("{href}/") } else { href };
        let size = if entry.is_dir {
            String::new()
        } else {
            format_size(entry.size)
        };
        let mtime = entry.mtime.map(format_mtime).unwrap_or_default();

        rows.push_str(&format!(
            "<tr><td><a href=\"{href}\">{icon} {name}</a></td>\
             <td>{size}</td><td>{mtime}</td></tr>",
            name = html::escape(&entry.name),
        ));
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>Index of {title}</title>{style}</head><body>\
         <h1>Index of {title}</h1>\
         <input id=\"filter\" type=\"search\" placeholder=\"Filter\u{2026}\" autofocus>\
         <table><thead><tr><th>Name</th><th>Size</th><th>Modified</th></tr></thead>\
         <tbody>{rows}</tbody></table>\
         {script}</body></html>",
        title = html::escape(url_path),
        style = LISTING_STYLE,
        script = FILTER_SCRIPT,
    )
}

const LISTING_STYLE: &str = "<style>body{font-family:system-ui,sans-serif;max-width:50rem;\
margin:2rem auto;padding:0 1rem;color:#333}table{width:100%;border-collapse:collapse}\
th,td{text-align:left;padding:.3rem .5rem;border-bottom:1px solid #eee}\
th{color:#888;font-weight:600}a{text-decoration:none;color:#0366d6}\
a:hover{text-decoration:underline}#filter{width:100%;padding:.4rem;margin:.5rem 0 1rem;\
border:1px solid #ccc;border-radius:4px;font-size:1rem}</style>";

/// Client-side name filter over the rendered rows.
const FILTER_SCRIPT: &str = "<script>\
document.getElementById('filter').addEventListener('input',function(){\
var q=this.value.toLowerCase();\
document.querySelectorAll('tbody tr').forEach(function(row){\
row.style.display=row.textContent.toLowerCase().indexOf(q)===-1?'none':'';\
});});\
</script>";
