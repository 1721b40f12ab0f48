//! Path normalization and display formatting helpers.
//!
//! Pure functions, no timezone or locale dependencies: modification times
//! render as UTC.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Format a byte count as a human-readable size (`1.5 KB`, `3.2 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return if unit == "B" {
                format!("{bytes} B")
            } else {
                format!("{size:.1} {unit}")
            };
        }
        size /= 1024.0;
    }
    format!("{size:.1} PB")
}

/// Format a modification time as `YYYY-MM-DD HH:MM` (UTC).
///
/// Returns `-` for times before the epoch (broken filesystem metadata).
pub fn format_mtime(mtime: SystemTime) -> String {
    let Ok(elapsed) = mtime.duration_since(UNIX_EPOCH) else {
        return "-".to_string();
    };
    let secs = elapsed.as_secs();

    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let hour = (secs / 3600) % 24;
    let minute = (secs / 60) % 60;

    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}")
}

/// Convert days since 1970-01-01 to a (year, month, day) civil date.
///
/// Howard Hinnant's days-from-civil inverse; exact for the full u64 range
/// encountered here.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}
