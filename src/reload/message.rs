//! Wire messages sent to reload clients.

use std::path::Path;

/// What connected browsers are told after a change burst settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Reload the whole page.
    FullReload,
    /// Re-link stylesheets in place, keeping page state.
    RefreshCss,
}

impl ReloadMessage {
    /// Text frame payload understood by the client script.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullReload => "reload",
            Self::RefreshCss => "refreshcss",
        }
    }

    /// Classify a flushed change burst.
    ///
    /// A css-only burst maps to `RefreshCss` when css injection is enabled.
    /// Any non-stylesheet path, or injection being off, means a full reload.
    pub fn classify<'a>(
        paths: impl IntoIterator<Item = &'a Path>,
        css_injection: bool,
    ) -> Self {
        if !css_injection {
            return Self::FullReload;
        }

        let mut saw_any = false;
        for path in paths {
            saw_any = true;
            let is_css = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("css"));
            if !is_css {
                return Self::FullReload;
            }
        }

        if saw_any { Self::RefreshCss } else { Self::FullReload }
    }
}

impl std::fmt::Display for ReloadMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
