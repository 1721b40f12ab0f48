//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Live-reload client script (livereload.js)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LivereloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LivereloadVars { ws_path: "/livereload" });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Variables for livereload.js.
    pub struct LivereloadVars<'a> {
        pub ws_path: &'a str,
    }

    impl TemplateVars for LivereloadVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__LIVESERVE_WS_PATH__", self.ws_path)
        }
    }

    /// Live-reload client with WebSocket path injection.
    pub const LIVERELOAD_JS: Template<LivereloadVars<'static>> =
        Template::new(include_str!("serve/livereload.js"));
}
