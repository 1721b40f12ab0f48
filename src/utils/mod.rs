//! Shared utilities.
//!
//! - [`mime`]: MIME type detection for HTTP responses
//! - [`html`]: HTML escaping for rendered pages
//! - [`fs`]: path normalization and display formatting

pub mod fs;
pub mod html;
pub mod mime;
