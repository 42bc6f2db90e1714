//! HTML table codec.
//!
//! `GridToHtml` serializes a matrix fragment to an annotated `<table>`
//! fragment. `HtmlToGrid` parses foreign HTML back into a `CopyDataModel`
//! through a pluggable set of per-producer recognizers, falling back to a
//! generic table reader.

mod from_html;
mod plugins;
mod to_html;

pub use from_html::{read_table, HtmlToGrid};
pub use plugins::{GridPastePlugin, PastePlugin, WordPastePlugin};
pub use to_html::GridToHtml;
