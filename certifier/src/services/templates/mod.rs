//! # Certificate templates
//!
//! - `text`: placeholder substitution and the `*italic*` / `**bold**` markup.
//! - `pdf`: lays the texts out on a page and writes the PDF.
//! - `background`: the full-page image, or its solid fallback.

mod background;
pub mod pdf;
pub mod text;

pub use background::BackgroundKind;
