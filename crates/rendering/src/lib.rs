//! Document rendering: company branding + content → HTML documents.
//!
//! Rendering is a pure function of its inputs; the same company, content,
//! template, and paper size always produce byte-identical output.

pub mod html;
pub mod render;

pub use render::{
    LetterheadRequest, RenderError, RenderedDocument, parse_selection, render_invoice,
    render_letterhead,
};
