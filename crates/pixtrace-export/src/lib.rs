//! pixtrace-export: SVG document assembly (sans-IO)
//!
//! Turns the filled regions produced by `pixtrace-pipeline` into a
//! complete SVG document string.

pub mod svg;

pub use svg::{GENERATOR, path_element, to_svg, to_svg_document};
