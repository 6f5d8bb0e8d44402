//! SVG export serializer.
//!
//! Emits one `<path>` element per filled region, in paint order, with an
//! even-odd fill rule so that hole loops traced with opposite winding
//! cut through their enclosing region.
//!
//! The document is assembled by hand rather than through a DOM so the
//! output is byte-for-byte stable:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!-- Generator: pixtrace -->
//! <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 W H" width="W" height="H">
//! <path d="..." fill="#rrggbb" fill-rule="evenodd" />
//! </svg>
//! ```
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use pixtrace_pipeline::raster::to_hex;
use pixtrace_pipeline::{Dimensions, FilledPath, TracedImage};

/// Comment identifying the producer, emitted after the XML declaration.
pub const GENERATOR: &str = "<!-- Generator: pixtrace -->";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render a single filled region as a `<path>` element.
#[must_use]
pub fn path_element(path: &FilledPath) -> String {
    format!(
        r#"<path d="{}" fill="{}" fill-rule="evenodd" />"#,
        path.data,
        to_hex(path.fill)
    )
}

/// Serialize filled regions into an SVG document string.
///
/// The `viewBox` and the `width`/`height` attributes are set from
/// [`Dimensions`] so the SVG coordinate space matches the source pixel
/// grid. Regions with empty path data are skipped.
///
/// # Examples
///
/// ```
/// use image::Rgb;
/// use pixtrace_pipeline::{Dimensions, FilledPath};
/// use pixtrace_export::to_svg_document;
///
/// let paths = vec![FilledPath {
///     data: "M 0,0 L 1,0 1,1 0,1 Z".to_owned(),
///     fill: Rgb([255, 0, 0]),
/// }];
/// let svg = to_svg_document(Dimensions { width: 1, height: 1 }, &paths);
/// assert!(svg.contains(r##"<path d="M 0,0 L 1,0 1,1 0,1 Z" fill="#ff0000" fill-rule="evenodd" />"##));
/// ```
#[must_use]
pub fn to_svg_document(dimensions: Dimensions, paths: &[FilledPath]) -> String {
    let Dimensions { width, height } = dimensions;
    let mut out = String::new();

    let _ = writeln!(out, "{XML_DECLARATION}");
    let _ = writeln!(out, "{GENERATOR}");
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#,
    );

    let body: Vec<String> = paths
        .iter()
        .filter(|path| !path.data.is_empty())
        .map(path_element)
        .collect();
    let _ = writeln!(out, "{}", body.join("\n"));

    out.push_str("</svg>");
    out
}

/// Serialize a pipeline result into an SVG document string.
///
/// See [`to_svg_document`].
#[must_use]
pub fn to_svg(traced: &TracedImage) -> String {
    to_svg_document(traced.dimensions, &traced.paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn filled(data: &str, fill: [u8; 3]) -> FilledPath {
        FilledPath {
            data: data.to_owned(),
            fill: Rgb(fill),
        }
    }

    #[test]
    fn empty_document_layout() {
        let svg = to_svg_document(dims(10, 10), &[]);
        assert_eq!(
            svg,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!-- Generator: pixtrace -->\n\
             <svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\" width=\"10\" height=\"10\">\n\
             \n\
             </svg>"
        );
    }

    #[test]
    fn path_element_format() {
        let path = filled("M 0,0 L 2,0 2,2 Z", [0, 128, 255]);
        assert_eq!(
            path_element(&path),
            r##"<path d="M 0,0 L 2,0 2,2 Z" fill="#0080ff" fill-rule="evenodd" />"##
        );
    }

    #[test]
    fn paths_keep_paint_order_one_per_line() {
        let paths = vec![
            filled("M 0,0 L 4,0 4,4 Z", [255, 255, 255]),
            filled("M 1,1 L 2,1 2,2 Z", [0, 0, 0]),
        ];
        let svg = to_svg_document(dims(4, 4), &paths);
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[3].contains("#ffffff"));
        assert!(lines[4].contains("#000000"));
        assert_eq!(lines[5], "</svg>");
    }

    #[test]
    fn empty_path_data_is_skipped() {
        let paths = vec![filled("", [1, 2, 3]), filled("M 0,0 L 1,0 Z", [4, 5, 6])];
        let svg = to_svg_document(dims(2, 2), &paths);
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(!svg.contains("#010203"));
    }

    #[test]
    fn viewbox_reflects_dimensions() {
        let svg = to_svg_document(dims(800, 600), &[]);
        assert!(svg.contains(r#"viewBox="0 0 800 600" width="800" height="600""#));
    }

    #[test]
    fn generator_comment_follows_declaration() {
        let svg = to_svg_document(dims(1, 1), &[]);
        let mut lines = svg.lines();
        assert_eq!(lines.next().unwrap(), XML_DECLARATION);
        assert_eq!(lines.next().unwrap(), GENERATOR);
    }
}
