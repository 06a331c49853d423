//! # PDF Serializer
//!
//! Takes a laid-out [`Document`] and writes a PDF 1.7 file.
//!
//! This is a from-scratch writer covering the subset the reports need:
//! base-14 Helvetica text, filled and stroked (rounded) rectangles, raster
//! images, and URI link annotations. Writing the bytes directly keeps the
//! engine free of a PDF library and makes output byte-for-byte
//! reproducible for a given document and timestamp.
//!
//! ```text
//! %PDF-1.7
//! 1 0 obj  Catalog
//! 2 0 obj  Pages
//! 3 0 obj  /F0 Helvetica
//! 4 0 obj  /F1 Helvetica-Bold
//! ...      image XObjects, then per page: content stream, annotations, page
//! xref / trailer / %%EOF
//! ```
//!
//! Layout coordinates are top-left based; PDF user space is bottom-left, so
//! every y is flipped against the page height here.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::ExportError;
use crate::font::{FontContext, StandardFont};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::{Document, DrawCommand, RenderedPage};

const FONTS: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::HelveticaBold];
const COMPRESSION_LEVEL: u8 = 6;

#[derive(Default)]
pub struct PdfWriter {
    fonts: FontContext,
}

struct PdfObject {
    data: Vec<u8>,
}

/// Tracks allocated PDF objects while writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    font_ids: Vec<usize>,
    /// XObject id per distinct image, keyed by the shared allocation, so an
    /// image drawn several times is embedded once.
    image_ids: HashMap<*const LoadedImage, usize>,
    image_order: Vec<*const LoadedImage>,
}

impl PdfBuilder {
    fn new() -> Self {
        // Object ids are 1-based: 0 is a placeholder, 1 the catalog, 2 the
        // page tree.
        let mut objects = Vec::new();
        for _ in 0..3 {
            objects.push(PdfObject { data: Vec::new() });
        }
        Self {
            objects,
            font_ids: Vec::new(),
            image_ids: HashMap::new(),
            image_order: Vec::new(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            payload.len()
        );
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }

    fn image_index(&self, image: &Arc<LoadedImage>) -> Option<usize> {
        let ptr = Arc::as_ptr(image);
        self.image_order.iter().position(|p| *p == ptr)
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            fonts: FontContext::new(),
        }
    }

    /// Serialize a document. `created_at` becomes the Info
    /// `/CreationDate`.
    pub fn write(
        &self,
        document: &Document,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>, ExportError> {
        if document.pages.is_empty() {
            return Err(ExportError::Serialize("document has no pages".to_string()));
        }

        let mut builder = PdfBuilder::new();

        for font in FONTS {
            let dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            let id = builder.push(dict.into_bytes());
            builder.font_ids.push(id);
        }

        self.register_images(&mut builder, &document.pages);

        let mut page_ids = Vec::with_capacity(document.pages.len());
        for page in &document.pages {
            let content = self.build_content_stream(page, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), COMPRESSION_LEVEL);
            let content_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let annot_ids = self.write_link_annotations(&mut builder, page);

            let mut resources = format!("/Font << {} >>", font_resource_dict(&builder));
            let xobjects = xobject_resource_dict(&builder, page);
            if !xobjects.is_empty() {
                let _ = write!(resources, " /XObject << {} >>", xobjects);
            }

            let mut page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >>",
                page.width, page.height, content_id, resources
            );
            if !annot_ids.is_empty() {
                let refs: Vec<String> = annot_ids.iter().map(|id| format!("{} 0 R", id)).collect();
                let _ = write!(page_dict, " /Annots [{}]", refs.join(" "));
            }
            page_dict.push_str(" >>");
            page_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_ids.len()
        )
        .into_bytes();

        let mut info = format!(
            "<< /Title ({}) /Producer (casereport {}) ",
            encode_text(&document.title),
            env!("CARGO_PKG_VERSION")
        );
        if let Some(ts) = created_at {
            let _ = write!(info, "/CreationDate (D:{}Z) ", ts.format("%Y%m%d%H%M%S"));
        }
        info.push_str(">>");
        let info_id = builder.push(info.into_bytes());

        Ok(serialize(&builder, info_id))
    }

    fn register_images(&self, builder: &mut PdfBuilder, pages: &[RenderedPage]) {
        for page in pages {
            for command in page.all_commands() {
                if let DrawCommand::Image { image, .. } = command {
                    let ptr = Arc::as_ptr(image);
                    if builder.image_ids.contains_key(&ptr) {
                        continue;
                    }
                    let id = write_image_xobject(builder, image);
                    builder.image_ids.insert(ptr, id);
                    builder.image_order.push(ptr);
                }
            }
        }
    }

    fn build_content_stream(&self, page: &RenderedPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        let page_height = page.height;

        for command in page.all_commands() {
            match command {
                DrawCommand::Rect {
                    x,
                    y,
                    width,
                    height,
                    radius,
                    fill,
                    stroke,
                } => {
                    let op = match (fill, stroke) {
                        (Some(_), Some(_)) => "B",
                        (Some(_), None) => "f",
                        (None, Some(_)) => "S",
                        (None, None) => continue,
                    };
                    stream.push_str("q\n");
                    if let Some(c) = fill {
                        let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
                    }
                    if let Some(c) = stroke {
                        let _ = writeln!(stream, "{:.3} {:.3} {:.3} RG\n0.75 w", c.r, c.g, c.b);
                    }
                    let pdf_y = page_height - y - height;
                    if *radius > 0.0 {
                        write_rounded_rect(&mut stream, *x, pdf_y, *width, *height, *radius);
                    } else {
                        let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, pdf_y, width, height);
                    }
                    let _ = writeln!(stream, "{}\nQ", op);
                }

                DrawCommand::Text {
                    x,
                    y,
                    line_height,
                    size,
                    text,
                    bold,
                    color,
                    ..
                } => {
                    let font_index = usize::from(*bold);
                    let baseline = baseline(*y, *line_height, *size);
                    let _ = write!(
                        stream,
                        "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                        color.r,
                        color.g,
                        color.b,
                        font_index,
                        size,
                        x,
                        page_height - baseline,
                        encode_text(text)
                    );
                }

                DrawCommand::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    let pdf_y = page_height - y - height;
                    match builder.image_index(image) {
                        Some(idx) => {
                            let _ = write!(
                                stream,
                                "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                                width, height, x, pdf_y, idx
                            );
                        }
                        None => {
                            let _ = write!(
                                stream,
                                "q\n0.9 0.9 0.9 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                                x, pdf_y, width, height
                            );
                        }
                    }
                }
            }
        }

        stream
    }

    /// One `/Link` annotation per linked text line, covering its line box.
    fn write_link_annotations(&self, builder: &mut PdfBuilder, page: &RenderedPage) -> Vec<usize> {
        let mut ids = Vec::new();
        for command in page.all_commands() {
            if let DrawCommand::Text {
                x,
                y,
                line_height,
                size,
                text,
                bold,
                link: Some(uri),
                ..
            } = command
            {
                let width = self.fonts.measure_string(text, *bold, *size);
                let dict = format!(
                    "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
                     /Border [0 0 0] /A << /S /URI /URI ({}) >> >>",
                    x,
                    page.height - y - line_height,
                    x + width,
                    page.height - y,
                    escape_pdf_string(uri)
                );
                ids.push(builder.push(dict.into_bytes()));
            }
        }
        ids
    }
}

/// Baseline for a line of `size` text vertically centred in its line box.
fn baseline(top: f64, line_height: f64, size: f64) -> f64 {
    top + line_height / 2.0 + size * 0.35
}

/// Write one image as an XObject, plus an SMask for decoded images with
/// alpha. Returns the main XObject id.
fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg {
            data,
            color_space,
            invert_cmyk,
        } => {
            let color_space = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
                JpegColorSpace::DeviceCMYK => "/DeviceCMYK",
            };
            let mut dict = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                 /BitsPerComponent 8 /Filter /DCTDecode",
                image.width_px, image.height_px, color_space
            );
            if *invert_cmyk {
                dict.push_str(" /Decode [1 0 1 0 1 0 1 0]");
            }
            builder.push_stream(&dict, data)
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let compressed = compress_to_vec_zlib(alpha, COMPRESSION_LEVEL);
                let dict = format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray \
                     /BitsPerComponent 8 /Filter /FlateDecode",
                    image.width_px, image.height_px
                );
                builder.push_stream(&dict, &compressed)
            });

            let compressed = compress_to_vec_zlib(rgb, COMPRESSION_LEVEL);
            let smask_ref = smask
                .map(|id| format!(" /SMask {} 0 R", id))
                .unwrap_or_default();
            let dict = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
                 /BitsPerComponent 8 /Filter /FlateDecode{}",
                image.width_px, image.height_px, smask_ref
            );
            builder.push_stream(&dict, &compressed)
        }
    }
}

fn write_rounded_rect(stream: &mut String, x: f64, y: f64, w: f64, h: f64, radius: f64) {
    let k = 0.5522847498;
    let r = radius.min(w / 2.0).min(h / 2.0);

    let _ = writeln!(stream, "{:.2} {:.2} m", x + r, y);
    let _ = writeln!(stream, "{:.2} {:.2} l", x + w - r, y);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + w - r + r * k, y,
        x + w, y + r - r * k,
        x + w, y + r
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x + w, y + h - r);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + w, y + h - r + r * k,
        x + w - r + r * k, y + h,
        x + w - r, y + h
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x + r, y + h);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x + r - r * k, y + h,
        x, y + h - r + r * k,
        x, y + h - r
    );
    let _ = writeln!(stream, "{:.2} {:.2} l", x, y + r);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        x, y + r - r * k,
        x + r - r * k, y,
        x + r, y
    );
    stream.push_str("h\n");
}

fn font_resource_dict(builder: &PdfBuilder) -> String {
    builder
        .font_ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!("/F{} {} 0 R", i, id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `/ImN` entries for the images drawn on `page`.
fn xobject_resource_dict(builder: &PdfBuilder, page: &RenderedPage) -> String {
    let mut used: Vec<usize> = page
        .all_commands()
        .filter_map(|c| match c {
            DrawCommand::Image { image, .. } => builder.image_index(image),
            _ => None,
        })
        .collect();
    used.sort_unstable();
    used.dedup();
    used.iter()
        .filter_map(|idx| {
            let ptr = builder.image_order[*idx];
            builder
                .image_ids
                .get(&ptr)
                .map(|id| format!("/Im{} {} 0 R", idx, id))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encode text as the body of a PDF literal string in WinAnsiEncoding.
/// Characters outside the encoding become `?`.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Map a Unicode scalar to its WinAnsiEncoding (Windows-1252) byte.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        // Tabs would otherwise print as '?'.
        0x09 => Some(b' '),
        _ => None,
    }
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(builder: &PdfBuilder, info_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    output.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_id,
        xref_offset
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::decode_image_bytes;
    use crate::image_loader::tests::png_bytes;
    use crate::model::PageGeometry;
    use crate::style::Color;
    use chrono::TimeZone;

    fn document(commands: Vec<DrawCommand>) -> Document {
        let geometry = PageGeometry::a4();
        let mut page = RenderedPage::new(0, &geometry);
        page.commands = commands;
        Document {
            geometry,
            title: "Report (draft)".to_string(),
            pages: vec![page],
        }
    }

    fn text(s: &str, link: Option<&str>) -> DrawCommand {
        DrawCommand::Text {
            x: 40.0,
            y: 40.0,
            line_height: 15.0,
            size: 10.0,
            text: s.to_string(),
            bold: false,
            color: Color::BLACK,
            link: link.map(str::to_string),
        }
    }

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_encode_text_winansi() {
        assert_eq!(encode_text("a(b)"), "a\\(b\\)");
        assert_eq!(encode_text("café"), "caf\\351");
        assert_eq!(encode_text("\u{2014}"), "\\227");
        assert_eq!(encode_text("中"), "?");
    }

    #[test]
    fn test_structure_and_metadata() {
        let created = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();
        let bytes = PdfWriter::new()
            .write(&document(vec![text("Hello", None)]), Some(created))
            .unwrap();
        let s = as_text(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(s.contains("xref"));
        assert!(s.trim_end().ends_with("%%EOF"));
        assert!(s.contains("/BaseFont /Helvetica "));
        assert!(s.contains("/BaseFont /Helvetica-Bold"));
        assert!(s.contains("/Title (Report \\(draft\\))"));
        assert!(s.contains("/CreationDate (D:20261015093000Z)"));
        assert!(s.contains("/Count 1"));
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let doc = Document {
            geometry: PageGeometry::a4(),
            title: String::new(),
            pages: Vec::new(),
        };
        assert!(matches!(
            PdfWriter::new().write(&doc, None),
            Err(ExportError::Serialize(_))
        ));
    }

    #[test]
    fn test_link_annotation() {
        let bytes = PdfWriter::new()
            .write(&document(vec![text("1. invoice.pdf", Some("https://f/invoice.pdf"))]), None)
            .unwrap();
        let s = as_text(&bytes);
        assert!(s.contains("/Subtype /Link"));
        assert!(s.contains("/URI (https://f/invoice.pdf)"));
        assert!(s.contains("/Annots ["));
    }

    #[test]
    fn test_shared_image_embedded_once() {
        let image = Arc::new(decode_image_bytes(&png_bytes(2, 2, [10, 20, 30, 128])).unwrap());
        let draw = |y: f64| DrawCommand::Image {
            x: 40.0,
            y,
            width: 20.0,
            height: 20.0,
            image: Arc::clone(&image),
        };
        let bytes = PdfWriter::new()
            .write(&document(vec![draw(40.0), draw(80.0)]), None)
            .unwrap();
        let s = as_text(&bytes);
        // One RGB XObject plus its SMask.
        assert_eq!(s.matches("/Subtype /Image").count(), 2);
        assert!(s.contains("/SMask"));
        assert!(s.contains("/Im0"));
    }

    #[test]
    fn test_inverted_cmyk_jpeg_gets_decode_array() {
        let jpeg = |invert_cmyk: bool| {
            Arc::new(LoadedImage {
                pixel_data: ImagePixelData::Jpeg {
                    data: vec![0xFF, 0xD8, 0xFF, 0xD9],
                    color_space: JpegColorSpace::DeviceCMYK,
                    invert_cmyk,
                },
                width_px: 2,
                height_px: 2,
            })
        };
        let draw = |image: Arc<LoadedImage>| DrawCommand::Image {
            x: 40.0,
            y: 40.0,
            width: 20.0,
            height: 20.0,
            image,
        };

        let inverted = as_text(&PdfWriter::new().write(&document(vec![draw(jpeg(true))]), None).unwrap());
        assert!(inverted.contains("/ColorSpace /DeviceCMYK"));
        assert!(inverted.contains("/Decode [1 0 1 0 1 0 1 0]"));

        let plain = as_text(&PdfWriter::new().write(&document(vec![draw(jpeg(false))]), None).unwrap());
        assert!(!plain.contains("/Decode"));
    }

    #[test]
    fn test_rounded_rect_path() {
        let mut stream = String::new();
        write_rounded_rect(&mut stream, 0.0, 0.0, 120.0, 22.0, 6.0);
        assert!(stream.starts_with("6.00 0.00 m"));
        assert_eq!(stream.matches(" c\n").count(), 4);
        assert!(stream.ends_with("h\n"));
    }

    #[test]
    fn test_baseline_centres_text() {
        let b = baseline(100.0, 14.0, 10.0);
        assert!(b > 100.0 + 7.0 && b < 114.0);
    }
}
