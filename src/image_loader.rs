//! # Image Loading and Decoding
//!
//! Resolves image sources (http(s) URLs and data URIs) into pixel data ready
//! for PDF embedding. Sources come from record data, so anything else,
//! local paths and `file:` URLs included, is skipped without being read.
//! JPEG images pass through without re-encoding (DCTDecode). PNG, WebP, and GIF are decoded to RGB pixels
//! with a separate alpha channel for SMask transparency.
//!
//! Nothing in here fails an export. A source that cannot be fetched or
//! decoded becomes [`ImageResolution::Skipped`] with a reason, is logged at
//! warn level, and the caller renders nothing in its place.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
        /// CMYK samples are stored inverted (Adobe APP14 marker, as written
        /// by Photoshop). The writer flips them back with a /Decode array.
        invert_cmyk: bool,
    },
    /// Decoded RGB pixels and an optional alpha channel.
    Decoded {
        /// width * height * 3 bytes
        rgb: Vec<u8>,
        /// width * height bytes. None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
    DeviceCMYK,
}

// ── Fetching ───────────────────────────────────────────────────

/// Raw response from an [`ImageFetcher`].
#[derive(Debug, Clone, Default)]
pub struct FetchedBytes {
    /// The `Content-Type` header, when the transport reported one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Network primitive used to retrieve remote images.
///
/// Implementations should stop reading once more than `max_bytes` have
/// arrived; the resolver rejects anything over the limit either way.
pub trait ImageFetcher {
    fn fetch(&self, url: &str, max_bytes: u64) -> Result<FetchedBytes, String>;
}

/// Blocking HTTP(S) fetcher with a request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, max_bytes: u64) -> Result<FetchedBytes, String> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| format!("request failed: {}", e))?;

        let content_type = response
            .header("Content-Type")
            .map(|v| v.to_string());

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| format!("failed to read body: {}", e))?;

        Ok(FetchedBytes {
            content_type,
            bytes,
        })
    }
}

// ── Resolution ─────────────────────────────────────────────────

/// Why an image source was left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("empty source")]
    EmptySource,
    #[error("unsupported source; only http(s) and data: URIs are loaded")]
    UnsupportedSource,
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("content type {content_type:?} is not an image")]
    NotAnImage { content_type: String },
    #[error("larger than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub enum ImageResolution {
    Ready(Arc<LoadedImage>),
    Skipped(SkipReason),
}

impl ImageResolution {
    pub fn image(&self) -> Option<&Arc<LoadedImage>> {
        match self {
            ImageResolution::Ready(img) => Some(img),
            ImageResolution::Skipped(_) => None,
        }
    }
}

/// Per-export image resolver. Each source is fetched at most once; later
/// requests for the same source reuse the first outcome.
pub struct ImageResolver<'a> {
    fetcher: &'a dyn ImageFetcher,
    max_bytes: u64,
    cache: HashMap<String, ImageResolution>,
}

impl<'a> ImageResolver<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, max_bytes: u64) -> Self {
        Self {
            fetcher,
            max_bytes,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, source: &str) -> ImageResolution {
        let source = source.trim();
        if let Some(hit) = self.cache.get(source) {
            return hit.clone();
        }

        let resolution = match self.load(source) {
            Ok(image) => ImageResolution::Ready(Arc::new(image)),
            Err(reason) => {
                log::warn!("Skipping image {}: {}", loggable_source(source), reason);
                ImageResolution::Skipped(reason)
            }
        };
        self.cache.insert(source.to_string(), resolution.clone());
        resolution
    }

    /// Number of distinct sources seen so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn load(&self, source: &str) -> Result<LoadedImage, SkipReason> {
        if source.is_empty() {
            return Err(SkipReason::EmptySource);
        }

        let fetched = if has_scheme(source, "data:") {
            decode_data_uri(source)?
        } else if has_scheme(source, "http://") || has_scheme(source, "https://") {
            self.fetcher
                .fetch(source, self.max_bytes)
                .map_err(SkipReason::Fetch)?
        } else {
            return Err(SkipReason::UnsupportedSource);
        };

        if fetched.bytes.len() as u64 > self.max_bytes {
            return Err(SkipReason::TooLarge {
                limit: self.max_bytes,
            });
        }
        if let Some(ct) = fetched.content_type.as_deref() {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            if !essence.is_empty() && !essence.starts_with("image/") {
                return Err(SkipReason::NotAnImage {
                    content_type: ct.to_string(),
                });
            }
        }

        decode_image_bytes(&fetched.bytes).map_err(SkipReason::Decode)
    }
}

fn loggable_source(source: &str) -> String {
    const MAX: usize = 80;
    if source.len() <= MAX {
        return source.to_string();
    }
    let cut = source
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!("{}...", &source[..cut])
}

fn has_scheme(source: &str, scheme: &str) -> bool {
    source
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

/// Decode `data:<mime>;base64,<payload>`.
fn decode_data_uri(uri: &str) -> Result<FetchedBytes, SkipReason> {
    let comma = uri
        .find(',')
        .ok_or_else(|| SkipReason::Decode("invalid data URI: missing comma".to_string()))?;
    let header = uri.get("data:".len()..comma).unwrap_or("");
    let payload = &uri[comma + 1..];

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or("").trim();
    if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(SkipReason::Decode(
            "only base64 data URIs are supported".to_string(),
        ));
    }

    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SkipReason::Decode(format!("base64 decode error: {}", e)))?;

    Ok(FetchedBytes {
        content_type: (!mime.is_empty()).then(|| mime.to_string()),
        bytes,
    })
}

// ── Decoding ───────────────────────────────────────────────────

/// Detect image format from magic bytes and decode accordingly.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, String> {
    if data.len() < 4 {
        return Err("image data too short".to_string());
    }

    let image = if is_jpeg(data) {
        decode_jpeg(data)?
    } else if is_png(data) || is_gif(data) || is_webp(data) {
        decode_to_rgb(data)?
    } else {
        return Err("unsupported image format (expected JPEG, PNG, WebP, or GIF)".to_string());
    };

    if image.width_px == 0 || image.height_px == 0 {
        return Err("image has zero width or height".to_string());
    }
    Ok(image)
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

fn is_gif(data: &[u8]) -> bool {
    data.starts_with(b"GIF8")
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, String> {
    let (width, height) = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| format!("failed to read JPEG dimensions: {}", e))?;

    let (color_space, adobe) = scan_jpeg_markers(data);
    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space,
            invert_cmyk: adobe && color_space == JpegColorSpace::DeviceCMYK,
        },
        width_px: width,
        height_px: height,
    })
}

/// Walk the JPEG markers up to the SOF segment. Returns the color space
/// from its component count and whether an Adobe APP14 segment came first.
fn scan_jpeg_markers(data: &[u8]) -> (JpegColorSpace, bool) {
    let mut adobe = false;
    let mut i = 2;
    while i + 3 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            let color_space = match data[i + 9] {
                1 => JpegColorSpace::DeviceGray,
                4 => JpegColorSpace::DeviceCMYK,
                _ => JpegColorSpace::DeviceRGB,
            };
            return (color_space, adobe);
        }
        if marker == 0xEE && data.get(i + 4..i + 9) == Some(b"Adobe".as_slice()) {
            adobe = true;
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + seg_len;
    }
    (JpegColorSpace::DeviceRGB, adobe)
}

/// Decode to RGBA, then split into RGB and alpha.
fn decode_to_rgb(data: &[u8]) -> Result<LoadedImage, String> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("format detection error: {}", e))?
        .decode()
        .map_err(|e| format!("failed to decode image: {}", e))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = width as usize * height as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

// ── Scaling ────────────────────────────────────────────────────

/// Fit `(width, height)` inside `(max_width, max_height)` keeping the
/// aspect ratio: clamp width first, then height. Never upscales.
pub fn scale_to_fit(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    let (mut w, mut h) = (width, height);
    if w > max_width {
        let ratio = max_width / w;
        w = max_width;
        h *= ratio;
    }
    if h > max_height {
        let ratio = max_height / h;
        h = max_height;
        w *= ratio;
    }
    (w, h)
}
