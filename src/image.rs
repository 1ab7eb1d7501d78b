//! Bitmap re-encoding for `<img>` elements.
//!
//! The browser-equivalent step: the image is already resolved and decoded
//! by the time translation runs, and this only redraws the pixels at the
//! element's rendered size and exports them as an embeddable data URL. No
//! network fetch happens here.

use crate::error::GalleyError;
use base64::Engine;
use image::GenericImageView;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;

/// Re-encoded bitmap: the payload plus the pixel size it was drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub data_url: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Pixel capability: produce the encoded payload for an image source,
/// scaled to the rendered `target` size when one is known, in the format
/// named by `format` (a bare suffix token like `png` or `jpeg`).
pub trait PixelSource {
    fn raster(
        &self,
        src: &str,
        target: Option<(u32, u32)>,
        format: &str,
    ) -> Result<Raster, GalleyError>;
}

/// Bundled [`PixelSource`]: decodes base64 data URLs and local files,
/// scales with a triangle filter and re-encodes through the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct EagerPixels {
    base_dir: Option<PathBuf>,
}

impl EagerPixels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative file sources against `dir` instead of the process
    /// working directory.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve_bytes(&self, src: &str) -> Result<Vec<u8>, GalleyError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(GalleyError::ImageEncode("image has no source".to_string()));
        }
        if let Some(rest) = src.strip_prefix("data:") {
            let Some((header, payload)) = rest.split_once(',') else {
                return Err(GalleyError::ImageEncode(format!(
                    "malformed data url: {src}"
                )));
            };
            if !header.contains(";base64") {
                return Err(GalleyError::ImageEncode(
                    "only base64 data urls are supported".to_string(),
                ));
            }
            return base64::engine::general_purpose::STANDARD
                .decode(payload.as_bytes())
                .map_err(|err| GalleyError::ImageEncode(format!("data url payload: {err}")));
        }
        let path_text = src.strip_prefix("file://").unwrap_or(src);
        let path_text = path_text.split('#').next().unwrap_or(path_text);
        let path = match &self.base_dir {
            Some(base) => base.join(path_text),
            None => PathBuf::from(path_text),
        };
        Ok(std::fs::read(path)?)
    }
}

impl PixelSource for EagerPixels {
    fn raster(
        &self,
        src: &str,
        target: Option<(u32, u32)>,
        format: &str,
    ) -> Result<Raster, GalleyError> {
        let bytes = self.resolve_bytes(src)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| GalleyError::ImageEncode(format!("decode {src}: {err}")))?;
        let (width, height) = match target {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => decoded.dimensions(),
        };
        let scaled = if (width, height) != decoded.dimensions() {
            decoded.resize_exact(width, height, FilterType::Triangle)
        } else {
            decoded
        };
        let (encode_format, mime) = match format.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => (ImageFormat::Jpeg, "image/jpeg"),
            // anything unrecognized falls back to png, like a canvas export
            _ => (ImageFormat::Png, "image/png"),
        };
        let mut encoded = Cursor::new(Vec::new());
        let write_result = if encode_format == ImageFormat::Jpeg {
            // jpeg has no alpha channel
            DynamicImage::ImageRgb8(scaled.to_rgb8()).write_to(&mut encoded, encode_format)
        } else {
            scaled.write_to(&mut encoded, encode_format)
        };
        write_result.map_err(|err| GalleyError::ImageEncode(format!("encode {src}: {err}")))?;
        let payload = base64::engine::general_purpose::STANDARD.encode(encoded.into_inner());
        Ok(Raster {
            data_url: format!("data:{mime};base64,{payload}"),
            width_px: width,
            height_px: height,
        })
    }
}

/// Format token for an image source: the suffix after the last `.`, with
/// png as the fallback when there is none.
pub(crate) fn format_token(src: &str) -> &str {
    match src.rfind('.') {
        Some(index) if index + 1 < src.len() => &src[index + 1..],
        _ => "png",
    }
}
