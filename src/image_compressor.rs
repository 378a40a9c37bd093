use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use log::{debug, warn};

use crate::thumbnail_types::{MAX_THUMBNAIL_BYTES, RECOMPRESS_QUALITIES};

/// Result of size limiting: the bytes to serve and their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitedImage {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Recompresses `body` as JPEG when it exceeds `max_bytes`, trying each
/// quality in turn and keeping the first that fits (or the last tried).
/// Undecodable input is returned untouched.
pub fn limit_image_size(
    body: Vec<u8>,
    content_type: &str,
    max_bytes: usize,
    label: &str,
) -> LimitedImage {
    if body.len() <= max_bytes {
        return LimitedImage {
            body,
            content_type: content_type.to_string(),
        };
    }

    match recompress(&body, max_bytes) {
        Ok(compressed) => {
            debug!(
                "Recompressed {} from {} to {} bytes",
                label,
                body.len(),
                compressed.len()
            );
            LimitedImage {
                body: compressed,
                content_type: "image/jpeg".to_string(),
            }
        }
        Err(e) => {
            warn!("Failed to compress image {}: {:#}", label, e);
            LimitedImage {
                body,
                content_type: content_type.to_string(),
            }
        }
    }
}

/// [`limit_image_size`] on the blocking pool, since decoding and re-encoding
/// a large image would otherwise stall a runtime worker.
pub async fn limit_image_size_blocking(
    body: Vec<u8>,
    content_type: String,
    max_bytes: usize,
    label: String,
) -> Result<LimitedImage> {
    tokio::task::spawn_blocking(move || limit_image_size(body, &content_type, max_bytes, &label))
        .await
        .context("Image compression task failed")
}

pub async fn limit_thumbnail(
    body: Vec<u8>,
    content_type: String,
    label: String,
) -> Result<LimitedImage> {
    limit_image_size_blocking(body, content_type, MAX_THUMBNAIL_BYTES, label).await
}

fn recompress(body: &[u8], max_bytes: usize) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(body).context("Failed to decode image")?;
    let rgb = flatten_onto_white(decoded);

    let mut output = Vec::new();
    for quality in RECOMPRESS_QUALITIES {
        output.clear();
        JpegEncoder::new_with_quality(&mut output, quality)
            .encode_image(&rgb)
            .with_context(|| format!("Failed to encode JPEG at quality {}", quality))?;
        if output.len() <= max_bytes {
            break;
        }
    }

    Ok(output)
}

/// JPEG has no alpha channel, so transparent pixels are composited on white.
fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 128])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_small_images_pass_through() {
        let body = vec![1, 2, 3];
        let limited = limit_image_size(body.clone(), "image/webp", 10, "small");
        assert_eq!(limited.body, body);
        assert_eq!(limited.content_type, "image/webp");
    }

    #[test]
    fn test_oversized_image_is_recompressed_to_jpeg() {
        let body = png_bytes(64, 64);
        let max = body.len() - 1;
        let limited = limit_image_size(body, "image/png", max, "oversized");
        assert_eq!(limited.content_type, "image/jpeg");
        // JPEG SOI marker
        assert_eq!(&limited.body[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_recompression_runs_on_blocking_pool() {
        let body = png_bytes(64, 64);
        let max = body.len() - 1;
        let limited = limit_image_size_blocking(
            body,
            "image/png".to_string(),
            max,
            "pooled".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(limited.content_type, "image/jpeg");
        assert!(limited.body.len() <= max);
    }

    #[test]
    fn test_undecodable_image_is_returned_untouched() {
        let body = vec![0u8; 64];
        let limited = limit_image_size(body.clone(), "image/jpeg", 10, "garbage");
        assert_eq!(limited.body, body);
        assert_eq!(limited.content_type, "image/jpeg");
    }

    #[test]
    fn test_flatten_onto_white() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let rgb = flatten_onto_white(DynamicImage::ImageRgba8(img));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);

        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let rgb = flatten_onto_white(DynamicImage::ImageRgba8(img));
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
