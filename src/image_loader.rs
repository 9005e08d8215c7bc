//! # Image Loading and Decoding
//!
//! Loads images referenced by the layout (QR codes written to the render
//! workspace) and prepares them for PDF embedding. JPEG images pass through
//! without re-encoding (PDF decodes DCTDecode streams natively). PNG
//! images are decoded to RGB pixels with a separate alpha channel for SMask
//! transparency.

use std::io::Cursor;
use std::path::Path;

use crate::error::RenderError;

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
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Read and decode the image at `path`.
pub fn load_image(path: &Path) -> Result<LoadedImage, RenderError> {
    let image_error = |reason: String| RenderError::Image {
        path: path.to_path_buf(),
        reason,
    };
    let raw_bytes = std::fs::read(path).map_err(|e| image_error(e.to_string()))?;
    decode_image_bytes(&raw_bytes).map_err(image_error)
}

/// Detect image format from magic bytes and decode accordingly.
fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, String> {
    if data.len() < 4 {
        return Err("image data too short".to_string());
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err("unsupported image format (expected JPEG or PNG)".to_string())
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, String> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("JPEG format detection error: {e}"))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| format!("failed to read JPEG dimensions: {e}"))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers for the SOF segment and read its component count.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, String> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| format!("failed to decode PNG: {e}"))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = (width * height) as usize;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(img: &image::GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(decode_image_bytes(&[0x00, 0x01]).is_err());
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn test_decode_grayscale_png() {
        let img = image::GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 0 } else { 255 }]));
        let loaded = decode_image_bytes(&png_bytes(&img)).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[0, 0, 0, 255, 255, 255]);
                assert!(alpha.is_none(), "opaque PNG should have no alpha");
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_minimal_jpeg() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!(loaded.width_px, 2);
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert!(matches!(color_space, JpegColorSpace::DeviceRGB));
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image(Path::new("/nonexistent/qr-0.png")).unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
        assert!(err.to_string().contains("qr-0.png"));
    }
}
