//! QR code encoding: payload text in, PNG bytes out.
//!
//! The module matrix comes from `qrcode`; the bitmap is painted by hand so
//! the module size and quiet zone follow the style sheet exactly.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::{GrayImage, ImageOutputFormat, Luma};
use qrcode::{Color as Module, EcLevel, QrCode};

use crate::error::QrError;
use crate::style::QrStyle;

/// Encodes text into a PNG image.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u8>, QrError>;
}

/// The production encoder.
#[derive(Debug, Clone, Copy)]
pub struct PngQrEncoder {
    pub error_correction: EcLevel,
    /// Pixels per module.
    pub module_px: u32,
    /// Quiet zone width in modules.
    pub quiet_zone: u32,
}

impl PngQrEncoder {
    pub fn from_style(style: &QrStyle) -> Self {
        Self {
            error_correction: style.error_correction,
            module_px: style.module_px.max(1),
            quiet_zone: style.quiet_zone,
        }
    }
}

impl QrEncoder for PngQrEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), self.error_correction)
            .map_err(|e| QrError::Encode(e.to_string()))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * self.quiet_zone) * self.module_px;

        let img = GrayImage::from_fn(side, side, |x, y| {
            let mx = (x / self.module_px).checked_sub(self.quiet_zone);
            let my = (y / self.module_px).checked_sub(self.quiet_zone);
            match (mx, my) {
                (Some(mx), Some(my)) if mx < modules && my < modules => {
                    match colors[(my * modules + mx) as usize] {
                        Module::Dark => Luma([0]),
                        Module::Light => Luma([255]),
                    }
                }
                _ => Luma([255]),
            }
        });

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Png)
            .map_err(|e| QrError::Image(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// Run `encoder` on a worker thread and give up after `timeout`.
///
/// A timed-out worker is detached; its result is discarded.
pub fn encode_with_timeout(
    encoder: Arc<dyn QrEncoder>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<u8>, QrError> {
    let (tx, rx) = mpsc::channel();
    let payload = text.to_string();
    thread::spawn(move || {
        let _ = tx.send(encoder.encode(&payload));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(QrError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(QrError::Encode("encoder thread panicked".to_string()))
        }
    }
}

/// An encoder wrapper that bounds every call with [`encode_with_timeout`].
#[derive(Clone)]
pub struct TimedEncoder {
    inner: Arc<dyn QrEncoder>,
    timeout: Duration,
}

impl TimedEncoder {
    pub fn new(inner: Arc<dyn QrEncoder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl QrEncoder for TimedEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u8>, QrError> {
        encode_with_timeout(Arc::clone(&self.inner), text, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleSheet;

    struct SlowEncoder(Duration);

    impl QrEncoder for SlowEncoder {
        fn encode(&self, _text: &str) -> Result<Vec<u8>, QrError> {
            thread::sleep(self.0);
            Ok(vec![1, 2, 3])
        }
    }

    fn encoder() -> PngQrEncoder {
        PngQrEncoder::from_style(&StyleSheet::royal().qr)
    }

    #[test]
    fn test_encodes_png_with_quiet_zone() {
        let bytes = encoder()
            .encode("https://www.google.com/maps/search/?api=1&query=32.6468089,43.978243")
            .unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let img = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(img.width(), img.height());
        assert_eq!(img.width() % 10, 0);
        // quiet zone is white, the finder pattern corner is dark
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(39, 39)[0], 255);
        assert_eq!(img.get_pixel(40, 40)[0], 0);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encoder().encode("https://example.com/photo.jpg").unwrap();
        let b = encoder().encode("https://example.com/photo.jpg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_higher_error_correction_is_not_smaller() {
        let text = "https://www.google.com/maps/search/?api=1&query=33.3152,44.3661";
        let low = PngQrEncoder {
            error_correction: EcLevel::L,
            module_px: 1,
            quiet_zone: 0,
        };
        let high = PngQrEncoder {
            error_correction: EcLevel::H,
            ..low
        };
        let side = |e: &PngQrEncoder| image::load_from_memory(&e.encode(text).unwrap()).unwrap().width();
        assert!(side(&high) >= side(&low));
    }

    #[test]
    fn test_oversized_payload_fails() {
        let huge = "x".repeat(8000);
        assert!(matches!(encoder().encode(&huge), Err(QrError::Encode(_))));
    }

    #[test]
    fn test_timeout_is_a_failure() {
        let slow: Arc<dyn QrEncoder> = Arc::new(SlowEncoder(Duration::from_millis(500)));
        let result = encode_with_timeout(slow, "payload", Duration::from_millis(20));
        assert!(matches!(result, Err(QrError::Timeout(_))));
    }

    #[test]
    fn test_timed_encoder_passes_results_through() {
        let timed = TimedEncoder::new(Arc::new(encoder()), Duration::from_secs(10));
        assert!(timed.encode("hello").unwrap().starts_with(&[0x89]));
    }
}
