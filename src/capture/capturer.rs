use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::{info, warn};

use crate::capture::debug_sink::DebugSink;
use crate::capture::source::ScreenSource;
use crate::error::CaptureError;

/// One encoded capture, consumed exactly once by perception.
#[derive(Clone)]
pub struct Snapshot {
    jpeg: Vec<u8>,
    pub seq: u64,
    pub captured_at: DateTime<Utc>,
    pub monitor_index: usize,
}

impl Snapshot {
    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    /// Transport-safe form for embedding in a request payload.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.jpeg)
    }
}

pub struct Capturer<S: ScreenSource> {
    source: S,
    monitor_index: usize,
    jpeg_quality: u8,
    seq: u64,
    debug_sink: Option<DebugSink>,
}

impl<S: ScreenSource> Capturer<S> {
    /// Resolves the requested monitor index once at startup. An index past
    /// the enumerated display count falls back to the primary display (1).
    pub fn new(
        source: S,
        requested_index: usize,
        jpeg_quality: u8,
        debug_sink: Option<DebugSink>,
    ) -> Result<Self, CaptureError> {
        let displays = source.displays()?;
        if displays.is_empty() {
            return Err(CaptureError::NoDisplays);
        }
        for (i, disp) in displays.iter().enumerate() {
            info!(
                "Monitor {}: {}x{} at ({}, {}){}",
                i + 1,
                disp.width,
                disp.height,
                disp.x,
                disp.y,
                if disp.is_primary { " [primary]" } else { "" }
            );
        }
        let monitor_index = if requested_index > displays.len() {
            warn!(
                "Monitor {} not found ({} available), using primary monitor (1)",
                requested_index,
                displays.len()
            );
            1
        } else {
            requested_index
        };
        info!("Capturing from monitor {}", monitor_index);
        Ok(Self {
            source,
            monitor_index,
            jpeg_quality,
            seq: 0,
            debug_sink,
        })
    }

    pub fn monitor_index(&self) -> usize {
        self.monitor_index
    }

    /// Grabs one frame, persists the debug copy when configured, and
    /// returns the JPEG-encoded snapshot.
    pub fn grab(&mut self) -> Result<Snapshot, CaptureError> {
        let raw = self.source.grab(self.monitor_index)?;
        self.seq += 1;
        let captured_at = Utc::now();

        if let Some(sink) = &self.debug_sink {
            // Debug persistence is best-effort, never fails the cycle.
            match sink.store(self.monitor_index, captured_at, self.seq, &raw) {
                Ok(path) => info!("Saved screenshot: {}", path.display()),
                Err(e) => warn!("Failed to save debug screenshot: {}", e),
            }
        }

        let jpeg = encode_jpeg(&raw, self.jpeg_quality)?;
        Ok(Snapshot {
            jpeg,
            seq: self.seq,
            captured_at,
            monitor_index: self.monitor_index,
        })
    }
}

// JPEG has no alpha channel, so the raw frame is flattened to RGB first.
fn encode_jpeg(raw: &RgbaImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let rgb = DynamicImage::ImageRgba8(raw.clone()).to_rgb8();
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode_image(&DynamicImage::ImageRgb8(rgb))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::DisplayInfo;
    use image::Rgba;

    struct FakeSource {
        displays: Vec<DisplayInfo>,
    }

    impl FakeSource {
        fn with_displays(count: usize) -> Self {
            let displays = (0..count)
                .map(|i| DisplayInfo {
                    x: (i as i32) * 1920,
                    y: 0,
                    width: 1920,
                    height: 1080,
                    is_primary: i == 0,
                })
                .collect();
            Self { displays }
        }
    }

    impl ScreenSource for FakeSource {
        fn displays(&self) -> Result<Vec<DisplayInfo>, CaptureError> {
            Ok(self.displays.clone())
        }

        fn grab(&mut self, index: usize) -> Result<RgbaImage, CaptureError> {
            let (w, h) = if index == 0 {
                let w: u32 = self.displays.iter().map(|d| d.width).sum();
                (w, 1080)
            } else {
                let d = self
                    .displays
                    .get(index - 1)
                    .ok_or(CaptureError::Grab("index out of range".to_string(), index))?;
                (d.width, d.height)
            };
            Ok(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])))
        }
    }

    #[test]
    fn valid_index_captures_display_geometry() {
        let mut capturer =
            Capturer::new(FakeSource::with_displays(2), 2, 80, None).expect("capturer");
        let snapshot = capturer.grab().expect("grab");
        let decoded = image::load_from_memory(snapshot.jpeg_bytes()).expect("decode");
        assert_eq!(decoded.width(), 1920);
        assert_eq!(decoded.height(), 1080);
        assert_eq!(snapshot.monitor_index, 2);
    }

    #[test]
    fn out_of_range_index_falls_back_to_primary() {
        let capturer =
            Capturer::new(FakeSource::with_displays(1), 5, 80, None).expect("capturer");
        assert_eq!(capturer.monitor_index(), 1);
    }

    #[test]
    fn combined_index_is_preserved() {
        let capturer =
            Capturer::new(FakeSource::with_displays(2), 0, 80, None).expect("capturer");
        assert_eq!(capturer.monitor_index(), 0);
    }

    #[test]
    fn sequence_counter_increments_per_grab() {
        let mut capturer =
            Capturer::new(FakeSource::with_displays(1), 1, 80, None).expect("capturer");
        let first = capturer.grab().expect("grab");
        let second = capturer.grab().expect("grab");
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }

    #[test]
    fn base64_round_trips_jpeg_bytes() {
        let mut capturer =
            Capturer::new(FakeSource::with_displays(1), 1, 80, None).expect("capturer");
        let snapshot = capturer.grab().expect("grab");
        let decoded = BASE64.decode(snapshot.to_base64()).expect("base64");
        assert_eq!(decoded, snapshot.jpeg_bytes());
    }
}
