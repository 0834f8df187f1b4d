use image::RgbaImage;
use xcap::Monitor;

use crate::error::CaptureError;

/// Geometry of one enumerated display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

/// Seam between the capture loop and the OS screen-capture primitive.
///
/// Display indices follow the convention of the capture collaborator:
/// 1 and up address the displays returned by `displays()` in order, and
/// 0 addresses all displays composited into one buffer.
pub trait ScreenSource: Send {
    fn displays(&self) -> Result<Vec<DisplayInfo>, CaptureError>;

    fn grab(&mut self, index: usize) -> Result<RgbaImage, CaptureError>;
}

/// Production source backed by the `xcap` crate.
pub struct XcapSource;

impl XcapSource {
    fn monitors() -> Result<Vec<Monitor>, CaptureError> {
        Monitor::all().map_err(|e| CaptureError::Enumerate(e.to_string()))
    }

    fn grab_one(monitor: &Monitor, index: usize) -> Result<RgbaImage, CaptureError> {
        monitor
            .capture_image()
            .map_err(|e| CaptureError::Grab(e.to_string(), index))
    }

    fn composite(monitors: &[Monitor]) -> Result<RgbaImage, CaptureError> {
        if monitors.is_empty() {
            return Err(CaptureError::NoDisplays);
        }
        let min_x = monitors.iter().map(|m| m.x()).min().unwrap_or(0);
        let min_y = monitors.iter().map(|m| m.y()).min().unwrap_or(0);
        let max_x = monitors
            .iter()
            .map(|m| m.x() + m.width() as i32)
            .max()
            .unwrap_or(0);
        let max_y = monitors
            .iter()
            .map(|m| m.y() + m.height() as i32)
            .max()
            .unwrap_or(0);

        let mut canvas = RgbaImage::new((max_x - min_x) as u32, (max_y - min_y) as u32);
        for (i, monitor) in monitors.iter().enumerate() {
            let img = Self::grab_one(monitor, i + 1)?;
            image::imageops::replace(
                &mut canvas,
                &img,
                (monitor.x() - min_x) as i64,
                (monitor.y() - min_y) as i64,
            );
        }
        Ok(canvas)
    }
}

impl ScreenSource for XcapSource {
    fn displays(&self) -> Result<Vec<DisplayInfo>, CaptureError> {
        Ok(Self::monitors()?
            .iter()
            .map(|m| DisplayInfo {
                x: m.x(),
                y: m.y(),
                width: m.width(),
                height: m.height(),
                is_primary: m.is_primary(),
            })
            .collect())
    }

    fn grab(&mut self, index: usize) -> Result<RgbaImage, CaptureError> {
        let monitors = Self::monitors()?;
        if monitors.is_empty() {
            return Err(CaptureError::NoDisplays);
        }
        if index == 0 {
            return Self::composite(&monitors);
        }
        let monitor = monitors
            .get(index - 1)
            .ok_or(CaptureError::Grab("index out of range".to_string(), index))?;
        Self::grab_one(monitor, index)
    }
}
