//! Screen capture backends.
//!
//! A [`CaptureBackend`] is shared with the recording worker and opens the
//! per-recording resources on the worker thread: a [`FrameGrabber`] for the
//! display and a [`VideoSink`] for the output file.

use super::encoder::{FfmpegWriter, VideoSettings, VideoSink};
use super::frame::{DisplayInfo, RawFrame};
use crate::Result;

/// Grabs frames from one display.
pub trait FrameGrabber {
    fn grab(&mut self) -> Result<RawFrame>;
}

/// Source of display information, grabbers and video sinks.
pub trait CaptureBackend: Send + Sync + 'static {
    /// The display that gets recorded.
    fn primary_display(&self) -> Result<DisplayInfo>;

    fn open_grabber(&self, display: &DisplayInfo) -> Result<Box<dyn FrameGrabber>>;

    fn open_sink(&self, settings: &VideoSettings) -> Result<Box<dyn VideoSink>>;
}

/// The real desktop: GDI capture of the primary display, FFmpeg encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopBackend;

impl DesktopBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for DesktopBackend {
    fn primary_display(&self) -> Result<DisplayInfo> {
        gdi::primary_display()
    }

    fn open_grabber(&self, display: &DisplayInfo) -> Result<Box<dyn FrameGrabber>> {
        Ok(Box::new(gdi::ScreenGrabber::new(display)?))
    }

    fn open_sink(&self, settings: &VideoSettings) -> Result<Box<dyn VideoSink>> {
        Ok(Box::new(FfmpegWriter::spawn(settings)?))
    }
}

#[cfg(windows)]
mod gdi {
    use super::{DisplayInfo, FrameGrabber, RawFrame};
    use crate::recorder::frame::PixelFormat;
    use crate::{ClipsError, Result};
    use tracing::debug;
    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
        DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, HBITMAP, HDC, HGDIOBJ, ReleaseDC,
        SRCCOPY, SelectObject,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    pub fn primary_display() -> Result<DisplayInfo> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(ClipsError::capture_failed("primary display has no resolution"));
        }
        Ok(DisplayInfo { width: width as u32, height: height as u32 })
    }

    /// BitBlt-based grabber. Holds its device contexts for the whole recording.
    pub struct ScreenGrabber {
        screen: HDC,
        memory: HDC,
        bitmap: HBITMAP,
        previous: HGDIOBJ,
        width: u32,
        height: u32,
    }

    impl ScreenGrabber {
        pub fn new(display: &DisplayInfo) -> Result<Self> {
            let (width, height) = (display.width, display.height);
            unsafe {
                let screen = GetDC(None);
                if screen.is_invalid() {
                    return Err(ClipsError::capture_failed("GetDC returned no screen context"));
                }

                let memory = CreateCompatibleDC(Some(screen));
                if memory.is_invalid() {
                    ReleaseDC(None, screen);
                    return Err(ClipsError::capture_failed("CreateCompatibleDC failed"));
                }

                let bitmap = CreateCompatibleBitmap(screen, width as i32, height as i32);
                if bitmap.is_invalid() {
                    let _ = DeleteDC(memory);
                    ReleaseDC(None, screen);
                    return Err(ClipsError::capture_failed("CreateCompatibleBitmap failed"));
                }

                let previous = SelectObject(memory, bitmap.into());
                debug!(width, height, "Opened GDI screen grabber");
                Ok(Self { screen, memory, bitmap, previous, width, height })
            }
        }
    }

    impl FrameGrabber for ScreenGrabber {
        fn grab(&mut self) -> Result<RawFrame> {
            let (width, height) = (self.width as i32, self.height as i32);
            let mut buffer = vec![0u8; self.width as usize * self.height as usize * RawFrame::BYTES_PER_PIXEL];

            unsafe {
                BitBlt(self.memory, 0, 0, width, height, Some(self.screen), 0, 0, SRCCOPY)
                    .map_err(|e| ClipsError::windows_api_error("BitBlt", e))?;

                let mut bmi = BITMAPINFO::default();
                bmi.bmiHeader.biSize = std::mem::size_of::<BITMAPINFOHEADER>() as u32;
                bmi.bmiHeader.biWidth = width;
                // Negative height asks for top-down rows
                bmi.bmiHeader.biHeight = -height;
                bmi.bmiHeader.biPlanes = 1;
                bmi.bmiHeader.biBitCount = 32;
                bmi.bmiHeader.biCompression = BI_RGB.0;

                let lines = GetDIBits(
                    self.memory,
                    self.bitmap,
                    0,
                    self.height,
                    Some(buffer.as_mut_ptr() as *mut _),
                    &mut bmi,
                    DIB_RGB_COLORS,
                );
                if lines == 0 {
                    return Err(ClipsError::capture_failed("GetDIBits copied no scan lines"));
                }
            }

            RawFrame::new(self.width, self.height, PixelFormat::Bgra, buffer)
        }
    }

    impl Drop for ScreenGrabber {
        fn drop(&mut self) {
            unsafe {
                SelectObject(self.memory, self.previous);
                let _ = DeleteObject(self.bitmap.into());
                let _ = DeleteDC(self.memory);
                ReleaseDC(None, self.screen);
            }
        }
    }
}

#[cfg(not(windows))]
mod gdi {
    use super::{DisplayInfo, FrameGrabber, RawFrame};
    use crate::{ClipsError, Result};

    pub fn primary_display() -> Result<DisplayInfo> {
        Err(ClipsError::unsupported_platform("Screen capture", "Windows"))
    }

    pub struct ScreenGrabber;

    impl ScreenGrabber {
        pub fn new(_display: &DisplayInfo) -> Result<Self> {
            Err(ClipsError::unsupported_platform("Screen capture", "Windows"))
        }
    }

    impl FrameGrabber for ScreenGrabber {
        fn grab(&mut self) -> Result<RawFrame> {
            Err(ClipsError::unsupported_platform("Screen capture", "Windows"))
        }
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::ClipsError;

    #[test]
    fn desktop_capture_requires_windows() {
        let backend = DesktopBackend::new();
        assert!(matches!(backend.primary_display(), Err(ClipsError::UnsupportedPlatform { .. })));

        let display = DisplayInfo { width: 640, height: 480 };
        assert!(backend.open_grabber(&display).is_err());
    }
}
