//! Shared render surface sampled by capture streams.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use anyhow::Context as _;

use crate::foundation::error::{FlatlandError, FlatlandResult};

/// One rendered RGBA8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixel data (`width * height * 4` bytes).
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Byte length a frame of this size must have.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }

    /// Write the frame as a PNG.
    pub fn write_png(&self, path: &Path) -> FlatlandResult<()> {
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Message flowing from the surface into an encoder worker.
#[derive(Debug)]
pub(crate) enum CaptureMsg {
    /// A newly presented frame.
    Frame(Frame),
    /// End of stream: finalize the recording.
    Eos,
}

/// Shared render target.
///
/// Clones are cheap handles onto the same buffer. [`Surface::present`] stores
/// the latest frame and forwards a copy to every attached capture tap; taps
/// whose receiving side is gone are pruned.
#[derive(Clone)]
pub struct Surface {
    inner: Arc<Mutex<SurfaceInner>>,
}

struct SurfaceInner {
    width: u32,
    height: u32,
    last: Option<Frame>,
    taps: Vec<mpsc::Sender<CaptureMsg>>,
}

impl Surface {
    /// Create a surface with fixed pixel dimensions.
    pub fn new(width: u32, height: u32) -> FlatlandResult<Self> {
        if width == 0 || height == 0 {
            return Err(FlatlandError::validation(
                "surface width/height must be non-zero",
            ));
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(SurfaceInner {
                width,
                height,
                last: None,
                taps: Vec::new(),
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.lock().width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.lock().height
    }

    /// Present a rendered frame: store it and fan it out to attached taps.
    pub fn present(&self, frame: Frame) -> FlatlandResult<()> {
        let mut inner = self.lock();
        if frame.width != inner.width || frame.height != inner.height {
            return Err(FlatlandError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, inner.width, inner.height
            )));
        }
        if frame.data.len() != frame.expected_len() {
            return Err(FlatlandError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }
        inner
            .taps
            .retain(|tap| tap.send(CaptureMsg::Frame(frame.clone())).is_ok());
        inner.last = Some(frame);
        Ok(())
    }

    /// Latest presented frame, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        self.lock().last.clone()
    }

    pub(crate) fn attach(&self, tap: mpsc::Sender<CaptureMsg>) {
        self.lock().taps.push(tap);
    }
}
