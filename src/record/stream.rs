use std::sync::mpsc;

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::surface::{CaptureMsg, Surface};

/// Capture frame rate in whole frames per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureRate(u32);

impl CaptureRate {
    /// Validate and wrap a frame rate in Hz.
    pub fn new(hz: u32) -> FlatlandResult<Self> {
        if hz == 0 {
            return Err(FlatlandError::validation("capture rate must be > 0 Hz"));
        }
        Ok(Self(hz))
    }

    /// Frames per second.
    pub fn hz(self) -> u32 {
        self.0
    }
}

/// Live feed of frames presented on a surface.
///
/// Opening a stream attaches a tap to the surface; every frame presented from
/// then on is forwarded to the stream in presentation order. The stream lives
/// until the encoder consuming it finalizes.
pub struct CaptureStream {
    pub(crate) rx: mpsc::Receiver<CaptureMsg>,
    pub(crate) ctrl: mpsc::Sender<CaptureMsg>,
    rate: CaptureRate,
    width: u32,
    height: u32,
}

impl CaptureStream {
    /// Open a capture stream over `surface` at `frame_rate_hz`.
    pub fn open(surface: &Surface, frame_rate_hz: u32) -> FlatlandResult<Self> {
        let rate = CaptureRate::new(frame_rate_hz)?;
        let (tx, rx) = mpsc::channel();
        surface.attach(tx.clone());
        Ok(Self {
            rx,
            ctrl: tx,
            rate,
            width: surface.width(),
            height: surface.height(),
        })
    }

    /// Target frame rate.
    pub fn frame_rate(&self) -> CaptureRate {
        self.rate
    }

    /// Source surface width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source surface height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Split into the frame receiver (for the encoder worker) and the control
    /// sender (for signaling end of stream).
    pub(crate) fn split(self) -> (mpsc::Receiver<CaptureMsg>, mpsc::Sender<CaptureMsg>) {
        (self.rx, self.ctrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Frame;

    #[test]
    fn open_rejects_zero_rate() {
        let surface = Surface::new(1, 1).unwrap();
        assert!(CaptureStream::open(&surface, 0).is_err());
    }

    #[test]
    fn stream_sees_frames_presented_after_open() {
        let surface = Surface::new(1, 1).unwrap();
        let stream = CaptureStream::open(&surface, 10).unwrap();
        assert_eq!(stream.frame_rate().hz(), 10);
        assert_eq!((stream.width(), stream.height()), (1, 1));

        surface.present(Frame::filled(1, 1, [5, 5, 5, 255])).unwrap();
        match stream.rx.recv().unwrap() {
            CaptureMsg::Frame(f) => assert_eq!(f.data, vec![5, 5, 5, 255]),
            CaptureMsg::Eos => panic!("expected a frame"),
        }
    }
}
