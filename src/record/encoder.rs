use std::sync::mpsc;

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::record::stream::CaptureStream;
use crate::surface::Surface;

/// Finished recording payload delivered by an encoder after stop.
#[derive(Clone, Debug)]
pub struct EncodedPayload {
    /// Opaque container bytes.
    pub data: Vec<u8>,
    /// MIME type the encoder was created with.
    pub mime_type: String,
}

/// One-shot receiving half of an encoder's deferred completion notification.
///
/// The payload is delivered only after [`Encoder::stop`] was requested; the
/// delay relative to other events is unspecified.
#[derive(Debug)]
pub struct PayloadReceiver {
    rx: mpsc::Receiver<FlatlandResult<EncodedPayload>>,
}

impl PayloadReceiver {
    /// Block until the payload (or the encoder's failure) arrives.
    pub fn recv(self) -> FlatlandResult<EncodedPayload> {
        self.rx
            .recv()
            .map_err(|_| FlatlandError::encoding("encoder completion channel disconnected"))?
    }

    /// Poll without blocking. `Ok(None)` means the payload is not ready yet.
    pub fn try_recv(&self) -> FlatlandResult<Option<EncodedPayload>> {
        match self.rx.try_recv() {
            Ok(result) => result.map(Some),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(FlatlandError::encoding(
                "encoder completion channel disconnected",
            )),
        }
    }
}

/// Sending half of the completion channel, held by the encoder until delivery.
#[derive(Debug)]
pub struct CompletionSender {
    tx: mpsc::Sender<FlatlandResult<EncodedPayload>>,
}

impl CompletionSender {
    /// Deliver the final payload (or failure). Consumes the sender: the
    /// notification is one-shot.
    pub fn deliver(self, result: FlatlandResult<EncodedPayload>) {
        // The receiver may already be gone (abandoned session); nothing to do.
        let _ = self.tx.send(result);
    }
}

/// Create the one-shot completion channel an encoder delivers its payload on.
pub fn completion_channel() -> (CompletionSender, PayloadReceiver) {
    let (tx, rx) = mpsc::channel();
    (CompletionSender { tx }, PayloadReceiver { rx })
}

/// Asynchronous video producer over a capture stream.
///
/// Contract: exactly one `start`/`stop` pair per encoder. The finished payload
/// is never returned synchronously from `stop`; it arrives later through the
/// receiver taken with `subscribe`.
pub trait Encoder {
    /// Take the one-shot completion receiver. Errors if already taken.
    fn subscribe(&mut self) -> FlatlandResult<PayloadReceiver>;

    /// Begin consuming captured frames.
    fn start(&mut self) -> FlatlandResult<()>;

    /// Request finalization. Frames presented after this call are not part of
    /// the recording.
    fn stop(&mut self) -> FlatlandResult<()>;
}

/// Factory seam for the capture/encoding subsystem.
pub trait MediaBackend {
    /// Encoder type produced by this backend.
    type Encoder: Encoder;

    /// Open a live frame stream over `surface` at `frame_rate_hz`.
    fn open_capture(
        &mut self,
        surface: &Surface,
        frame_rate_hz: u32,
    ) -> FlatlandResult<CaptureStream>;

    /// Create an encoder over an open stream producing `mime_type` output.
    fn create_encoder(
        &mut self,
        stream: CaptureStream,
        mime_type: &str,
    ) -> FlatlandResult<Self::Encoder>;
}
