use std::sync::mpsc;
use std::thread;

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::record::encoder::{
    CompletionSender, EncodedPayload, Encoder, MediaBackend, PayloadReceiver, completion_channel,
};
use crate::record::stream::CaptureStream;
use crate::surface::{CaptureMsg, Surface};

/// In-memory recording backend for tests and headless use.
///
/// The payload is the concatenation of every captured frame's raw RGBA8 bytes
/// in presentation order.
#[derive(Debug, Default)]
pub struct MemoryRecorder;

impl MediaBackend for MemoryRecorder {
    type Encoder = MemoryEncoder;

    fn open_capture(
        &mut self,
        surface: &Surface,
        frame_rate_hz: u32,
    ) -> FlatlandResult<CaptureStream> {
        CaptureStream::open(surface, frame_rate_hz)
    }

    fn create_encoder(
        &mut self,
        stream: CaptureStream,
        mime_type: &str,
    ) -> FlatlandResult<Self::Encoder> {
        Ok(MemoryEncoder::new(stream, mime_type))
    }
}

/// Encoder that accumulates raw frames on a worker thread.
pub struct MemoryEncoder {
    stream: Option<CaptureStream>,
    ctrl: Option<mpsc::Sender<CaptureMsg>>,
    mime_type: String,
    completion: Option<CompletionSender>,
    receiver: Option<PayloadReceiver>,
    started: bool,
    stopped: bool,
}

impl MemoryEncoder {
    fn new(stream: CaptureStream, mime_type: &str) -> Self {
        let (completion, receiver) = completion_channel();
        Self {
            stream: Some(stream),
            ctrl: None,
            mime_type: mime_type.to_owned(),
            completion: Some(completion),
            receiver: Some(receiver),
            started: false,
            stopped: false,
        }
    }
}

impl Encoder for MemoryEncoder {
    fn subscribe(&mut self) -> FlatlandResult<PayloadReceiver> {
        self.receiver
            .take()
            .ok_or_else(|| FlatlandError::session("completion receiver already taken"))
    }

    fn start(&mut self) -> FlatlandResult<()> {
        if self.started {
            return Err(FlatlandError::session("encoder already started"));
        }
        let stream = self
            .stream
            .take()
            .ok_or_else(|| FlatlandError::session("capture stream already consumed"))?;
        let completion = self
            .completion
            .take()
            .ok_or_else(|| FlatlandError::session("encoder completion already delivered"))?;

        // The worker owns only the receiving half; a torn-down session
        // disconnects the channel and lets the worker finalize.
        let (rx, ctrl) = stream.split();
        self.ctrl = Some(ctrl);
        let mime_type = self.mime_type.clone();
        thread::spawn(move || {
            let mut data = Vec::new();
            while let Ok(msg) = rx.recv() {
                match msg {
                    CaptureMsg::Frame(frame) => data.extend_from_slice(&frame.data),
                    CaptureMsg::Eos => break,
                }
            }
            completion.deliver(Ok(EncodedPayload { data, mime_type }));
        });
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> FlatlandResult<()> {
        if !self.started {
            return Err(FlatlandError::session("encoder stop requested before start"));
        }
        if self.stopped {
            return Err(FlatlandError::session("encoder already stopped"));
        }
        let ctrl = self
            .ctrl
            .as_ref()
            .ok_or_else(|| FlatlandError::session("encoder has no running worker"))?;
        ctrl.send(CaptureMsg::Eos)
            .map_err(|_| FlatlandError::encoding("encoder worker is not accepting frames"))?;
        self.stopped = true;
        Ok(())
    }
}
