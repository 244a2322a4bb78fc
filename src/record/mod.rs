//! Capture streams and video encoders.
//!
//! A [`CaptureStream`] taps a [`Surface`](crate::surface::Surface); an
//! [`Encoder`] consumes the stream and delivers its finished payload through a
//! one-shot completion channel, strictly after `stop` was requested.

mod encoder;
mod ffmpeg;
mod memory;
mod stream;

pub use crate::record::encoder::{
    CompletionSender, EncodedPayload, Encoder, MediaBackend, PayloadReceiver, completion_channel,
};
pub use crate::record::ffmpeg::{FfmpegEncoder, FfmpegRecorder};
pub use crate::record::memory::{MemoryEncoder, MemoryRecorder};
pub use crate::record::stream::{CaptureRate, CaptureStream};
