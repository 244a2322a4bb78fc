use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::record::encoder::{
    CompletionSender, EncodedPayload, Encoder, MediaBackend, PayloadReceiver, completion_channel,
};
use crate::record::stream::CaptureStream;
use crate::surface::{CaptureMsg, Surface};

/// Output container and codec selected from the requested MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    /// WebM with VP9 video.
    Webm,
    /// MP4 with H.264 video.
    Mp4,
}

impl Container {
    fn for_mime(mime_type: &str) -> FlatlandResult<Self> {
        let base = mime_type.split(';').next().unwrap_or("").trim();
        match base {
            "video/webm" => Ok(Self::Webm),
            "video/mp4" => Ok(Self::Mp4),
            _ => Err(FlatlandError::acquisition(format!(
                "unsupported mime type '{mime_type}' (expected video/webm or video/mp4)"
            ))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

/// Recording backend that encodes through the system `ffmpeg`.
///
/// Raw RGBA frames are streamed to a spawned `ffmpeg` child over stdin; the
/// finished container bytes are delivered through the completion channel once
/// the child exits.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegRecorder;

impl FfmpegRecorder {
    /// Return `true` when `ffmpeg` can be invoked from `PATH`.
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl MediaBackend for FfmpegRecorder {
    type Encoder = FfmpegEncoder;

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
        let container = Container::for_mime(mime_type)?;
        Ok(FfmpegEncoder::new(stream, container, mime_type))
    }
}

/// Encoder over a spawned `ffmpeg` child process.
pub struct FfmpegEncoder {
    stream: Option<CaptureStream>,
    ctrl: Option<mpsc::Sender<CaptureMsg>>,
    container: Container,
    mime_type: String,
    completion: Option<CompletionSender>,
    receiver: Option<PayloadReceiver>,
    started: bool,
    stopped: bool,
}

impl FfmpegEncoder {
    fn new(stream: CaptureStream, container: Container, mime_type: &str) -> Self {
        let (completion, receiver) = completion_channel();
        Self {
            stream: Some(stream),
            ctrl: None,
            container,
            mime_type: mime_type.to_owned(),
            completion: Some(completion),
            receiver: Some(receiver),
            started: false,
            stopped: false,
        }
    }
}

impl Encoder for FfmpegEncoder {
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

        let (width, height) = (stream.width(), stream.height());
        if width % 2 != 0 || height % 2 != 0 {
            return Err(FlatlandError::validation(
                "encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if !FfmpegRecorder::is_available() {
            return Err(FlatlandError::acquisition(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let out_path = std::env::temp_dir().join(format!(
            "flatland_rec_{}_{}.{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            self.container.extension()
        ));

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(ffmpeg_args(
                self.container,
                width,
                height,
                stream.frame_rate().hz(),
                &out_path,
            ));

        let mut child = cmd.spawn().map_err(|e| {
            FlatlandError::acquisition(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlatlandError::acquisition("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            FlatlandError::acquisition("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_drain = thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let (rx, ctrl) = stream.split();
        self.ctrl = Some(ctrl);
        let out = out_path.clone();
        let mime_type = self.mime_type.clone();
        thread::spawn(move || {
            completion.deliver(encode_loop(rx, stdin, child, stderr_drain, out, mime_type));
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

fn ffmpeg_args(
    container: Container,
    width: u32,
    height: u32,
    frame_rate_hz: u32,
    out_path: &Path,
) -> Vec<OsString> {
    // Input: raw opaque RGBA8 frames on stdin. For rawvideo, `-r` before `-i`
    // sets the input framerate.
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{width}x{height}"),
        "-r",
        &frame_rate_hz.to_string(),
        "-i",
        "pipe:0",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    let codec: &[&str] = match container {
        Container::Webm => &["-an", "-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"],
        Container::Mp4 => &[
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ],
    };
    args.extend(codec.iter().map(OsString::from));
    args.push(out_path.into());
    args
}

fn encode_loop(
    rx: mpsc::Receiver<CaptureMsg>,
    mut stdin: ChildStdin,
    mut child: Child,
    stderr_drain: thread::JoinHandle<std::io::Result<Vec<u8>>>,
    out_path: PathBuf,
    mime_type: String,
) -> FlatlandResult<EncodedPayload> {
    let _cleanup = TempFileGuard(Some(out_path.clone()));

    let mut write_err: Option<String> = None;
    loop {
        match rx.recv() {
            Ok(CaptureMsg::Frame(frame)) => {
                use std::io::Write as _;
                if let Err(e) = stdin.write_all(&frame.data) {
                    write_err = Some(format!("failed to write frame to ffmpeg stdin: {e}"));
                    break;
                }
            }
            // A disconnected stream means the session was torn down; finalize
            // with whatever was captured.
            Ok(CaptureMsg::Eos) | Err(_) => break,
        }
    }
    drop(stdin);

    let status = child
        .wait()
        .map_err(|e| FlatlandError::encoding(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| FlatlandError::encoding("ffmpeg stderr drain thread panicked"))?
        .map_err(|e| FlatlandError::encoding(format!("ffmpeg stderr read failed: {e}")))?;
    let stderr = String::from_utf8_lossy(&stderr_bytes);

    if let Some(msg) = write_err {
        return Err(FlatlandError::encoding(format!("{msg}: {}", stderr.trim())));
    }
    if !status.success() {
        return Err(FlatlandError::encoding(format!(
            "ffmpeg exited with status {status}: {}",
            stderr.trim()
        )));
    }

    let data = std::fs::read(&out_path).map_err(|e| {
        FlatlandError::encoding(format!(
            "failed to read encoded output '{}': {e}",
            out_path.display()
        ))
    })?;
    Ok(EncodedPayload { data, mime_type })
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_is_selected_from_mime_base_type() {
        assert_eq!(
            Container::for_mime("video/webm; codecs=vp9").unwrap(),
            Container::Webm
        );
        assert_eq!(Container::for_mime("video/webm").unwrap(), Container::Webm);
        assert_eq!(Container::for_mime("video/mp4").unwrap(), Container::Mp4);
        assert!(Container::for_mime("video/x-matroska").is_err());
        assert!(Container::for_mime("").is_err());
    }

    #[test]
    fn args_carry_geometry_rate_and_codec() {
        let args = ffmpeg_args(Container::Webm, 640, 640, 10, Path::new("/tmp/out.webm"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-s", "640x640"]));
        assert!(args.windows(2).any(|w| w == ["-r", "10"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libvpx-vp9"]));
        assert_eq!(args.last().unwrap(), "/tmp/out.webm");

        let args = ffmpeg_args(Container::Mp4, 320, 240, 30, Path::new("out.mp4"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.contains(&"+faststart".to_owned()));
    }
}
