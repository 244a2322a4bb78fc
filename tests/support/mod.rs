//! Scripted collaborator doubles for session lifecycle tests.
//!
//! Every collaborator call lands in one shared, ordered [`CallLog`] so tests
//! can assert both counts and interleaving.

use std::sync::{Arc, Mutex};

use flatland::record::{CompletionSender, completion_channel};
use flatland::{
    Artifact, CaptureStream, ControlId, ControlPanel, EncodedPayload, Encoder, FlatlandError,
    FlatlandResult, MediaBackend, PayloadReceiver, Simulation, Surface,
};

/// Shared, ordered log of collaborator calls.
#[derive(Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

#[derive(Clone)]
pub struct ScriptedSimSpec {
    /// `is_finished` turns true once this many updates ran.
    pub finish_after: u64,
    /// Fail the n-th update (1-based).
    pub fail_update_on: Option<u64>,
    pub log: Arc<CallLog>,
}

impl ScriptedSimSpec {
    pub fn finishing_after(finish_after: u64, log: Arc<CallLog>) -> Self {
        Self {
            finish_after,
            fail_update_on: None,
            log,
        }
    }
}

pub struct ScriptedSim {
    spec: ScriptedSimSpec,
    updates: u64,
}

impl Simulation for ScriptedSim {
    type Params = ScriptedSimSpec;

    fn construct(spec: ScriptedSimSpec, _surface: &Surface) -> FlatlandResult<Self> {
        spec.log.push("construct");
        Ok(Self { spec, updates: 0 })
    }

    fn update(&mut self) -> FlatlandResult<()> {
        self.updates += 1;
        self.spec.log.push(format!("update {}", self.updates));
        if self.spec.fail_update_on == Some(self.updates) {
            return Err(FlatlandError::simulation("scripted update failure"));
        }
        Ok(())
    }

    fn render(&mut self) -> FlatlandResult<()> {
        self.spec.log.push("render");
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.spec.log.push("check");
        self.updates >= self.spec.finish_after
    }
}

pub struct ScriptedBackend {
    pub log: Arc<CallLog>,
    pub fail_open_capture: bool,
    pub fail_create_encoder: bool,
    pub fail_start: bool,
}

impl ScriptedBackend {
    pub fn healthy(log: Arc<CallLog>) -> Self {
        Self {
            log,
            fail_open_capture: false,
            fail_create_encoder: false,
            fail_start: false,
        }
    }
}

impl MediaBackend for ScriptedBackend {
    type Encoder = ScriptedEncoder;

    fn open_capture(
        &mut self,
        surface: &Surface,
        frame_rate_hz: u32,
    ) -> FlatlandResult<CaptureStream> {
        self.log.push("open_capture");
        if self.fail_open_capture {
            return Err(FlatlandError::acquisition("scripted capture failure"));
        }
        CaptureStream::open(surface, frame_rate_hz)
    }

    fn create_encoder(
        &mut self,
        _stream: CaptureStream,
        _mime_type: &str,
    ) -> FlatlandResult<Self::Encoder> {
        self.log.push("create_encoder");
        if self.fail_create_encoder {
            return Err(FlatlandError::acquisition("scripted encoder rejection"));
        }
        Ok(ScriptedEncoder::new(self.log.clone(), self.fail_start))
    }
}

pub struct ScriptedEncoder {
    log: Arc<CallLog>,
    fail_start: bool,
    // Held, never delivered: lifecycle tests feed the coordinator's
    // `on_payload` directly to control the completion timing.
    _completion: Option<CompletionSender>,
    receiver: Option<PayloadReceiver>,
}

impl ScriptedEncoder {
    fn new(log: Arc<CallLog>, fail_start: bool) -> Self {
        let (completion, receiver) = completion_channel();
        Self {
            log,
            fail_start,
            _completion: Some(completion),
            receiver: Some(receiver),
        }
    }
}

impl Encoder for ScriptedEncoder {
    fn subscribe(&mut self) -> FlatlandResult<PayloadReceiver> {
        self.log.push("subscribe");
        self.receiver
            .take()
            .ok_or_else(|| FlatlandError::session("completion receiver already taken"))
    }

    fn start(&mut self) -> FlatlandResult<()> {
        self.log.push("start");
        if self.fail_start {
            return Err(FlatlandError::acquisition("scripted start failure"));
        }
        Ok(())
    }

    fn stop(&mut self) -> FlatlandResult<()> {
        self.log.push("stop");
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PanelState {
    pub restart_enabled: Option<bool>,
    pub download_enabled: Option<bool>,
    pub published: Option<(String, usize)>,
}

pub struct LogPanel {
    log: Arc<CallLog>,
    pub state: Arc<Mutex<PanelState>>,
}

impl LogPanel {
    pub fn new(log: Arc<CallLog>) -> (Self, Arc<Mutex<PanelState>>) {
        let state = Arc::new(Mutex::new(PanelState::default()));
        (
            Self {
                log,
                state: state.clone(),
            },
            state,
        )
    }
}

impl ControlPanel for LogPanel {
    fn set_enabled(&mut self, control: ControlId, enabled: bool) {
        let verb = if enabled { "enable" } else { "disable" };
        self.log.push(format!("{verb} {control:?}"));
        let mut state = self.state.lock().unwrap();
        match control {
            ControlId::Restart => state.restart_enabled = Some(enabled),
            ControlId::Download => state.download_enabled = Some(enabled),
        }
    }

    fn set_download_target(
        &mut self,
        _control: ControlId,
        artifact: &Artifact,
    ) -> FlatlandResult<()> {
        self.log.push(format!("publish {}", artifact.filename));
        self.state.lock().unwrap().published =
            Some((artifact.filename.clone(), artifact.payload.data.len()));
        Ok(())
    }
}

pub fn webm_payload(bytes: &[u8]) -> EncodedPayload {
    EncodedPayload {
        data: bytes.to_vec(),
        mime_type: "video/webm; codecs=vp9".to_owned(),
    }
}
