use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::record::{EncodedPayload, Encoder, MediaBackend, PayloadReceiver};
use crate::session::timer::PeriodicTimer;
use crate::sim::Simulation;
use crate::surface::Surface;
use crate::ui::{ControlId, ControlPanel};

/// Phase of one recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session has been armed yet.
    Idle,
    /// Capture and encoder are armed; the simulation is not ticking yet.
    Recording,
    /// The tick timer is driving the simulation.
    Running,
    /// Terminal state reached; waiting for the encoder's completion.
    Finalizing,
    /// The artifact has been published.
    Complete,
}

/// Options for one session.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionOpts {
    /// Capture frame rate handed to the capture stream, in Hz.
    pub frame_rate_hz: u32,
    /// Fixed simulation tick period in milliseconds.
    pub tick_period_ms: u64,
    /// MIME type requested from the encoder.
    pub mime_type: String,
    /// Suggested filename for the published artifact.
    pub filename: String,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            frame_rate_hz: 10,
            tick_period_ms: 100,
            mime_type: "video/webm; codecs=vp9".to_owned(),
            filename: "flatland.webm".to_owned(),
        }
    }
}

impl SessionOpts {
    /// Tick period as a [`Duration`].
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    fn validate(&self) -> FlatlandResult<()> {
        if self.frame_rate_hz == 0 {
            return Err(FlatlandError::validation("frame_rate_hz must be > 0"));
        }
        if self.tick_period_ms == 0 {
            return Err(FlatlandError::validation("tick_period_ms must be > 0"));
        }
        if self.filename.is_empty() {
            return Err(FlatlandError::validation("filename must be non-empty"));
        }
        Ok(())
    }
}

/// Reference to the finished recording, published for download.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Encoded container bytes as delivered by the encoder.
    pub payload: EncodedPayload,
    /// Suggested download filename.
    pub filename: String,
}

/// Summary of one completed session.
#[derive(Clone, Debug)]
pub struct SessionReport {
    /// Number of update+render ticks that ran.
    pub ticks: u64,
    /// The published artifact.
    pub artifact: Artifact,
}

/// Owns one recording session end to end.
///
/// The coordinator sequences: arm capture and encoder, construct the
/// simulation, drive update -> render -> terminal check on every tick, then
/// tear the encoder down and publish the artifact once its deferred
/// completion arrives. Recording fully brackets simulation execution.
///
/// All session state lives in explicit fields here; construct a fresh
/// coordinator per session.
pub struct Coordinator<S, M, C>
where
    S: Simulation,
    M: MediaBackend,
    C: ControlPanel,
{
    phase: SessionPhase,
    surface: Surface,
    media: M,
    controls: C,
    opts: SessionOpts,
    sim: Option<S>,
    encoder: Option<M::Encoder>,
    completion: Option<PayloadReceiver>,
    timer: Option<PeriodicTimer>,
    ticks: u64,
    artifact: Option<Artifact>,
}

impl<S, M, C> Coordinator<S, M, C>
where
    S: Simulation,
    M: MediaBackend,
    C: ControlPanel,
{
    /// Create an idle coordinator over its collaborators.
    pub fn new(surface: Surface, media: M, controls: C, opts: SessionOpts) -> Self {
        Self {
            phase: SessionPhase::Idle,
            surface,
            media,
            controls,
            opts,
            sim: None,
            encoder: None,
            completion: None,
            timer: None,
            ticks: 0,
            artifact: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Ticks driven so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The published artifact, once the session is complete.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// The control panel collaborator.
    pub fn controls(&self) -> &C {
        &self.controls
    }

    /// The render surface this session draws onto.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The simulation handle, once the session has constructed it.
    pub fn simulation(&self) -> Option<&S> {
        self.sim.as_ref()
    }

    /// Arm the session: Idle -> Recording -> Running.
    ///
    /// Acquires the capture stream, creates and starts the encoder, disables
    /// the controls, constructs the simulation, renders its initial state
    /// (so the stream has a frame before the timer starts), and arms the tick
    /// timer. Acquisition failures propagate without starting anything; a
    /// simulation failure after the encoder started tears the encoder down
    /// best-effort before propagating.
    #[tracing::instrument(skip_all)]
    pub fn begin(&mut self, params: S::Params) -> FlatlandResult<()> {
        if self.phase != SessionPhase::Idle {
            return Err(FlatlandError::session("a session is already active"));
        }
        self.opts.validate()?;

        let stream = self
            .media
            .open_capture(&self.surface, self.opts.frame_rate_hz)?;
        let mut encoder = self.media.create_encoder(stream, &self.opts.mime_type)?;
        let completion = encoder.subscribe()?;
        encoder.start()?;
        self.encoder = Some(encoder);
        self.completion = Some(completion);
        self.phase = SessionPhase::Recording;
        self.controls.set_enabled(ControlId::Restart, false);
        self.controls.set_enabled(ControlId::Download, false);
        debug!(mime_type = %self.opts.mime_type, "recording armed");

        let constructed = S::construct(params, &self.surface)
            .and_then(|mut sim| sim.render().map(|()| sim));
        let sim = match constructed {
            Ok(sim) => sim,
            Err(e) => {
                self.stop_encoder_best_effort();
                return Err(e);
            }
        };
        self.sim = Some(sim);
        self.timer = Some(PeriodicTimer::new(self.opts.tick_period())?);
        self.phase = SessionPhase::Running;
        debug!(period_ms = self.opts.tick_period_ms, "tick loop armed");
        Ok(())
    }

    /// One firing of the tick timer: update, render, then the terminal check,
    /// in that order. The final encoded frame must show the state that
    /// satisfied the terminal predicate.
    ///
    /// A firing that was already queued when the timer was cancelled is a
    /// no-op, not an error.
    pub fn on_tick(&mut self) -> FlatlandResult<()> {
        let stale = match self.timer.as_ref() {
            Some(timer) => timer.is_cancelled(),
            None => true,
        };
        if stale || self.phase != SessionPhase::Running {
            return Ok(());
        }

        let step = match self.sim.as_mut() {
            Some(sim) => sim.update().and_then(|()| sim.render()),
            None => Err(FlatlandError::session(
                "no simulation handle in Running phase",
            )),
        };
        if let Err(e) = step {
            self.abort_running();
            return Err(e);
        }
        self.ticks += 1;

        if self.sim.as_ref().is_some_and(S::is_finished) {
            if let Some(timer) = self.timer.as_mut() {
                timer.cancel();
            }
            self.controls.set_enabled(ControlId::Restart, true);
            self.controls.set_enabled(ControlId::Download, true);
            let encoder = self
                .encoder
                .as_mut()
                .ok_or_else(|| FlatlandError::session("no encoder in Running phase"))?;
            encoder.stop()?;
            self.phase = SessionPhase::Finalizing;
            debug!(ticks = self.ticks, "terminal state reached; finalizing");
        }
        Ok(())
    }

    /// Deliver the encoder's completion payload: Finalizing -> Complete.
    ///
    /// Wraps the payload into an [`Artifact`] and publishes it to the
    /// download control. Controls were already re-enabled at terminal
    /// detection; publication arriving later is expected.
    pub fn on_payload(&mut self, payload: EncodedPayload) -> FlatlandResult<()> {
        if self.phase != SessionPhase::Finalizing {
            return Err(FlatlandError::session(format!(
                "encoder payload delivered in {:?} phase",
                self.phase
            )));
        }
        let artifact = Artifact {
            payload,
            filename: self.opts.filename.clone(),
        };
        self.controls
            .set_download_target(ControlId::Download, &artifact)?;
        self.artifact = Some(artifact);
        self.phase = SessionPhase::Complete;
        debug!("artifact published");
        Ok(())
    }

    /// Block until the encoder's deferred completion arrives, then publish.
    ///
    /// No watchdog: a completion that never fires blocks indefinitely.
    pub fn await_payload(&mut self) -> FlatlandResult<()> {
        if self.phase != SessionPhase::Finalizing {
            return Err(FlatlandError::session(
                "no completion to await outside the Finalizing phase",
            ));
        }
        let completion = self
            .completion
            .take()
            .ok_or_else(|| FlatlandError::session("completion receiver already consumed"))?;
        let payload = completion.recv()?;
        self.on_payload(payload)
    }

    /// Run a full session on the calling thread with a wall-clock tick timer.
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self, params: S::Params) -> FlatlandResult<SessionReport> {
        self.begin(params)?;
        loop {
            match self.phase {
                SessionPhase::Running => {
                    let wait = match self.timer.as_ref() {
                        Some(timer) => timer.until_due(Instant::now()),
                        None => return Err(FlatlandError::session("tick timer disappeared")),
                    };
                    if let Some(wait) = wait
                        && !wait.is_zero()
                    {
                        std::thread::sleep(wait);
                    }
                    let fired = self
                        .timer
                        .as_mut()
                        .is_some_and(|timer| timer.poll(Instant::now()));
                    if fired {
                        self.on_tick()?;
                    }
                }
                SessionPhase::Finalizing => self.await_payload()?,
                SessionPhase::Complete => {
                    let artifact = self
                        .artifact
                        .clone()
                        .ok_or_else(|| FlatlandError::session("complete without an artifact"))?;
                    return Ok(SessionReport {
                        ticks: self.ticks,
                        artifact,
                    });
                }
                SessionPhase::Idle | SessionPhase::Recording => {
                    return Err(FlatlandError::session(
                        "session driver observed an unexpected phase",
                    ));
                }
            }
        }
    }

    fn abort_running(&mut self) {
        // Failure must not leave a dangling periodic callback.
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        self.stop_encoder_best_effort();
    }

    fn stop_encoder_best_effort(&mut self) {
        if let Some(encoder) = self.encoder.as_mut()
            && let Err(e) = encoder.stop()
        {
            warn!(error = %e, "encoder stop failed during teardown");
        }
    }
}

/// Run one complete session: construct a fresh [`Coordinator`] over the given
/// collaborators and drive it to completion.
pub fn run_session<S, M, C>(
    surface: Surface,
    media: M,
    controls: C,
    params: S::Params,
    opts: SessionOpts,
) -> FlatlandResult<SessionReport>
where
    S: Simulation,
    M: MediaBackend,
    C: ControlPanel,
{
    Coordinator::<S, M, C>::new(surface, media, controls, opts).run(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryRecorder;
    use crate::surface::Frame;

    struct TestSim {
        done_after: u32,
        updates: u32,
        surface: Surface,
    }

    impl Simulation for TestSim {
        type Params = u32;

        fn construct(done_after: u32, surface: &Surface) -> FlatlandResult<Self> {
            Ok(Self {
                done_after,
                updates: 0,
                surface: surface.clone(),
            })
        }

        fn update(&mut self) -> FlatlandResult<()> {
            self.updates += 1;
            Ok(())
        }

        fn render(&mut self) -> FlatlandResult<()> {
            let (w, h) = (self.surface.width(), self.surface.height());
            self.surface.present(Frame::filled(w, h, [255, 255, 255, 255]))
        }

        fn is_finished(&self) -> bool {
            self.updates >= self.done_after
        }
    }

    struct NoopPanel;

    impl ControlPanel for NoopPanel {
        fn set_enabled(&mut self, _control: ControlId, _enabled: bool) {}

        fn set_download_target(
            &mut self,
            _control: ControlId,
            _artifact: &Artifact,
        ) -> FlatlandResult<()> {
            Ok(())
        }
    }

    fn coordinator() -> (Coordinator<TestSim, MemoryRecorder, NoopPanel>, Surface) {
        let surface = Surface::new(2, 2).unwrap();
        let opts = SessionOpts {
            tick_period_ms: 1,
            ..SessionOpts::default()
        };
        (
            Coordinator::new(surface.clone(), MemoryRecorder, NoopPanel, opts),
            surface,
        )
    }

    #[test]
    fn manual_ticks_walk_the_phases_in_order() {
        let (mut coord, _surface) = coordinator();
        assert_eq!(coord.phase(), SessionPhase::Idle);

        coord.begin(2).unwrap();
        assert_eq!(coord.phase(), SessionPhase::Running);

        coord.on_tick().unwrap();
        assert_eq!(coord.phase(), SessionPhase::Running);
        coord.on_tick().unwrap();
        assert_eq!(coord.phase(), SessionPhase::Finalizing);

        coord.await_payload().unwrap();
        assert_eq!(coord.phase(), SessionPhase::Complete);
        // Initial render + one frame per tick, 2x2 RGBA.
        let artifact = coord.artifact().unwrap();
        assert_eq!(artifact.payload.data.len(), 3 * 2 * 2 * 4);
        assert_eq!(artifact.filename, "flatland.webm");
    }

    #[test]
    fn run_drives_a_session_to_completion() {
        let (mut coord, _surface) = coordinator();
        let report = coord.run(3).unwrap();
        assert_eq!(report.ticks, 3);
        assert_eq!(report.artifact.payload.data.len(), 4 * 2 * 2 * 4);
    }

    #[test]
    fn begin_rejects_an_active_session() {
        let (mut coord, _surface) = coordinator();
        coord.begin(1).unwrap();
        assert!(matches!(coord.begin(1), Err(FlatlandError::Session(_))));
    }

    #[test]
    fn bad_options_are_rejected_before_acquisition() {
        let surface = Surface::new(2, 2).unwrap();
        let opts = SessionOpts {
            tick_period_ms: 0,
            ..SessionOpts::default()
        };
        let mut coord: Coordinator<TestSim, MemoryRecorder, NoopPanel> =
            Coordinator::new(surface, MemoryRecorder, NoopPanel, opts);
        assert!(matches!(coord.begin(1), Err(FlatlandError::Validation(_))));
        assert_eq!(coord.phase(), SessionPhase::Idle);
    }

    #[test]
    fn ticks_before_begin_are_no_ops() {
        let (mut coord, _surface) = coordinator();
        coord.on_tick().unwrap();
        assert_eq!(coord.ticks(), 0);
        assert_eq!(coord.phase(), SessionPhase::Idle);
    }
}
