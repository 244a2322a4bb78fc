//! Flatland drives a tick-based simulation onto a render surface while an
//! asynchronous encoder records the surface into a downloadable video
//! artifact.
//!
//! The public API is session-oriented:
//!
//! - Create a [`Surface`] and pick a [`MediaBackend`]
//! - Construct a [`Coordinator`] over a [`Simulation`]
//! - [`Coordinator::run`] arms recording, ticks the simulation to its
//!   terminal state, and publishes the [`Artifact`] once the encoder's
//!   deferred completion arrives
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Capture streams and video encoders.
pub mod record;
/// Session lifecycle coordination.
pub mod session;
/// Simulation trait and the Flatland game.
pub mod sim;
/// Shared render surface.
pub mod surface;
/// Control-panel collaborator.
pub mod ui;

pub use crate::foundation::error::{FlatlandError, FlatlandResult};

pub use crate::record::{
    CaptureRate, CaptureStream, EncodedPayload, Encoder, FfmpegRecorder, MediaBackend,
    MemoryRecorder, PayloadReceiver,
};
pub use crate::session::{
    Artifact, Coordinator, SessionOpts, SessionPhase, SessionReport, run_session,
};
pub use crate::sim::{CELL_PX, Flatland, FlatlandParams, Simulation};
pub use crate::surface::{Frame, Surface};
pub use crate::ui::{ControlId, ControlPanel, DownloadDir};
