//! Session lifecycle coordination.
//!
//! One session runs: arm recording -> tick the simulation to its terminal
//! state -> stop the encoder -> publish the artifact. The [`Coordinator`]
//! guarantees recording fully brackets simulation execution, with exactly one
//! encoder start/stop pair and exactly one tick timer per session.

mod coordinator;
mod timer;

pub use crate::session::coordinator::{
    Artifact, Coordinator, SessionOpts, SessionPhase, SessionReport, run_session,
};
pub use crate::session::timer::PeriodicTimer;
