//! Simulation collaborator: the trait seam the session coordinator consumes,
//! plus the Flatland game itself.

mod enemy;
mod flatland;
mod grid;
mod hero;

pub use crate::sim::flatland::{CELL_PX, Flatland, FlatlandParams, RunState};
pub use crate::sim::grid::{Cell, Grid, Pos};

use crate::foundation::error::FlatlandResult;
use crate::surface::Surface;

/// One entity's requested move for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Hold position.
    Stay,
    /// Move one cell up (toward row 0).
    Up,
    /// Move one cell down.
    Down,
    /// Move one cell left.
    Left,
    /// Move one cell right.
    Right,
    /// Jump to a random unoccupied cell (hero only, budget permitting).
    Teleport,
    /// Deliberate self-destruct when no path remains.
    SelfDestruct,
}

/// Opaque simulation capability driven by the session coordinator.
///
/// The coordinator never looks inside: it constructs once per session, then
/// repeats update -> render -> terminal check on every tick.
pub trait Simulation: Sized {
    /// Construction parameters.
    type Params;

    /// Build a simulation that renders onto `surface`.
    fn construct(params: Self::Params, surface: &Surface) -> FlatlandResult<Self>;

    /// Advance the simulation by one tick.
    fn update(&mut self) -> FlatlandResult<()>;

    /// Render the current state onto the surface.
    fn render(&mut self) -> FlatlandResult<()>;

    /// Terminal predicate: true once the run is finished.
    fn is_finished(&self) -> bool;
}
