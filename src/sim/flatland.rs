use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::foundation::error::{FlatlandError, FlatlandResult};
use crate::sim::enemy::enemy_action;
use crate::sim::grid::{Cell, Grid, Pos};
use crate::sim::hero::hero_action;
use crate::sim::{Action, Simulation};
use crate::surface::{Frame, Surface};

/// Pixel size of one grid cell on the render surface.
pub const CELL_PX: u32 = 10;

const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];
const GREY: [u8; 4] = [0x88, 0x88, 0x88, 0xFF];
const GREEN: [u8; 4] = [0x00, 0xFF, 0x00, 0xFF];
const RED: [u8; 4] = [0xFF, 0x00, 0x00, 0xFF];
const BLUE: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Progress of one Flatland run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No tick has been applied yet.
    NotStarted,
    /// At least one tick ran, no terminal outcome yet.
    InProgress,
    /// The hero reached the goal.
    Victory,
    /// The hero was destroyed.
    Defeat,
}

impl RunState {
    /// True for the two terminal outcomes.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Victory | RunState::Defeat)
    }
}

/// Construction parameters for [`Flatland`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FlatlandParams {
    /// Approximate obstacle coverage ratio, 0..=1.
    pub dispersion: f32,
    /// Number of enemies placed at generation.
    pub enemies: usize,
    /// Teleports available to the hero.
    pub teleports: u32,
    /// Grid width in cells.
    pub grid_width: usize,
    /// Grid height in cells.
    pub grid_height: usize,
    /// World seed; equal seeds reproduce the run exactly.
    pub seed: u64,
}

impl Default for FlatlandParams {
    fn default() -> Self {
        Self {
            dispersion: 0.25,
            enemies: 20,
            teleports: 5,
            grid_width: 64,
            grid_height: 64,
            seed: 0,
        }
    }
}

impl FlatlandParams {
    /// Surface pixel dimensions a grid of this size renders onto.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            self.grid_width as u32 * CELL_PX,
            self.grid_height as u32 * CELL_PX,
        )
    }
}

/// The Flatland game: a hero pursuing a goal across a grid of obstacles while
/// enemies chase it down.
pub struct Flatland {
    grid: Grid,
    state: RunState,
    steps: u32,
    teleports_remaining: u32,
    rng: SmallRng,
    surface: Surface,
}

impl Flatland {
    /// Current world grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Current run state.
    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Ticks applied so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Hero teleports still available.
    pub fn teleports_remaining(&self) -> u32 {
        self.teleports_remaining
    }

    #[cfg(test)]
    pub(crate) fn with_grid(grid: Grid, teleports: u32, seed: u64, surface: Surface) -> Self {
        Self {
            grid,
            state: RunState::NotStarted,
            steps: 0,
            teleports_remaining: teleports,
            rng: SmallRng::seed_from_u64(seed),
            surface,
        }
    }

    /// Apply one tick: every live entity requests an action, then the actions
    /// resolve in shuffled order against the evolving grid.
    pub fn step(&mut self) {
        let mut pending: Vec<(Pos, Action)> = Vec::new();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                match self.grid.get((x, y)) {
                    Cell::Enemy => pending.push(((x, y), enemy_action((x, y), &self.grid))),
                    Cell::Hero => pending.push((
                        (x, y),
                        hero_action(
                            (x, y),
                            &self.grid,
                            self.steps,
                            self.teleports_remaining,
                            &mut self.rng,
                        ),
                    )),
                    _ => {}
                }
            }
        }
        pending.shuffle(&mut self.rng);

        self.state = RunState::InProgress;
        self.steps += 1;
        for (pos, action) in pending {
            self.apply(pos, action);
        }
    }

    fn apply(&mut self, pos: Pos, action: Action) {
        let entity = self.grid.get(pos);
        if entity != Cell::Hero && entity != Cell::Enemy {
            // The entity was destroyed earlier this tick.
            return;
        }

        let target: Option<(i64, i64)> = match action {
            Action::Stay => None,
            Action::Up => Some((pos.0 as i64, pos.1 as i64 - 1)),
            Action::Down => Some((pos.0 as i64, pos.1 as i64 + 1)),
            Action::Left => Some((pos.0 as i64 - 1, pos.1 as i64)),
            Action::Right => Some((pos.0 as i64 + 1, pos.1 as i64)),
            Action::Teleport => {
                if entity == Cell::Hero && self.teleports_remaining > 0 {
                    let open = self.grid.unoccupied();
                    if open.is_empty() {
                        None
                    } else {
                        let (tx, ty) = open[self.rng.random_range(0..open.len())];
                        self.teleports_remaining -= 1;
                        Some((tx as i64, ty as i64))
                    }
                } else {
                    None
                }
            }
            Action::SelfDestruct => Some((pos.0 as i64, pos.1 as i64)),
        };
        let Some((tx, ty)) = target else {
            return;
        };

        if tx < 0 || ty < 0 || tx >= self.grid.width() as i64 || ty >= self.grid.height() as i64 {
            self.grid.set(pos, Cell::Junk);
            if entity == Cell::Hero {
                self.state = RunState::Defeat;
            }
            return;
        }

        let to = (tx as usize, ty as usize);
        match self.grid.get(to) {
            Cell::Empty => {
                self.grid.set(pos, Cell::Empty);
                self.grid.set(to, entity);
            }
            Cell::Obstacle | Cell::Junk => {
                self.grid.set(pos, Cell::Junk);
                if entity == Cell::Hero {
                    self.state = RunState::Defeat;
                }
            }
            Cell::Enemy => {
                self.grid.set(pos, Cell::Junk);
                self.grid.set(to, Cell::Junk);
                if entity == Cell::Hero {
                    self.state = RunState::Defeat;
                }
            }
            Cell::Hero => {
                // Any collision involving the hero cell ends the run.
                self.grid.set(pos, Cell::Junk);
                self.grid.set(to, Cell::Junk);
                self.state = RunState::Defeat;
            }
            Cell::Goal => {
                if entity == Cell::Hero {
                    self.state = RunState::Victory;
                    self.grid.set(pos, Cell::Empty);
                }
            }
        }
    }

    /// Paint the grid into an RGBA frame at [`CELL_PX`] pixels per cell.
    pub fn render_frame(&self) -> Frame {
        let width = self.grid.width() as u32 * CELL_PX;
        let height = self.grid.height() as u32 * CELL_PX;
        let mut frame = Frame::filled(width, height, WHITE);
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let x0 = x as u32 * CELL_PX;
                let y0 = y as u32 * CELL_PX;
                match self.grid.get((x, y)) {
                    Cell::Empty => {}
                    Cell::Obstacle => fill_cell(&mut frame, x0, y0, BLACK),
                    Cell::Junk => fill_cell(&mut frame, x0, y0, GREY),
                    Cell::Goal => fill_cell(&mut frame, x0, y0, GREEN),
                    Cell::Enemy => paint_triangle(&mut frame, x0, y0, RED),
                    Cell::Hero => paint_disc(&mut frame, x0, y0, BLUE),
                }
            }
        }
        frame
    }
}

impl Simulation for Flatland {
    type Params = FlatlandParams;

    fn construct(params: FlatlandParams, surface: &Surface) -> FlatlandResult<Self> {
        let (want_w, want_h) = params.surface_size();
        if surface.width() != want_w || surface.height() != want_h {
            return Err(FlatlandError::validation(format!(
                "surface is {}x{} but a {}x{} grid renders at {}x{}",
                surface.width(),
                surface.height(),
                params.grid_width,
                params.grid_height,
                want_w,
                want_h
            )));
        }
        let mut rng = SmallRng::seed_from_u64(params.seed);
        let grid = Grid::generate(
            params.grid_width,
            params.grid_height,
            params.dispersion,
            params.enemies,
            &mut rng,
        )?;
        Ok(Self {
            grid,
            state: RunState::NotStarted,
            steps: 0,
            teleports_remaining: params.teleports,
            rng,
            surface: surface.clone(),
        })
    }

    fn update(&mut self) -> FlatlandResult<()> {
        self.step();
        Ok(())
    }

    fn render(&mut self) -> FlatlandResult<()> {
        self.surface.present(self.render_frame())
    }

    fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}

fn put_px(frame: &mut Frame, x: u32, y: u32, rgba: [u8; 4]) {
    let i = ((y * frame.width + x) * 4) as usize;
    frame.data[i..i + 4].copy_from_slice(&rgba);
}

fn fill_cell(frame: &mut Frame, x0: u32, y0: u32, rgba: [u8; 4]) {
    for dy in 0..CELL_PX {
        for dx in 0..CELL_PX {
            put_px(frame, x0 + dx, y0 + dy, rgba);
        }
    }
}

/// Upward-pointing triangle: apex at the top center, widening downward.
fn paint_triangle(frame: &mut Frame, x0: u32, y0: u32, rgba: [u8; 4]) {
    let center = (CELL_PX - 1) / 2;
    for dy in 0..CELL_PX {
        let half = dy / 2;
        let left = center.saturating_sub(half);
        let right = (center + 1 + half).min(CELL_PX - 1);
        for dx in left..=right {
            put_px(frame, x0 + dx, y0 + dy, rgba);
        }
    }
}

/// Filled disc centered in the cell.
fn paint_disc(frame: &mut Frame, x0: u32, y0: u32, rgba: [u8; 4]) {
    let center = (CELL_PX as f32 - 1.0) / 2.0;
    let radius = CELL_PX as f32 * 0.35;
    for dy in 0..CELL_PX {
        for dx in 0..CELL_PX {
            let ox = dx as f32 - center;
            let oy = dy as f32 - center;
            if ox * ox + oy * oy <= radius * radius {
                put_px(frame, x0 + dx, y0 + dy, rgba);
            }
        }
    }
}
