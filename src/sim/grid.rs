use rand::Rng;
use rand::rngs::SmallRng;

use crate::foundation::error::{FlatlandError, FlatlandResult};

/// Grid position as `(x, y)`, `x` growing rightward and `y` downward.
pub type Pos = (usize, usize);

/// One cell of the Flatland grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Walkable floor.
    Empty,
    /// Impassable wall; colliding with it destroys the mover.
    Obstacle,
    /// The hero.
    Hero,
    /// A pursuing enemy.
    Enemy,
    /// The hero's destination.
    Goal,
    /// Wreckage left behind by a destroyed entity.
    Junk,
}

impl Cell {
    fn glyph(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Obstacle => '\u{2588}',
            Cell::Hero => '\u{2022}',
            Cell::Enemy => '\u{25B2}',
            Cell::Goal => '\u{25CE}',
            Cell::Junk => '\u{2592}',
        }
    }
}

/// Tetromino shapes used for obstacle scatter, as `(row, col)` offsets.
const TETROMINOES: [&[(usize, usize)]; 7] = [
    &[(0, 0), (0, 1), (0, 2), (0, 3)],
    &[(0, 0), (1, 0), (1, 1), (1, 2)],
    &[(0, 0), (0, 1), (0, 2), (1, 0)],
    &[(0, 0), (0, 1), (1, 1), (1, 2)],
    &[(0, 1), (0, 2), (1, 0), (1, 1)],
    &[(0, 1), (1, 0), (1, 1), (1, 2)],
    &[(0, 0), (0, 1), (1, 0), (1, 1)],
];

/// Smallest grid dimension that fits every rotated tetromino.
const MIN_GENERATED_DIM: usize = 8;

/// Rectangular Flatland world with runtime dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an all-empty grid.
    pub fn new(width: usize, height: usize) -> FlatlandResult<Self> {
        if width == 0 || height == 0 {
            return Err(FlatlandError::validation(
                "grid width/height must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        })
    }

    /// Generate a populated world: scattered tetromino obstacles at roughly
    /// `coverage` density, then `enemies` enemies, the hero, and the goal at
    /// random unoccupied cells.
    pub fn generate(
        width: usize,
        height: usize,
        coverage: f32,
        enemies: usize,
        rng: &mut SmallRng,
    ) -> FlatlandResult<Self> {
        if !(0.0..=1.0).contains(&coverage) {
            return Err(FlatlandError::validation(
                "obstacle coverage must be within 0..=1",
            ));
        }
        if width < MIN_GENERATED_DIM || height < MIN_GENERATED_DIM {
            return Err(FlatlandError::validation(format!(
                "generated grids must be at least {MIN_GENERATED_DIM}x{MIN_GENERATED_DIM}"
            )));
        }
        let mut grid = Self::new(width, height)?;
        grid.scatter_obstacles(coverage, rng);
        grid.spawn(Cell::Enemy, enemies, rng)?;
        grid.spawn(Cell::Hero, 1, rng)?;
        grid.spawn(Cell::Goal, 1, rng)?;
        Ok(grid)
    }

    #[cfg(test)]
    pub(crate) fn from_cells(width: usize, height: usize, cells: Vec<Cell>) -> Self {
        assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn index(&self, (x, y): Pos) -> usize {
        y * self.width + x
    }

    /// Cell at `pos`. `pos` must be within the grid.
    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[self.index(pos)]
    }

    pub(crate) fn set(&mut self, pos: Pos, cell: Cell) {
        let i = self.index(pos);
        self.cells[i] = cell;
    }

    /// First cell holding `cell`, scanning row-major.
    pub fn find(&self, cell: Cell) -> Option<Pos> {
        self.positions_of(cell).into_iter().next()
    }

    /// Every position holding `cell`, row-major.
    pub fn positions_of(&self, cell: Cell) -> Vec<Pos> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get((x, y)) == cell {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Every empty cell, row-major.
    pub fn unoccupied(&self) -> Vec<Pos> {
        self.positions_of(Cell::Empty)
    }

    /// 4-neighbors an entity can enter or path through: everything except
    /// obstacles and junk.
    pub fn passable_neighbors(&self, (x, y): Pos) -> Vec<Pos> {
        let mut out = Vec::new();
        for (dx, dy) in [(-1i64, 0i64), (0, -1), (0, 1), (1, 0)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
                continue;
            }
            let n = (nx as usize, ny as usize);
            match self.get(n) {
                Cell::Empty | Cell::Goal | Cell::Hero | Cell::Enemy => out.push(n),
                Cell::Obstacle | Cell::Junk => {}
            }
        }
        out
    }

    /// Box-framed Unicode rendering for terminal debugging. Obstacles and junk
    /// print double-width so cells come out roughly square.
    pub fn display_string(&self) -> String {
        let mut out = String::new();
        out.push('\u{250C}');
        out.push_str(&"\u{2500}".repeat(self.width * 2));
        out.push_str("\u{2510}\n");
        for y in 0..self.height {
            out.push('\u{2502}');
            for x in 0..self.width {
                let glyph = self.get((x, y)).glyph();
                out.push(glyph);
                match self.get((x, y)) {
                    Cell::Obstacle | Cell::Junk => out.push(glyph),
                    _ => out.push(' '),
                }
            }
            out.push_str("\u{2502}\n");
        }
        out.push('\u{2514}');
        out.push_str(&"\u{2500}".repeat(self.width * 2));
        out.push_str("\u{2518}\n");
        out
    }

    fn scatter_obstacles(&mut self, coverage: f32, rng: &mut SmallRng) {
        let pieces = ((self.width * self.height) as f32 * coverage / 4.0) as usize;
        for _ in 0..pieces {
            let shape = TETROMINOES[rng.random_range(0..TETROMINOES.len())];
            let mut cells: Vec<(usize, usize)> = shape.to_vec();
            for _ in 0..rng.random_range(0..4u8) {
                cells = rotate_quarter_turn(&cells);
            }
            let (rows, cols) = shape_bounds(&cells);
            if rows > self.height || cols > self.width {
                continue;
            }
            let row0 = rng.random_range(0..=self.height - rows);
            let col0 = rng.random_range(0..=self.width - cols);
            for &(r, c) in &cells {
                self.set((col0 + c, row0 + r), Cell::Obstacle);
            }
        }
    }

    fn spawn(&mut self, cell: Cell, count: usize, rng: &mut SmallRng) -> FlatlandResult<()> {
        let mut open = self.unoccupied();
        if open.len() < count {
            return Err(FlatlandError::simulation(format!(
                "grid ran out of space placing {count} {cell:?} cell(s)"
            )));
        }
        for _ in 0..count {
            let i = rng.random_range(0..open.len());
            let pos = open.swap_remove(i);
            self.set(pos, cell);
        }
        Ok(())
    }
}

fn rotate_quarter_turn(cells: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let rows = cells.iter().map(|&(r, _)| r).max().unwrap_or(0) + 1;
    cells.iter().map(|&(r, c)| (c, rows - 1 - r)).collect()
}

fn shape_bounds(cells: &[(usize, usize)]) -> (usize, usize) {
    let rows = cells.iter().map(|&(r, _)| r).max().unwrap_or(0) + 1;
    let cols = cells.iter().map(|&(_, c)| c).max().unwrap_or(0) + 1;
    (rows, cols)
}
