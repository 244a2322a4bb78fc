use crate::sim::Action;
use crate::sim::grid::{Cell, Grid, Pos};

/// Greedy chase: close the dominant axis toward the hero; idle when no hero
/// remains on the map.
pub(crate) fn enemy_action(pos: Pos, grid: &Grid) -> Action {
    let Some((hero_x, hero_y)) = grid.find(Cell::Hero) else {
        return Action::Stay;
    };
    let dx = hero_x as i64 - pos.0 as i64;
    let dy = hero_y as i64 - pos.1 as i64;
    if dx.abs() > dy.abs() {
        if dx < 0 { Action::Left } else { Action::Right }
    } else if dy < 0 {
        Action::Up
    } else {
        Action::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(hero: Option<Pos>, enemy: Pos) -> Grid {
        let mut cells = vec![Cell::Empty; 25];
        if let Some((x, y)) = hero {
            cells[y * 5 + x] = Cell::Hero;
        }
        cells[enemy.1 * 5 + enemy.0] = Cell::Enemy;
        Grid::from_cells(5, 5, cells)
    }

    #[test]
    fn enemy_closes_the_dominant_axis() {
        let grid = grid_with(Some((0, 2)), (4, 3));
        assert_eq!(enemy_action((4, 3), &grid), Action::Left);

        let grid = grid_with(Some((2, 0)), (2, 4));
        assert_eq!(enemy_action((2, 4), &grid), Action::Up);

        // Ties resolve along the vertical axis.
        let grid = grid_with(Some((0, 0)), (2, 2));
        assert_eq!(enemy_action((2, 2), &grid), Action::Up);
    }

    #[test]
    fn enemy_idles_without_a_hero() {
        let grid = grid_with(None, (1, 1));
        assert_eq!(enemy_action((1, 1), &grid), Action::Stay);
    }
}
