use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::sim::Action;
use crate::sim::grid::{Cell, Grid, Pos};

/// BFS distance from the nearest of `sources` across passable cells.
/// `None` marks cells no source can reach.
pub(crate) fn distance_field(grid: &Grid, sources: &[Pos]) -> Vec<Option<u32>> {
    let mut dist: Vec<Option<u32>> = vec![None; grid.width() * grid.height()];
    let mut frontier = VecDeque::new();
    for &pos in sources {
        if dist[grid.index(pos)].is_none() {
            dist[grid.index(pos)] = Some(0);
            frontier.push_back(pos);
        }
    }
    while let Some(pos) = frontier.pop_front() {
        let here = dist[grid.index(pos)].unwrap_or(0);
        for n in grid.passable_neighbors(pos) {
            let i = grid.index(n);
            if dist[i].is_none() {
                dist[i] = Some(here + 1);
                frontier.push_back(n);
            }
        }
    }
    dist
}

/// Decide the hero's move: flee adjacent enemies by teleport, give up when
/// boxed in with no budget, otherwise descend toward the goal while the fear
/// term pushes away from enemies early in the run.
pub(crate) fn hero_action(
    pos: Pos,
    grid: &Grid,
    steps_run: u32,
    teleports_remaining: u32,
    rng: &mut SmallRng,
) -> Action {
    let goal_dist = distance_field(grid, &grid.positions_of(Cell::Goal));
    let enemy_dist = distance_field(grid, &grid.positions_of(Cell::Enemy));

    // Courage grows with elapsed steps; early on the hero gives enemies a
    // wide berth.
    let fear_falloff = 6.0 / (f64::from(steps_run) / 50.0);

    let here = grid.index(pos);
    if enemy_dist[here].unwrap_or(u32::MAX) <= 2 {
        return Action::Teleport;
    }
    if goal_dist[here].is_none() && (enemy_dist[here].is_none() || fear_falloff <= 3.0) {
        if teleports_remaining != 0 {
            return Action::Teleport;
        }
        return Action::SelfDestruct;
    }

    let mut best: Option<Pos> = None;
    let mut best_value = f64::INFINITY;
    let mut neighbors = grid.passable_neighbors(pos);
    neighbors.shuffle(rng);
    for n in neighbors {
        let i = grid.index(n);
        let value = f64::from(goal_dist[i].unwrap_or(u32::MAX)).sqrt()
            - fear_falloff.min(f64::from(enemy_dist[i].unwrap_or(1)));
        if value < best_value {
            best_value = value;
            best = Some(n);
        }
    }

    match best {
        Some((nx, ny)) => {
            let dx = nx as i64 - pos.0 as i64;
            let dy = ny as i64 - pos.1 as i64;
            if dx < 0 {
                Action::Left
            } else if dx > 0 {
                Action::Right
            } else if dy < 0 {
                Action::Up
            } else if dy > 0 {
                Action::Down
            } else {
                Action::Stay
            }
        }
        None => Action::Stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn open_grid(width: usize, height: usize) -> Grid {
        Grid::from_cells(width, height, vec![Cell::Empty; width * height])
    }

    #[test]
    fn distance_field_radiates_from_source() {
        let grid = open_grid(3, 3);
        let dist = distance_field(&grid, &[(0, 0)]);
        assert_eq!(dist[grid.index((0, 0))], Some(0));
        assert_eq!(dist[grid.index((1, 0))], Some(1));
        assert_eq!(dist[grid.index((1, 1))], Some(2));
        assert_eq!(dist[grid.index((2, 2))], Some(4));
    }

    #[test]
    fn distance_field_stops_at_walls() {
        // Vertical wall splits the 3x3 world.
        let mut grid = open_grid(3, 3);
        grid.set((1, 0), Cell::Obstacle);
        grid.set((1, 1), Cell::Obstacle);
        grid.set((1, 2), Cell::Obstacle);
        let dist = distance_field(&grid, &[(0, 0)]);
        assert_eq!(dist[grid.index((2, 0))], None);
        assert_eq!(dist[grid.index((2, 2))], None);
    }

    #[test]
    fn hero_steps_toward_a_reachable_goal() {
        let mut grid = open_grid(4, 1);
        grid.set((0, 0), Cell::Hero);
        grid.set((3, 0), Cell::Goal);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(hero_action((0, 0), &grid, 10, 5, &mut rng), Action::Right);
    }

    #[test]
    fn hero_teleports_away_from_an_adjacent_enemy() {
        let mut grid = open_grid(5, 5);
        grid.set((2, 2), Cell::Hero);
        grid.set((2, 3), Cell::Enemy);
        grid.set((4, 4), Cell::Goal);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(hero_action((2, 2), &grid, 0, 5, &mut rng), Action::Teleport);
    }

    #[test]
    fn boxed_in_hero_without_budget_self_destructs() {
        // No goal anywhere, no enemies, and no teleports left.
        let mut grid = open_grid(3, 3);
        grid.set((1, 1), Cell::Hero);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            hero_action((1, 1), &grid, 0, 0, &mut rng),
            Action::SelfDestruct
        );
    }
}
